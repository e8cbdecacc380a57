//! crates/reading_analytics_core/src/recap/mod.rs
//!
//! Year-in-review aggregation over one calendar year of reading events.
//!
//! Everything here is pure: the engine fetches the year's events and
//! completed-book count, and decides whether the result is persisted as an
//! immutable snapshot or cached until the end of the day.

pub mod personality;
pub mod rewind;

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::books::Book;
use crate::domain::{BookChapterCount, DateRange, ReadingEvent};
use crate::streak::{self, ReadingDates};

pub use personality::{Personality, PersonalityMetrics, ReaderPersonality};
pub use rewind::RewindSummary;

pub const TOP_BOOKS_LIMIT: usize = 3;

/// The inclusive `[Jan 1, Dec 31]` range of `year`.
pub fn year_range(year: i32) -> Option<DateRange> {
    Some(DateRange::new(
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// "Jan 1" style label.
pub fn day_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyStreak {
    pub count: u32,
    pub start_label: String,
    pub end_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopBook {
    pub book_id: u8,
    pub name: String,
    pub chapters: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualRecap {
    pub year: i32,
    pub total_chapters_read: u32,
    pub active_days_count: u32,
    pub yearly_streak: YearlyStreak,
    pub top_books: Vec<TopBook>,
    pub books_completed_count: u32,
    pub reader_personality: ReaderPersonality,
    pub heatmap_data: BTreeMap<NaiveDate, u32>,
    pub first_reading: NaiveDate,
    pub last_reading: NaiveDate,
}

/// Everything the recap is computed from.
#[derive(Debug, Clone, Copy)]
pub struct RecapInput<'a> {
    pub year: i32,
    pub events: &'a [ReadingEvent],
    pub books_completed: u32,
    pub today: NaiveDate,
    pub launch_date: NaiveDate,
}

/// Orders per-book counts highest first. Equal counts follow canonical book
/// order, never the order the store grouped them in.
pub fn rank_book_counts(counts: &[BookChapterCount]) -> Vec<TopBook> {
    let mut ranked = counts.to_vec();
    ranked.sort_by(|a, b| b.chapters.cmp(&a.chapters).then(a.book_id.cmp(&b.book_id)));
    ranked
        .into_iter()
        .map(|count| TopBook {
            book_id: count.book_id,
            name: Book::name_of(count.book_id),
            chapters: count.chapters,
        })
        .collect()
}

/// Chapters per book, highest first.
pub fn rank_books(events: &[ReadingEvent]) -> Vec<TopBook> {
    let mut counts: HashMap<u8, u32> = HashMap::new();
    for event in events {
        *counts.entry(event.book_id).or_default() += 1;
    }
    let counts: Vec<BookChapterCount> = counts
        .into_iter()
        .map(|(book_id, chapters)| BookChapterCount { book_id, chapters })
        .collect();
    rank_book_counts(&counts)
}

/// Chapters logged on each day.
pub fn heatmap(events: &[ReadingEvent]) -> BTreeMap<NaiveDate, u32> {
    let mut map = BTreeMap::new();
    for event in events {
        *map.entry(event.date_read).or_insert(0) += 1;
    }
    map
}

/// Builds the recap for `input.year`, ignoring events outside that year.
/// Returns `None` when the user logged nothing in the year.
pub fn build(input: RecapInput<'_>) -> Option<AnnualRecap> {
    let range = year_range(input.year)?;
    let events: Vec<ReadingEvent> = input
        .events
        .iter()
        .filter(|e| range.contains(e.date_read))
        .cloned()
        .collect();
    if events.is_empty() {
        return None;
    }

    let heatmap_data = heatmap(&events);
    let dates: ReadingDates = heatmap_data.keys().copied().collect();
    let first_reading = *heatmap_data.keys().next()?;
    let last_reading = *heatmap_data.keys().next_back()?;

    let total_chapters_read = events.len() as u32;
    let active_days_count = dates.len() as u32;

    let yearly_streak = streak::longest_run(&dates)
        .map(|run| YearlyStreak {
            count: run.length,
            start_label: day_label(run.start),
            end_label: day_label(run.end),
        })
        .unwrap_or_default();

    let weekend_chapters = events
        .iter()
        .filter(|e| personality::is_weekend(e.date_read))
        .count() as u32;
    let metrics = PersonalityMetrics {
        active_days: active_days_count,
        available_days: personality::available_days(
            input.year,
            input.today,
            input.launch_date,
            active_days_count,
        ),
        total_chapters: total_chapters_read,
        weekend_chapters,
    };

    let mut top_books = rank_books(&events);
    top_books.truncate(TOP_BOOKS_LIMIT);

    Some(AnnualRecap {
        year: input.year,
        total_chapters_read,
        active_days_count,
        yearly_streak,
        top_books,
        books_completed_count: input.books_completed,
        reader_personality: ReaderPersonality::from_metrics(&metrics),
        heatmap_data,
        first_reading,
        last_reading,
    })
}

/// True when `year` has fully elapsed relative to `today`.
pub fn is_past_year(year: i32, today: NaiveDate) -> bool {
    year < today.year()
}
