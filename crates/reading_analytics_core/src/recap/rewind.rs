//! The "rewind" view: the same year of events grouped by book, testament,
//! genre and weekday.
//!
//! Every "most" pick breaks exact ties by canonical order: book id,
//! Old before New Testament, genre declaration order, Sunday first.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::books::{Book, Genre, Testament};
use crate::domain::ReadingEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewindSummary {
    pub year: i32,
    pub total_chapters: u32,
    pub active_days: u32,
    pub most_read_book: Option<CategoryCount>,
    pub most_read_testament: Option<CategoryCount>,
    pub most_read_genre: Option<CategoryCount>,
    /// Weekday with the most distinct reading days.
    pub most_active_day: Option<CategoryCount>,
}

/// The highest count, scanning keys in ascending order so the smallest key
/// wins a tie.
fn pick_max<K: Ord + Copy>(counts: &BTreeMap<K, u32>) -> Option<(K, u32)> {
    counts.iter().fold(None, |best, (key, count)| match best {
        Some((_, best_count)) if best_count >= *count => best,
        _ => Some((*key, *count)),
    })
}

const WEEKDAYS_FROM_SUNDAY: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// Builds the rewind for `year`. Returns `None` when no events fall in it.
pub fn build(year: i32, events: &[ReadingEvent]) -> Option<RewindSummary> {
    let events: Vec<&ReadingEvent> = events.iter().filter(|e| e.date_read.year() == year).collect();
    if events.is_empty() {
        return None;
    }

    let mut by_book: BTreeMap<u8, u32> = BTreeMap::new();
    let mut by_testament: BTreeMap<Testament, u32> = BTreeMap::new();
    let mut by_genre: BTreeMap<Genre, u32> = BTreeMap::new();
    let mut days: BTreeSet<NaiveDate> = BTreeSet::new();

    for event in &events {
        *by_book.entry(event.book_id).or_default() += 1;
        if let Some(book) = Book::by_id(event.book_id) {
            *by_testament.entry(book.testament()).or_default() += 1;
            *by_genre.entry(book.genre).or_default() += 1;
        }
        days.insert(event.date_read);
    }

    let mut by_weekday: BTreeMap<u32, u32> = BTreeMap::new();
    for day in &days {
        *by_weekday.entry(day.weekday().num_days_from_sunday()).or_default() += 1;
    }

    Some(RewindSummary {
        year,
        total_chapters: events.len() as u32,
        active_days: days.len() as u32,
        most_read_book: pick_max(&by_book).map(|(id, count)| CategoryCount {
            name: Book::name_of(id),
            count,
        }),
        most_read_testament: pick_max(&by_testament).map(|(t, count)| CategoryCount {
            name: t.name().to_string(),
            count,
        }),
        most_read_genre: pick_max(&by_genre).map(|(g, count)| CategoryCount {
            name: g.name().to_string(),
            count,
        }),
        most_active_day: pick_max(&by_weekday).map(|(idx, count)| CategoryCount {
            name: weekday_name(WEEKDAYS_FROM_SUNDAY[idx as usize]).to_string(),
            count,
        }),
    })
}
