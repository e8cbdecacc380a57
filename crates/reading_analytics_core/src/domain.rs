//! crates/reading_analytics_core/src/domain.rs
//!
//! Defines the pure, core data structures for the analytics engine.
//! These structs are independent of any database; the ones that leave the
//! engine as views derive `Serialize` so the presentation layer and the
//! snapshot store can render them directly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single chapter read by a user on a calendar day.
///
/// Owned by the event store. Only `notes` may change after creation, and
/// `(user_id, book_id, chapter, date_read)` is unique upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: u8,
    pub chapter: u16,
    pub date_read: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Chapter count for one book, as returned by the store's per-book grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookChapterCount {
    pub book_id: u8,
    pub chapters: u32,
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// The single-day range `[date, date]`.
    pub fn day(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Aggregate book-progress counts from the book-progress collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookProgressSummary {
    pub books_completed: u32,
    pub books_in_progress: u32,
}

/// A persisted, immutable annual recap for a year that has fully elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecapSnapshot {
    pub user_id: Uuid,
    pub year: i32,
    /// Opaque serialized recap payload.
    pub snapshot_json: String,
    pub generated_at: DateTime<Utc>,
}

/// Consecutive events logged together for one book, grouped for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSession {
    pub book_id: u8,
    pub book_name: String,
    pub first_chapter: u16,
    pub last_chapter: u16,
    pub chapters: u32,
    pub date_read: NaiveDate,
    pub logged_at: DateTime<Utc>,
}

impl ReadingSession {
    /// "Genesis 1-3" or "Psalms 23".
    pub fn label(&self) -> String {
        if self.first_chapter == self.last_chapter {
            format!("{} {}", self.book_name, self.first_chapter)
        } else {
            format!("{} {}-{}", self.book_name, self.first_chapter, self.last_chapter)
        }
    }
}
