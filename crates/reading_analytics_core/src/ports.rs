//! crates/reading_analytics_core/src/ports.rs
//!
//! Defines the service contracts (traits) the analytics engine depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! engine independent of the concrete event store, snapshot table and cache
//! backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::{BookChapterCount, BookProgressSummary, DateRange, ReadingEvent, RecapSnapshot};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, cache).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read access to the append-only reading event log.
///
/// A `None` range means the user's whole history.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Unique `date_read` values, in any order.
    async fn distinct_dates(&self, user_id: Uuid, range: Option<DateRange>)
        -> PortResult<Vec<NaiveDate>>;

    async fn events(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<Vec<ReadingEvent>>;

    async fn count_events(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<u64>;

    async fn count_distinct_dates(&self, user_id: Uuid) -> PortResult<u64>;

    async fn group_by_book(
        &self,
        user_id: Uuid,
        range: Option<DateRange>,
    ) -> PortResult<Vec<BookChapterCount>>;

    /// The most recently logged events, newest `created_at` first.
    async fn recent_events(&self, user_id: Uuid, limit: u32) -> PortResult<Vec<ReadingEvent>>;
}

#[async_trait]
pub trait BookProgressStore: Send + Sync {
    /// Books marked complete whose completion timestamp falls in `[from, to)`.
    async fn completed_books_between(
        &self,
        user_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> PortResult<u32>;

    async fn progress_summary(&self, user_id: Uuid) -> PortResult<BookProgressSummary>;
}

/// Persistent storage of past-year recaps, unique on `(user_id, year)`.
#[async_trait]
pub trait RecapSnapshotStore: Send + Sync {
    async fn find(&self, user_id: Uuid, year: i32) -> PortResult<Option<RecapSnapshot>>;

    /// Insert-or-ignore. Returns `false` when a snapshot already existed and
    /// the given one was discarded.
    async fn insert_if_absent(&self, snapshot: &RecapSnapshot) -> PortResult<bool>;
}

/// A key/value store with per-key TTL and explicit delete.
///
/// Values are opaque serialized strings. Implementations may lose entries at
/// any time; the engine treats every error as a miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> PortResult<()>;

    async fn delete(&self, keys: &[String]) -> PortResult<()>;

    /// Removes every key starting with `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> PortResult<()>;
}

/// The user's reference "now", in their local calendar.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// The same instant as a UTC timestamp, for stored audit columns.
    fn now_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.now())
    }
}

/// Wall-clock time in the process's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
