//! services/analytics/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the `EventStore`, `BookProgressStore` and `RecapSnapshotStore` ports from
//! the core crate. It handles all interactions with PostgreSQL using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reading_analytics_core::domain::{
    BookChapterCount, BookProgressSummary, DateRange, ReadingEvent, RecapSnapshot,
};
use reading_analytics_core::ports::{
    BookProgressStore, EventStore, PortError, PortResult, RecapSnapshotStore,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PortError::Unavailable(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

/// Splits an optional range into nullable bounds; `NULL` means unbounded.
fn bounds(range: Option<DateRange>) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match range {
        Some(r) => (Some(r.from), Some(r.to)),
        None => (None, None),
    }
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ReadingEventRecord {
    id: Uuid,
    user_id: Uuid,
    book_id: i16,
    chapter: i16,
    date_read: NaiveDate,
    created_at: DateTime<Utc>,
    notes: Option<String>,
}
impl ReadingEventRecord {
    fn to_domain(self) -> ReadingEvent {
        ReadingEvent {
            id: self.id,
            user_id: self.user_id,
            book_id: u8::try_from(self.book_id).unwrap_or_default(),
            chapter: u16::try_from(self.chapter).unwrap_or_default(),
            date_read: self.date_read,
            created_at: self.created_at,
            notes: self.notes,
        }
    }
}

#[derive(FromRow)]
struct BookCountRecord {
    book_id: i16,
    chapters: i64,
}
impl BookCountRecord {
    fn to_domain(self) -> BookChapterCount {
        BookChapterCount {
            book_id: u8::try_from(self.book_id).unwrap_or_default(),
            chapters: u32::try_from(self.chapters).unwrap_or(u32::MAX),
        }
    }
}

#[derive(FromRow)]
struct RecapSnapshotRecord {
    user_id: Uuid,
    year: i32,
    snapshot_json: String,
    generated_at: DateTime<Utc>,
}
impl RecapSnapshotRecord {
    fn to_domain(self) -> RecapSnapshot {
        RecapSnapshot {
            user_id: self.user_id,
            year: self.year,
            snapshot_json: self.snapshot_json,
            generated_at: self.generated_at,
        }
    }
}

const EVENT_COLUMNS: &str = "id, user_id, book_id, chapter, date_read, created_at, notes";

//=========================================================================================
// `EventStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl EventStore for DbAdapter {
    async fn distinct_dates(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<Vec<NaiveDate>> {
        let (from, to) = bounds(range);
        let rows: Vec<(NaiveDate,)> = sqlx::query_as(
            "SELECT DISTINCT date_read FROM reading_events
             WHERE user_id = $1
               AND ($2::date IS NULL OR date_read >= $2)
               AND ($3::date IS NULL OR date_read <= $3)
             ORDER BY date_read",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(|(date,)| date).collect())
    }

    async fn events(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<Vec<ReadingEvent>> {
        let (from, to) = bounds(range);
        let records: Vec<ReadingEventRecord> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM reading_events
             WHERE user_id = $1
               AND ($2::date IS NULL OR date_read >= $2)
               AND ($3::date IS NULL OR date_read <= $3)
             ORDER BY date_read, created_at, book_id, chapter"
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn count_events(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<u64> {
        let (from, to) = bounds(range);
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reading_events
             WHERE user_id = $1
               AND ($2::date IS NULL OR date_read >= $2)
               AND ($3::date IS NULL OR date_read <= $3)",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count(total))
    }

    async fn count_distinct_dates(&self, user_id: Uuid) -> PortResult<u64> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(DISTINCT date_read) FROM reading_events WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(count(total))
    }

    async fn group_by_book(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<Vec<BookChapterCount>> {
        let (from, to) = bounds(range);
        let records: Vec<BookCountRecord> = sqlx::query_as(
            "SELECT book_id, COUNT(*) AS chapters FROM reading_events
             WHERE user_id = $1
               AND ($2::date IS NULL OR date_read >= $2)
               AND ($3::date IS NULL OR date_read <= $3)
             GROUP BY book_id
             ORDER BY chapters DESC, book_id",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn recent_events(&self, user_id: Uuid, limit: u32) -> PortResult<Vec<ReadingEvent>> {
        let records: Vec<ReadingEventRecord> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM reading_events
             WHERE user_id = $1
             ORDER BY created_at DESC, book_id, chapter
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `BookProgressStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl BookProgressStore for DbAdapter {
    async fn completed_books_between(
        &self,
        user_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> PortResult<u32> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM book_progress
             WHERE user_id = $1 AND is_completed AND updated_at >= $2 AND updated_at < $3",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(u32::try_from(total).unwrap_or(0))
    }

    async fn progress_summary(&self, user_id: Uuid) -> PortResult<BookProgressSummary> {
        let (completed, in_progress): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE is_completed),
                    COUNT(*) FILTER (WHERE NOT is_completed)
             FROM book_progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(BookProgressSummary {
            books_completed: u32::try_from(completed).unwrap_or(0),
            books_in_progress: u32::try_from(in_progress).unwrap_or(0),
        })
    }
}

//=========================================================================================
// `RecapSnapshotStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecapSnapshotStore for DbAdapter {
    async fn find(&self, user_id: Uuid, year: i32) -> PortResult<Option<RecapSnapshot>> {
        let record: Option<RecapSnapshotRecord> = sqlx::query_as(
            "SELECT user_id, year, snapshot_json, generated_at FROM annual_recap_snapshots
             WHERE user_id = $1 AND year = $2",
        )
        .bind(user_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn insert_if_absent(&self, snapshot: &RecapSnapshot) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO annual_recap_snapshots (user_id, year, snapshot_json, generated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, year) DO NOTHING",
        )
        .bind(snapshot.user_id)
        .bind(snapshot.year)
        .bind(&snapshot.snapshot_json)
        .bind(snapshot.generated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }
}
