//! In-memory fakes of every port, shared by the engine integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use reading_analytics_core::{
    AnalyticsEngine, BookChapterCount, BookProgressStore, BookProgressSummary, CacheStore,
    DateRange, EngineSettings, EventStore, FixedClock, PortError, PortResult, ReadingEvent,
    RecapSnapshot, RecapSnapshotStore,
};
use uuid::Uuid;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 0, 0).unwrap()
}

fn in_range(range: Option<DateRange>, date: NaiveDate) -> bool {
    range.map_or(true, |r| r.contains(date))
}

//=========================================================================================
// Event store
//=========================================================================================

#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<ReadingEvent>>,
    pub fail: Mutex<bool>,
}

impl MemoryEventStore {
    /// Logs one chapter, rejecting a duplicate `(user, book, chapter, day)`.
    pub fn log(&self, user_id: Uuid, book_id: u8, chapter: u16, date_read: NaiveDate) -> bool {
        let mut events = self.events.lock().unwrap();
        let duplicate = events.iter().any(|e| {
            e.user_id == user_id && e.book_id == book_id && e.chapter == chapter && e.date_read == date_read
        });
        if duplicate {
            return false;
        }
        let created_at = Utc.from_utc_datetime(&at(date_read, 7)) + chrono::Duration::seconds(events.len() as i64);
        events.push(ReadingEvent {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            chapter,
            date_read,
            created_at,
            notes: None,
        });
        true
    }

    /// One chapter of Genesis on each day.
    pub fn log_days(&self, user_id: Uuid, days: impl IntoIterator<Item = NaiveDate>) {
        for (i, day) in days.into_iter().enumerate() {
            self.log(user_id, 1, (i % 50) as u16 + 1, day);
        }
    }

    pub fn remove_day(&self, user_id: Uuid, date_read: NaiveDate) {
        self.events
            .lock()
            .unwrap()
            .retain(|e| !(e.user_id == user_id && e.date_read == date_read));
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    fn matching(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<Vec<ReadingEvent>> {
        if *self.fail.lock().unwrap() {
            return Err(PortError::Unavailable("event store offline".to_string()));
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && in_range(range, e.date_read))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn distinct_dates(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<Vec<NaiveDate>> {
        let dates: BTreeSet<NaiveDate> = self.matching(user_id, range)?.iter().map(|e| e.date_read).collect();
        Ok(dates.into_iter().collect())
    }

    async fn events(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<Vec<ReadingEvent>> {
        self.matching(user_id, range)
    }

    async fn count_events(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<u64> {
        Ok(self.matching(user_id, range)?.len() as u64)
    }

    async fn count_distinct_dates(&self, user_id: Uuid) -> PortResult<u64> {
        Ok(self.distinct_dates(user_id, None).await?.len() as u64)
    }

    async fn group_by_book(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<Vec<BookChapterCount>> {
        let mut counts: HashMap<u8, u32> = HashMap::new();
        for event in self.matching(user_id, range)? {
            *counts.entry(event.book_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(book_id, chapters)| BookChapterCount { book_id, chapters })
            .collect())
    }

    async fn recent_events(&self, user_id: Uuid, limit: u32) -> PortResult<Vec<ReadingEvent>> {
        let mut events = self.matching(user_id, None)?;
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit as usize);
        Ok(events)
    }
}

//=========================================================================================
// Book progress
//=========================================================================================

#[derive(Default)]
pub struct MemoryBookProgress {
    pub completed_at: Mutex<Vec<(Uuid, NaiveDateTime)>>,
}

#[async_trait]
impl BookProgressStore for MemoryBookProgress {
    async fn completed_books_between(&self, user_id: Uuid, from: NaiveDateTime, to: NaiveDateTime) -> PortResult<u32> {
        Ok(self
            .completed_at
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, when)| *user == user_id && from <= *when && *when < to)
            .count() as u32)
    }

    async fn progress_summary(&self, user_id: Uuid) -> PortResult<BookProgressSummary> {
        let completed = self.completed_at.lock().unwrap().iter().filter(|(u, _)| *u == user_id).count();
        Ok(BookProgressSummary {
            books_completed: completed as u32,
            books_in_progress: 0,
        })
    }
}

//=========================================================================================
// Snapshot store
//=========================================================================================

#[derive(Default)]
pub struct MemorySnapshots {
    pub rows: Mutex<HashMap<(Uuid, i32), RecapSnapshot>>,
    pub inserts: AtomicUsize,
}

#[async_trait]
impl RecapSnapshotStore for MemorySnapshots {
    async fn find(&self, user_id: Uuid, year: i32) -> PortResult<Option<RecapSnapshot>> {
        Ok(self.rows.lock().unwrap().get(&(user_id, year)).cloned())
    }

    async fn insert_if_absent(&self, snapshot: &RecapSnapshot) -> PortResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&(snapshot.user_id, snapshot.year)) {
            return Ok(false);
        }
        rows.insert((snapshot.user_id, snapshot.year), snapshot.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

//=========================================================================================
// Cache
//=========================================================================================

/// A cache without expiry that records deletions.
#[derive(Default)]
pub struct RecordingCache {
    pub entries: Mutex<HashMap<String, String>>,
    pub deleted: Mutex<Vec<String>>,
    pub broken: Mutex<bool>,
}

impl RecordingCache {
    pub fn has(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn was_deleted(&self, key: &str) -> bool {
        self.deleted.lock().unwrap().iter().any(|k| k == key)
    }

    pub fn put(&self, key: &str, value: &str) {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn set_broken(&self, broken: bool) {
        *self.broken.lock().unwrap() = broken;
    }

    fn check(&self) -> PortResult<()> {
        if *self.broken.lock().unwrap() {
            return Err(PortError::Unavailable("cache offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String, _ttl: Duration) -> PortResult<()> {
        self.check()?;
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> PortResult<()> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        let mut deleted = self.deleted.lock().unwrap();
        for key in keys {
            entries.remove(key);
            deleted.push(key.clone());
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> PortResult<()> {
        self.check()?;
        self.entries.lock().unwrap().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub struct Harness {
    pub user: Uuid,
    pub events: Arc<MemoryEventStore>,
    pub progress: Arc<MemoryBookProgress>,
    pub snapshots: Arc<MemorySnapshots>,
    pub cache: Arc<RecordingCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            user: Uuid::new_v4(),
            events: Arc::new(MemoryEventStore::default()),
            progress: Arc::new(MemoryBookProgress::default()),
            snapshots: Arc::new(MemorySnapshots::default()),
            cache: Arc::new(RecordingCache::default()),
        }
    }

    /// An engine frozen at `now`, backed by the recording cache.
    pub fn engine_at(&self, now: NaiveDateTime) -> AnalyticsEngine {
        self.uncached_engine_at(now).with_cache(self.cache.clone())
    }

    /// An engine frozen at `now` with the default no-op cache.
    pub fn uncached_engine_at(&self, now: NaiveDateTime) -> AnalyticsEngine {
        AnalyticsEngine::new(self.events.clone(), self.progress.clone(), self.snapshots.clone())
            .with_clock(Arc::new(FixedClock(now)))
            .with_settings(EngineSettings {
                launch_date: d(2024, 1, 1),
                ..EngineSettings::default()
            })
    }
}
