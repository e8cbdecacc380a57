//! crates/reading_analytics_core/src/engine.rs
//!
//! The analytics engine: reads from the event store, aggregates in memory
//! and memoizes through the cache port.
//!
//! Public read operations never fail. Store errors are logged and degrade to
//! the empty view; cache errors are treated as misses.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::activity;
use crate::cache::{user_prefix, CacheKey, CachedStreaks, InvalidationPlan, NoopCache};
use crate::domain::{BookProgressSummary, DateRange, ReadingSession, RecapSnapshot};
use crate::ports::{
    BookProgressStore, CacheStore, Clock, EventStore, PortError, PortResult, RecapSnapshotStore,
    SystemClock,
};
use crate::recap::{self, AnnualRecap, RecapInput, RewindSummary, TopBook};
use crate::record::{self, RecordStatus, RecordSummary};
use crate::streak::{self, ReadingDates};
use crate::weekly::{self, WeekWindow, WeeklyGoal, WeeklyJourney, DEFAULT_WEEKLY_TARGET};

/// Upper bound on events scanned to build the recent-activity feed.
const RECENT_EVENTS_SCAN: u32 = 200;

//=========================================================================================
// Settings and Views
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// First day the product was available; bounds the launch year's
    /// consistency rate.
    pub launch_date: NaiveDate,
    pub weekly_target: u32,
    pub recent_activity_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            launch_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            weekly_target: DEFAULT_WEEKLY_TARGET,
            recent_activity_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStatistics {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub current_streak_series: Vec<NaiveDate>,
    pub record_status: RecordStatus,
    pub record_just_broken: bool,
    pub record_previous_best: u32,
    pub current_streak_started_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingSummary {
    pub total_reading_days: u64,
    pub total_chapters: u64,
    pub average_chapters_per_day: f64,
    pub chapters_this_week: u64,
    /// Most-read book across the whole history.
    pub favorite_book: Option<TopBook>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyGoalStatistics {
    pub goal: WeeklyGoal,
    pub journey: WeeklyJourney,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStatistics {
    pub streaks: StreakStatistics,
    pub reading_summary: ReadingSummary,
    pub book_progress: BookProgressSummary,
    pub recent_activity: Vec<ReadingSession>,
    pub weekly_goal: WeeklyGoal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub chapters: u32,
    pub read: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCalendar {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
    pub reading_days: u32,
}

/// The current run with its record classification, cached as one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CurrentRun {
    series: Vec<NaiveDate>,
    record: RecordSummary,
}

impl CurrentRun {
    fn compute(dates: &ReadingDates, today: NaiveDate) -> Self {
        let series = streak::current_streak_series(dates, today);
        let record = record::classify(dates, series.len() as u32, series.first().copied());
        Self { series, record }
    }

    fn length(&self) -> u32 {
        self.series.len() as u32
    }
}

//=========================================================================================
// The Engine
//=========================================================================================

pub struct AnalyticsEngine {
    events: Arc<dyn EventStore>,
    progress: Arc<dyn BookProgressStore>,
    snapshots: Arc<dyn RecapSnapshotStore>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl AnalyticsEngine {
    /// Creates an engine with no cache, the system clock and default settings.
    pub fn new(
        events: Arc<dyn EventStore>,
        progress: Arc<dyn BookProgressStore>,
        snapshots: Arc<dyn RecapSnapshotStore>,
    ) -> Self {
        Self {
            events,
            progress,
            snapshots,
            cache: Arc::new(NoopCache),
            clock: Arc::new(SystemClock),
            settings: EngineSettings::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    // --- Cache plumbing ---

    async fn cache_get<T: DeserializeOwned>(&self, user_id: Uuid, key: CacheKey) -> Option<T> {
        let rendered = key.render(user_id);
        let raw = match self.cache.get(&rendered).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %rendered, error = %e, "cache read failed, recomputing");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = %rendered, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %rendered, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn cache_set<T: Serialize>(&self, user_id: Uuid, key: CacheKey, value: &T) {
        let rendered = key.render(user_id);
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %rendered, error = %e, "failed to encode cache entry");
                return;
            }
        };
        let ttl = key.ttl(self.clock.now());
        if let Err(e) = self.cache.set(&rendered, payload, ttl).await {
            warn!(key = %rendered, error = %e, "cache write failed");
        }
    }

    async fn cached<T, F, Fut>(&self, user_id: Uuid, key: CacheKey, compute: F) -> PortResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = PortResult<T>>,
    {
        if let Some(hit) = self.cache_get(user_id, key).await {
            return Ok(hit);
        }
        debug!(key = %key.render(user_id), "cache miss");
        let value = compute().await?;
        self.cache_set(user_id, key, &value).await;
        Ok(value)
    }

    async fn reading_dates(&self, user_id: Uuid, range: Option<DateRange>) -> PortResult<ReadingDates> {
        Ok(self.events.distinct_dates(user_id, range).await?.into_iter().collect())
    }

    // --- Streaks ---

    /// Current and longest streak, the current run and its record status.
    pub async fn streak_statistics(&self, user_id: Uuid) -> StreakStatistics {
        self.try_streak_statistics(user_id).await.unwrap_or_else(|e| {
            error!(%user_id, error = %e, "failed to compute streak statistics");
            StreakStatistics::default()
        })
    }

    async fn try_streak_statistics(&self, user_id: Uuid) -> PortResult<StreakStatistics> {
        let today = self.clock.today();
        let run: Option<CurrentRun> = self.cache_get(user_id, CacheKey::CurrentStreakSeries).await;
        let longest: Option<u32> = self.cache_get(user_id, CacheKey::LongestStreak).await;

        let (run, longest) = match (run, longest) {
            (Some(run), Some(longest)) => (run, longest),
            (run, longest) => {
                let dates = self.reading_dates(user_id, None).await?;
                let run = match run {
                    Some(run) => run,
                    None => {
                        let run = CurrentRun::compute(&dates, today);
                        self.cache_set(user_id, CacheKey::CurrentStreakSeries, &run).await;
                        self.cache_set(user_id, CacheKey::CurrentStreak, &run.length()).await;
                        run
                    }
                };
                let longest = match longest {
                    Some(longest) => longest,
                    None => {
                        let longest = streak::longest_streak(&dates);
                        self.cache_set(user_id, CacheKey::LongestStreak, &longest).await;
                        longest
                    }
                };
                (run, longest)
            }
        };

        let current = run.length();
        Ok(StreakStatistics {
            current_streak: current,
            // A longest value cached before today's reading may trail the run.
            longest_streak: longest.max(current),
            current_streak_started_at: run.series.first().copied(),
            record_status: run.record.status,
            record_just_broken: run.record.just_broken,
            record_previous_best: run.record.previous_best,
            current_streak_series: run.series,
        })
    }

    // --- Weekly goal ---

    /// Goal progress and journey for the week containing today.
    pub async fn weekly_goal_statistics(&self, user_id: Uuid) -> WeeklyGoalStatistics {
        self.try_weekly_goal_statistics(user_id).await.unwrap_or_else(|e| {
            error!(%user_id, error = %e, "failed to compute weekly goal");
            WeeklyGoalStatistics {
                goal: WeeklyGoal::from_progress(0, self.settings.weekly_target),
                journey: WeeklyJourney::default(),
            }
        })
    }

    async fn try_weekly_goal_statistics(&self, user_id: Uuid) -> PortResult<WeeklyGoalStatistics> {
        let today = self.clock.today();
        self.cached(user_id, CacheKey::weekly_goal_for(today), || async move {
            let week = WeekWindow::containing(today);
            let dates = self
                .reading_dates(user_id, Some(DateRange::new(week.start, week.end)))
                .await?;
            Ok(WeeklyGoalStatistics {
                goal: weekly::weekly_goal(&dates, today, self.settings.weekly_target),
                journey: weekly::journey(&dates, today),
            })
        })
        .await
    }

    // --- Reading summary and calendars ---

    async fn total_reading_days(&self, user_id: Uuid) -> PortResult<u64> {
        self.cached(user_id, CacheKey::TotalReadingDays, || {
            self.events.count_distinct_dates(user_id)
        })
        .await
    }

    async fn average_chapters_per_day(&self, user_id: Uuid) -> PortResult<f64> {
        self.cached(user_id, CacheKey::AverageChaptersPerDay, || async move {
            let days = self.events.count_distinct_dates(user_id).await?;
            if days == 0 {
                return Ok(0.0);
            }
            let chapters = self.events.count_events(user_id, None).await?;
            Ok(((chapters as f64 / days as f64) * 100.0).round() / 100.0)
        })
        .await
    }

    async fn reading_summary(&self, user_id: Uuid) -> PortResult<ReadingSummary> {
        let week = WeekWindow::containing(self.clock.today());
        Ok(ReadingSummary {
            total_reading_days: self.total_reading_days(user_id).await?,
            total_chapters: self.events.count_events(user_id, None).await?,
            average_chapters_per_day: self.average_chapters_per_day(user_id).await?,
            chapters_this_week: self
                .events
                .count_events(user_id, Some(DateRange::new(week.start, week.end)))
                .await?,
            favorite_book: recap::rank_book_counts(&self.events.group_by_book(user_id, None).await?)
                .into_iter()
                .next(),
        })
    }

    /// Chapters per day for one calendar month.
    pub async fn monthly_calendar(&self, user_id: Uuid, year: i32, month: u32) -> MonthlyCalendar {
        self.try_monthly_calendar(user_id, year, month)
            .await
            .unwrap_or_else(|e| {
                error!(%user_id, year, month, error = %e, "failed to build monthly calendar");
                MonthlyCalendar {
                    year,
                    month,
                    ..MonthlyCalendar::default()
                }
            })
    }

    async fn try_monthly_calendar(&self, user_id: Uuid, year: i32, month: u32) -> PortResult<MonthlyCalendar> {
        let range = month_range(year, month)
            .ok_or_else(|| PortError::Unexpected(format!("invalid month {year}-{month}")))?;
        self.cached(user_id, CacheKey::MonthlyCalendar { year, month }, || async move {
            let events = self.events.events(user_id, Some(range)).await?;
            let heatmap = recap::heatmap(&events);
            let days: Vec<CalendarDay> = range
                .from
                .iter_days()
                .take_while(|day| *day <= range.to)
                .map(|date| {
                    let chapters = heatmap.get(&date).copied().unwrap_or(0);
                    CalendarDay {
                        date,
                        chapters,
                        read: chapters > 0,
                    }
                })
                .collect();
            Ok(MonthlyCalendar {
                year,
                month,
                reading_days: heatmap.len() as u32,
                days,
            })
        })
        .await
    }

    /// Chapters per reading day across a whole year.
    pub async fn year_calendar(&self, user_id: Uuid, year: i32) -> BTreeMap<NaiveDate, u32> {
        let result = match recap::year_range(year) {
            Some(range) => {
                self.cached(user_id, CacheKey::YearCalendar { year }, || async move {
                    let events = self.events.events(user_id, Some(range)).await?;
                    Ok(recap::heatmap(&events))
                })
                .await
            }
            None => Err(PortError::Unexpected(format!("invalid year {year}"))),
        };
        result.unwrap_or_else(|e| {
            error!(%user_id, year, error = %e, "failed to build year calendar");
            Default::default()
        })
    }

    // --- Dashboard ---

    /// Everything the dashboard shows, cached briefly as one value.
    pub async fn dashboard_statistics(&self, user_id: Uuid) -> DashboardStatistics {
        let result = self
            .cached(user_id, CacheKey::DashboardSummary, || self.compute_dashboard(user_id))
            .await;
        result.unwrap_or_else(|e| {
            error!(%user_id, error = %e, "failed to compute dashboard statistics");
            DashboardStatistics {
                weekly_goal: WeeklyGoal::from_progress(0, self.settings.weekly_target),
                ..DashboardStatistics::default()
            }
        })
    }

    async fn compute_dashboard(&self, user_id: Uuid) -> PortResult<DashboardStatistics> {
        let streaks = self.try_streak_statistics(user_id).await?;
        let reading_summary = self.reading_summary(user_id).await?;
        let book_progress = self.progress.progress_summary(user_id).await?;
        let weekly = self.try_weekly_goal_statistics(user_id).await?;

        let recent = self.events.recent_events(user_id, RECENT_EVENTS_SCAN).await?;
        let mut recent_activity = activity::group_sessions(&recent);
        recent_activity.truncate(self.settings.recent_activity_limit);

        Ok(DashboardStatistics {
            streaks,
            reading_summary,
            book_progress,
            recent_activity,
            weekly_goal: weekly.goal,
        })
    }

    // --- Annual recap ---

    /// The year-in-review for `year`, or `None` when nothing was read in it.
    ///
    /// Past years are served from an immutable snapshot created on first
    /// access. The current and future years are computed live and cached
    /// until the end of the day.
    pub async fn recap(&self, user_id: Uuid, year: i32) -> Option<AnnualRecap> {
        self.try_recap(user_id, year).await.unwrap_or_else(|e| {
            error!(%user_id, year, error = %e, "failed to build annual recap");
            None
        })
    }

    async fn try_recap(&self, user_id: Uuid, year: i32) -> PortResult<Option<AnnualRecap>> {
        let today = self.clock.today();
        if !recap::is_past_year(year, today) {
            return self
                .cached(user_id, CacheKey::AnnualRecap { year }, || {
                    self.compute_recap(user_id, year, today)
                })
                .await;
        }

        match self.snapshots.find(user_id, year).await {
            Ok(Some(snapshot)) => {
                if let Some(recap) = decode_snapshot(&snapshot) {
                    return Ok(Some(recap));
                }
                // An unreadable snapshot is served live and left untouched.
                return self.compute_recap(user_id, year, today).await;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(%user_id, year, error = %e, "snapshot lookup failed, serving live recap");
                return self.compute_recap(user_id, year, today).await;
            }
        }

        let Some(recap) = self.compute_recap(user_id, year, today).await? else {
            // Empty years are never persisted so they can fill in later.
            return Ok(None);
        };
        self.persist_snapshot(user_id, year, recap).await
    }

    async fn persist_snapshot(&self, user_id: Uuid, year: i32, recap: AnnualRecap) -> PortResult<Option<AnnualRecap>> {
        let snapshot_json = serde_json::to_string(&recap)
            .map_err(|e| PortError::Unexpected(format!("failed to encode recap: {e}")))?;
        let snapshot = RecapSnapshot {
            user_id,
            year,
            snapshot_json,
            generated_at: self.clock.now_utc(),
        };

        match self.snapshots.insert_if_absent(&snapshot).await {
            Ok(true) => {
                info!(%user_id, year, "persisted annual recap snapshot");
                Ok(Some(recap))
            }
            Ok(false) => {
                // A concurrent request won; its row is authoritative.
                debug!(%user_id, year, "recap snapshot already present, using stored copy");
                let stored = self.snapshots.find(user_id, year).await?;
                Ok(stored.as_ref().and_then(decode_snapshot).or(Some(recap)))
            }
            Err(e) => {
                warn!(%user_id, year, error = %e, "failed to persist recap snapshot");
                Ok(Some(recap))
            }
        }
    }

    async fn compute_recap(&self, user_id: Uuid, year: i32, today: NaiveDate) -> PortResult<Option<AnnualRecap>> {
        let Some(range) = recap::year_range(year) else {
            return Ok(None);
        };
        let events = self.events.events(user_id, Some(range)).await?;
        if events.is_empty() {
            return Ok(None);
        }

        let (Some(from), Some(to)) = (
            range.from.and_hms_opt(0, 0, 0),
            NaiveDate::from_ymd_opt(year + 1, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
        ) else {
            return Ok(None);
        };
        let books_completed = self.progress.completed_books_between(user_id, from, to).await?;

        Ok(recap::build(RecapInput {
            year,
            events: &events,
            books_completed,
            today,
            launch_date: self.settings.launch_date,
        }))
    }

    /// The rewind view for `year`, computed live.
    pub async fn rewind(&self, user_id: Uuid, year: i32) -> Option<RewindSummary> {
        let range = recap::year_range(year)?;
        match self.events.events(user_id, Some(range)).await {
            Ok(events) => recap::rewind::build(year, &events),
            Err(e) => {
                error!(%user_id, year, error = %e, "failed to build rewind");
                None
            }
        }
    }

    // --- Invalidation ---

    /// True when `date_read` has at most one event, i.e. the event just
    /// stored was the first of its day. Call once per write, after the insert.
    pub async fn is_first_event_of_day(&self, user_id: Uuid, date_read: NaiveDate) -> bool {
        match self.events.count_events(user_id, Some(DateRange::day(date_read))).await {
            Ok(count) => count <= 1,
            Err(e) => {
                // Over-invalidating is always safe.
                warn!(%user_id, %date_read, error = %e, "could not count events for day");
                true
            }
        }
    }

    /// Drops every cached view for the user.
    pub async fn invalidate_user_cache(&self, user_id: Uuid) {
        if let Err(e) = self.cache.delete_prefix(&user_prefix(user_id)).await {
            warn!(%user_id, error = %e, "failed to flush user cache");
        } else {
            debug!(%user_id, "flushed user cache");
        }
    }

    /// Applies the selective invalidation policy for a newly logged event.
    pub async fn invalidate_on_new_event(&self, user_id: Uuid, date_read: NaiveDate, is_first_of_day: bool) {
        let cached = if is_first_of_day && date_read == self.clock.today() {
            CachedStreaks {
                current: self.cache_get(user_id, CacheKey::CurrentStreak).await,
                longest: self.cache_get(user_id, CacheKey::LongestStreak).await,
            }
        } else {
            CachedStreaks::default()
        };
        let plan = InvalidationPlan::for_new_event(date_read, self.clock.today(), is_first_of_day, cached);
        self.apply(user_id, plan).await;
    }

    /// Invalidates everything a deleted event could have affected.
    pub async fn invalidate_on_delete(&self, user_id: Uuid, date_read: NaiveDate) {
        let plan = InvalidationPlan::for_removal(date_read, self.clock.today());
        self.apply(user_id, plan).await;
    }

    /// Edits are treated like deletions.
    pub async fn invalidate_on_update(&self, user_id: Uuid, date_read: NaiveDate) {
        self.invalidate_on_delete(user_id, date_read).await;
    }

    async fn apply(&self, user_id: Uuid, plan: InvalidationPlan) {
        let keys = plan.render(user_id);
        debug!(%user_id, keys = keys.len(), "invalidating cached views");
        if let Err(e) = self.cache.delete(&keys).await {
            warn!(%user_id, error = %e, "cache invalidation failed");
        }
    }
}

fn decode_snapshot(snapshot: &RecapSnapshot) -> Option<AnnualRecap> {
    match serde_json::from_str(&snapshot.snapshot_json) {
        Ok(recap) => Some(recap),
        Err(e) => {
            error!(user_id = %snapshot.user_id, year = snapshot.year, error = %e, "corrupt recap snapshot");
            None
        }
    }
}

/// First and last day of a calendar month.
pub fn month_range(year: i32, month: u32) -> Option<DateRange> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(DateRange::new(first, next.pred_opt()?))
}
