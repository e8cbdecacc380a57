//! crates/reading_analytics_core/src/cache.rs
//!
//! Cache keys, their TTLs, and the selective invalidation policy applied when
//! the event log changes. The cache itself sits behind the `CacheStore` port.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::ports::{CacheStore, PortResult};
use crate::weekly::WeekWindow;

const MINUTE: Duration = Duration::from_secs(60);

/// Every cached view, scoped to one user and, where needed, one time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    DashboardSummary,
    CurrentStreak,
    LongestStreak,
    CurrentStreakSeries,
    WeeklyGoal { week_start: NaiveDate },
    MonthlyCalendar { year: i32, month: u32 },
    TotalReadingDays,
    AverageChaptersPerDay,
    YearCalendar { year: i32 },
    AnnualRecap { year: i32 },
}

/// Prefix shared by every key belonging to `user_id`.
pub fn user_prefix(user_id: Uuid) -> String {
    format!("reading_stats:{user_id}:")
}

impl CacheKey {
    pub fn render(&self, user_id: Uuid) -> String {
        let prefix = user_prefix(user_id);
        match self {
            CacheKey::DashboardSummary => format!("{prefix}dashboard"),
            CacheKey::CurrentStreak => format!("{prefix}streak:current"),
            CacheKey::LongestStreak => format!("{prefix}streak:longest"),
            CacheKey::CurrentStreakSeries => format!("{prefix}streak:series"),
            CacheKey::WeeklyGoal { week_start } => format!("{prefix}weekly_goal:{week_start}"),
            CacheKey::MonthlyCalendar { year, month } => {
                format!("{prefix}calendar:{year:04}-{month:02}")
            }
            CacheKey::TotalReadingDays => format!("{prefix}total_days"),
            CacheKey::AverageChaptersPerDay => format!("{prefix}avg_chapters"),
            CacheKey::YearCalendar { year } => format!("{prefix}calendar:{year:04}"),
            CacheKey::AnnualRecap { year } => format!("{prefix}recap:{year:04}"),
        }
    }

    /// How long a value may live, measured from `now`.
    pub fn ttl(&self, now: NaiveDateTime) -> Duration {
        match self {
            CacheKey::DashboardSummary => 5 * MINUTE,
            CacheKey::MonthlyCalendar { .. } => 10 * MINUTE,
            CacheKey::WeeklyGoal { .. } => 15 * MINUTE,
            CacheKey::AverageChaptersPerDay => 30 * MINUTE,
            CacheKey::LongestStreak | CacheKey::TotalReadingDays | CacheKey::YearCalendar { .. } => {
                60 * MINUTE
            }
            CacheKey::CurrentStreak | CacheKey::CurrentStreakSeries | CacheKey::AnnualRecap { .. } => {
                until_end_of_day(now)
            }
        }
    }

    pub fn weekly_goal_for(date: NaiveDate) -> Self {
        CacheKey::WeeklyGoal {
            week_start: WeekWindow::containing(date).start,
        }
    }

    pub fn monthly_calendar_for(date: NaiveDate) -> Self {
        CacheKey::MonthlyCalendar {
            year: date.year(),
            month: date.month(),
        }
    }
}

/// Time left until local midnight, at least one second.
pub fn until_end_of_day(now: NaiveDateTime) -> Duration {
    let remaining = now
        .date()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .and_then(|midnight| (midnight - now).to_std().ok())
        .unwrap_or(Duration::ZERO);
    remaining.max(Duration::from_secs(1))
}

/// Cached streak values as observed by the write path, possibly stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachedStreaks {
    pub current: Option<u32>,
    pub longest: Option<u32>,
}

impl CachedStreaks {
    /// Whether one more reading day could lift the current streak past the
    /// longest. Unknown values are assumed to be able to.
    pub fn could_exceed_longest(&self) -> bool {
        match (self.current, self.longest) {
            (Some(current), Some(longest)) => current + 1 > longest,
            _ => true,
        }
    }
}

/// The keys to drop after a change to the event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub keys: Vec<CacheKey>,
}

impl InvalidationPlan {
    /// Keys that change with every logged chapter.
    fn always(date_read: NaiveDate) -> Vec<CacheKey> {
        vec![
            CacheKey::DashboardSummary,
            CacheKey::monthly_calendar_for(date_read),
            CacheKey::YearCalendar { year: date_read.year() },
            CacheKey::TotalReadingDays,
            CacheKey::AverageChaptersPerDay,
            CacheKey::AnnualRecap { year: date_read.year() },
        ]
    }

    /// Plan for a newly created event on `date_read`.
    ///
    /// Streak and weekly keys only move when the day becomes active, so later
    /// events on the same day leave them alone. A first reading today extends
    /// the current run by exactly one day, so the longest streak is only
    /// dropped when that could overtake it. A back-dated day can join two
    /// older runs and always drops it.
    pub fn for_new_event(
        date_read: NaiveDate,
        today: NaiveDate,
        is_first_of_day: bool,
        cached: CachedStreaks,
    ) -> Self {
        let mut keys = Self::always(date_read);
        if is_first_of_day {
            keys.push(CacheKey::CurrentStreak);
            keys.push(CacheKey::CurrentStreakSeries);
            keys.push(CacheKey::weekly_goal_for(date_read));
            if date_read != today || cached.could_exceed_longest() {
                keys.push(CacheKey::LongestStreak);
            }
        }
        Self { keys }
    }

    /// Plan for a deleted or edited event. Everything derived from the day
    /// goes, since a removal can shorten any run.
    pub fn for_removal(date_read: NaiveDate, today: NaiveDate) -> Self {
        let mut keys = Self::always(date_read);
        keys.extend([
            CacheKey::CurrentStreak,
            CacheKey::CurrentStreakSeries,
            CacheKey::LongestStreak,
            CacheKey::weekly_goal_for(date_read),
        ]);
        let current_week = CacheKey::weekly_goal_for(today);
        if !keys.contains(&current_week) {
            keys.push(current_week);
        }
        Self { keys }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.keys.contains(key)
    }

    pub fn render(&self, user_id: Uuid) -> Vec<String> {
        self.keys.iter().map(|key| key.render(user_id)).collect()
    }
}

/// A cache that stores nothing. The engine is fully correct with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheStore for NoopCache {
    async fn get(&self, _key: &str) -> PortResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> PortResult<()> {
        Ok(())
    }

    async fn delete(&self, _keys: &[String]) -> PortResult<()> {
        Ok(())
    }

    async fn delete_prefix(&self, _prefix: &str) -> PortResult<()> {
        Ok(())
    }
}
