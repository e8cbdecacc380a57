//! Integration tests for the analytics engine against in-memory ports.

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::{at, d, Harness};
use reading_analytics_core::recap::personality::Personality;
use reading_analytics_core::{
    AnalyticsEngine, AnnualRecap, CacheKey, FixedClock, PortResult, RecapSnapshot,
    RecapSnapshotStore, RecordStatus,
};
use uuid::Uuid;

fn days_from(start: NaiveDate, count: i64) -> impl Iterator<Item = NaiveDate> {
    (0..count).map(move |i| start + Duration::days(i))
}

// 2025-03-12 is a Wednesday; its week runs Sun 03-09 to Sat 03-15.
fn wednesday() -> NaiveDate {
    d(2025, 3, 12)
}

// ---------------------------------------------------------------------------
// Streaks and records
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_streak_statistics_new_record() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 2, 1), 3));
    h.events.log_days(h.user, days_from(d(2025, 3, 9), 4));

    let stats = h.engine_at(at(wednesday(), 9)).streak_statistics(h.user).await;
    assert_eq!(stats.current_streak, 4);
    assert_eq!(stats.longest_streak, 4);
    assert_eq!(stats.record_status, RecordStatus::Record);
    assert!(stats.record_just_broken);
    assert_eq!(stats.record_previous_best, 3);
    assert_eq!(stats.current_streak_started_at, Some(d(2025, 3, 9)));
    assert_eq!(stats.current_streak_series.len(), 4);
}

#[tokio::test]
async fn test_lapsed_streak_reports_zero() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 3, 1), 10));

    let stats = h.engine_at(at(wednesday(), 9)).streak_statistics(h.user).await;
    assert_eq!(stats.current_streak, 0);
    assert_eq!(stats.longest_streak, 10);
    assert_eq!(stats.record_status, RecordStatus::None);
    assert!(!stats.record_just_broken);
    assert_eq!(stats.current_streak_started_at, None);
}

#[tokio::test]
async fn test_several_chapters_on_one_day_count_once() {
    let h = Harness::new();
    for chapter in 1..=5 {
        h.events.log(h.user, 19, chapter, wednesday());
    }
    h.events.log(h.user, 19, 6, d(2025, 3, 11));

    let engine = h.engine_at(at(wednesday(), 20));
    let stats = engine.streak_statistics(h.user).await;
    assert_eq!(stats.current_streak, 2);

    let weekly = engine.weekly_goal_statistics(h.user).await;
    assert_eq!(weekly.goal.progress, 2);

    let dashboard = engine.dashboard_statistics(h.user).await;
    assert_eq!(dashboard.reading_summary.total_reading_days, 2);
    assert_eq!(dashboard.reading_summary.total_chapters, 6);
    assert_eq!(dashboard.reading_summary.average_chapters_per_day, 3.0);
}

// ---------------------------------------------------------------------------
// Weekly goal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_weekly_goal_respects_week_boundaries() {
    let h = Harness::new();
    h.events.log_days(h.user, [d(2025, 3, 8), d(2025, 3, 9), d(2025, 3, 15), d(2025, 3, 16)]);

    let weekly = h.engine_at(at(wednesday(), 9)).weekly_goal_statistics(h.user).await;
    assert_eq!(weekly.goal.progress, 2);
    assert_eq!(weekly.goal.target, 4);
    assert_eq!(weekly.goal.percentage, 50.0);
    assert!(!weekly.goal.achieved);
    assert_eq!(weekly.journey.days.len(), 7);
    assert_eq!(weekly.journey.days[0].date, d(2025, 3, 9));
    assert!(weekly.journey.days[0].read);
    assert!(weekly.journey.days[3].is_today);
    assert!(weekly.journey.show_cta);
}

#[tokio::test]
async fn test_weekly_goal_achieved() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 3, 9), 4));

    let weekly = h.engine_at(at(wednesday(), 21)).weekly_goal_statistics(h.user).await;
    assert!(weekly.goal.achieved);
    assert_eq!(weekly.goal.percentage, 100.0);
    assert!(!weekly.journey.show_cta);
}

// ---------------------------------------------------------------------------
// Annual recap
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_past_year_recap_is_immutable() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2024, 1, 1), 5));
    h.events.log_days(h.user, days_from(d(2024, 1, 7), 3));
    let engine = h.engine_at(at(wednesday(), 9));

    let first = engine.recap(h.user, 2024).await.expect("recap for 2024");
    assert_eq!(first.yearly_streak.count, 5);
    assert_eq!(first.yearly_streak.start_label, "Jan 1");
    assert_eq!(first.yearly_streak.end_label, "Jan 5");

    // A late correction to the past year does not change the snapshot.
    h.events.log_days(h.user, days_from(d(2024, 6, 1), 20));
    let second = engine.recap(h.user, 2024).await.expect("recap for 2024");

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(h.snapshots.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_snapshot_timestamp_follows_engine_clock() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2024, 2, 1), 3));
    let now = at(wednesday(), 9);

    h.engine_at(now).recap(h.user, 2024).await.expect("recap for 2024");

    let rows = h.snapshots.rows.lock().unwrap();
    let stored = rows.get(&(h.user, 2024)).expect("snapshot row");
    assert_eq!(stored.generated_at, Utc.from_utc_datetime(&now));
}

#[tokio::test]
async fn test_empty_past_year_is_not_persisted() {
    let h = Harness::new();
    let engine = h.engine_at(at(wednesday(), 9));

    assert!(engine.recap(h.user, 2023).await.is_none());
    assert_eq!(h.snapshots.inserts.load(Ordering::SeqCst), 0);

    h.events.log_days(h.user, [d(2023, 5, 5)]);
    let recap = engine.recap(h.user, 2023).await.expect("recap after logging");
    assert_eq!(recap.active_days_count, 1);
    assert_eq!(h.snapshots.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_current_year_recap_is_cached_and_invalidated() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 1, 1), 3));
    let engine = h.engine_at(at(wednesday(), 9));
    let key = CacheKey::AnnualRecap { year: 2025 }.render(h.user);

    let recap = engine.recap(h.user, 2025).await.expect("current year recap");
    assert_eq!(recap.total_chapters_read, 3);
    assert!(h.cache.has(&key));
    assert_eq!(h.snapshots.inserts.load(Ordering::SeqCst), 0);

    h.events.log(h.user, 2, 1, wednesday());
    let first = engine.is_first_event_of_day(h.user, wednesday()).await;
    engine.invalidate_on_new_event(h.user, wednesday(), first).await;
    assert!(!h.cache.has(&key));

    let recap = engine.recap(h.user, 2025).await.expect("current year recap");
    assert_eq!(recap.total_chapters_read, 4);
}

#[tokio::test]
async fn test_recap_personality_uses_available_days() {
    let h = Harness::new();
    // Every day since Jan 1 up to and including today: 71 of 71 days.
    h.events.log_days(h.user, days_from(d(2025, 1, 1), 71));
    h.progress
        .completed_at
        .lock()
        .unwrap()
        .push((h.user, at(d(2025, 2, 2), 10)));

    let recap = h
        .engine_at(at(wednesday(), 9))
        .recap(h.user, 2025)
        .await
        .expect("recap");
    assert_eq!(recap.active_days_count, 71);
    assert_eq!(recap.reader_personality.kind, Personality::DailyDevotee);
    assert_eq!(recap.reader_personality.stats_label, "100% consistency");
    assert_eq!(recap.books_completed_count, 1);
}

/// A store where another request always wins the insert race.
struct LosingRaceSnapshots {
    winner: Mutex<Option<RecapSnapshot>>,
    winner_payload: String,
}

#[async_trait]
impl RecapSnapshotStore for LosingRaceSnapshots {
    async fn find(&self, _user_id: Uuid, _year: i32) -> PortResult<Option<RecapSnapshot>> {
        Ok(self.winner.lock().unwrap().clone())
    }

    async fn insert_if_absent(&self, snapshot: &RecapSnapshot) -> PortResult<bool> {
        *self.winner.lock().unwrap() = Some(RecapSnapshot {
            snapshot_json: self.winner_payload.clone(),
            ..snapshot.clone()
        });
        Ok(false)
    }
}

#[tokio::test]
async fn test_snapshot_race_returns_stored_winner() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2024, 3, 1), 2));

    let mut winner: AnnualRecap = h
        .uncached_engine_at(at(d(2024, 12, 31), 9))
        .recap(h.user, 2024)
        .await
        .expect("live recap");
    winner.books_completed_count = 99;

    let snapshots = Arc::new(LosingRaceSnapshots {
        winner: Mutex::new(None),
        winner_payload: serde_json::to_string(&winner).unwrap(),
    });
    let engine = AnalyticsEngine::new(h.events.clone(), h.progress.clone(), snapshots)
        .with_clock(Arc::new(FixedClock(at(wednesday(), 9))));

    let recap = engine.recap(h.user, 2024).await.expect("recap");
    assert_eq!(recap.books_completed_count, 99);
}

#[tokio::test]
async fn test_rewind_view() {
    let h = Harness::new();
    h.events.log(h.user, 43, 1, d(2025, 3, 9));
    h.events.log(h.user, 43, 2, d(2025, 3, 9));
    h.events.log(h.user, 1, 1, d(2025, 3, 10));

    let rewind = h
        .engine_at(at(wednesday(), 9))
        .rewind(h.user, 2025)
        .await
        .expect("rewind");
    assert_eq!(rewind.total_chapters, 3);
    assert_eq!(rewind.most_read_book.unwrap().name, "John");
    assert_eq!(rewind.most_read_testament.unwrap().name, "New Testament");
    // One Sunday and one Monday: Sunday wins the tie.
    assert_eq!(rewind.most_active_day.unwrap().name, "Sunday");
}

// ---------------------------------------------------------------------------
// Calendars and dashboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_monthly_and_year_calendars() {
    let h = Harness::new();
    h.events.log(h.user, 1, 1, d(2025, 2, 3));
    h.events.log(h.user, 1, 2, d(2025, 2, 3));
    h.events.log(h.user, 1, 3, d(2025, 2, 20));
    h.events.log(h.user, 1, 4, d(2025, 3, 1));
    let engine = h.engine_at(at(wednesday(), 9));

    let february = engine.monthly_calendar(h.user, 2025, 2).await;
    assert_eq!(february.days.len(), 28);
    assert_eq!(february.reading_days, 2);
    assert_eq!(february.days[2].chapters, 2);
    assert!(february.days[2].read);
    assert!(!february.days[3].read);

    let year = engine.year_calendar(h.user, 2025).await;
    assert_eq!(year.len(), 3);
    assert_eq!(year[&d(2025, 2, 3)], 2);
}

#[tokio::test]
async fn test_dashboard_recent_activity_and_progress() {
    let h = Harness::new();
    h.events.log(h.user, 19, 23, d(2025, 3, 10));
    h.events.log(h.user, 40, 5, d(2025, 3, 11));
    h.progress
        .completed_at
        .lock()
        .unwrap()
        .push((h.user, at(d(2025, 1, 5), 8)));

    let dashboard = h.engine_at(at(wednesday(), 9)).dashboard_statistics(h.user).await;
    assert_eq!(dashboard.recent_activity.len(), 2);
    assert_eq!(dashboard.recent_activity[0].label(), "Matthew 5");
    assert_eq!(dashboard.book_progress.books_completed, 1);
    assert_eq!(dashboard.weekly_goal.progress, 2);
    assert_eq!(dashboard.streaks.current_streak, 2);
    assert_eq!(dashboard.reading_summary.chapters_this_week, 2);
    // One chapter each: the tie goes to the earlier book.
    assert_eq!(dashboard.reading_summary.favorite_book.unwrap().name, "Psalms");
}

// ---------------------------------------------------------------------------
// Cache behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_repeat_event_of_day_keeps_streak_cache() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 3, 10), 3));
    let engine = h.engine_at(at(wednesday(), 9));
    engine.streak_statistics(h.user).await;

    let current = CacheKey::CurrentStreak.render(h.user);
    assert!(h.cache.has(&current));

    h.events.log(h.user, 2, 1, wednesday());
    let first = engine.is_first_event_of_day(h.user, wednesday()).await;
    assert!(!first);
    engine.invalidate_on_new_event(h.user, wednesday(), first).await;

    assert!(h.cache.has(&current));
    assert!(h.cache.was_deleted(&CacheKey::DashboardSummary.render(h.user)));
    assert!(h.cache.was_deleted(&CacheKey::TotalReadingDays.render(h.user)));
}

#[tokio::test]
async fn test_longest_streak_kept_when_it_cannot_be_overtaken() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 1, 1), 10));
    h.events.log_days(h.user, days_from(d(2025, 3, 10), 2));
    let engine = h.engine_at(at(wednesday(), 9));
    engine.streak_statistics(h.user).await;

    h.events.log(h.user, 2, 1, wednesday());
    let first = engine.is_first_event_of_day(h.user, wednesday()).await;
    assert!(first);
    engine.invalidate_on_new_event(h.user, wednesday(), first).await;

    assert!(h.cache.was_deleted(&CacheKey::CurrentStreak.render(h.user)));
    assert!(h.cache.was_deleted(&CacheKey::weekly_goal_for(wednesday()).render(h.user)));
    assert!(!h.cache.was_deleted(&CacheKey::LongestStreak.render(h.user)));

    let stats = engine.streak_statistics(h.user).await;
    assert_eq!(stats.current_streak, 3);
    assert_eq!(stats.longest_streak, 10);
}

#[tokio::test]
async fn test_cached_results_match_fresh_computation_after_writes() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 3, 5), 3));
    let cached = h.engine_at(at(wednesday(), 9));
    let fresh = h.uncached_engine_at(at(wednesday(), 9));
    cached.streak_statistics(h.user).await;
    cached.weekly_goal_statistics(h.user).await;

    for day in days_from(d(2025, 3, 8), 5) {
        h.events.log(h.user, 3, 1, day);
        let first = cached.is_first_event_of_day(h.user, day).await;
        cached.invalidate_on_new_event(h.user, day, first).await;

        assert_eq!(
            cached.streak_statistics(h.user).await,
            fresh.streak_statistics(h.user).await
        );
        assert_eq!(
            cached.weekly_goal_statistics(h.user).await,
            fresh.weekly_goal_statistics(h.user).await
        );
    }
}

#[tokio::test]
async fn test_delete_invalidates_streaks() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 3, 8), 5));
    let engine = h.engine_at(at(wednesday(), 9));
    assert_eq!(engine.streak_statistics(h.user).await.current_streak, 5);

    h.events.remove_day(h.user, d(2025, 3, 11));
    engine.invalidate_on_delete(h.user, d(2025, 3, 11)).await;

    let stats = engine.streak_statistics(h.user).await;
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_streak, 3);
}

#[tokio::test]
async fn test_invalidate_user_cache_flushes_everything() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 3, 10), 2));
    let engine = h.engine_at(at(wednesday(), 9));
    engine.dashboard_statistics(h.user).await;
    h.cache.put("reading_stats:someone-else:dashboard", "{}");

    engine.invalidate_user_cache(h.user).await;
    let entries = h.cache.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries.contains_key("reading_stats:someone-else:dashboard"));
}

#[tokio::test]
async fn test_broken_cache_falls_back_to_computation() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 3, 10), 3));
    h.cache.set_broken(true);
    let engine = h.engine_at(at(wednesday(), 9));

    let stats = engine.streak_statistics(h.user).await;
    assert_eq!(stats.current_streak, 3);
    engine.invalidate_on_new_event(h.user, wednesday(), true).await;
    engine.invalidate_user_cache(h.user).await;
}

#[tokio::test]
async fn test_corrupt_cache_entry_is_recomputed() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 3, 10), 3));
    h.cache.put(&CacheKey::LongestStreak.render(h.user), "not json");

    let stats = h.engine_at(at(wednesday(), 9)).streak_statistics(h.user).await;
    assert_eq!(stats.longest_streak, 3);
}

#[tokio::test]
async fn test_store_failure_degrades_to_empty_views() {
    let h = Harness::new();
    h.events.log_days(h.user, days_from(d(2025, 3, 10), 3));
    h.events.set_failing(true);
    let engine = h.engine_at(at(wednesday(), 9));

    assert_eq!(engine.streak_statistics(h.user).await.current_streak, 0);
    let weekly = engine.weekly_goal_statistics(h.user).await;
    assert_eq!(weekly.goal.progress, 0);
    assert!(weekly.goal.message.starts_with("Start your week"));
    assert!(engine.recap(h.user, 2024).await.is_none());
    assert!(engine.rewind(h.user, 2025).await.is_none());
    // Nothing was cached while the store was down.
    assert!(!h.cache.has(&CacheKey::CurrentStreak.render(h.user)));
}
