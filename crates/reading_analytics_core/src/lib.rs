pub mod activity;
pub mod books;
pub mod cache;
pub mod domain;
pub mod engine;
pub mod ports;
pub mod recap;
pub mod record;
pub mod streak;
pub mod weekly;

pub use cache::{CacheKey, InvalidationPlan, NoopCache};
pub use domain::{BookChapterCount, BookProgressSummary, DateRange, ReadingEvent, ReadingSession, RecapSnapshot};
pub use engine::{
    AnalyticsEngine, DashboardStatistics, EngineSettings, MonthlyCalendar, ReadingSummary,
    StreakStatistics, WeeklyGoalStatistics,
};
pub use ports::{
    BookProgressStore, CacheStore, Clock, EventStore, FixedClock, PortError, PortResult,
    RecapSnapshotStore, SystemClock,
};
pub use recap::{AnnualRecap, RewindSummary};
pub use record::RecordStatus;
pub use streak::ReadingDates;
