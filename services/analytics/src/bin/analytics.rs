//! services/analytics/src/bin/analytics.rs
//!
//! Prints a user's reading analytics as JSON. Logs go to stderr.

use std::io::Write;
use std::sync::Arc;

use analytics_lib::{
    adapters::{DbAdapter, InMemoryCache},
    config::Config,
    error::AnalyticsError,
};
use clap::{Parser, Subcommand};
use reading_analytics_core::{AnalyticsEngine, CacheStore, NoopCache};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "analytics", about = "Reading streaks, weekly goals and annual recaps")]
struct Cli {
    /// The user whose statistics are printed.
    #[arg(long)]
    user: Uuid,

    #[command(subcommand)]
    view: View,
}

#[derive(Subcommand, Debug)]
enum View {
    /// Streaks, reading summary, book progress, recent activity and weekly goal.
    Dashboard,
    /// Current and longest streak with record status.
    Streaks,
    /// Weekly goal progress and the seven-day journey.
    Weekly,
    /// Chapters per day for one month.
    Calendar { year: i32, month: u32 },
    /// Year-in-review.
    Recap { year: i32 },
    /// Most-read book, testament, genre and weekday for a year.
    Rewind { year: i32 },
}

#[tokio::main]
async fn main() -> Result<(), AnalyticsError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    db_adapter.run_migrations().await?;

    // --- 3. Build the Engine ---
    let cache: Arc<dyn CacheStore> = if config.cache_enabled {
        Arc::new(InMemoryCache::with_max_entries(config.cache_max_entries))
    } else {
        Arc::new(NoopCache)
    };
    let engine = AnalyticsEngine::new(db_adapter.clone(), db_adapter.clone(), db_adapter)
        .with_cache(cache)
        .with_settings(config.engine_settings());

    // --- 4. Render the Requested View ---
    let user = cli.user;
    let json = match cli.view {
        View::Dashboard => serde_json::to_string_pretty(&engine.dashboard_statistics(user).await)?,
        View::Streaks => serde_json::to_string_pretty(&engine.streak_statistics(user).await)?,
        View::Weekly => serde_json::to_string_pretty(&engine.weekly_goal_statistics(user).await)?,
        View::Calendar { year, month } => {
            serde_json::to_string_pretty(&engine.monthly_calendar(user, year, month).await)?
        }
        View::Recap { year } => serde_json::to_string_pretty(&engine.recap(user, year).await)?,
        View::Rewind { year } => serde_json::to_string_pretty(&engine.rewind(user, year).await)?,
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}
