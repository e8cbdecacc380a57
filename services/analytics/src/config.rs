//! services/analytics/src/config.rs
//!
//! Defines the service's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::NaiveDate;
use reading_analytics_core::EngineSettings;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub launch_date: NaiveDate,
    pub weekly_goal_target: u32,
    pub cache_enabled: bool,
    pub cache_max_entries: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Database Settings ---
        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Engine Settings ---
        let launch_date = match lookup("LAUNCH_DATE") {
            Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| ConfigError::InvalidValue("LAUNCH_DATE".to_string(), e.to_string()))?,
            None => EngineSettings::default().launch_date,
        };
        let weekly_goal_target: u32 = parse_or(&lookup, "WEEKLY_GOAL_TARGET", 4)?;
        if !(1..=7).contains(&weekly_goal_target) {
            return Err(ConfigError::InvalidValue(
                "WEEKLY_GOAL_TARGET".to_string(),
                format!("{weekly_goal_target} is not between 1 and 7"),
            ));
        }

        // --- Cache Settings ---
        let cache_enabled = parse_or(&lookup, "CACHE_ENABLED", true)?;
        let cache_max_entries = parse_or(&lookup, "CACHE_MAX_ENTRIES", 10_000)?;

        Ok(Self {
            database_url,
            db_max_connections,
            log_level,
            launch_date,
            weekly_goal_target,
            cache_enabled,
            cache_max_entries,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            launch_date: self.launch_date,
            weekly_target: self.weekly_goal_target,
            ..EngineSettings::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}
