//! services/analytics/src/error.rs
//!
//! Defines the primary error type for the analytics service.

use crate::config::ConfigError;

/// The primary error type for the `analytics` service.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a failure to render a view as JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Represents a standard Input/Output error (e.g., writing to stdout).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
