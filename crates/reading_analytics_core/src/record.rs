//! crates/reading_analytics_core/src/record.rs
//!
//! Compares the current run against the best run that preceded it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::streak::{self, ReadingDates};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    None,
    Tied,
    Record,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub status: RecordStatus,
    /// True only on the day the current run first exceeds `previous_best`.
    pub just_broken: bool,
    pub previous_best: u32,
}

/// Classifies a current streak of `current` days starting on `current_start`.
///
/// `previous_best` is taken from history strictly before the run began, so it
/// stays fixed while the run grows and `just_broken` fires exactly once.
pub fn classify(dates: &ReadingDates, current: u32, current_start: Option<NaiveDate>) -> RecordSummary {
    let previous_best = match current_start {
        Some(start) if current > 0 => streak::longest_streak_before(dates, start),
        _ => streak::longest_streak(dates),
    };

    let status = if current > previous_best {
        RecordStatus::Record
    } else if current == previous_best && previous_best > 0 {
        RecordStatus::Tied
    } else {
        RecordStatus::None
    };

    RecordSummary {
        status,
        just_broken: status == RecordStatus::Record && current == previous_best + 1,
        previous_best,
    }
}
