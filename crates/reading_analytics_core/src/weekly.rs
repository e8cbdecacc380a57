//! crates/reading_analytics_core/src/weekly.rs
//!
//! Weekly goal progress and the seven-day journey view.
//!
//! Weeks run Sunday through Saturday. Progress is the number of distinct
//! reading days inside the week, so it is bounded by 7 and unaffected by how
//! many chapters were logged on a day.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::streak::ReadingDates;

pub const DEFAULT_WEEKLY_TARGET: u32 = 4;
pub const DAYS_IN_WEEK: u32 = 7;

/// A Sunday-to-Saturday calendar week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    pub fn containing(date: NaiveDate) -> Self {
        let start = date - Duration::days(i64::from(date.weekday().num_days_from_sunday()));
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..i64::from(DAYS_IN_WEEK)).map(move |i| start + Duration::days(i))
    }

    pub fn progress(&self, dates: &ReadingDates) -> u32 {
        dates.count_between(self.start, self.end) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyGoal {
    pub progress: u32,
    pub target: u32,
    pub percentage: f64,
    pub achieved: bool,
    pub message: String,
}

impl Default for WeeklyGoal {
    fn default() -> Self {
        Self::from_progress(0, DEFAULT_WEEKLY_TARGET)
    }
}

impl WeeklyGoal {
    pub fn from_progress(progress: u32, target: u32) -> Self {
        let target = target.max(1);
        let achieved = progress >= target;
        let message = if achieved {
            "Weekly goal achieved! Keep the momentum going.".to_string()
        } else if progress == 0 {
            "Start your week strong with today's reading.".to_string()
        } else {
            let remaining = target - progress;
            let unit = if remaining == 1 { "day" } else { "days" };
            format!("{remaining} more {unit} to reach your weekly goal.")
        };

        Self {
            progress,
            target,
            percentage: round2(f64::from(progress) / f64::from(target) * 100.0),
            achieved,
            message,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Motivational state for the journey view, a pure threshold lookup on
/// progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JourneyStatus {
    #[default]
    NotStarted,
    Momentum,
    Solid,
    OnARoll,
    Perfect,
}

impl JourneyStatus {
    pub fn from_progress(progress: u32) -> Self {
        match progress {
            0 => JourneyStatus::NotStarted,
            1..=3 => JourneyStatus::Momentum,
            4 => JourneyStatus::Solid,
            5 | 6 => JourneyStatus::OnARoll,
            _ => JourneyStatus::Perfect,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JourneyStatus::NotStarted => "Ready to begin",
            JourneyStatus::Momentum => "Building momentum",
            JourneyStatus::Solid => "Solid week",
            JourneyStatus::OnARoll => "On a roll",
            JourneyStatus::Perfect => "Perfect week",
        }
    }

    pub fn show_crown(self) -> bool {
        self == JourneyStatus::Perfect
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyDay {
    pub date: NaiveDate,
    /// Short weekday name, "Sun" through "Sat".
    pub day_of_week: String,
    pub is_today: bool,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyJourney {
    pub days: Vec<JourneyDay>,
    pub progress: u32,
    pub target: u32,
    pub status: JourneyStatus,
    pub status_label: String,
    pub show_crown: bool,
    pub show_cta: bool,
}

impl Default for WeeklyJourney {
    fn default() -> Self {
        let status = JourneyStatus::NotStarted;
        Self {
            days: Vec::new(),
            progress: 0,
            target: DAYS_IN_WEEK,
            status,
            status_label: status.label().to_string(),
            show_crown: false,
            show_cta: false,
        }
    }
}

/// Builds the journey for the week containing `today`.
pub fn journey(dates: &ReadingDates, today: NaiveDate) -> WeeklyJourney {
    let week = WeekWindow::containing(today);
    let days: Vec<JourneyDay> = week
        .days()
        .map(|date| JourneyDay {
            date,
            day_of_week: date.format("%a").to_string(),
            is_today: date == today,
            read: dates.contains(date),
        })
        .collect();

    let progress = days.iter().filter(|day| day.read).count() as u32;
    let status = JourneyStatus::from_progress(progress);
    let read_today = days.iter().any(|day| day.is_today && day.read);

    WeeklyJourney {
        progress,
        target: DAYS_IN_WEEK,
        status,
        status_label: status.label().to_string(),
        show_crown: status.show_crown(),
        show_cta: !read_today && progress < DAYS_IN_WEEK,
        days,
    }
}

/// Goal data for the week containing `today`.
pub fn weekly_goal(dates: &ReadingDates, today: NaiveDate, target: u32) -> WeeklyGoal {
    WeeklyGoal::from_progress(WeekWindow::containing(today).progress(dates), target)
}
