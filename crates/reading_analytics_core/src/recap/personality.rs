//! Reader personality: an ordered rule table evaluated first-match-wins.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The inputs every personality rule sees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PersonalityMetrics {
    pub active_days: u32,
    pub available_days: u32,
    pub total_chapters: u32,
    pub weekend_chapters: u32,
}

impl PersonalityMetrics {
    /// Share of the available days with at least one reading.
    pub fn consistency_rate(&self) -> f64 {
        if self.available_days == 0 {
            return 0.0;
        }
        f64::from(self.active_days) / f64::from(self.available_days)
    }

    pub fn chapters_per_day(&self) -> f64 {
        if self.active_days == 0 {
            return 0.0;
        }
        f64::from(self.total_chapters) / f64::from(self.active_days)
    }

    /// Share of chapters read on a Saturday or Sunday. Chapter-weighted, not
    /// day-weighted: two heavy weekend sessions can outweigh a dozen light
    /// weekdays.
    pub fn weekend_fraction(&self) -> f64 {
        if self.total_chapters == 0 {
            return 0.0;
        }
        f64::from(self.weekend_chapters) / f64::from(self.total_chapters)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    DailyDevotee,
    FaithfulFollower,
    DeepDiver,
    WeekendWarrior,
    SteadySeeker,
}

impl Personality {
    pub fn name(self) -> &'static str {
        match self {
            Personality::DailyDevotee => "Daily Devotee",
            Personality::FaithfulFollower => "Faithful Follower",
            Personality::DeepDiver => "Deep Diver",
            Personality::WeekendWarrior => "Weekend Warrior",
            Personality::SteadySeeker => "Steady Seeker",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Personality::DailyDevotee => "Reading is part of nearly every one of your days.",
            Personality::FaithfulFollower => "You show up for the Word more days than not.",
            Personality::DeepDiver => "When you sit down to read, you go deep.",
            Personality::WeekendWarrior => "Your weekends are where your reading comes alive.",
            Personality::SteadySeeker => "Every chapter counts, and you keep coming back.",
        }
    }

    /// The headline statistic shown under the personality name.
    pub fn stats_label(self, metrics: &PersonalityMetrics) -> String {
        match self {
            Personality::DailyDevotee | Personality::FaithfulFollower => {
                format!("{}% consistency", percent(metrics.consistency_rate()))
            }
            Personality::DeepDiver => {
                format!("{:.1} chapters per reading day", metrics.chapters_per_day())
            }
            Personality::WeekendWarrior => {
                format!("{}% weekend reading", percent(metrics.weekend_fraction()))
            }
            Personality::SteadySeeker => {
                let unit = if metrics.active_days == 1 { "day" } else { "days" };
                format!("{} reading {unit}", metrics.active_days)
            }
        }
    }
}

fn percent(rate: f64) -> u32 {
    (rate * 100.0).round() as u32
}

/// One row of the classification table.
pub struct PersonalityRule {
    pub personality: Personality,
    pub applies: fn(&PersonalityMetrics) -> bool,
}

/// Evaluated top to bottom; the first matching rule wins.
pub const PERSONALITY_RULES: [PersonalityRule; 4] = [
    PersonalityRule {
        personality: Personality::DailyDevotee,
        applies: |m| m.consistency_rate() >= 0.80,
    },
    PersonalityRule {
        personality: Personality::FaithfulFollower,
        applies: |m| m.consistency_rate() >= 0.55,
    },
    PersonalityRule {
        personality: Personality::DeepDiver,
        applies: |m| m.chapters_per_day() >= 2.0,
    },
    PersonalityRule {
        personality: Personality::WeekendWarrior,
        applies: |m| m.total_chapters > 20 && m.weekend_fraction() > 0.4,
    },
];

pub const FALLBACK_PERSONALITY: Personality = Personality::SteadySeeker;

pub fn classify(metrics: &PersonalityMetrics) -> Personality {
    PERSONALITY_RULES
        .iter()
        .find(|rule| (rule.applies)(metrics))
        .map_or(FALLBACK_PERSONALITY, |rule| rule.personality)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderPersonality {
    pub kind: Personality,
    pub name: String,
    pub description: String,
    pub stats_label: String,
}

impl ReaderPersonality {
    pub fn from_metrics(metrics: &PersonalityMetrics) -> Self {
        let kind = classify(metrics);
        Self {
            kind,
            name: kind.name().to_string(),
            description: kind.description().to_string(),
            stats_label: kind.stats_label(metrics),
        }
    }
}

/// Days in `year` on which the user could have read.
///
/// Availability starts at the later of Jan 1 and `launch_date`, and ends at
/// the earlier of Dec 31 and `today`. Never less than `active_days`, so the
/// consistency rate stays within `[0, 1]`.
pub fn available_days(year: i32, today: NaiveDate, launch_date: NaiveDate, active_days: u32) -> u32 {
    let (Some(jan_first), Some(dec_last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return active_days;
    };

    let start = jan_first.max(launch_date);
    let end = dec_last.min(today);
    let span = if end < start {
        0
    } else {
        (end - start).num_days() + 1
    };
    (span as u32).max(active_days)
}

/// True for Saturday and Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() >= 5
}
