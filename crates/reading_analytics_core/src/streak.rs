//! crates/reading_analytics_core/src/streak.rs
//!
//! Pure streak arithmetic over a user's distinct reading dates.
//!
//! Every function takes a [`ReadingDates`] set, so a day logged several times
//! is always counted once. Adjacency is absolute day difference, which makes
//! month and year boundaries ordinary.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The deduplicated, ordered set of days on which a user read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingDates(BTreeSet<NaiveDate>);

impl ReadingDates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.0.iter().copied()
    }

    /// Days strictly before `cutoff`.
    pub fn before(&self, cutoff: NaiveDate) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.0.range(..cutoff).copied()
    }

    /// Days within the inclusive window `[from, to]`.
    pub fn count_between(&self, from: NaiveDate, to: NaiveDate) -> usize {
        if from > to {
            return 0;
        }
        self.0.range(from..=to).count()
    }
}

impl FromIterator<NaiveDate> for ReadingDates {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A maximal run of consecutive reading days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRun {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub length: u32,
}

/// The day the current run is anchored on: today if read, else yesterday if
/// read (grace period), else none.
fn current_anchor(dates: &ReadingDates, today: NaiveDate) -> Option<NaiveDate> {
    if dates.contains(today) {
        return Some(today);
    }
    today.pred_opt().filter(|yesterday| dates.contains(*yesterday))
}

/// Length of the run ending today, or yesterday when today has no reading yet.
pub fn current_streak(dates: &ReadingDates, today: NaiveDate) -> u32 {
    current_streak_series(dates, today).len() as u32
}

/// The days composing the current run, oldest first.
pub fn current_streak_series(dates: &ReadingDates, today: NaiveDate) -> Vec<NaiveDate> {
    let Some(anchor) = current_anchor(dates, today) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut cursor = Some(anchor);
    while let Some(day) = cursor.filter(|d| dates.contains(*d)) {
        series.push(day);
        cursor = day.pred_opt();
    }
    series.reverse();
    series
}

/// The longest run in an ascending sequence of distinct days. The earliest
/// run wins a tie.
fn longest_run_in<I>(ascending: I) -> Option<StreakRun>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut best: Option<StreakRun> = None;
    let mut current: Option<StreakRun> = None;

    for day in ascending {
        current = match current {
            Some(run) if (day - run.end).num_days() == 1 => Some(StreakRun {
                end: day,
                length: run.length + 1,
                ..run
            }),
            _ => Some(StreakRun { start: day, end: day, length: 1 }),
        };
        if let Some(run) = current {
            if best.map_or(true, |b| run.length > b.length) {
                best = Some(run);
            }
        }
    }
    best
}

/// The longest run anywhere in the set.
pub fn longest_run(dates: &ReadingDates) -> Option<StreakRun> {
    longest_run_in(dates.iter())
}

pub fn longest_streak(dates: &ReadingDates) -> u32 {
    longest_run(dates).map_or(0, |run| run.length)
}

/// Longest run using only days strictly before `cutoff`. Used to keep an
/// in-progress run out of the "previous best".
pub fn longest_streak_before(dates: &ReadingDates, cutoff: NaiveDate) -> u32 {
    longest_run_in(dates.before(cutoff)).map_or(0, |run| run.length)
}
