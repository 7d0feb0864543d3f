use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local};
use tracing::warn;

use crate::error::DataSourceError;

/// Number of calendar months the trend chart always covers.
pub const TREND_MONTHS: u32 = 6;

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: &impl Datelike) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month containing today's local date.
    pub fn current() -> Self {
        Self::of(&Local::now().date_naive())
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// The month `months` calendar months earlier.
    pub fn back(self, months: u32) -> Self {
        let index = self.year * 12 + self.month as i32 - 1 - months as i32;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }
}

impl FromStr for YearMonth {
    type Err = DataSourceError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DataSourceError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Aggregate counts as read from the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawCounts {
    pub total_users: u64,
    pub matched_users: u64,
    pub total_matches: u64,
    pub active_deals: u64,
    pub completed_deals: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyCount {
    pub month: YearMonth,
    pub count: u64,
}

impl MonthlyCount {
    pub fn new(month: YearMonth, count: u64) -> Self {
        Self { month, count }
    }
}

/// Derived statistics fed to the charts and the JSON summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub counts: RawCounts,
    pub unmatched_users: u64,
    /// Percentage of users with at least one match.
    pub match_rate: f64,
    /// Percentage of deals that are completed.
    pub success_rate: f64,
    /// Gap-filled, sorted, at least [`TREND_MONTHS`] entries.
    pub monthly: Vec<MonthlyCount>,
}

pub fn summarize(counts: RawCounts, monthly: &[MonthlyCount], current: YearMonth) -> Stats {
    if counts.matched_users > counts.total_users {
        warn!(
            matched = counts.matched_users,
            total = counts.total_users,
            "matched users exceed total users"
        );
    }

    Stats {
        counts,
        unmatched_users: counts.total_users.saturating_sub(counts.matched_users),
        match_rate: percentage(counts.matched_users as f64, counts.total_users as f64),
        success_rate: percentage(
            counts.completed_deals as f64,
            counts.active_deals as f64 + counts.completed_deals as f64,
        ),
        monthly: gap_fill(monthly, current),
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Cover the trailing [`TREND_MONTHS`] months ending at `current`.
///
/// Duplicate months are summed; months outside the window are kept.
pub fn gap_fill(monthly: &[MonthlyCount], current: YearMonth) -> Vec<MonthlyCount> {
    let mut by_month: BTreeMap<YearMonth, u64> = BTreeMap::new();
    for entry in monthly {
        let count = by_month.entry(entry.month).or_insert(0);
        *count = count.saturating_add(entry.count);
    }
    for back in 0..TREND_MONTHS {
        by_month.entry(current.back(back)).or_insert(0);
    }
    by_month
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}
