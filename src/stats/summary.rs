use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::aggregate::Stats;

/// The `match_stats.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_users: u64,
    pub match_rate: f64,
    pub total_matches: u64,
    pub success_rate: f64,
    pub generated_at: String,
}

impl Summary {
    pub fn new(stats: &Stats, generated_at: NaiveDateTime) -> Self {
        Self {
            total_users: stats.counts.total_users,
            match_rate: round1(stats.match_rate),
            total_matches: stats.counts.total_matches,
            success_rate: round1(stats.success_rate),
            generated_at: generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
