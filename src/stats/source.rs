use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::aggregate::{MonthlyCount, RawCounts, YearMonth};
use crate::error::DataSourceError;

/// One read of the aggregate statistics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub counts: RawCounts,
    /// Sparse, possibly unsorted `(month, count)` pairs.
    pub monthly: Vec<MonthlyCount>,
}

/// Where aggregate counts come from. Read once per run.
pub trait StatsSource {
    fn fetch(&self) -> Result<Snapshot, DataSourceError>;
}

impl StatsSource for Snapshot {
    fn fetch(&self) -> Result<Snapshot, DataSourceError> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MonthlyDocument {
    Entry { month: String, count: u64 },
    Pair(String, u64),
}

impl MonthlyDocument {
    fn parts(&self) -> (&str, u64) {
        match self {
            MonthlyDocument::Entry { month, count } => (month.as_str(), *count),
            MonthlyDocument::Pair(month, count) => (month.as_str(), *count),
        }
    }
}

/// Serialized form of a [`Snapshot`].
///
/// `monthly_matches` accepts `{month, count}` objects or `[month, count]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub total_users: u64,
    pub matched_users: u64,
    #[serde(default)]
    pub total_matches: u64,
    #[serde(default)]
    pub active_deals: u64,
    #[serde(default)]
    pub completed_deals: u64,
    #[serde(default)]
    pub monthly_matches: Vec<MonthlyDocument>,
}

impl SnapshotDocument {
    pub fn into_snapshot(self) -> Result<Snapshot, DataSourceError> {
        let monthly = self
            .monthly_matches
            .iter()
            .map(|entry| {
                let (month, count) = entry.parts();
                month
                    .parse::<YearMonth>()
                    .map(|month| MonthlyCount::new(month, count))
            })
            .collect::<Result<Vec<_>, DataSourceError>>()?;

        Ok(Snapshot {
            counts: RawCounts {
                total_users: self.total_users,
                matched_users: self.matched_users,
                total_matches: self.total_matches,
                active_deals: self.active_deals,
                completed_deals: self.completed_deals,
            },
            monthly,
        })
    }
}

/// A JSON or YAML snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> Result<SnapshotDocument, DataSourceError> {
        let unavailable =
            |e: String| DataSourceError::Unavailable(format!("{}: {}", self.path.display(), e));
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("json") => serde_json::from_str(content).map_err(|e| unavailable(e.to_string())),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(content).map_err(|e| unavailable(e.to_string()))
            }
            _ => serde_json::from_str(content)
                .or_else(|_| serde_yaml::from_str(content))
                .map_err(|e| unavailable(e.to_string())),
        }
    }
}

impl StatsSource for SnapshotFile {
    fn fetch(&self) -> Result<Snapshot, DataSourceError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            DataSourceError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let snapshot = self.parse(&content)?.into_snapshot()?;
        debug!(
            path = %self.path.display(),
            months = snapshot.monthly.len(),
            "read statistics snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "total_users": 10,
        "matched_users": 4,
        "total_matches": 6,
        "active_deals": 3,
        "completed_deals": 1,
        "monthly_matches": [{"month": "2024-03", "count": 5}, ["2024-05", 1]]
    }"#;

    #[test]
    fn reads_json_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, JSON).unwrap();

        let snapshot = SnapshotFile::new(&path).fetch().unwrap();
        assert_eq!(snapshot.counts.total_users, 10);
        assert_eq!(snapshot.counts.completed_deals, 1);
        assert_eq!(
            snapshot.monthly,
            vec![
                MonthlyCount::new(YearMonth::new(2024, 3).unwrap(), 5),
                MonthlyCount::new(YearMonth::new(2024, 5).unwrap(), 1),
            ]
        );
    }

    #[test]
    fn reads_yaml_snapshot_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.yml");
        std::fs::write(&path, "total_users: 3\nmatched_users: 1\n").unwrap();

        let snapshot = SnapshotFile::new(&path).fetch().unwrap();
        assert_eq!(snapshot.counts.matched_users, 1);
        assert_eq!(snapshot.counts.active_deals, 0);
        assert!(snapshot.monthly.is_empty());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = SnapshotFile::new("/nonexistent/stats.json").fetch().unwrap_err();
        assert!(matches!(err, DataSourceError::Unavailable(msg) if msg.contains("stats.json")));
    }

    #[test]
    fn malformed_month_is_reported() {
        let doc: SnapshotDocument = serde_json::from_str(
            r#"{"total_users": 1, "matched_users": 0, "monthly_matches": [["March", 2]]}"#,
        )
        .unwrap();
        assert!(matches!(
            doc.into_snapshot(),
            Err(DataSourceError::InvalidMonth(m)) if m == "March"
        ));
    }

    #[test]
    fn in_memory_snapshot_is_a_source() {
        let snapshot = Snapshot::default();
        assert_eq!(snapshot.fetch().unwrap(), snapshot);
    }
}
