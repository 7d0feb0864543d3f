//! Aggregate statistics: data source, derived rates, gap-filled trend, JSON summary.

mod aggregate;
mod source;
mod summary;

pub use aggregate::{
    MonthlyCount, RawCounts, Stats, TREND_MONTHS, YearMonth, gap_fill, summarize,
};
pub use source::{MonthlyDocument, Snapshot, SnapshotDocument, SnapshotFile, StatsSource};
pub use summary::Summary;
