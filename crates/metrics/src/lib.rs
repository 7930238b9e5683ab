//! Ingest counters and the periodic stats reporter.

mod stats;
mod tracker;

pub use stats::Stats;
pub use tracker::StatsTracker;
