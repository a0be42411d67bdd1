//! Execution progress snapshot.

use serde::{Deserialize, Serialize};

/// Statement execution stats attached to every batch.
///
/// Only the most recently observed value is meaningful; each batch carries a
/// refined snapshot of the same query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    /// Query state as reported by the coordinator (QUEUED, RUNNING, FINISHED, FAILED...)
    pub state: String,
    pub queued: bool,
    pub scheduled: bool,
    pub nodes: i32,
    pub total_splits: i32,
    pub queued_splits: i32,
    pub running_splits: i32,
    pub completed_splits: i32,
    pub cpu_time_millis: i64,
    pub wall_time_millis: i64,
    pub queued_time_millis: i64,
    pub elapsed_time_millis: i64,
    pub processed_rows: i64,
    pub processed_bytes: i64,
    pub peak_memory_bytes: i64,
    pub spilled_bytes: i64,
}

impl Stats {
    /// Completed splits as a percentage of total splits, if any splits are known.
    pub fn progress_percentage(&self) -> Option<f64> {
        if self.total_splits <= 0 {
            return None;
        }
        let pct = f64::from(self.completed_splits) * 100.0 / f64::from(self.total_splits);
        Some(pct.min(100.0))
    }

    /// Whether the coordinator reports a final state.
    pub fn is_finished(&self) -> bool {
        matches!(self.state.as_str(), "FINISHED" | "FAILED" | "CANCELED")
    }
}
