//! Per-run sync results

use serde::{Deserialize, Serialize};

use crate::status::SyncStatus;

/// A track that could not be cached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFailure {
    pub id: String,
    pub reason: String,
}

/// Per-track counters for one run.
///
/// `attempted` always equals `succeeded + skipped_cached + failed.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub attempted: u64,
    pub succeeded: u64,
    pub skipped_cached: u64,
    pub failed: Vec<TrackFailure>,
}

impl SyncReport {
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_skipped(&mut self) {
        self.attempted += 1;
        self.skipped_cached += 1;
    }

    pub fn record_failure(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.attempted += 1;
        self.failed.push(TrackFailure {
            id: id.into(),
            reason: reason.into(),
        });
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.len() as u64
    }

    /// True when every track is now cached
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of a completed sync run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    pub duration_seconds: f64,
    pub stats: SyncStatus,
    pub report: SyncReport,
}
