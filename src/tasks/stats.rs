//! Refresh Statistics
//!
//! Counters describing how refresh cycles have gone so far.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::FetchError;

// == Refresh Stats ==
/// Outcome counters for refresh cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshStats {
    /// Cycles that replaced the cache
    pub completed: u64,
    /// Cycles whose fetch failed
    pub failed: u64,
    /// Malformed rows dropped across all cycles
    pub skipped_rows: u64,
    /// Time of the last cache replacement
    pub last_success_at: Option<DateTime<Utc>>,
    /// Message of the most recent fetch failure
    pub last_error: Option<String>,
}

impl RefreshStats {
    /// Total finished cycles, successful or not.
    pub fn cycles(&self) -> u64 {
        self.completed + self.failed
    }

    // == Record Success ==
    /// Records a cycle that committed a new aggregate.
    pub fn record_success(&mut self, skipped_rows: usize) {
        self.completed += 1;
        self.skipped_rows += skipped_rows as u64;
        self.last_success_at = Some(Utc::now());
    }

    // == Record Failure ==
    /// Records a cycle whose fetch failed.
    pub fn record_failure(&mut self, error: &FetchError) {
        self.failed += 1;
        self.last_error = Some(error.to_string());
    }
}
