//! Response DTOs for the score server API
//!
//! Defines the structure of outgoing HTTP response bodies. The score table
//! itself is served as a bare JSON object and needs no wrapper.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::score::CacheSnapshot;
use crate::tasks::{RefreshStats, SchedulerPhase, SchedulerStatus};

/// Response body for the status endpoint (GET /score/status)
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// When the served scores were committed, absent before the first refresh
    pub generated_at: Option<DateTime<Utc>>,
    /// Number of teams in the served scores
    pub teams: usize,
    /// Scheduler phase, flattened to `state` and `next_refresh_at`
    #[serde(flatten)]
    pub phase: SchedulerPhase,
    /// Refresh cycle counters
    #[serde(flatten)]
    pub stats: RefreshStats,
}

impl StatusResponse {
    /// Creates a new StatusResponse from a cache snapshot and scheduler status
    pub fn new(snapshot: &CacheSnapshot, status: SchedulerStatus) -> Self {
        Self {
            generated_at: snapshot.generated_at,
            teams: snapshot.aggregate.len(),
            phase: status.phase,
            stats: status.stats,
        }
    }
}
