//! Aggregator Module
//!
//! Sums score deltas per team.

use std::collections::HashMap;

// == Score Row ==
/// A single validated score change for one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    /// Points added (or removed, when negative)
    pub delta: i64,
    /// Team identifier, compared case-sensitively
    pub team: String,
    /// Why the score changed, if the sheet says
    pub reason: Option<String>,
}

impl ScoreRow {
    /// Creates a new ScoreRow.
    pub fn new(delta: i64, team: impl Into<String>) -> Self {
        Self {
            delta,
            team: team.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Team to cumulative score.
pub type ScoreAggregate = HashMap<String, i64>;

// == Aggregate ==
/// Sums `delta` grouped by `team`.
///
/// Input order does not matter. Deltas are expected to be parsed already,
/// see [`parse_rows`](crate::score::parse_rows). Totals saturate at the
/// `i64` bounds rather than wrapping.
pub fn aggregate(rows: &[ScoreRow]) -> ScoreAggregate {
    let mut totals = ScoreAggregate::new();

    for row in rows {
        let total = totals.entry(row.team.clone()).or_insert(0);
        *total = total.saturating_add(row.delta);
    }

    totals
}
