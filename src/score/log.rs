//! Entry Log Module
//!
//! Keeps every accepted score change per team, alongside the team's total,
//! so a scoreboard can show where the points came from.

use std::collections::HashMap;

use serde::Serialize;

use crate::score::ScoreRow;

// == Log Entry ==
/// One accepted score change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// == Team Log ==
/// A team's entries in sheet order and their total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamLog {
    pub total: i64,
    pub log: Vec<LogEntry>,
}

/// Team to its entry log.
pub type ScoreLog = HashMap<String, TeamLog>;

// == Entry Log ==
/// Groups rows by team, keeping their order within each team.
///
/// `total` saturates the same way [`aggregate`](crate::score::aggregate)
/// does, so the two always agree.
pub fn entry_log(rows: &[ScoreRow]) -> ScoreLog {
    let mut log = ScoreLog::new();

    for row in rows {
        let team = log.entry(row.team.clone()).or_default();
        team.total = team.total.saturating_add(row.delta);
        team.log.push(LogEntry {
            score: row.delta,
            reason: row.reason.clone(),
        });
    }

    log
}
