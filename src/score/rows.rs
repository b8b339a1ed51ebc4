//! Row Parsing Module
//!
//! Converts raw spreadsheet cells into [`ScoreRow`]s. This is the only place
//! amount text is turned into an integer; the aggregator trusts its input.

use tracing::warn;

use crate::score::ScoreRow;

// == Raw Row ==
/// One row as delivered by the source: amount text, team and an optional
/// reason, unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Amount as written in the sheet, e.g. `"10"` or `"-3"`
    pub amount: String,
    /// Team identifier
    pub team: String,
    /// Free text explaining the change
    pub reason: Option<String>,
}

impl RawRow {
    /// Creates a new RawRow without a reason
    pub fn new(amount: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            team: team.into(),
            reason: None,
        }
    }

    /// Sets the reason. Blank text leaves it unset.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.reason = (!reason.trim().is_empty()).then_some(reason);
        self
    }
}

// == Parsed Rows ==
/// Result of parsing a batch of raw rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRows {
    /// Rows that passed validation, in input order
    pub rows: Vec<ScoreRow>,
    /// Number of rows dropped as malformed
    pub skipped: usize,
}

// == Parse Rows ==
/// Validates raw rows, skipping the malformed ones.
///
/// A row is malformed when its amount is not a base-10 integer (surrounding
/// whitespace is ignored) or its team is empty. Malformed rows are logged and
/// counted; the rest of the batch is kept.
pub fn parse_rows(raw: Vec<RawRow>) -> ParsedRows {
    let mut parsed = ParsedRows::default();

    for (index, row) in raw.into_iter().enumerate() {
        if row.team.is_empty() {
            warn!("Skipping row {}: empty team", index);
            parsed.skipped += 1;
            continue;
        }

        match row.amount.trim().parse::<i64>() {
            Ok(delta) => parsed.rows.push(ScoreRow {
                delta,
                team: row.team,
                reason: row.reason,
            }),
            Err(_) => {
                warn!(
                    "Skipping row {}: amount {:?} for team {:?} is not an integer",
                    index, row.amount, row.team
                );
                parsed.skipped += 1;
            }
        }
    }

    parsed
}
