//! Score Module
//!
//! Turns raw spreadsheet rows into a per-team tally (plus the entries behind
//! it) and keeps the latest tally in an in-memory cache.

mod aggregate;
mod cache;
mod log;
mod rows;


// Re-export public types
pub use aggregate::{aggregate, ScoreAggregate, ScoreRow};
pub use cache::{CacheSnapshot, ScoreCache};
pub use log::{entry_log, LogEntry, ScoreLog, TeamLog};
pub use rows::{parse_rows, ParsedRows, RawRow};
