//! Scoreboard - A team score tally served over HTTP
//!
//! Periodically rebuilds per-team totals from a spreadsheet range and serves
//! the latest totals from memory.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod score;
pub mod source;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use score::ScoreCache;
pub use tasks::RefreshScheduler;
