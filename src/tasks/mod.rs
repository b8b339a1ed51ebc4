//! Background Tasks Module
//!
//! Contains the background refresh controller and its caller-facing handle.
//!
//! # Tasks
//! - Score refresh: fetches rows, rebuilds the tally and re-arms itself on a
//!   fixed interval; can be triggered on demand

mod handle;
mod refresh;
mod stats;

pub use handle::RefreshHandle;
pub use refresh::{
    RefreshScheduler, SchedulerConfig, SchedulerPhase, SchedulerStatus, DEFAULT_FETCH_TIMEOUT,
    DEFAULT_REFRESH_INTERVAL,
};
pub use stats::RefreshStats;
