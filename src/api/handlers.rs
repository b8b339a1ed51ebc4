//! API Handlers
//!
//! HTTP request handlers for each score server endpoint. Handlers only read
//! the cache or post a trigger; none of them waits on a refresh.

use axum::{extract::State, Json};

use crate::models::StatusResponse;
use crate::score::{ScoreAggregate, ScoreCache, ScoreLog};
use crate::tasks::RefreshScheduler;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Latest score snapshot
    pub cache: ScoreCache,
    /// Handle to the background refresh controller
    pub scheduler: RefreshScheduler,
}

impl AppState {
    /// Creates a new AppState from a cache and the scheduler refreshing it.
    pub fn new(cache: ScoreCache, scheduler: RefreshScheduler) -> Self {
        Self { cache, scheduler }
    }
}

/// Handler for GET /
///
/// Liveness check.
pub async fn index_handler() -> &'static str {
    "pong"
}

/// Handler for GET /score
///
/// Returns the cached team totals, `{}` before the first refresh.
pub async fn score_handler(State(state): State<AppState>) -> Json<ScoreAggregate> {
    let snapshot = state.cache.read().await;
    Json(snapshot.aggregate.clone())
}

/// Handler for GET /score/log
///
/// Returns each team's entries with their reasons and the total they add up
/// to, from the same snapshot /score reads.
pub async fn log_handler(State(state): State<AppState>) -> Json<ScoreLog> {
    let snapshot = state.cache.read().await;
    Json(snapshot.log.clone())
}

/// Handler for POST /score/update
///
/// Requests a refresh and returns immediately; upstream failures only show
/// up in logs and in /score/status.
pub async fn update_handler(State(state): State<AppState>) -> &'static str {
    state.scheduler.trigger_now();
    "ok"
}

/// Handler for GET /score/status
///
/// Reports snapshot freshness and scheduler state.
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.cache.read().await;
    Json(StatusResponse::new(&snapshot, state.scheduler.status()))
}
