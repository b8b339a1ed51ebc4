//! API Routes
//!
//! Configures the Axum router with all score server endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    index_handler, log_handler, score_handler, status_handler, update_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /` - Liveness check, answers `pong`
/// - `GET /score` - Cached team totals
/// - `GET /score/log` - Per-team entries with their reasons
/// - `POST /score/update` - Trigger a refresh, answers `ok`
/// - `GET /score/status` - Snapshot age and scheduler state
///
/// # Middleware
/// - CORS: Allows any origin, method and header
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/", get(index_handler))
        .route("/score", get(score_handler))
        .route("/score/log", get(log_handler))
        .route("/score/update", post(update_handler))
        .route("/score/status", get(status_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
