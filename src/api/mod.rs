//! API Module
//!
//! HTTP handlers and routing for the score server.
//!
//! # Endpoints
//! - `GET /` - Liveness check
//! - `GET /score` - Cached team totals
//! - `GET /score/log` - Cached entries behind each total
//! - `POST /score/update` - Trigger a refresh
//! - `GET /score/status` - Snapshot age and scheduler state

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
