//! Error types for the score server
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

// == Fetch Error Enum ==
/// Failure of a single fetch from the upstream row source.
///
/// None of these are fatal: the scheduler logs them, keeps serving the
/// previous snapshot and tries again on the next cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Credentials were rejected or have expired
    #[error("Authentication rejected: {0}")]
    Auth(String),

    /// Network error or non-success upstream status
    #[error("Transient upstream error: {0}")]
    Transient(String),

    /// Upstream answered with a body we could not decode
    #[error("Malformed upstream response: {0}")]
    Malformed(String),

    /// Fetch did not complete within the configured bound
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    // == Kind ==
    /// Short label used in logs and status output.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Auth(_) => "auth",
            FetchError::Transient(_) => "transient",
            FetchError::Malformed(_) => "malformed",
            FetchError::Timeout(_) => "timeout",
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
