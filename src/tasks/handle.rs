//! Refresh Handle
//!
//! Token for the one pending scheduled refresh.

use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, Sleep};
use tracing::debug;

/// Deadline used when `now + interval` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

// == Refresh Handle ==
/// An armed future refresh.
///
/// The handle owns the timer itself, so consuming it with [`cancel`] or
/// dropping it disarms the refresh. Only the refresh controller creates
/// these, and it never holds more than one.
///
/// [`cancel`]: RefreshHandle::cancel
#[derive(Debug)]
pub struct RefreshHandle {
    sleep: Pin<Box<Sleep>>,
    fires_at: DateTime<Utc>,
}

impl RefreshHandle {
    // == Arm ==
    /// Arms a refresh `interval` from now.
    ///
    /// Intervals too large to represent are clamped to a deadline decades
    /// away instead of overflowing.
    pub fn arm(interval: Duration) -> Self {
        let now = Utc::now();
        let fires_at = chrono::Duration::from_std(interval)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let start = Instant::now();
        let deadline = start
            .checked_add(interval)
            .unwrap_or_else(|| start + FAR_FUTURE);

        Self {
            sleep: Box::pin(tokio::time::sleep_until(deadline)),
            fires_at,
        }
    }

    /// Wall-clock time the refresh is due.
    pub fn fires_at(&self) -> DateTime<Utc> {
        self.fires_at
    }

    /// Returns true once the deadline has passed.
    pub fn is_due(&self) -> bool {
        Instant::now() >= self.sleep.deadline()
    }

    // == Fired ==
    /// Completes when the deadline is reached.
    pub async fn fired(&mut self) {
        self.sleep.as_mut().await;
    }

    // == Cancel ==
    /// Disarms the handle by dropping its timer. Canceling a handle that
    /// already fired is a no-op.
    pub fn cancel(self) {
        if self.is_due() {
            debug!("Pending refresh already fired, nothing to cancel");
        } else {
            debug!("Canceled pending refresh due at {}", self.fires_at);
        }
    }
}
