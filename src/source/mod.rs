//! Source Module
//!
//! The upstream row provider. The scheduler only sees the [`RowSource`]
//! trait; [`SheetsClient`] is the production implementation.

mod sheets;

use async_trait::async_trait;

use crate::error::Result;
use crate::score::RawRow;

pub use sheets::{Credentials, SheetsClient};

/// Anything that can deliver the raw score rows of a range.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch every row of `range` in the document identified by `source_id`.
    async fn fetch_rows(&self, source_id: &str, range: &str) -> Result<Vec<RawRow>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
