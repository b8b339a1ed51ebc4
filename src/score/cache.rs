//! Score Cache Module
//!
//! Holds the most recent aggregate behind an `Arc` swap so readers never wait
//! on a refresh.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::score::{ScoreAggregate, ScoreLog};

// == Cache Snapshot ==
/// An immutable view of the aggregate at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheSnapshot {
    /// Team to cumulative score
    pub aggregate: ScoreAggregate,
    /// Team to the entries behind its score
    pub log: ScoreLog,
    /// When the aggregate was committed; `None` before the first refresh
    pub generated_at: Option<DateTime<Utc>>,
}

impl CacheSnapshot {
    /// Returns true if no refresh has committed yet.
    pub fn is_absent(&self) -> bool {
        self.generated_at.is_none()
    }
}

// == Score Cache ==
/// Shared handle to the latest [`CacheSnapshot`].
///
/// Cloning the handle shares the same underlying slot. The write lock is only
/// held for a pointer swap, never across a fetch.
#[derive(Debug, Clone, Default)]
pub struct ScoreCache {
    current: Arc<RwLock<Arc<CacheSnapshot>>>,
}

impl ScoreCache {
    // == Constructor ==
    /// Creates a cache holding the absent snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    // == Read ==
    /// Returns the most recently committed snapshot.
    pub async fn read(&self) -> Arc<CacheSnapshot> {
        self.current.read().await.clone()
    }

    // == Replace ==
    /// Commits `aggregate` as the new snapshot with an empty entry log,
    /// stamped with the current time.
    pub async fn replace(&self, aggregate: ScoreAggregate) -> Arc<CacheSnapshot> {
        self.replace_with_log(aggregate, ScoreLog::new()).await
    }

    /// Commits `aggregate` and its entry `log` together as one snapshot.
    ///
    /// The previous snapshot is dropped whole; nothing is merged.
    pub async fn replace_with_log(
        &self,
        aggregate: ScoreAggregate,
        log: ScoreLog,
    ) -> Arc<CacheSnapshot> {
        let snapshot = Arc::new(CacheSnapshot {
            aggregate,
            log,
            generated_at: Some(Utc::now()),
        });

        *self.current.write().await = snapshot.clone();
        snapshot
    }
}
