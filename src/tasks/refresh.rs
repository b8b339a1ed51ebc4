//! Score Refresh Task
//!
//! A single controller task owns every refresh state transition. Callers hold
//! a cloneable [`RefreshScheduler`] and send trigger requests to it over a
//! channel; they never touch the timer directly.
//!
//! The controller loop:
//! 1. Run one cycle: fetch rows, parse, aggregate, replace the cache with
//!    the new totals and entry log
//! 2. Drain triggers that arrived during the cycle (they join it)
//! 3. Arm a [`RefreshHandle`] for `now + interval`
//! 4. Wait for the handle to fire or for a trigger; a trigger cancels the
//!    handle first
//! 5. Repeat until every scheduler handle is dropped

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::FetchError;
use crate::score::{aggregate, entry_log, parse_rows, ScoreCache};
use crate::source::RowSource;
use crate::tasks::{RefreshHandle, RefreshStats};

// == Public Constants ==
/// Time between the end of one cycle and the start of the next
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on a single fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// == Scheduler Phase ==
/// Where the controller currently is in its loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchedulerPhase {
    /// No timer armed and no cycle running
    #[default]
    Idle,
    /// A cycle is in progress
    Refreshing,
    /// A refresh is armed for the given time
    Scheduled { next_refresh_at: DateTime<Utc> },
}

// == Scheduler Status ==
/// Phase plus cycle counters, published after every transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub phase: SchedulerPhase,
    pub stats: RefreshStats,
}

// == Scheduler Config ==
/// What to fetch and how often.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Document identifier passed to the source
    pub source_id: String,
    /// Range within the document, e.g. `Score!A2:C`
    pub range: String,
    /// Delay between cycles
    pub interval: Duration,
    /// Bound on each fetch; exceeding it fails the cycle
    pub fetch_timeout: Duration,
}

impl SchedulerConfig {
    /// Creates a config with the default interval and fetch timeout.
    pub fn new(source_id: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            range: range.into(),
            interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Builds the scheduler settings from server configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_id: config.sheet_id.clone().unwrap_or_default(),
            range: config.sheet_range.clone(),
            interval: Duration::from_secs(config.refresh_interval),
            fetch_timeout: Duration::from_secs(config.fetch_timeout),
        }
    }
}

// == Refresh Scheduler ==
/// Caller-facing handle to the refresh controller.
///
/// Cheap to clone. The controller keeps running while at least one clone is
/// alive.
#[derive(Clone)]
pub struct RefreshScheduler {
    triggers: mpsc::Sender<()>,
    status: watch::Receiver<SchedulerStatus>,
}

impl RefreshScheduler {
    // == Spawn ==
    /// Starts the controller task. The first cycle runs immediately.
    ///
    /// # Returns
    /// The scheduler handle and the controller's JoinHandle, which can be
    /// aborted during graceful shutdown.
    pub fn spawn(
        source: Arc<dyn RowSource>,
        cache: ScoreCache,
        config: SchedulerConfig,
    ) -> (Self, JoinHandle<()>) {
        // Capacity 1: a trigger sent while another is queued coalesces into it
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (status_tx, status_rx) = watch::channel(SchedulerStatus::default());

        let controller = Controller {
            source,
            cache,
            config,
            triggers: trigger_rx,
            status: status_tx,
        };
        let task = tokio::spawn(controller.run());

        (
            Self {
                triggers: trigger_tx,
                status: status_rx,
            },
            task,
        )
    }

    // == Trigger Now ==
    /// Requests an immediate refresh without waiting for it.
    ///
    /// A pending scheduled refresh is superseded. If a cycle is already
    /// running, the request joins it instead of starting another.
    pub fn trigger_now(&self) {
        match self.triggers.try_send(()) {
            Ok(()) => debug!("Refresh trigger queued"),
            Err(TrySendError::Full(())) => debug!("Refresh trigger already queued, coalesced"),
            Err(TrySendError::Closed(())) => warn!("Refresh controller stopped, trigger ignored"),
        }
    }

    // == Status ==
    /// Returns the current phase and counters.
    pub fn status(&self) -> SchedulerStatus {
        self.status.borrow().clone()
    }

    /// Returns a receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.clone()
    }
}

/// Why the controller left the scheduled wait.
enum Wake {
    Timer,
    Trigger,
    Shutdown,
}

// == Controller ==
/// Owns the pending RefreshHandle and runs cycles one at a time.
struct Controller {
    source: Arc<dyn RowSource>,
    cache: ScoreCache,
    config: SchedulerConfig,
    triggers: mpsc::Receiver<()>,
    status: watch::Sender<SchedulerStatus>,
}

impl Controller {
    async fn run(mut self) {
        info!(
            "Starting score refresh task: source={}, range={}, interval={:?}",
            self.source.name(),
            self.config.range,
            self.config.interval
        );

        loop {
            self.set_phase(SchedulerPhase::Refreshing);
            self.run_cycle().await;

            let joined = self.drain_triggers();
            if joined > 0 {
                debug!("{} trigger(s) joined the finished refresh", joined);
            }

            let mut pending = RefreshHandle::arm(self.config.interval);
            self.set_phase(SchedulerPhase::Scheduled {
                next_refresh_at: pending.fires_at(),
            });

            let wake = tokio::select! {
                _ = pending.fired() => Wake::Timer,
                trigger = self.triggers.recv() => match trigger {
                    Some(()) => Wake::Trigger,
                    None => Wake::Shutdown,
                },
            };

            match wake {
                Wake::Timer => debug!("Scheduled refresh fired"),
                Wake::Trigger => {
                    pending.cancel();
                    info!("Manual refresh triggered");
                }
                Wake::Shutdown => {
                    pending.cancel();
                    self.set_phase(SchedulerPhase::Idle);
                    info!("All scheduler handles dropped, stopping refresh task");
                    return;
                }
            }
        }
    }

    // == Refresh Cycle ==
    /// Fetch, parse, aggregate and replace. A failed fetch leaves the cache
    /// untouched.
    async fn run_cycle(&self) {
        let started = tokio::time::Instant::now();
        let fetch = self
            .source
            .fetch_rows(&self.config.source_id, &self.config.range);

        let fetched = match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.config.fetch_timeout)),
        };

        match fetched {
            Ok(raw) => {
                let total_rows = raw.len();
                let parsed = parse_rows(raw);
                let totals = aggregate(&parsed.rows);
                let log = entry_log(&parsed.rows);
                let teams = totals.len();

                self.cache.replace_with_log(totals, log).await;
                self.status
                    .send_modify(|status| status.stats.record_success(parsed.skipped));

                info!(
                    "Score refresh complete: {} rows, {} skipped, {} teams in {:?}",
                    total_rows,
                    parsed.skipped,
                    teams,
                    started.elapsed()
                );
            }
            Err(err) => {
                warn!(
                    "Score refresh failed ({}), keeping previous scores: {}",
                    err.kind(),
                    err
                );
                self.status
                    .send_modify(|status| status.stats.record_failure(&err));
            }
        }
    }

    /// Consumes queued triggers, returning how many there were.
    fn drain_triggers(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.triggers.try_recv() {
                Ok(()) => drained += 1,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return drained,
            }
        }
    }

    fn set_phase(&self, phase: SchedulerPhase) {
        self.status.send_modify(|status| status.phase = phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use crate::score::{RawRow, ScoreAggregate};

    // == Test Doubles ==

    /// Answers every fetch with a fixed response, optionally after a delay.
    struct StubSource {
        calls: AtomicUsize,
        response: Mutex<crate::error::Result<Vec<RawRow>>>,
        delay: Duration,
    }

    impl StubSource {
        fn ok(rows: &[(&str, &str)]) -> Self {
            let rows = rows.iter().map(|(a, t)| RawRow::new(*a, *t)).collect();
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Ok(rows)),
                delay: Duration::ZERO,
            }
        }

        fn with_reasons(rows: &[(&str, &str, &str)]) -> Self {
            let rows = rows
                .iter()
                .map(|(a, t, r)| RawRow::new(*a, *t).with_reason(*r))
                .collect();
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Ok(rows)),
                delay: Duration::ZERO,
            }
        }

        fn failing(err: FetchError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Err(err)),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RowSource for StubSource {
        async fn fetch_rows(&self, _: &str, _: &str) -> crate::error::Result<Vec<RawRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response.lock().unwrap().clone()
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Blocks each fetch until the test adds a permit.
    struct GatedSource {
        calls: AtomicUsize,
        gate: Semaphore,
    }

    impl GatedSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl RowSource for GatedSource {
        async fn fetch_rows(&self, _: &str, _: &str) -> crate::error::Result<Vec<RawRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| FetchError::Transient(e.to_string()))?;
            permit.forget();
            Ok(vec![RawRow::new("1", "new")])
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    // == Helpers ==

    fn test_config() -> SchedulerConfig {
        SchedulerConfig::new("sheet", "Score!A2:C")
    }

    fn tally(pairs: &[(&str, i64)]) -> ScoreAggregate {
        pairs.iter().map(|(t, s)| (t.to_string(), *s)).collect()
    }

    /// Waits until `cycles` cycles have finished and the next one is armed.
    async fn wait_scheduled(rx: &mut watch::Receiver<SchedulerStatus>, cycles: u64) {
        rx.wait_for(|s| {
            s.stats.cycles() >= cycles && matches!(s.phase, SchedulerPhase::Scheduled { .. })
        })
        .await
        .expect("controller stopped unexpectedly");
    }

    // == Tests ==

    #[tokio::test(start_paused = true)]
    async fn test_initial_refresh_populates_cache() {
        let source = Arc::new(StubSource::ok(&[("10", "A"), ("5", "B"), ("7", "A")]));
        let cache = ScoreCache::new();
        let (scheduler, task) = RefreshScheduler::spawn(source.clone(), cache.clone(), test_config());

        wait_scheduled(&mut scheduler.subscribe(), 1).await;

        assert_eq!(source.calls(), 1);
        assert_eq!(cache.read().await.aggregate, tally(&[("A", 17), ("B", 5)]));
        assert_eq!(scheduler.status().stats.completed, 1);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearms_after_interval() {
        let source = Arc::new(StubSource::ok(&[("1", "A")]));
        let (scheduler, task) =
            RefreshScheduler::spawn(source.clone(), ScoreCache::new(), test_config());
        let mut rx = scheduler.subscribe();
        wait_scheduled(&mut rx, 1).await;

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        wait_scheduled(&mut rx, 2).await;
        assert_eq!(source.calls(), 2);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_triggers_run_single_cycle() {
        let source = Arc::new(StubSource::ok(&[("1", "A")]).with_delay(Duration::from_millis(50)));
        let (scheduler, task) =
            RefreshScheduler::spawn(source.clone(), ScoreCache::new(), test_config());
        let mut rx = scheduler.subscribe();
        wait_scheduled(&mut rx, 1).await;

        let callers: Vec<_> = (0..10)
            .map(|_| {
                let scheduler = scheduler.clone();
                tokio::spawn(async move { scheduler.trigger_now() })
            })
            .collect();
        for caller in callers {
            caller.await.unwrap();
        }

        wait_scheduled(&mut rx, 2).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(scheduler.status().stats.cycles(), 2);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_while_refreshing_joins() {
        let source = Arc::new(StubSource::ok(&[("1", "A")]).with_delay(Duration::from_secs(5)));
        let (scheduler, task) =
            RefreshScheduler::spawn(source.clone(), ScoreCache::new(), test_config());
        let mut rx = scheduler.subscribe();

        rx.wait_for(|s| s.phase == SchedulerPhase::Refreshing)
            .await
            .unwrap();
        scheduler.trigger_now();
        scheduler.trigger_now();
        scheduler.trigger_now();

        wait_scheduled(&mut rx, 1).await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(source.calls(), 1);
        assert_eq!(scheduler.status().stats.cycles(), 1);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_cancels_pending_timer() {
        let source = Arc::new(StubSource::ok(&[("1", "A")]));
        let (scheduler, task) =
            RefreshScheduler::spawn(source.clone(), ScoreCache::new(), test_config());
        let mut rx = scheduler.subscribe();
        wait_scheduled(&mut rx, 1).await;

        tokio::time::sleep(Duration::from_secs(30)).await;
        scheduler.trigger_now();
        wait_scheduled(&mut rx, 2).await;

        // The superseded timer would have fired 60s after the first cycle
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(source.calls(), 2);

        // The replacement fires 60s after the manual cycle
        tokio::time::sleep(Duration::from_secs(20)).await;
        wait_scheduled(&mut rx, 3).await;
        assert_eq!(source.calls(), 3);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_reschedules_and_keeps_cache() {
        let source = Arc::new(StubSource::failing(FetchError::Auth("expired".to_string())));
        let cache = ScoreCache::new();
        let prior = cache.replace(tally(&[("A", 4)])).await;

        let (scheduler, task) = RefreshScheduler::spawn(source.clone(), cache.clone(), test_config());
        let mut rx = scheduler.subscribe();
        wait_scheduled(&mut rx, 1).await;

        let status = scheduler.status();
        assert_eq!(status.stats.failed, 1);
        assert_eq!(status.stats.completed, 0);
        assert!(status.stats.last_error.unwrap().contains("expired"));
        assert!(Arc::ptr_eq(&cache.read().await, &prior));

        // No faster retry: the next attempt waits for the full interval
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(source.calls(), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        wait_scheduled(&mut rx, 2).await;
        assert_eq!(source.calls(), 2);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_is_a_failure() {
        let source = Arc::new(GatedSource::new());
        let config = SchedulerConfig {
            fetch_timeout: Duration::from_secs(5),
            ..test_config()
        };
        let (scheduler, task) = RefreshScheduler::spawn(source.clone(), ScoreCache::new(), config);

        wait_scheduled(&mut scheduler.subscribe(), 1).await;

        let status = scheduler.status();
        assert_eq!(status.stats.failed, 1);
        assert!(status.stats.last_error.unwrap().contains("timed out"));
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_not_blocked_by_slow_fetch() {
        let source = Arc::new(GatedSource::new());
        let cache = ScoreCache::new();
        cache.replace(tally(&[("old", 1)])).await;

        let (scheduler, task) = RefreshScheduler::spawn(source.clone(), cache.clone(), test_config());
        let mut rx = scheduler.subscribe();
        rx.wait_for(|s| s.phase == SchedulerPhase::Refreshing)
            .await
            .unwrap();
        while source.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let snapshot = tokio::time::timeout(Duration::from_millis(10), cache.read())
            .await
            .expect("read blocked behind refresh");
        assert_eq!(snapshot.aggregate, tally(&[("old", 1)]));

        source.gate.add_permits(1);
        wait_scheduled(&mut rx, 1).await;
        assert_eq!(cache.read().await.aggregate, tally(&[("new", 1)]));
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_rows_are_skipped() {
        let source = Arc::new(StubSource::ok(&[("10", "A"), ("ten", "A"), ("3", "B"), ("1", "")]));
        let cache = ScoreCache::new();
        let (scheduler, task) = RefreshScheduler::spawn(source, cache.clone(), test_config());

        wait_scheduled(&mut scheduler.subscribe(), 1).await;

        assert_eq!(cache.read().await.aggregate, tally(&[("A", 10), ("B", 3)]));
        assert_eq!(scheduler.status().stats.skipped_rows, 2);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_handles_dropped() {
        let source = Arc::new(StubSource::ok(&[]));
        let (scheduler, task) = RefreshScheduler::spawn(source, ScoreCache::new(), test_config());
        let mut rx = scheduler.subscribe();
        wait_scheduled(&mut rx, 1).await;

        drop(scheduler);
        task.await.unwrap();

        assert_eq!(rx.borrow().phase, SchedulerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_keeps_controller_alive() {
        let source = Arc::new(StubSource::ok(&[("1", "A")]));
        let config = SchedulerConfig {
            interval: Duration::MAX,
            ..test_config()
        };
        let (scheduler, task) = RefreshScheduler::spawn(source.clone(), ScoreCache::new(), config);
        let mut rx = scheduler.subscribe();
        wait_scheduled(&mut rx, 1).await;

        match scheduler.status().phase {
            SchedulerPhase::Scheduled { next_refresh_at } => {
                assert_eq!(next_refresh_at, DateTime::<Utc>::MAX_UTC)
            }
            other => panic!("unexpected phase {:?}", other),
        }

        scheduler.trigger_now();
        wait_scheduled(&mut rx, 2).await;

        assert!(!task.is_finished());
        assert_eq!(source.calls(), 2);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_records_entry_log() {
        let source = Arc::new(StubSource::with_reasons(&[
            ("10", "A", "quiz"),
            ("-2", "A", ""),
            ("5", "B", "relay"),
        ]));
        let cache = ScoreCache::new();
        let (scheduler, task) = RefreshScheduler::spawn(source, cache.clone(), test_config());

        wait_scheduled(&mut scheduler.subscribe(), 1).await;

        let snapshot = cache.read().await;
        assert_eq!(snapshot.aggregate, tally(&[("A", 8), ("B", 5)]));
        let team_a = &snapshot.log["A"];
        assert_eq!(team_a.total, 8);
        assert_eq!(team_a.log.len(), 2);
        assert_eq!(team_a.log[0].reason.as_deref(), Some("quiz"));
        assert_eq!(team_a.log[1].reason, None);
        task.abort();
    }

    #[test]
    fn test_config_defaults() {
        let config = SchedulerConfig::new("sheet", "Score!A2:C");
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
    }
}
