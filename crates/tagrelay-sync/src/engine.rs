//! # Sync Engine
//!
//! Periodically drains the durable queue through the delivery client.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            elapsed ≥ interval && connected                              │
//! │   ┌──────┐ ─────────────────────────────────► ┌──────────┐             │
//! │   │ Idle │                                    │ Draining │             │
//! │   └──────┘ ◄───────────────────────────────── └──────────┘             │
//! │              in-flight log consumed                 │                   │
//! │              (finish_drain) or pass aborted         │ per record:       │
//! │                                                     │  Delivered → drop │
//! │                                                     │  otherwise → back │
//! │                                                     │  of queue.txt     │
//! │                                                     │  pacing sleep     │
//! │                                                                         │
//! │  The attempt clock starts at construction and is reset only when a     │
//! │  pass is attempted; offline checks leave it alone.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Handling
//! A single failed delivery never stops a pass. Failing to open or read the
//! in-flight log, or to re-enqueue a record, aborts the pass without
//! `finish_drain`; the in-flight log stays on disk and is drained again in
//! full on the next check.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use tagrelay_store::QueueStore;

use crate::config::SyncSettings;
use crate::delivery::{Deliver, DeliveryOutcome};
use crate::device::Connectivity;
use crate::error::RelayResult;

// =============================================================================
// Types
// =============================================================================

/// Engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Draining,
}

/// Summary of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records confirmed by the endpoint.
    pub delivered: usize,

    /// Records moved to the back of the active log.
    pub requeued: usize,

    /// Unreadable lines dropped.
    pub skipped: usize,

    /// The pass picked up a log left by an interrupted drain.
    pub resumed: bool,
}

impl DrainReport {
    /// Number of delivery attempts made.
    pub fn attempted(&self) -> usize {
        self.delivered + self.requeued
    }

    /// True when every attempted record was delivered.
    pub fn all_delivered(&self) -> bool {
        self.requeued == 0
    }
}

// =============================================================================
// Pacing
// =============================================================================

/// Delay between consecutive deliveries inside one pass.
struct Pacing {
    base: Duration,
    backoff: Option<ExponentialBackoff>,
}

impl Pacing {
    fn new(settings: &SyncSettings) -> Self {
        let backoff = settings.pacing_backoff.then(|| ExponentialBackoff {
            current_interval: settings.pacing(),
            initial_interval: settings.pacing(),
            max_interval: settings.max_pacing(),
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        });

        Pacing {
            base: settings.pacing(),
            backoff,
        }
    }

    fn reset(&mut self) {
        if let Some(backoff) = self.backoff.as_mut() {
            backoff.reset();
        }
    }

    /// Delay to wait after `outcome` before the next attempt.
    fn after(&mut self, outcome: DeliveryOutcome) -> Duration {
        match self.backoff.as_mut() {
            Some(backoff) if matches!(outcome, DeliveryOutcome::TransportFailure { .. }) => {
                backoff.next_backoff().unwrap_or(backoff.max_interval)
            }
            Some(backoff) => {
                backoff.reset();
                self.base
            }
            None => self.base,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Drain scheduler.
pub struct SyncEngine {
    interval: Duration,
    pacing: Pacing,
    last_attempt: Instant,
    state: EngineState,
}

impl SyncEngine {
    pub fn new(settings: &SyncSettings) -> Self {
        SyncEngine {
            interval: settings.interval(),
            pacing: Pacing::new(settings),
            last_attempt: Instant::now(),
            state: EngineState::Idle,
        }
    }

    /// True if a pass should start now. Never blocks.
    pub fn is_due(&self, connected: bool) -> bool {
        connected
            && self.state == EngineState::Idle
            && self.last_attempt.elapsed() >= self.interval
    }

    /// Drains the in-flight log once.
    pub async fn run_pass<D: Deliver, C: Connectivity>(
        &mut self,
        store: &QueueStore,
        client: &D,
        link: &C,
    ) -> RelayResult<DrainReport> {
        self.last_attempt = Instant::now();
        self.state = EngineState::Draining;
        let result = self.drain(store, client, link).await;
        self.state = EngineState::Idle;

        match &result {
            Ok(report) if report.attempted() > 0 || report.skipped > 0 => info!(
                delivered = report.delivered,
                requeued = report.requeued,
                skipped = report.skipped,
                resumed = report.resumed,
                "Drain pass finished"
            ),
            Ok(_) => debug!("Nothing to drain"),
            Err(e) => warn!(
                error = %e,
                retryable = e.is_retryable(),
                "Drain pass aborted, in-flight log kept"
            ),
        }
        result
    }

    async fn drain<D: Deliver, C: Connectivity>(
        &mut self,
        store: &QueueStore,
        client: &D,
        link: &C,
    ) -> RelayResult<DrainReport> {
        let mut report = DrainReport::default();
        let Some(mut handle) = store.begin_drain()? else {
            return Ok(report);
        };
        report.resumed = handle.is_resumed();
        self.pacing.reset();

        let mut delay = None;
        while let Some(record) = handle.next_line()? {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let outcome = client.deliver(link, &record).await;
            if outcome.is_delivered() {
                report.delivered += 1;
            } else {
                store.enqueue(&record)?;
                report.requeued += 1;
                debug!(record = %record, ?outcome, "Record requeued");
            }

            delay = Some(self.pacing.after(outcome));
        }

        report.skipped = handle.skipped();
        store.finish_drain(handle)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::test_support::{FakeLink, ScriptedDelivery};
    use std::fs;
    use tagrelay_core::{Record, TagUid};
    use tagrelay_store::IN_FLIGHT_LOG;
    use tempfile::tempdir;

    fn record(bytes: &[u8]) -> Record {
        Record::encode(&TagUid::new(bytes.to_vec()).unwrap())
    }

    fn settings() -> SyncSettings {
        SyncSettings::default()
    }

    fn lines(path: &std::path::Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_due_after_interval_when_connected() {
        let engine = SyncEngine::new(&settings());
        assert!(!engine.is_due(true));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!engine.is_due(true));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(engine.is_due(true));
        assert!(!engine.is_due(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_checks_do_not_reset_clock() {
        let dir = tempdir().unwrap();
        let store = QueueStore::open(dir.path()).unwrap();
        let client = ScriptedDelivery::default();
        let link = FakeLink::new(false);
        let mut engine = SyncEngine::new(&settings());

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(!engine.is_due(link.is_connected()));

        link.set(true);
        assert!(engine.is_due(link.is_connected()));
        let report = engine.run_pass(&store, &client, &link).await.unwrap();
        assert_eq!(report, DrainReport::default());

        // The pass reset the clock.
        assert!(!engine.is_due(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_requeues_remainder() {
        let dir = tempdir().unwrap();
        let store = QueueStore::open(dir.path()).unwrap();
        store.enqueue(&record(&[0x01])).unwrap();
        store.enqueue(&record(&[0x02])).unwrap();

        let client = ScriptedDelivery::new([
            DeliveryOutcome::Delivered,
            DeliveryOutcome::TransportFailure { offline: false },
        ]);
        let mut engine = SyncEngine::new(&settings());

        let report = engine
            .run_pass(&store, &client, &FakeLink::new(true))
            .await
            .unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.requeued, 1);
        assert!(!store.in_flight_path().exists());
        assert_eq!(lines(store.active_path()), vec!["02"]);
        assert_eq!(engine.state, EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leftover_in_flight_log_drained_on_next_check() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(IN_FLIGHT_LOG), "04A39F\n").unwrap();
        let store = QueueStore::open(dir.path()).unwrap();

        let client = ScriptedDelivery::default();
        let link = FakeLink::new(true);
        let mut engine = SyncEngine::new(&settings());

        assert!(!engine.is_due(link.is_connected()));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(engine.is_due(link.is_connected()));

        let report = engine.run_pass(&store, &client, &link).await.unwrap();
        assert!(report.resumed);
        assert_eq!(report.delivered, 1);
        assert_eq!(client.attempts(), vec![record(&[0x04, 0xA3, 0x9F])]);
        assert!(!store.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_never_abort_pass() {
        let dir = tempdir().unwrap();
        let store = QueueStore::open(dir.path()).unwrap();
        for b in 1..=3u8 {
            store.enqueue(&record(&[b])).unwrap();
        }

        let client = ScriptedDelivery::new([
            DeliveryOutcome::Rejected(500),
            DeliveryOutcome::Rejected(409),
            DeliveryOutcome::TransportFailure { offline: false },
        ]);
        let mut engine = SyncEngine::new(&settings());
        let report = engine
            .run_pass(&store, &client, &FakeLink::new(true))
            .await
            .unwrap();

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.requeued, 3);
        assert!(!report.all_delivered());
        assert_eq!(lines(store.active_path()), vec!["01", "02", "03"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_pacing_between_attempts() {
        let dir = tempdir().unwrap();
        let store = QueueStore::open(dir.path()).unwrap();
        for b in 1..=3u8 {
            store.enqueue(&record(&[b])).unwrap();
        }

        let mut engine = SyncEngine::new(&settings());
        let start = Instant::now();
        engine
            .run_pass(&store, &ScriptedDelivery::default(), &FakeLink::new(true))
            .await
            .unwrap();

        // Two gaps for three records, none after the last.
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_backoff_grows_on_transport_failures() {
        let dir = tempdir().unwrap();
        let store = QueueStore::open(dir.path()).unwrap();
        for b in 1..=3u8 {
            store.enqueue(&record(&[b])).unwrap();
        }

        let mut settings = settings();
        settings.pacing_backoff = true;
        let client = ScriptedDelivery::new([DeliveryOutcome::TransportFailure { offline: false }; 3]);
        let mut engine = SyncEngine::new(&settings);

        let start = Instant::now();
        engine
            .run_pass(&store, &client, &FakeLink::new(true))
            .await
            .unwrap();

        // 200 ms then 400 ms.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(602), "{elapsed:?}");
    }

    #[test]
    fn test_pacing_backoff_resets_on_other_outcomes() {
        let mut settings = settings();
        settings.pacing_backoff = true;
        settings.max_pacing_ms = 500;
        let mut pacing = Pacing::new(&settings);
        let failure = DeliveryOutcome::TransportFailure { offline: false };

        let first = pacing.after(failure);
        let second = pacing.after(failure);
        let third = pacing.after(failure);
        assert!(second > first);
        assert!(third <= Duration::from_millis(501));

        assert_eq!(pacing.after(DeliveryOutcome::Delivered), Duration::from_millis(200));
        assert!(pacing.after(failure) < Duration::from_millis(201));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_in_flight_log_aborts_pass() {
        let dir = tempdir().unwrap();
        let store = QueueStore::open(dir.path()).unwrap();
        // A directory in place of the in-flight log opens but cannot be read.
        fs::create_dir(store.in_flight_path()).unwrap();

        let client = ScriptedDelivery::default();
        let mut engine = SyncEngine::new(&settings());
        let err = engine
            .run_pass(&store, &client, &FakeLink::new(true))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::StorageFailure(_)));
        assert!(store.in_flight_path().exists());
        assert!(client.attempts().is_empty());
        assert_eq!(engine.state, EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_requeue_aborts_pass() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(IN_FLIGHT_LOG), "01\n02\n").unwrap();
        let store = QueueStore::open(dir.path()).unwrap();
        // The active log cannot be opened for append.
        fs::create_dir(store.active_path()).unwrap();

        let client = ScriptedDelivery::new([DeliveryOutcome::Rejected(500)]);
        let mut engine = SyncEngine::new(&settings());
        let err = engine
            .run_pass(&store, &client, &FakeLink::new(true))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::StorageFailure(_)));
        assert_eq!(client.attempts(), vec![record(&[0x01])]);
        assert_eq!(lines(store.in_flight_path()), vec!["01", "02"]);
        assert_eq!(engine.state, EngineState::Idle);
        assert!(!engine.is_due(true));
    }
}
