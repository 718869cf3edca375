//! # Relay Control Loop
//!
//! Owns every peripheral, the queue and the engine, and runs them on one
//! thread.
//!
//! ## Loop Iteration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           tick()                                        │
//! │                                                                         │
//! │  1. sync_if_due()        engine timer; drains queue when due+online     │
//! │          │                                                              │
//! │  2. indicator.refresh()  end expired flash, follow connectivity         │
//! │          │                                                              │
//! │  3. reader.read_uid(t)   bounded wait for a tag                         │
//! │          │                                                              │
//! │  4. handle_scan(uid)     Processing ─► deliver ─┬─ 201 ──► Success      │
//! │                                                 └─ else ─► enqueue,     │
//! │                                                            Error        │
//! │                                                                         │
//! │  Only the card poll and the engine's pacing delay suspend the loop.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use tagrelay_core::{IndicatorState, Record, TagUid};
use tagrelay_store::QueueStore;

use crate::config::{NetworkSettings, RelayConfig};
use crate::delivery::Deliver;
use crate::device::{Connectivity, Indicator, TagReader};
use crate::engine::{DrainReport, SyncEngine};
use crate::error::{RelayError, RelayResult};
use crate::indicator::StatusIndicator;

/// Red/off blinks after the network could not be joined.
const FAILED_JOIN_BLINKS: u32 = 3;

/// What happened to one scanned tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Confirmed by the endpoint.
    Delivered,

    /// Saved to the active log for a later drain.
    Queued,

    /// Neither delivered nor saved.
    Lost,

    /// Same tag read again within the debounce window.
    Debounced,
}

/// The relay's single control loop.
pub struct RelayLoop<R, C, D, I> {
    reader: R,
    link: C,
    client: D,
    store: QueueStore,
    engine: SyncEngine,
    indicator: StatusIndicator<I>,
    network: NetworkSettings,
    poll_timeout: Duration,
    debounce: Duration,
    last_scan: Option<(Record, Instant)>,
}

impl<R, C, D, I> RelayLoop<R, C, D, I>
where
    R: TagReader,
    C: Connectivity,
    D: Deliver,
    I: Indicator,
{
    pub fn new(
        reader: R,
        link: C,
        client: D,
        store: QueueStore,
        indicator: I,
        config: &RelayConfig,
    ) -> Self {
        RelayLoop {
            reader,
            link,
            client,
            store,
            engine: SyncEngine::new(&config.sync),
            indicator: StatusIndicator::new(indicator, &config.indicator),
            network: config.network.clone(),
            poll_timeout: Duration::from_millis(config.reader.poll_timeout_ms),
            debounce: Duration::from_millis(config.reader.debounce_ms),
            last_scan: None,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts up, then loops forever. Returns only on a fatal error.
    pub async fn run(&mut self) -> RelayResult<()> {
        self.start().await?;
        info!("Relay running");
        loop {
            self.tick().await;
        }
    }

    /// Startup sequence: probe the reader, join the network, report the
    /// backlog.
    pub async fn start(&mut self) -> RelayResult<()> {
        self.indicator.show(IndicatorState::Booting);

        match self.reader.firmware_version().await {
            Some(version) => info!(firmware = %format!("{version:#010x}"), "NFC transceiver found"),
            None => {
                error!("NFC transceiver not found, halting");
                self.indicator.show(IndicatorState::Error);
                return Err(RelayError::ReaderNotFound);
            }
        }

        if !self.connect_network().await {
            warn!("Continuing in offline mode; scans will be queued");
            self.indicator
                .blink(IndicatorState::Error, FAILED_JOIN_BLINKS)
                .await;
        }

        match self.store.pending_records() {
            Ok(0) => debug!("Queue empty"),
            Ok(pending) => info!(pending, dir = ?self.store.dir(), "Queued records awaiting sync"),
            Err(e) => warn!(error = %e, "Could not count queued records"),
        }

        self.indicator
            .show(IndicatorState::idle(self.link.is_connected()));
        Ok(())
    }

    /// Tries to join the network, blinking the indicator between attempts.
    pub async fn connect_network(&mut self) -> bool {
        if self.link.is_connected() {
            return true;
        }

        info!(ssid = %self.network.ssid, open = self.network.is_open(), "Joining network");
        let retry = Duration::from_millis(self.network.connect_retry_ms);

        for attempt in 0..self.network.connect_attempts {
            self.indicator
                .show(IndicatorState::Connecting { lit: attempt % 2 == 0 });
            if self.link.connect().await {
                info!(attempts = attempt + 1, "Network connected");
                return true;
            }
            tokio::time::sleep(retry).await;
        }

        warn!(
            attempts = self.network.connect_attempts,
            "Network connection failed"
        );
        false
    }

    // =========================================================================
    // Loop Body
    // =========================================================================

    /// One loop iteration.
    pub async fn tick(&mut self) -> Option<ScanOutcome> {
        self.sync_if_due().await;
        self.indicator.refresh(self.link.is_connected());

        let uid = self.reader.read_uid(self.poll_timeout).await?;
        Some(self.handle_scan(uid).await)
    }

    /// Runs a drain pass if the engine says one is due.
    pub async fn sync_if_due(&mut self) -> Option<DrainReport> {
        if !self.engine.is_due(self.link.is_connected()) {
            return None;
        }

        let pending = self.store.has_pending();
        if pending {
            self.indicator.show(IndicatorState::Processing);
        }

        match self
            .engine
            .run_pass(&self.store, &self.client, &self.link)
            .await
        {
            Ok(report) => {
                if report.attempted() > 0 {
                    self.indicator.show(if report.all_delivered() {
                        IndicatorState::Success
                    } else {
                        IndicatorState::Error
                    });
                } else if pending {
                    self.indicator
                        .show(IndicatorState::idle(self.link.is_connected()));
                }
                Some(report)
            }
            Err(_) => {
                if pending {
                    self.indicator.show(IndicatorState::Error);
                }
                None
            }
        }
    }

    /// Delivers a freshly scanned tag, or saves it for later.
    pub async fn handle_scan(&mut self, uid: TagUid) -> ScanOutcome {
        let record = Record::encode(&uid);

        if let Some((last, at)) = &self.last_scan {
            if *last == record && at.elapsed() < self.debounce {
                debug!(record = %record, "Repeat read ignored");
                return ScanOutcome::Debounced;
            }
        }
        self.last_scan = Some((record.clone(), Instant::now()));

        info!(record = %record, "Tag scanned");
        self.indicator.show(IndicatorState::Processing);

        let outcome = self.client.deliver(&self.link, &record).await;
        if outcome.is_delivered() {
            info!(record = %record, "Scan delivered");
            self.indicator.show(IndicatorState::Success);
            return ScanOutcome::Delivered;
        }

        if let Some(err) = outcome.error() {
            warn!(record = %record, error = %err, "Delivery failed, saving offline");
        }
        self.indicator.show(IndicatorState::Error);

        match self.store.enqueue(&record) {
            Ok(()) => ScanOutcome::Queued,
            Err(e) => {
                error!(record = %record, error = %e, "Failed to save scan, record lost");
                ScanOutcome::Lost
            }
        }
    }
}
