//! Shared fakes for the peripheral and delivery traits.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tagrelay_core::{Record, Rgb, TagUid};

use crate::delivery::{Deliver, DeliveryOutcome};
use crate::device::{Connectivity, Indicator, TagReader};

// =============================================================================
// Reader
// =============================================================================

/// Reader that hands out queued tags, then idles for the poll timeout.
#[derive(Debug, Clone)]
pub struct FakeReader {
    firmware: Option<u32>,
    scans: Rc<RefCell<VecDeque<TagUid>>>,
}

impl FakeReader {
    pub fn new() -> Self {
        FakeReader {
            firmware: Some(0x3206_0107),
            scans: Rc::default(),
        }
    }

    /// A reader whose transceiver never answers.
    pub fn absent() -> Self {
        FakeReader {
            firmware: None,
            ..FakeReader::new()
        }
    }

    /// Queues a tag to be returned by the next poll.
    pub fn present(&self, bytes: &[u8]) {
        let uid = TagUid::new(bytes.to_vec()).unwrap();
        self.scans.borrow_mut().push_back(uid);
    }
}

impl TagReader for FakeReader {
    async fn firmware_version(&mut self) -> Option<u32> {
        self.firmware
    }

    async fn read_uid(&mut self, timeout: Duration) -> Option<TagUid> {
        let next = self.scans.borrow_mut().pop_front();
        if next.is_none() {
            tokio::time::sleep(timeout).await;
        }
        next
    }
}

// =============================================================================
// Link
// =============================================================================

/// Link whose state tests flip directly.
#[derive(Debug, Clone, Default)]
pub struct FakeLink {
    up: Arc<AtomicBool>,
    accepts: Arc<AtomicBool>,
    connects: Arc<AtomicU32>,
}

impl FakeLink {
    /// `connected` sets both the current state and whether `connect()`
    /// succeeds.
    pub fn new(connected: bool) -> Self {
        let link = FakeLink::default();
        link.up.store(connected, Ordering::SeqCst);
        link.accepts.store(connected, Ordering::SeqCst);
        link
    }

    pub fn set(&self, connected: bool) {
        self.up.store(connected, Ordering::SeqCst);
        self.accepts.store(connected, Ordering::SeqCst);
    }

    /// Number of `connect()` calls so far.
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connectivity for FakeLink {
    fn is_connected(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }

    async fn connect(&mut self) -> bool {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.accepts.load(Ordering::SeqCst) {
            self.up.store(true, Ordering::SeqCst);
        }
        self.is_connected()
    }
}

// =============================================================================
// Indicator
// =============================================================================

/// Records every rendered color.
#[derive(Debug, Clone, Default)]
pub struct RecordingIndicator {
    frames: Rc<RefCell<Vec<Rgb>>>,
}

impl RecordingIndicator {
    pub fn frames(&self) -> Vec<Rgb> {
        self.frames.borrow().clone()
    }

    pub fn last(&self) -> Option<Rgb> {
        self.frames.borrow().last().copied()
    }
}

impl Indicator for RecordingIndicator {
    fn render(&mut self, color: Rgb) {
        self.frames.borrow_mut().push(color);
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// Answers from a script; `Delivered` once the script runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDelivery {
    script: Rc<RefCell<VecDeque<DeliveryOutcome>>>,
    attempts: Rc<RefCell<Vec<Record>>>,
}

impl ScriptedDelivery {
    pub fn new(script: impl IntoIterator<Item = DeliveryOutcome>) -> Self {
        let delivery = ScriptedDelivery::default();
        delivery.script.borrow_mut().extend(script);
        delivery
    }

    pub fn push(&self, outcome: DeliveryOutcome) {
        self.script.borrow_mut().push_back(outcome);
    }

    /// Records that reached the "endpoint", in order.
    pub fn attempts(&self) -> Vec<Record> {
        self.attempts.borrow().clone()
    }
}

impl Deliver for ScriptedDelivery {
    async fn deliver<C: Connectivity>(&self, link: &C, record: &Record) -> DeliveryOutcome {
        if !link.is_connected() {
            return DeliveryOutcome::TransportFailure { offline: true };
        }
        self.attempts.borrow_mut().push(record.clone());
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or(DeliveryOutcome::Delivered)
    }
}
