//! # tagrelay-sync: Delivery and Store-and-Forward Sync
//!
//! This crate turns scanned tags into rows in a remote table, saving them to
//! the durable queue whenever delivery does not succeed and draining that
//! queue in the background.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Relay Architecture                               │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      RelayLoop (single owner)                    │  │
//! │  │                                                                  │  │
//! │  │  Runs on a current_thread runtime; owns every resource below    │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ DeliveryClient │  │  SyncEngine    │  │  StatusIndicator       │    │
//! │  │                │  │                │  │                        │    │
//! │  │ POST one       │  │ Every 30 s:    │  │ Booting / Connecting / │    │
//! │  │ record, 201 =  │  │ rotate, drain, │  │ idle / flash states    │    │
//! │  │ delivered      │  │ requeue misses │  │                        │    │
//! │  └────────────────┘  └───────┬────────┘  └────────────────────────┘    │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                  tagrelay-store::QueueStore                             │
//! │                  queue.txt ──rename──► sending.txt                      │
//! │                                                                         │
//! │  PERIPHERALS (device module):                                          │
//! │  • TagReader     - NFC transceiver                                     │
//! │  • Connectivity  - network link                                        │
//! │  • Indicator     - RGB status pixel                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Layered relay configuration (build-time, TOML, env)
//! - [`delivery`] - HTTP delivery client and outcomes
//! - [`device`] - Peripheral traits
//! - [`engine`] - Periodic queue drain
//! - [`error`] - Relay error types
//! - [`indicator`] - Status indicator controller
//! - [`relay`] - The control loop

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod delivery;
pub mod device;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod relay;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::RelayConfig;
pub use delivery::{Deliver, DeliveryClient, DeliveryOutcome};
pub use device::{Connectivity, Indicator, TagReader};
pub use engine::{DrainReport, EngineState, SyncEngine};
pub use error::{RelayError, RelayResult};
pub use indicator::StatusIndicator;
pub use relay::{RelayLoop, ScanOutcome};
