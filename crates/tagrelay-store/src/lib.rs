//! # tagrelay-store: Durable Queue Store
//!
//! Records that cannot be delivered immediately are appended here and
//! drained later by the sync engine.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        tagrelay Data Flow                               │
//! │                                                                         │
//! │  Scan (offline or delivery failed)        Sync engine (every 30 s)     │
//! │       │                                        │                        │
//! │       ▼                                        ▼                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tagrelay-store (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   enqueue ──► queue.txt ──(rename)──► sending.txt ──► drain     │   │
//! │  │                  ▲                                     │        │   │
//! │  │                  └────────── re-enqueue on failure ◄───┘        │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     Filesystem                                  │   │
//! │  │   /queue.txt (active)     /sending.txt (in-flight)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`queue`] - The queue store and drain handle
//! - [`fsync`] - File and directory durability helpers
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tagrelay_store::QueueStore;
//!
//! let store = QueueStore::open("/")?;
//! store.enqueue(&record)?;
//!
//! if let Some(mut drain) = store.begin_drain()? {
//!     while let Some(record) = drain.next_line()? {
//!         // deliver or re-enqueue
//!     }
//!     store.finish_drain(drain)?;
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fsync;
pub mod queue;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use queue::{DrainHandle, QueueStore, ACTIVE_LOG, IN_FLIGHT_LOG};
