//! # tagrelay-core: Pure Types for tagrelay
//!
//! This crate holds the types shared by every other crate in the workspace,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        tagrelay Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    relay-node (binary)                          │   │
//! │  │    host reader ──► control loop ──► host indicator              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            tagrelay-sync (delivery + sync engine)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tagrelay-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │  record   │  │  status   │  │   error   │                  │   │
//! │  │   │  TagUid   │  │ Indicator │  │ CoreError │                  │   │
//! │  │   │  Record   │  │   State   │  │           │                  │   │
//! │  │   │           │  │   Rgb     │  │           │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO FILESYSTEM • NO NETWORK • PURE FUNCTIONS          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`record`] - Tag identifiers and their canonical hex record form
//! - [`status`] - Indicator states and the color palette
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tagrelay_core::{Record, TagUid};
//!
//! let uid = TagUid::new(vec![0x04, 0xA3, 0x9F]).unwrap();
//! let record = Record::encode(&uid);
//!
//! assert_eq!(record.as_str(), "04A39F");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod record;
pub mod status;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult};
pub use record::{Record, TagUid};
pub use status::{IndicatorState, Rgb};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest tag identifier accepted, in bytes.
///
/// ISO14443A identifiers are 4, 7 or 10 bytes long.
pub const MAX_UID_LEN: usize = 10;
