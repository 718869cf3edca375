//! # Peripheral Traits
//!
//! The three pieces of hardware the control loop talks to. The device build
//! binds these to the NFC transceiver, the wireless radio and the status
//! pixel; the host build binds them to a line reader, a TCP probe and a log.
//!
//! ```text
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │  TagReader    │   │ Connectivity  │   │  Indicator    │
//! │               │   │               │   │               │
//! │ firmware()    │   │ is_connected()│   │ render(rgb)   │
//! │ read_uid(t)   │   │ connect()     │   │               │
//! └───────┬───────┘   └───────┬───────┘   └───────┬───────┘
//!         └───────────────────┼───────────────────┘
//!                             ▼
//!                      RelayLoop (owner)
//! ```

use std::time::Duration;

use tagrelay_core::{Rgb, TagUid};

/// NFC transceiver.
#[allow(async_fn_in_trait)]
pub trait TagReader {
    /// Firmware version reported by the transceiver, `None` if it does not
    /// answer.
    async fn firmware_version(&mut self) -> Option<u32>;

    /// Waits up to `timeout` for a tag in the field.
    async fn read_uid(&mut self, timeout: Duration) -> Option<TagUid>;
}

/// Network link.
#[allow(async_fn_in_trait)]
pub trait Connectivity {
    /// Current link state. Must not block.
    fn is_connected(&self) -> bool;

    /// One association attempt. Returns the link state afterwards.
    async fn connect(&mut self) -> bool;
}

/// Single RGB status pixel.
pub trait Indicator {
    /// Shows `color`, already brightness-scaled.
    fn render(&mut self, color: Rgb);
}
