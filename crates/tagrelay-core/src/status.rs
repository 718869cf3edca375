//! # Indicator States
//!
//! What the single status LED can show, and the color for each state.
//!
//! ## State Palette
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Indicator States                                 │
//! │                                                                         │
//! │  STEADY                               TRANSIENT (held, then revert)     │
//! │  ──────                               ─────────────────────────────     │
//! │  Booting      orange (255,165,0)      Processing  yellow (255,255,0)   │
//! │  Connecting   blue / off (blinking)   Success     green  (0,255,0)     │
//! │  OnlineIdle   blue   (0,0,255)        Error       red    (255,0,0)     │
//! │  OfflineIdle  red    (255,0,0)                                          │
//! │                                                                         │
//! │  Transient states revert to OnlineIdle / OfflineIdle depending on      │
//! │  connectivity at the moment the hold expires.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

// =============================================================================
// RGB
// =============================================================================

/// An RGB triple as accepted by the indicator driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// LED off.
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Scales every channel by `brightness / 255`.
    ///
    /// Matches how single-pixel LED drivers apply a global brightness.
    pub fn scaled(self, brightness: u8) -> Self {
        let scale = |c: u8| ((u16::from(c) * u16::from(brightness)) / 255) as u8;
        Rgb::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

// =============================================================================
// Indicator State
// =============================================================================

/// Everything the indicator can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    /// Device is starting up.
    Booting,

    /// Network association in progress; `lit` alternates each attempt.
    Connecting { lit: bool },

    /// Idle with network available.
    OnlineIdle,

    /// Idle without network; scans will be queued.
    OfflineIdle,

    /// A scan or delivery attempt is in flight.
    Processing,

    /// A record was confirmed delivered.
    Success,

    /// Any failure, including "saved offline".
    Error,
}

impl IndicatorState {
    /// Idle state matching current connectivity.
    #[inline]
    pub const fn idle(connected: bool) -> Self {
        if connected {
            IndicatorState::OnlineIdle
        } else {
            IndicatorState::OfflineIdle
        }
    }

    /// True for the two idle states.
    pub const fn is_idle(&self) -> bool {
        matches!(self, IndicatorState::OnlineIdle | IndicatorState::OfflineIdle)
    }

    /// Full-brightness color for this state.
    pub const fn color(&self) -> Rgb {
        match self {
            IndicatorState::Booting => Rgb::new(255, 165, 0),
            IndicatorState::Connecting { lit: true } => Rgb::new(0, 0, 255),
            IndicatorState::Connecting { lit: false } => Rgb::OFF,
            IndicatorState::OnlineIdle => Rgb::new(0, 0, 255),
            IndicatorState::OfflineIdle => Rgb::new(255, 0, 0),
            IndicatorState::Processing => Rgb::new(255, 255, 0),
            IndicatorState::Success => Rgb::new(0, 255, 0),
            IndicatorState::Error => Rgb::new(255, 0, 0),
        }
    }
}

impl fmt::Display for IndicatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorState::Booting => write!(f, "booting"),
            IndicatorState::Connecting { .. } => write!(f, "connecting"),
            IndicatorState::OnlineIdle => write!(f, "online"),
            IndicatorState::OfflineIdle => write!(f, "offline"),
            IndicatorState::Processing => write!(f, "processing"),
            IndicatorState::Success => write!(f, "success"),
            IndicatorState::Error => write!(f, "error"),
        }
    }
}
