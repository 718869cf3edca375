//! # Status Indicator Controller
//!
//! Decides what the status pixel shows right now. Holds no history beyond
//! the current state and, for flashed states, when the flash ends.
//!
//! ```text
//!   show(Success|Error) ──► held for flash_ms ──► refresh() reverts to
//!                                                 idle(connected)
//!   show(Processing)    ──► held until the next show()
//!   idle states         ──► refresh() follows connectivity changes
//!   blink(state, n)     ──► state/off n times, blink_ms each, then dark
//! ```

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use tagrelay_core::{IndicatorState, Rgb};

use crate::config::IndicatorSettings;
use crate::device::Indicator;

/// Drives an [`Indicator`] from [`IndicatorState`]s.
#[derive(Debug)]
pub struct StatusIndicator<I> {
    driver: I,
    brightness: u8,
    hold: Duration,
    blink: Duration,
    state: IndicatorState,
    until: Option<Instant>,
    rendered: Option<Rgb>,
}

impl<I: Indicator> StatusIndicator<I> {
    /// Wraps `driver`. Nothing is rendered until the first `show`.
    pub fn new(driver: I, settings: &IndicatorSettings) -> Self {
        StatusIndicator {
            driver,
            brightness: settings.brightness,
            hold: settings.flash(),
            blink: settings.blink(),
            state: IndicatorState::Booting,
            until: None,
            rendered: None,
        }
    }

    /// Switches to `state` immediately.
    pub fn show(&mut self, state: IndicatorState) {
        self.until = match state {
            IndicatorState::Success | IndicatorState::Error => Some(Instant::now() + self.hold),
            _ => None,
        };
        self.state = state;
        self.render();
    }

    /// Ends an expired flash and keeps the idle color in step with
    /// connectivity. Called once per loop iteration.
    pub fn refresh(&mut self, connected: bool) {
        let idle = IndicatorState::idle(connected);

        match self.until {
            Some(until) if Instant::now() >= until => {
                self.until = None;
                self.state = idle;
            }
            Some(_) => return,
            None if self.state.is_idle() => self.state = idle,
            None => return,
        }
        self.render();
    }

    /// State currently shown.
    pub fn state(&self) -> IndicatorState {
        self.state
    }

    /// Alternates `state` and dark `times` times, sleeping `blink_ms` after
    /// each. The pixel is left dark; the caller shows what comes next.
    pub async fn blink(&mut self, state: IndicatorState, times: u32) {
        self.until = None;
        self.state = state;
        for _ in 0..times {
            self.render();
            tokio::time::sleep(self.blink).await;
            self.paint(Rgb::OFF);
            tokio::time::sleep(self.blink).await;
        }
    }

    fn render(&mut self) {
        self.paint(self.state.color().scaled(self.brightness));
    }

    fn paint(&mut self, color: Rgb) {
        if self.rendered == Some(color) {
            return;
        }
        trace!(state = %self.state, color = %color, "Indicator update");
        self.driver.render(color);
        self.rendered = Some(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingIndicator;

    fn full_brightness() -> IndicatorSettings {
        IndicatorSettings {
            brightness: 255,
            flash_ms: 500,
            blink_ms: 200,
        }
    }

    fn controller() -> (StatusIndicator<RecordingIndicator>, RecordingIndicator) {
        let driver = RecordingIndicator::default();
        (StatusIndicator::new(driver.clone(), &full_brightness()), driver)
    }

    #[test]
    fn test_brightness_applied() {
        let driver = RecordingIndicator::default();
        let mut status = StatusIndicator::new(driver.clone(), &IndicatorSettings::default());
        status.show(IndicatorState::OfflineIdle);
        assert_eq!(driver.frames(), vec![Rgb::new(20, 0, 0)]);
    }

    #[test]
    fn test_renders_only_on_change() {
        let (mut status, driver) = controller();
        status.show(IndicatorState::OnlineIdle);
        status.show(IndicatorState::OnlineIdle);
        status.refresh(true);
        assert_eq!(driver.frames().len(), 1);

        // Same red for offline idle and error: no extra frame.
        status.show(IndicatorState::OfflineIdle);
        status.show(IndicatorState::Error);
        assert_eq!(driver.frames(), vec![Rgb::new(0, 0, 255), Rgb::new(255, 0, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_reverts_after_hold() {
        let (mut status, driver) = controller();
        status.show(IndicatorState::Success);
        assert!(status.until.is_some());

        tokio::time::advance(Duration::from_millis(499)).await;
        status.refresh(true);
        assert_eq!(status.state(), IndicatorState::Success);

        tokio::time::advance(Duration::from_millis(1)).await;
        status.refresh(true);
        assert_eq!(status.state(), IndicatorState::OnlineIdle);
        assert!(status.until.is_none());
        assert_eq!(driver.last(), Some(Rgb::new(0, 0, 255)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_uses_connectivity_at_expiry() {
        let (mut status, _) = controller();
        status.show(IndicatorState::Error);
        tokio::time::advance(Duration::from_millis(600)).await;
        status.refresh(false);
        assert_eq!(status.state(), IndicatorState::OfflineIdle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_held_until_replaced() {
        let (mut status, _) = controller();
        status.show(IndicatorState::Processing);
        tokio::time::advance(Duration::from_secs(10)).await;
        status.refresh(true);
        assert_eq!(status.state(), IndicatorState::Processing);
    }

    #[test]
    fn test_idle_follows_connectivity() {
        let (mut status, driver) = controller();
        status.show(IndicatorState::OnlineIdle);
        status.refresh(false);
        assert_eq!(status.state(), IndicatorState::OfflineIdle);
        status.refresh(true);
        assert_eq!(status.state(), IndicatorState::OnlineIdle);
        assert_eq!(driver.frames().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blink_alternates_with_off() {
        let (mut status, driver) = controller();
        status.show(IndicatorState::Connecting { lit: false });

        let start = Instant::now();
        status.blink(IndicatorState::Error, 3).await;
        assert_eq!(start.elapsed(), Duration::from_millis(1_200));

        let red = Rgb::new(255, 0, 0);
        assert_eq!(
            driver.frames(),
            vec![Rgb::OFF, red, Rgb::OFF, red, Rgb::OFF, red, Rgb::OFF]
        );
        assert!(status.until.is_none());

        status.show(IndicatorState::OfflineIdle);
        assert_eq!(driver.last(), Some(red));
    }

    #[test]
    fn test_booting_not_replaced_by_refresh() {
        let (mut status, _) = controller();
        status.show(IndicatorState::Booting);
        status.refresh(true);
        assert_eq!(status.state(), IndicatorState::Booting);
    }
}
