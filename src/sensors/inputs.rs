//! Debounced digital input sampling.
//!
//! The mechanical switch and the two charger-status lines bounce; a raw
//! level must persist for the configured debounce window before the stable
//! state flips. Polled once per loop pass with wrapping u32 millisecond
//! time.

use crate::app::ports::{Battery, InputPort};
use crate::config::UpsConfig;

/// One debounced line.
///
/// `stable` only changes after the raw level has disagreed with it for
/// `debounce_ms` continuously; any flicker back resets the window.
#[derive(Debug, Clone, Copy)]
pub struct DebouncedLine {
    stable: bool,
    candidate: bool,
    candidate_since_ms: u32,
    debounce_ms: u32,
}

impl DebouncedLine {
    pub fn new(initial: bool, debounce_ms: u32) -> Self {
        Self {
            stable: initial,
            candidate: initial,
            candidate_since_ms: 0,
            debounce_ms,
        }
    }

    /// Feed one raw sample; returns `Some(new_state)` on a stable edge.
    pub fn sample(&mut self, raw: bool, now_ms: u32) -> Option<bool> {
        if raw == self.stable {
            self.candidate = raw;
            return None;
        }
        if raw != self.candidate {
            self.candidate = raw;
            self.candidate_since_ms = now_ms;
            return None;
        }
        if now_ms.wrapping_sub(self.candidate_since_ms) >= self.debounce_ms {
            self.stable = raw;
            return Some(raw);
        }
        None
    }

    pub fn state(&self) -> bool {
        self.stable
    }

    /// Overwrite the stable state (used after the panic loop, where the
    /// switch was polled raw and the debounce history is stale).
    pub fn force(&mut self, state: bool) {
        self.stable = state;
        self.candidate = state;
    }
}

/// Debounced view of every slow digital input.
pub struct InputSampler {
    switch: DebouncedLine,
    bat1_stat: DebouncedLine,
    bat2_stat: DebouncedLine,
}

impl InputSampler {
    /// Seed the debouncers from one raw read of each line (startup runs
    /// before the power ISR is armed, so this is race-free).
    pub fn new(inputs: &mut impl InputPort, config: &UpsConfig) -> Self {
        let d = config.input_debounce_ms;
        Self {
            switch: DebouncedLine::new(inputs.switch_engaged_raw(), d),
            bat1_stat: DebouncedLine::new(inputs.battery_charging_raw(Battery::One), d),
            bat2_stat: DebouncedLine::new(inputs.battery_charging_raw(Battery::Two), d),
        }
    }

    /// Poll all lines once. Returns `Some(engaged)` when the switch crossed
    /// a stable edge this pass.
    pub fn poll(&mut self, inputs: &mut impl InputPort, now_ms: u32) -> Option<bool> {
        let edge = self.switch.sample(inputs.switch_engaged_raw(), now_ms);
        let _ = self
            .bat1_stat
            .sample(inputs.battery_charging_raw(Battery::One), now_ms);
        let _ = self
            .bat2_stat
            .sample(inputs.battery_charging_raw(Battery::Two), now_ms);
        edge
    }

    /// Debounced "output enabled by mechanical switch" state.
    pub fn switch_engaged(&self) -> bool {
        self.switch.state()
    }

    /// True when either charger status line reports charging.
    pub fn any_battery_charging(&self) -> bool {
        self.bat1_stat.state() || self.bat2_stat.state()
    }

    /// Re-seed the switch state after the panic loop returns.
    pub fn resync_switch(&mut self, engaged: bool) {
        self.switch.force(engaged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_level_passes_through() {
        let mut line = DebouncedLine::new(false, 30);
        assert_eq!(line.sample(false, 0), None);
        assert!(!line.state());
    }

    #[test]
    fn short_glitch_is_absorbed() {
        let mut line = DebouncedLine::new(false, 30);
        assert_eq!(line.sample(true, 0), None);
        assert_eq!(line.sample(true, 10), None);
        // Drops back before the window closes — no edge.
        assert_eq!(line.sample(false, 20), None);
        assert_eq!(line.sample(true, 25), None);
        assert_eq!(line.sample(true, 40), None, "window restarted at 25");
        assert!(!line.state());
    }

    #[test]
    fn sustained_level_flips_after_window() {
        let mut line = DebouncedLine::new(false, 30);
        assert_eq!(line.sample(true, 100), None);
        assert_eq!(line.sample(true, 120), None);
        assert_eq!(line.sample(true, 130), Some(true));
        assert!(line.state());
        // Reported once, then quiescent.
        assert_eq!(line.sample(true, 140), None);
    }

    #[test]
    fn debounce_survives_time_wraparound() {
        let mut line = DebouncedLine::new(false, 30);
        let near_wrap = u32::MAX - 10;
        assert_eq!(line.sample(true, near_wrap), None);
        assert_eq!(line.sample(true, 25), Some(true), "36 ms across the wrap");
    }

    #[test]
    fn force_resets_history() {
        let mut line = DebouncedLine::new(false, 30);
        let _ = line.sample(true, 0);
        line.force(true);
        assert!(line.state());
        assert_eq!(line.sample(true, 5), None);
    }
}
