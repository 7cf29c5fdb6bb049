//! Fan thermal controller.
//!
//! Timed run requests with extend-never-shorten semantics: a request while
//! the fan is already running can only lengthen the in-flight run. The
//! override flag (asserted while the output switch is engaged or the
//! batteries are charging) suppresses the auto-stop entirely — the fan keeps
//! running no matter how much time has elapsed, and the duration check
//! resumes once the override drops.

/// Fan run state. Pure logic; the service mirrors `running` onto the fan
/// line through the output port.
#[derive(Debug, Clone, Copy)]
pub struct FanController {
    running: bool,
    started_at_ms: u32,
    requested_ms: u32,
    override_on: bool,
}

impl Default for FanController {
    fn default() -> Self {
        Self::new()
    }
}

impl FanController {
    pub fn new() -> Self {
        Self {
            running: false,
            started_at_ms: 0,
            requested_ms: 0,
            override_on: false,
        }
    }

    /// Request a timed run. Starts the fan if stopped; otherwise extends the
    /// requested duration to `max(current, duration_ms)` — never shortens.
    pub fn request(&mut self, now_ms: u32, duration_ms: u32) {
        if self.running {
            self.requested_ms = self.requested_ms.max(duration_ms);
        } else {
            self.running = true;
            self.started_at_ms = now_ms;
            self.requested_ms = duration_ms;
            log::debug!("fan: starting, {} ms requested", duration_ms);
        }
    }

    /// Assert or drop the override. While asserted the fan never auto-stops.
    pub fn set_override(&mut self, on: bool) {
        self.override_on = on;
    }

    /// Zero the remaining run time so the next unoverridden tick stops the
    /// fan. Used when external power is lost, to keep the fan from draining
    /// the batteries.
    pub fn expire(&mut self) {
        self.requested_ms = 0;
    }

    /// Per-pass check: stops the fan iff running, not overridden, and the
    /// requested duration has elapsed. Returns `true` when the fan stopped
    /// this call.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        if self.running
            && !self.override_on
            && now_ms.wrapping_sub(self.started_at_ms) >= self.requested_ms
        {
            self.running = false;
            log::debug!("fan: stopping after {} ms", self.requested_ms);
            self.requested_ms = 0;
            return true;
        }
        false
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_overridden(&self) -> bool {
        self.override_on
    }

    /// Milliseconds until auto-stop; `None` when off or overridden.
    pub fn remaining_ms(&self, now_ms: u32) -> Option<u32> {
        if !self.running || self.override_on {
            return None;
        }
        let elapsed = now_ms.wrapping_sub(self.started_at_ms);
        Some(self.requested_ms.saturating_sub(elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_starts_stopped_fan() {
        let mut fan = FanController::new();
        fan.request(1000, 5000);
        assert!(fan.is_running());
        assert_eq!(fan.remaining_ms(1000), Some(5000));
    }

    #[test]
    fn second_request_takes_max() {
        let mut fan = FanController::new();
        fan.request(0, 5000);
        fan.request(100, 2000);
        assert_eq!(fan.remaining_ms(0), Some(5000), "shorter request ignored");
        fan.request(200, 8000);
        assert_eq!(fan.remaining_ms(0), Some(8000));
    }

    #[test]
    fn stops_after_requested_duration() {
        let mut fan = FanController::new();
        fan.request(0, 5000);
        assert!(!fan.tick(4999));
        assert!(fan.is_running());
        assert!(fan.tick(5000));
        assert!(!fan.is_running());
    }

    #[test]
    fn override_suppresses_stop() {
        let mut fan = FanController::new();
        fan.request(0, 1000);
        fan.set_override(true);
        assert!(!fan.tick(60_000));
        assert!(fan.is_running());
        fan.set_override(false);
        assert!(fan.tick(60_001));
    }

    #[test]
    fn expire_stops_on_next_tick() {
        let mut fan = FanController::new();
        fan.request(0, u32::MAX / 2);
        fan.expire();
        assert!(fan.tick(1));
        assert!(!fan.is_running());
    }

    #[test]
    fn elapsed_math_survives_wraparound() {
        let mut fan = FanController::new();
        fan.request(u32::MAX - 100, 1000);
        assert!(!fan.tick(u32::MAX - 50));
        assert!(fan.tick(899), "101 + 899 = 1000 ms across the wrap");
    }
}
