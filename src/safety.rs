//! Deep-discharge shutdown guard.
//!
//! When the output runs from the batteries and either pack sags below the
//! shutoff threshold, the guard counts strikes on a fixed 100 ms cadence.
//! Twenty consecutive strikes (≈2 s sustained) cut the output and drop the
//! firmware into a blocking alarm loop that holds until the user releases
//! the switch or external power returns. A single recovered sample resets
//! the count to zero — the discharge must be continuous to trip.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{Clock, EventSink, InputPort, OutputPort, WatchdogPort};
use crate::config::UpsConfig;

/// Under-voltage strike counter.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownGuard {
    strikes: u8,
    last_sample_ms: u32,
    sample_interval_ms: u32,
    strike_limit: u8,
    shutoff_v: f32,
}

impl ShutdownGuard {
    pub fn new(config: &UpsConfig, now_ms: u32) -> Self {
        Self {
            strikes: 0,
            last_sample_ms: now_ms,
            sample_interval_ms: config.shutdown_sample_interval_ms,
            strike_limit: config.shutdown_strike_limit,
            shutoff_v: config.bat_shutoff_v,
        }
    }

    /// Rate-limited strike evaluation. Returns `true` when the guard trips;
    /// the caller must then cut the output and enter [`panic_loop`].
    ///
    /// The condition is armed only while the output is enabled *and* running
    /// from the batteries — on external power the charger owns the packs and
    /// a sagging cell is not an emergency.
    pub fn maybe_sample(
        &mut self,
        now_ms: u32,
        output_enabled: bool,
        power_present: bool,
        bat1_volts: f32,
        bat2_volts: f32,
    ) -> bool {
        if now_ms.wrapping_sub(self.last_sample_ms) < self.sample_interval_ms {
            return false;
        }
        self.last_sample_ms = now_ms;

        let under = bat1_volts < self.shutoff_v || bat2_volts < self.shutoff_v;
        if output_enabled && !power_present && under {
            self.strikes = self.strikes.saturating_add(1);
            if self.strikes >= self.strike_limit {
                self.strikes = 0;
                return true;
            }
        } else {
            self.strikes = 0;
        }
        false
    }

    /// Zero the counter (called after the panic loop returns, so stale
    /// strikes from before the shutdown cannot re-trip instantly).
    pub fn reset(&mut self, now_ms: u32) {
        self.strikes = 0;
        self.last_sample_ms = now_ms;
    }

    #[cfg(test)]
    fn strikes(&self) -> u8 {
        self.strikes
    }
}

/// Blocking deep-discharge alarm.
///
/// Cuts the output and fan, then flashes every indicator red with the
/// buzzer on a 300/200 ms cadence until the switch is released or external
/// power returns. The watchdog is fed each cycle — this loop is a
/// deliberate hold, not a hang.
pub fn panic_loop(
    config: &UpsConfig,
    inputs: &mut impl InputPort,
    outputs: &mut impl OutputPort,
    clock: &impl Clock,
    watchdog: &impl WatchdogPort,
    sink: &mut impl EventSink,
) {
    warn!(
        "shutdown guard tripped: battery below {:.1} V sustained, cutting output",
        config.bat_shutoff_v
    );
    sink.emit(&AppEvent::ShutdownEngaged);
    outputs.set_output_enabled(false);
    outputs.set_fan(false);

    while inputs.switch_engaged_raw() && !inputs.power_present_raw() {
        watchdog.feed();
        outputs.set_power_led(true, false);
        outputs.set_status_led(true, false);
        outputs.set_buzzer(true);
        clock.delay_ms(config.panic_on_ms);
        outputs.set_power_led(false, false);
        outputs.set_status_led(false, false);
        outputs.set_buzzer(false);
        clock.delay_ms(config.panic_off_ms);
    }

    watchdog.feed();
    outputs.set_buzzer(false);
    info!("shutdown guard released (switch off or external power back)");
    sink.emit(&AppEvent::ShutdownRecovered);
}
