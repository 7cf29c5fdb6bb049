//! System configuration parameters.
//!
//! All calibration constants and delays for the UPS controller. There is no
//! runtime reconfiguration — the struct exists so the values live in one
//! place and so tests can run with compressed timing.

use serde::{Deserialize, Serialize};

/// Core controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsConfig {
    // --- ADC calibration ---
    /// External ADC reference voltage (volts).
    pub vref: f32,
    /// Battery 1 voltage divider ratio.
    pub vdiv_bat1: f32,
    /// Battery 2 voltage divider ratio.
    pub vdiv_bat2: f32,

    // --- Battery thresholds (volts) ---
    /// Low-battery warning threshold.
    pub bat_low_v: f32,
    /// Very-low-battery alarm threshold.
    pub bat_very_low_v: f32,
    /// Emergency shutdown threshold.
    pub bat_shutoff_v: f32,
    /// Hysteresis margin: a band is left only above threshold + margin.
    pub hysteresis_margin_v: f32,

    // --- Switching delays (milliseconds) ---
    /// Debounce on external-power restoration before energizing.
    pub on_delay_ms: u32,
    /// Inter-step delay inside the relay switching sequences.
    pub switch_delay_ms: u32,
    /// Debounce on the mechanical switch and charger status lines.
    pub input_debounce_ms: u32,

    // --- Fan ---
    /// Fan run duration when external power is confirmed on.
    pub fan_external_power_run_ms: u32,
    /// Short run re-issued while the fan override is asserted.
    pub fan_override_kick_ms: u32,

    // --- Signaling ---
    /// Indicator render period (one phase step).
    pub led_period_ms: u32,
    /// Periodic status report interval.
    pub status_period_ms: u32,

    // --- Shutdown guard ---
    /// Under-voltage condition sampling interval.
    pub shutdown_sample_interval_ms: u32,
    /// Consecutive strikes required to trip the guard.
    pub shutdown_strike_limit: u8,
    /// Panic loop alarm cadence: buzzer/LEDs on.
    pub panic_on_ms: u32,
    /// Panic loop alarm cadence: buzzer/LEDs off.
    pub panic_off_ms: u32,
}

impl Default for UpsConfig {
    fn default() -> Self {
        Self {
            // ADC
            vref: 3.0,
            vdiv_bat1: (25.5 + 4.9) / 4.9,
            vdiv_bat2: (25.5 + 12.4) / 12.4,

            // Thresholds
            bat_low_v: 7.0,
            bat_very_low_v: 6.8,
            bat_shutoff_v: 6.4,
            hysteresis_margin_v: 0.1,

            // Switching
            on_delay_ms: 2000,
            switch_delay_ms: 5,
            input_debounce_ms: 30,

            // Fan: 3 hours after external power returns
            fan_external_power_run_ms: 180 * 60_000,
            fan_override_kick_ms: 1000,

            // Signaling
            led_period_ms: 500,
            status_period_ms: 1000,

            // Shutdown guard: 20 strikes at 100 ms ≈ 2 s sustained
            shutdown_sample_interval_ms: 100,
            shutdown_strike_limit: 20,
            panic_on_ms: 300,
            panic_off_ms: 200,
        }
    }
}
