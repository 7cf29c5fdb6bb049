//! Battery voltage monitor.
//!
//! Samples the two battery channels, converts raw ADC counts to calibrated
//! voltages, and tracks two independent hysteresis bands (low / very-low)
//! so the alarm level cannot chatter near a threshold.
//!
//! ## Divider topology
//!
//! Battery 2 sits on top of battery 1 in the stack. While the charge-select
//! FET is inactive the battery-1 channel measures both cells in series, so
//! the battery-2 voltage is subtracted to recover the battery-1 cell
//! voltage. With charge-select active each channel reads its own cell.

use crate::app::ports::{Battery, InputPort};
use crate::config::UpsConfig;

/// One battery channel sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatteryReading {
    /// Raw ADC counts, 0..=1023.
    pub raw: u16,
    /// Calibrated cell voltage.
    pub volts: f32,
}

/// Alarm level derived from the two hysteresis bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoltageAlarmLevel {
    #[default]
    Normal,
    Low,
    VeryLow,
}

/// Convert raw ADC counts to volts for a given divider.
pub fn convert(raw: u16, vref: f32, divider: f32) -> f32 {
    (f32::from(raw) / 1024.0) * vref * divider
}

// ───────────────────────────────────────────────────────────────
// Hysteresis band
// ───────────────────────────────────────────────────────────────

/// One hysteresis band over a pair of voltages.
///
/// Entered when *either* voltage drops below `threshold`; left only when
/// *both* exceed `threshold + margin`. In between, the previous state
/// holds — a pure function of the current voltages and prior state, no
/// timers involved.
#[derive(Debug, Clone, Copy)]
pub struct HysteresisBand {
    threshold: f32,
    margin: f32,
    active: bool,
}

impl HysteresisBand {
    pub fn new(threshold: f32, margin: f32) -> Self {
        Self {
            threshold,
            margin,
            active: false,
        }
    }

    /// Feed one voltage pair; returns the updated band state.
    pub fn update(&mut self, v1: f32, v2: f32) -> bool {
        if v1 < self.threshold || v2 < self.threshold {
            self.active = true;
        } else if v1 > self.threshold + self.margin && v2 > self.threshold + self.margin {
            self.active = false;
        }
        self.active
    }
}

// ───────────────────────────────────────────────────────────────
// Voltage monitor
// ───────────────────────────────────────────────────────────────

/// Owns the conversion calibration and both alarm bands.
pub struct VoltageMonitor {
    vref: f32,
    vdiv_bat1: f32,
    vdiv_bat2: f32,
    low: HysteresisBand,
    very_low: HysteresisBand,
}

impl VoltageMonitor {
    pub fn new(config: &UpsConfig) -> Self {
        Self {
            vref: config.vref,
            vdiv_bat1: config.vdiv_bat1,
            vdiv_bat2: config.vdiv_bat2,
            low: HysteresisBand::new(config.bat_low_v, config.hysteresis_margin_v),
            very_low: HysteresisBand::new(config.bat_very_low_v, config.hysteresis_margin_v),
        }
    }

    /// Trigger one blocking conversion per channel and return calibrated
    /// readings. `charge_select_active` selects the divider topology.
    pub fn sample(
        &self,
        inputs: &mut impl InputPort,
        charge_select_active: bool,
    ) -> (BatteryReading, BatteryReading) {
        let raw1 = inputs.sample_battery(Battery::One);
        let raw2 = inputs.sample_battery(Battery::Two);

        let v2 = convert(raw2, self.vref, self.vdiv_bat2);
        let mut v1 = convert(raw1, self.vref, self.vdiv_bat1);
        if !charge_select_active {
            // Series measurement: channel 1 sees both cells.
            v1 -= v2;
        }

        (
            BatteryReading { raw: raw1, volts: v1 },
            BatteryReading { raw: raw2, volts: v2 },
        )
    }

    /// Update both bands with a fresh voltage pair and return the combined
    /// alarm level.
    pub fn evaluate(&mut self, v1: f32, v2: f32) -> VoltageAlarmLevel {
        let low = self.low.update(v1, v2);
        let very_low = self.very_low.update(v1, v2);
        if very_low {
            VoltageAlarmLevel::VeryLow
        } else if low {
            VoltageAlarmLevel::Low
        } else {
            VoltageAlarmLevel::Normal
        }
    }
}


#[cfg(test)]
#[cfg(not(target_os = "espidf"))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn conversion_monotonic_in_raw(a in 0u16..1024, b in 0u16..1024) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let c = UpsConfig::default();
            prop_assert!(convert(lo, c.vref, c.vdiv_bat1) <= convert(hi, c.vref, c.vdiv_bat1));
        }

        #[test]
        fn band_never_leaves_inside_margin(
            samples in proptest::collection::vec((5.5f32..8.5, 5.5f32..8.5), 1..50)
        ) {
            let mut band = HysteresisBand::new(7.0, 0.1);
            let mut was_active = false;
            for (v1, v2) in samples {
                let active = band.update(v1, v2);
                if was_active && !(v1 > 7.0 + 0.1 && v2 > 7.0 + 0.1) {
                    prop_assert!(active, "left Low band at {v1}/{v2} without clearing the margin");
                }
                was_active = active;
            }
        }
    }
}
