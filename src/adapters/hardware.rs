//! Hardware adapters — bridge real peripherals to the domain port traits.
//!
//! Split into a read side and a write side so the service can hold both
//! mutably at once. These are the only types in the system that touch
//! actual line I/O; on non-espidf targets the underlying drivers use
//! cfg-gated simulation stubs.
//!
//! Polarity is absorbed here: the switch and charger-status inputs are
//! active-low (pull-up wiring), the power sense is active-high. Domain
//! code only sees logical states.

use crate::app::ports::{Battery, InputPort, OutputPort};
use crate::drivers::hw_init;
use crate::drivers::indicators::IndicatorDriver;
use crate::drivers::rails::RailDriver;
use crate::pins;

// ── InputPort implementation ──────────────────────────────────

/// Read-side adapter: raw GPIO levels and blocking ADC conversions.
pub struct HardwareInputs;

impl HardwareInputs {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HardwareInputs {
    fn default() -> Self {
        Self::new()
    }
}

impl InputPort for HardwareInputs {
    fn switch_engaged_raw(&mut self) -> bool {
        // Active-low: engaged pulls the line to ground.
        !hw_init::gpio_read(pins::SWITCH_GPIO)
    }

    fn power_present_raw(&mut self) -> bool {
        hw_init::gpio_read(pins::POWER_SENSE_GPIO)
    }

    fn battery_charging_raw(&mut self, battery: Battery) -> bool {
        // Charger STAT outputs are open-drain, low while charging.
        let pin = match battery {
            Battery::One => pins::BAT1_STAT_GPIO,
            Battery::Two => pins::BAT2_STAT_GPIO,
        };
        !hw_init::gpio_read(pin)
    }

    fn sample_battery(&mut self, battery: Battery) -> u16 {
        let channel = match battery {
            Battery::One => pins::BAT1_ADC_CHANNEL,
            Battery::Two => pins::BAT2_ADC_CHANNEL,
        };
        // 12-bit hardware reading scaled to the calibrated 0..=1023 range
        // the divider math is specified against.
        hw_init::adc1_read(channel) >> 2
    }
}

// ── OutputPort implementation ─────────────────────────────────

/// Write-side adapter: owns the rail and indicator drivers.
pub struct HardwareOutputs {
    rails: RailDriver,
    indicators: IndicatorDriver,
}

impl HardwareOutputs {
    pub fn new(rails: RailDriver, indicators: IndicatorDriver) -> Self {
        Self { rails, indicators }
    }
}

impl OutputPort for HardwareOutputs {
    fn begin_switching(&mut self) {
        // Mask the power-sense ISR so a relay sequence cannot race an edge.
        hw_init::mask_power_isr();
    }

    fn end_switching(&mut self) {
        hw_init::unmask_power_isr();
    }

    fn set_source_select1(&mut self, on: bool) {
        self.rails.set_source_select1(on);
    }

    fn set_source_select2(&mut self, on: bool) {
        self.rails.set_source_select2(on);
    }

    fn set_charge_select(&mut self, on: bool) {
        self.rails.set_charge_select(on);
    }

    fn set_output_enabled(&mut self, on: bool) {
        self.rails.set_output_enabled(on);
    }

    fn set_fan(&mut self, on: bool) {
        self.rails.set_fan(on);
    }

    fn set_power_led(&mut self, red: bool, green: bool) {
        self.indicators.set_power_led(red, green);
    }

    fn set_status_led(&mut self, red: bool, green: bool) {
        self.indicators.set_status_led(red, green);
    }

    fn set_buzzer(&mut self, on: bool) {
        self.indicators.set_buzzer(on);
    }
}
