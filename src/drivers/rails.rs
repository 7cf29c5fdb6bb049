//! Power rail line driver.
//!
//! Thin wrapper over the relay, FET, output-enable and fan GPIOs. No
//! sequencing logic lives here — the arbiter owns ordering and delays;
//! this driver just moves lines and logs.

use log::debug;

use crate::drivers::hw_init;
use crate::pins;

pub struct RailDriver;

impl RailDriver {
    pub fn new() -> Self {
        Self
    }

    pub fn set_source_select1(&mut self, on: bool) {
        debug!("rails: source select 1 {}", if on { "on" } else { "off" });
        hw_init::gpio_write(pins::SOURCE_SEL1_GPIO, on);
    }

    pub fn set_source_select2(&mut self, on: bool) {
        debug!("rails: source select 2 {}", if on { "on" } else { "off" });
        hw_init::gpio_write(pins::SOURCE_SEL2_GPIO, on);
    }

    pub fn set_charge_select(&mut self, on: bool) {
        debug!("rails: charge select {}", if on { "on" } else { "off" });
        hw_init::gpio_write(pins::CHARGE_SEL_GPIO, on);
    }

    pub fn set_output_enabled(&mut self, on: bool) {
        debug!("rails: output {}", if on { "enabled" } else { "disabled" });
        hw_init::gpio_write(pins::OUTPUT_EN_GPIO, on);
    }

    pub fn set_fan(&mut self, on: bool) {
        debug!("rails: fan {}", if on { "on" } else { "off" });
        hw_init::gpio_write(pins::FAN_GPIO, on);
    }
}

impl Default for RailDriver {
    fn default() -> Self {
        Self::new()
    }
}
