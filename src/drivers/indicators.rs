//! Indicator driver: two bi-color LEDs plus the piezo buzzer.
//!
//! The LEDs are plain GPIO anodes; the buzzer is an LEDC square wave gated
//! by setting the duty to 50% or zero (gating the timer keeps the tone
//! frequency independent of the gate).

use crate::drivers::hw_init;
use crate::pins;

/// 50% duty at 8-bit resolution.
const BUZZER_ON_DUTY: u8 = 1 << (pins::PWM_RESOLUTION_BITS - 1);

pub struct IndicatorDriver {
    buzzer_on: bool,
}

impl IndicatorDriver {
    pub fn new() -> Self {
        Self { buzzer_on: false }
    }

    pub fn set_power_led(&mut self, red: bool, green: bool) {
        hw_init::gpio_write(pins::PWR_LED_RED_GPIO, red);
        hw_init::gpio_write(pins::PWR_LED_GREEN_GPIO, green);
    }

    pub fn set_status_led(&mut self, red: bool, green: bool) {
        hw_init::gpio_write(pins::STAT_LED_RED_GPIO, red);
        hw_init::gpio_write(pins::STAT_LED_GREEN_GPIO, green);
    }

    pub fn set_buzzer(&mut self, on: bool) {
        if on == self.buzzer_on {
            return;
        }
        self.buzzer_on = on;
        hw_init::ledc_set(hw_init::LEDC_CH_BUZZER, if on { BUZZER_ON_DUTY } else { 0 });
    }
}

impl Default for IndicatorDriver {
    fn default() -> Self {
        Self::new()
    }
}
