//! GPIO / peripheral pin assignments for the UPSguard control board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers. Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Power path inputs
// ---------------------------------------------------------------------------

/// Opto-isolated external-power presence sense (HIGH = source present).
/// Interrupt-driven, any-edge.
pub const POWER_SENSE_GPIO: i32 = 2;

/// Mechanical output switch. Active-low with pull-up: LOW = output enabled.
pub const SWITCH_GPIO: i32 = 3;

/// Charger status line, battery 1. Active-low with pull-up: LOW = charging.
pub const BAT1_STAT_GPIO: i32 = 4;
/// Charger status line, battery 2. Active-low with pull-up: LOW = charging.
pub const BAT2_STAT_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Power path outputs (relay / FET drivers)
// ---------------------------------------------------------------------------

/// Source-select relay stage 1 (first on during energize, last off).
pub const SOURCE_SEL1_GPIO: i32 = 6;
/// Source-select relay stage 2.
pub const SOURCE_SEL2_GPIO: i32 = 7;
/// Charge-select FET — routes charging current from the external source.
/// Also reconfigures the battery divider network: while inactive the two
/// cells are measured in series on the battery-1 channel.
pub const CHARGE_SEL_GPIO: i32 = 8;
/// Regulated output enable.
pub const OUTPUT_EN_GPIO: i32 = 9;

/// Cooling fan control (active HIGH).
pub const FAN_GPIO: i32 = 10;

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// Power indicator, red anode.
pub const PWR_LED_RED_GPIO: i32 = 11;
/// Power indicator, green anode.
pub const PWR_LED_GREEN_GPIO: i32 = 12;
/// Status indicator, red anode.
pub const STAT_LED_RED_GPIO: i32 = 13;
/// Status indicator, green anode.
pub const STAT_LED_GREEN_GPIO: i32 = 14;

/// Piezo buzzer — LEDC square wave, gated on/off.
pub const BUZZER_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Sensors — Analog (ADC1)
// ---------------------------------------------------------------------------

/// Battery 1 voltage divider — ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const BAT1_ADC_CHANNEL: u32 = 0;
/// Battery 2 voltage divider — ADC1 channel 4 (GPIO 16 wired to divider).
pub const BAT2_ADC_CHANNEL: u32 = 4;

// ---------------------------------------------------------------------------
// Buzzer PWM configuration
// ---------------------------------------------------------------------------

/// LEDC frequency for the piezo (resonant ~4 kHz).
pub const BUZZER_PWM_FREQ_HZ: u32 = 4_000;
/// LEDC timer resolution (bits). 8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
