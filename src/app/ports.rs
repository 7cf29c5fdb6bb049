//! Port traits — the hexagonal boundary between domain logic and hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ UpsService (domain)
//! ```
//!
//! Driven adapters (line I/O, clock, watchdog, event sinks) implement these
//! traits. The [`UpsService`](super::service::UpsService) consumes them via
//! generics, so the domain core never touches hardware directly and the
//! whole control path runs on the host with mock adapters and a fake clock.

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Battery channel selector for analog sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Battery {
    One,
    Two,
}

/// Read-side port: raw line levels and blocking analog conversions.
///
/// Line reads return *logical* states — the adapter absorbs the active-low
/// wiring of the switch and charger-status inputs.
pub trait InputPort {
    /// Mechanical output switch: true = user requests the output enabled.
    fn switch_engaged_raw(&mut self) -> bool;

    /// External-power presence line, sampled directly (not the debounced
    /// arbiter state). Used at startup and inside the panic loop.
    fn power_present_raw(&mut self) -> bool;

    /// Charger status line for the given battery: true = charging sensible.
    fn battery_charging_raw(&mut self, battery: Battery) -> bool;

    /// One blocking ADC conversion, scaled to the calibrated 0..=1023 range.
    fn sample_battery(&mut self, battery: Battery) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: relay/FET lines, fan, indicators, buzzer.
pub trait OutputPort {
    /// Take the switching lock. On target this masks the power-sense ISR so
    /// a relay sequence cannot observe a mid-flight flag change; in
    /// simulation it is a marker recorded by mocks. Must be balanced by
    /// [`end_switching`](Self::end_switching).
    fn begin_switching(&mut self);

    /// Release the switching lock.
    fn end_switching(&mut self);

    /// Source-select relay stage 1.
    fn set_source_select1(&mut self, on: bool);

    /// Source-select relay stage 2.
    fn set_source_select2(&mut self, on: bool);

    /// Charge-select FET. Also flips the battery divider topology — see
    /// [`VoltageMonitor`](crate::sensors::battery::VoltageMonitor).
    fn set_charge_select(&mut self, on: bool);

    /// Regulated output enable.
    fn set_output_enabled(&mut self, on: bool);

    /// Cooling fan.
    fn set_fan(&mut self, on: bool);

    /// Power indicator LED pair (red, green anodes).
    fn set_power_led(&mut self, red: bool, green: bool);

    /// Status indicator LED pair (red, green anodes).
    fn set_status_led(&mut self, red: bool, green: bool);

    /// Piezo buzzer gate.
    fn set_buzzer(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond time source plus the blocking delay primitive the
/// relay sequences are built on.
///
/// `now_ms` wraps at `u32::MAX`; every elapsed-time comparison in the crate
/// is computed with `now.wrapping_sub(recorded)` so wraparound is harmless.
/// Tests inject a fake clock whose `delay_ms` advances virtual time, so the
/// sequencing logic is exercised without real time passing.
pub trait Clock {
    fn now_ms(&self) -> u32;

    /// Busy/blocking delay. Intentionally uninterruptible — the switching
    /// sequences rely on it (only the hardware watchdog can cut it short).
    fn delay_ms(&self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Watchdog port
// ───────────────────────────────────────────────────────────────

/// Hardware watchdog feed. Armed by the driver at boot; the control loop
/// (and the panic loop) must call [`feed`](Self::feed) every iteration.
pub trait WatchdogPort {
    fn feed(&self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / console)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Best-effort: a sink that drops everything must not
/// change control behavior.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
