//! Outbound application events.
//!
//! The [`UpsService`](super::service::UpsService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them — in production they become serial console
//! lines.

use crate::sensors::battery::{BatteryReading, VoltageAlarmLevel};

/// Structured events emitted by the controller core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Controller finished startup (carries the initial line samples).
    Started {
        power_present: bool,
        output_enabled: bool,
    },

    /// External power was confirmed on or lost.
    PowerChanged { present: bool },

    /// The mechanical switch changed the output state.
    OutputSwitched { enabled: bool },

    /// Battery charging started or stopped.
    ChargingChanged { charging: bool },

    /// The battery alarm level crossed a hysteresis band.
    AlarmLevelChanged { level: VoltageAlarmLevel },

    /// The cooling fan started or stopped.
    FanChanged { running: bool },

    /// The critical shutdown guard tripped — output disabled, panic loop.
    ShutdownEngaged,

    /// The panic loop exited (switch released or power returned).
    ShutdownRecovered,

    /// Periodic status snapshot.
    Status(StatusReport),
}

/// A point-in-time status snapshot suitable for the diagnostic console.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub uptime_ms: u32,
    pub output_enabled: bool,
    pub power_present: bool,
    pub charging: bool,
    pub fan_running: bool,
    pub fan_override: bool,
    /// Milliseconds until the fan auto-stops; `None` when overridden or off.
    pub fan_remaining_ms: Option<u32>,
    pub bat1: BatteryReading,
    pub bat2: BatteryReading,
    pub alarm_level: VoltageAlarmLevel,
}
