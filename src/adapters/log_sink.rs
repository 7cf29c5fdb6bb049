//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::diagnostics::format_status;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Status(report) => {
                info!("STATUS | {}", format_status(report));
            }
            AppEvent::Started {
                power_present,
                output_enabled,
            } => {
                info!(
                    "START | power={} output={}",
                    on_off(*power_present),
                    on_off(*output_enabled)
                );
            }
            AppEvent::PowerChanged { present } => {
                info!("POWER | external source {}", on_off(*present));
            }
            AppEvent::OutputSwitched { enabled } => {
                info!("OUTPUT | {} by switch", on_off(*enabled));
            }
            AppEvent::ChargingChanged { charging } => {
                info!("CHARGE | {}", on_off(*charging));
            }
            AppEvent::AlarmLevelChanged { level } => {
                info!("ALARM | level={:?}", level);
            }
            AppEvent::FanChanged { running } => {
                info!("FAN | {}", on_off(*running));
            }
            AppEvent::ShutdownEngaged => {
                warn!("SHUTDOWN | deep discharge, output cut");
            }
            AppEvent::ShutdownRecovered => {
                info!("SHUTDOWN | recovered");
            }
        }
    }
}

fn on_off(v: bool) -> &'static str {
    if v {
        "on"
    } else {
        "off"
    }
}
