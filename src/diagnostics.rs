//! Diagnostic console formatting and panic reporting.

use core::fmt::Write as _;

use heapless::String;

use crate::app::events::StatusReport;

/// Render a status report as one fixed-capacity console line.
///
/// Kept heap-free so the event sink can emit it from the control loop
/// without allocating.
pub fn format_status(report: &StatusReport) -> String<192> {
    let mut line = String::new();

    let secs = report.uptime_ms / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    // Write into a fixed buffer cannot fail unless truncated; a truncated
    // status line is acceptable.
    let _ = write!(
        line,
        "up {h}:{m:02}:{s:02} | out {} | pwr {} | chg {} | bat1 {:.2}V ({}) | bat2 {:.2}V ({}) | {:?}",
        on_off(report.output_enabled),
        on_off(report.power_present),
        on_off(report.charging),
        report.bat1.volts,
        report.bat1.raw,
        report.bat2.volts,
        report.bat2.raw,
        report.alarm_level,
    );

    match (report.fan_running, report.fan_override, report.fan_remaining_ms) {
        (true, true, _) => {
            let _ = write!(line, " | fan on (override)");
        }
        (true, false, Some(ms)) => {
            let _ = write!(line, " | fan on ({}s left)", ms / 1000);
        }
        (true, false, None) => {
            let _ = write!(line, " | fan on");
        }
        (false, ..) => {
            let _ = write!(line, " | fan off");
        }
    }

    line
}

fn on_off(v: bool) -> &'static str {
    if v {
        "on"
    } else {
        "off"
    }
}

/// Route panics through the logger so they reach the serial console with
/// the same formatting as everything else before the watchdog resets us.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        log::error!("firmware panic: {info}");
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::battery::{BatteryReading, VoltageAlarmLevel};

    fn report() -> StatusReport {
        StatusReport {
            uptime_ms: 3_723_000, // 1 h 2 min 3 s
            output_enabled: true,
            power_present: false,
            charging: false,
            fan_running: false,
            fan_override: false,
            fan_remaining_ms: None,
            bat1: BatteryReading { raw: 800, volts: 7.41 },
            bat2: BatteryReading { raw: 810, volts: 7.26 },
            alarm_level: VoltageAlarmLevel::Normal,
        }
    }

    #[test]
    fn uptime_renders_h_mm_ss() {
        let line = format_status(&report());
        assert!(line.starts_with("up 1:02:03 |"), "{line}");
    }

    #[test]
    fn line_carries_voltages_and_levels() {
        let line = format_status(&report());
        assert!(line.contains("bat1 7.41V (800)"), "{line}");
        assert!(line.contains("bat2 7.26V (810)"), "{line}");
        assert!(line.contains("Normal"), "{line}");
        assert!(line.contains("out on"), "{line}");
        assert!(line.ends_with("fan off"), "{line}");
    }

    #[test]
    fn fan_remaining_shown_in_seconds() {
        let mut r = report();
        r.fan_running = true;
        r.fan_remaining_ms = Some(90_000);
        let line = format_status(&r);
        assert!(line.ends_with("fan on (90s left)"), "{line}");

        r.fan_override = true;
        let line = format_status(&r);
        assert!(line.ends_with("fan on (override)"), "{line}");
    }
}
