//! Controller core — owns every subsystem and runs the control loop.
//!
//! One [`tick`](UpsService::tick) is one pass of the firmware main loop, in
//! a fixed order: feed the watchdog, poll the debounced inputs, arbitrate
//! the power source, settle the fan, sample the batteries, run the shutdown
//! guard, then render indicators and the periodic status report. The order
//! matters — the guard must see this pass's voltages and power state, and
//! the signal selection must see everything.
//!
//! The service is pure orchestration over the port traits; the same code
//! runs against real hardware on target and against mocks with a fake
//! clock on the host.

use log::info;

use crate::app::events::{AppEvent, StatusReport};
use crate::app::ports::{Clock, EventSink, InputPort, OutputPort, WatchdogPort};
use crate::config::UpsConfig;
use crate::control::fan::FanController;
use crate::power::{PendingPowerCell, PowerArbiter};
use crate::safety::{panic_loop, ShutdownGuard};
use crate::sensors::battery::{BatteryReading, VoltageAlarmLevel, VoltageMonitor};
use crate::sensors::inputs::InputSampler;
use crate::signal::{select, PatternRenderer, SignalInputs};

pub struct UpsService {
    config: UpsConfig,
    cell: &'static PendingPowerCell,

    arbiter: PowerArbiter,
    sampler: InputSampler,
    monitor: VoltageMonitor,
    fan: FanController,
    guard: ShutdownGuard,
    renderer: PatternRenderer,

    output_enabled: bool,
    charging: bool,
    fan_line_on: bool,
    bat1: BatteryReading,
    bat2: BatteryReading,
    alarm_level: VoltageAlarmLevel,

    started_at_ms: u32,
    last_status_ms: u32,
}

impl UpsService {
    /// Bring the controller up from reset: force the rails into a known
    /// state, seed the debouncers, apply the switch position to the output,
    /// and take a first battery sample so the alarm bands start from real
    /// voltages rather than zero.
    pub fn startup(
        config: UpsConfig,
        cell: &'static PendingPowerCell,
        inputs: &mut impl InputPort,
        outputs: &mut impl OutputPort,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) -> Self {
        let now = clock.now_ms();

        let arbiter = PowerArbiter::startup(&config, cell, inputs, outputs, clock);
        let sampler = InputSampler::new(inputs, &config);
        let mut monitor = VoltageMonitor::new(&config);

        let output_enabled = sampler.switch_engaged();
        outputs.set_output_enabled(output_enabled);

        let (bat1, bat2) = monitor.sample(inputs, arbiter.charge_select_active());
        let alarm_level = monitor.evaluate(bat1.volts, bat2.volts);
        let charging = arbiter.power_present() && sampler.any_battery_charging();

        info!(
            "startup: output {}, bat1 {:.2} V, bat2 {:.2} V",
            if output_enabled { "on" } else { "off" },
            bat1.volts,
            bat2.volts
        );
        sink.emit(&AppEvent::Started {
            power_present: arbiter.power_present(),
            output_enabled,
        });

        let mut fan = FanController::new();
        fan.set_override(output_enabled || charging);

        Self {
            guard: ShutdownGuard::new(&config, now),
            renderer: PatternRenderer::new(config.led_period_ms, now),
            config,
            cell,
            arbiter,
            sampler,
            monitor,
            fan,
            output_enabled,
            charging,
            fan_line_on: false,
            bat1,
            bat2,
            alarm_level,
            started_at_ms: now,
            last_status_ms: now,
        }
    }

    /// One control-loop pass.
    pub fn tick(
        &mut self,
        inputs: &mut impl InputPort,
        outputs: &mut impl OutputPort,
        clock: &impl Clock,
        watchdog: &impl WatchdogPort,
        sink: &mut impl EventSink,
    ) {
        watchdog.feed();
        let now = clock.now_ms();

        // Mechanical switch → output enable.
        if let Some(engaged) = self.sampler.poll(inputs, now) {
            self.output_enabled = engaged;
            outputs.set_output_enabled(engaged);
            info!("output {} by switch", if engaged { "enabled" } else { "disabled" });
            sink.emit(&AppEvent::OutputSwitched { enabled: engaged });
        }

        // Pending power change → relay sequences.
        self.arbiter
            .poll(self.cell, inputs, outputs, clock, &mut self.fan, sink);
        // The switching sequences block through delay_ms; re-read the clock
        // so the rest of the pass sees the time spent in them.
        let now = clock.now_ms();

        // Charger status lines mean nothing without the external source.
        let charging = self.arbiter.power_present() && self.sampler.any_battery_charging();
        if charging != self.charging {
            self.charging = charging;
            sink.emit(&AppEvent::ChargingChanged { charging });
        }

        // Fan override: while the output is on or a charger is active the
        // fan must not stop, and gets kicked on if it is not yet running.
        let override_on = self.output_enabled || self.charging;
        self.fan.set_override(override_on);
        if override_on && !self.fan.is_running() {
            self.fan.request(now, self.config.fan_override_kick_ms);
        }

        // Battery sampling and alarm bands.
        let (bat1, bat2) = self
            .monitor
            .sample(inputs, self.arbiter.charge_select_active());
        self.bat1 = bat1;
        self.bat2 = bat2;
        let level = self.monitor.evaluate(bat1.volts, bat2.volts);
        if level != self.alarm_level {
            self.alarm_level = level;
            info!("battery alarm level now {level:?}");
            sink.emit(&AppEvent::AlarmLevelChanged { level });
        }

        // Deep-discharge guard.
        if self.guard.maybe_sample(
            now,
            self.output_enabled,
            self.arbiter.power_present(),
            bat1.volts,
            bat2.volts,
        ) {
            self.enter_shutdown(inputs, outputs, clock, watchdog, sink);
            return;
        }

        // Fan timing, then mirror the run state onto the line.
        self.fan.tick(now);
        if self.fan.is_running() != self.fan_line_on {
            self.fan_line_on = self.fan.is_running();
            outputs.set_fan(self.fan_line_on);
            sink.emit(&AppEvent::FanChanged {
                running: self.fan_line_on,
            });
        }

        // Indicators and buzzer.
        let selection = select(&SignalInputs {
            power_present: self.arbiter.power_present(),
            output_enabled: self.output_enabled,
            charging: self.charging,
            fan_running: self.fan.is_running(),
            alarm_level: self.alarm_level,
        });
        if let Some(frame) = self.renderer.update(now, &selection) {
            outputs.set_power_led(frame.power_red, frame.power_green);
            outputs.set_status_led(frame.status_red, frame.status_green);
            outputs.set_buzzer(frame.buzzer);
        }

        // Periodic status report.
        if now.wrapping_sub(self.last_status_ms) >= self.config.status_period_ms {
            self.last_status_ms = now;
            sink.emit(&AppEvent::Status(self.status_report(now)));
        }
    }

    /// Guard tripped: run the blocking panic loop, then re-seed every piece
    /// of state the loop invalidated before returning to normal ticking.
    fn enter_shutdown(
        &mut self,
        inputs: &mut impl InputPort,
        outputs: &mut impl OutputPort,
        clock: &impl Clock,
        watchdog: &impl WatchdogPort,
        sink: &mut impl EventSink,
    ) {
        self.output_enabled = false;
        panic_loop(&self.config, inputs, outputs, clock, watchdog, sink);

        // The loop cut the fan line directly; forget the mirrored state so
        // the next pass re-drives the line from the controller.
        self.fan_line_on = false;

        // The loop polled the switch raw; resync the debouncer to whatever
        // the line reads now and apply it.
        let engaged = inputs.switch_engaged_raw();
        self.sampler.resync_switch(engaged);
        self.output_enabled = engaged;
        outputs.set_output_enabled(engaged);

        // Fresh voltages — the packs recovered (or power returned) while
        // the loop was holding.
        let (bat1, bat2) = self
            .monitor
            .sample(inputs, self.arbiter.charge_select_active());
        self.bat1 = bat1;
        self.bat2 = bat2;
        self.alarm_level = self.monitor.evaluate(bat1.volts, bat2.volts);
        self.guard.reset(clock.now_ms());
    }

    fn status_report(&self, now: u32) -> StatusReport {
        StatusReport {
            uptime_ms: now.wrapping_sub(self.started_at_ms),
            output_enabled: self.output_enabled,
            power_present: self.arbiter.power_present(),
            charging: self.charging,
            fan_running: self.fan.is_running(),
            fan_override: self.fan.is_overridden(),
            fan_remaining_ms: self.fan.remaining_ms(now),
            bat1: self.bat1,
            bat2: self.bat2,
            alarm_level: self.alarm_level,
        }
    }

    pub fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    pub fn power_present(&self) -> bool {
        self.arbiter.power_present()
    }

    pub fn alarm_level(&self) -> VoltageAlarmLevel {
        self.alarm_level
    }

    pub fn fan_running(&self) -> bool {
        self.fan.is_running()
    }
}
