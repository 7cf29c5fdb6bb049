//! Power source arbitration.
//!
//! Owns the external-power / battery-power decision and the relay/FET
//! switching sequences. The power-presence opto fires an any-edge ISR which
//! only *publishes* the change into a lock-free single-slot cell; all relay
//! writes happen on the main loop, under the switching lock, so a mid-flight
//! edge can never leave the relays in an inconsistent combination.
//!
//! ```text
//!  ISR edge ──▶ PendingPowerCell ──▶ PowerArbiter::poll (main loop)
//!                (latest wins)          │
//!                                       ├─ lost     → de-energize now
//!                                       └─ restored → energize after ONDELAY
//! ```
//!
//! Restoration is debounced: the energize sequence starts only once the
//! pending change has been outstanding for `on_delay_ms` *and* the line
//! still reads present, so brownouts and glitches shorter than the delay
//! never reach `ExternalActive`. Loss is acted on immediately — staying on
//! a dead source is the one thing a UPS must not do.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::{Clock, EventSink, InputPort, OutputPort};
use crate::config::UpsConfig;
use crate::control::fan::FanController;

// ───────────────────────────────────────────────────────────────
// ISR publication cell
// ───────────────────────────────────────────────────────────────

/// Single-slot "latest pending power change" cell.
///
/// Written from ISR context (lock-free atomic stores), consumed by the
/// arbiter on the main loop. Only the most recent transition matters, so
/// the slot overwrites rather than queues.
pub struct PendingPowerCell {
    seq: AtomicU32,
    present: AtomicBool,
    at_ms: AtomicU32,
}

impl PendingPowerCell {
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            present: AtomicBool::new(false),
            at_ms: AtomicU32::new(0),
        }
    }

    /// Publish an edge. Safe to call from ISR context.
    pub fn publish(&self, present: bool, now_ms: u32) {
        self.present.store(present, Ordering::Relaxed);
        self.at_ms.store(now_ms, Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release);
    }

    fn snapshot(&self) -> (u32, bool, u32) {
        let seq = self.seq.load(Ordering::Acquire);
        (
            seq,
            self.present.load(Ordering::Relaxed),
            self.at_ms.load(Ordering::Relaxed),
        )
    }
}

impl Default for PendingPowerCell {
    fn default() -> Self {
        Self::new()
    }
}

/// The cell the hardware ISR publishes into.
pub static PENDING_POWER: PendingPowerCell = PendingPowerCell::new();

/// ISR handler — register on the power-sense GPIO, any edge.
/// `present` is the line level read inside the ISR.
#[allow(unused)]
pub fn power_isr_handler(present: bool, now_ms: u32) {
    PENDING_POWER.publish(present, now_ms);
}

// ───────────────────────────────────────────────────────────────
// Arbiter
// ───────────────────────────────────────────────────────────────

/// Power source states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Running from the batteries; external source absent or unconfirmed.
    BatteryOnly,
    /// Presence edge seen; waiting out the restoration debounce.
    PendingExternal { since_ms: u32 },
    /// External source confirmed and the rails switched over.
    ExternalActive,
}

pub struct PowerArbiter {
    state: PowerState,
    seen_seq: u32,
    on_delay_ms: u32,
    switch_delay_ms: u32,
    fan_run_ms: u32,
}

impl PowerArbiter {
    /// Startup: sample the presence line once (no debounce on the first
    /// read — the ISR is not armed yet, so this is race-free). If the
    /// source is absent, run the de-energize sequence to force the rails
    /// into a known state.
    pub fn startup(
        config: &UpsConfig,
        cell: &PendingPowerCell,
        inputs: &mut impl InputPort,
        outputs: &mut impl OutputPort,
        clock: &impl Clock,
    ) -> Self {
        let (seen_seq, _, _) = cell.snapshot();
        let mut arbiter = Self {
            state: PowerState::BatteryOnly,
            seen_seq,
            on_delay_ms: config.on_delay_ms,
            switch_delay_ms: config.switch_delay_ms,
            fan_run_ms: config.fan_external_power_run_ms,
        };

        if inputs.power_present_raw() {
            info!("power: external source present at boot, debouncing");
            arbiter.state = PowerState::PendingExternal {
                since_ms: clock.now_ms(),
            };
        } else {
            info!("power: no external source at boot, de-energizing rails");
            arbiter.de_energize(outputs, clock);
        }
        arbiter
    }

    /// One main-loop pass: consume at most one published edge, then let a
    /// pending restoration mature.
    pub fn poll(
        &mut self,
        cell: &PendingPowerCell,
        inputs: &mut impl InputPort,
        outputs: &mut impl OutputPort,
        clock: &impl Clock,
        fan: &mut FanController,
        sink: &mut impl EventSink,
    ) {
        let (seq, present, at_ms) = cell.snapshot();
        if seq != self.seen_seq {
            self.seen_seq = seq;
            if present {
                if self.state == PowerState::BatteryOnly {
                    info!("power: presence edge, starting {} ms debounce", self.on_delay_ms);
                    self.state = PowerState::PendingExternal { since_ms: at_ms };
                }
            } else {
                self.on_power_lost(outputs, clock, fan, sink);
            }
        }

        if let PowerState::PendingExternal { since_ms } = self.state {
            if clock.now_ms().wrapping_sub(since_ms) >= self.on_delay_ms {
                if inputs.power_present_raw() {
                    self.on_power_confirmed(outputs, clock, fan, sink);
                } else {
                    // Line dropped and the edge was lost — treat as a glitch.
                    info!("power: presence gone at debounce expiry, discarding");
                    self.state = PowerState::BatteryOnly;
                }
            }
        }
    }

    fn on_power_confirmed(
        &mut self,
        outputs: &mut impl OutputPort,
        clock: &impl Clock,
        fan: &mut FanController,
        sink: &mut impl EventSink,
    ) {
        info!("power: external source confirmed, energizing");
        self.energize(outputs, clock);
        self.state = PowerState::ExternalActive;
        fan.request(clock.now_ms(), self.fan_run_ms);
        sink.emit(&AppEvent::PowerChanged { present: true });
    }

    fn on_power_lost(
        &mut self,
        outputs: &mut impl OutputPort,
        clock: &impl Clock,
        fan: &mut FanController,
        sink: &mut impl EventSink,
    ) {
        match self.state {
            PowerState::ExternalActive => {
                info!("power: external source lost, de-energizing");
                self.state = PowerState::BatteryOnly;
                self.de_energize(outputs, clock);
                // Stop the fan from running down the batteries.
                fan.expire();
                sink.emit(&AppEvent::PowerChanged { present: false });
            }
            PowerState::PendingExternal { .. } => {
                // Never energized — just discard the pending change.
                info!("power: presence lost during debounce, discarding");
                self.state = PowerState::BatteryOnly;
            }
            PowerState::BatteryOnly => {}
        }
    }

    /// Energize sequence: stage 1, delay, stage 2, delay, charge-select.
    /// The ordering and inter-step delays are a hardware requirement; the
    /// switching lock holds for the whole sequence.
    fn energize(&self, outputs: &mut impl OutputPort, clock: &impl Clock) {
        outputs.begin_switching();
        outputs.set_source_select1(true);
        clock.delay_ms(self.switch_delay_ms);
        outputs.set_source_select2(true);
        clock.delay_ms(self.switch_delay_ms);
        outputs.set_charge_select(true);
        outputs.end_switching();
    }

    /// De-energize sequence: strict reverse of energize.
    fn de_energize(&self, outputs: &mut impl OutputPort, clock: &impl Clock) {
        outputs.begin_switching();
        outputs.set_charge_select(false);
        clock.delay_ms(self.switch_delay_ms);
        outputs.set_source_select2(false);
        clock.delay_ms(self.switch_delay_ms);
        outputs.set_source_select1(false);
        outputs.end_switching();
    }

    /// External power confirmed on.
    pub fn power_present(&self) -> bool {
        self.state == PowerState::ExternalActive
    }

    /// The charge-select line tracks `ExternalActive` — exposed for the
    /// voltage monitor's divider topology selection.
    pub fn charge_select_active(&self) -> bool {
        self.state == PowerState::ExternalActive
    }

    pub fn state(&self) -> PowerState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::Battery;
    use std::cell::Cell;

    // ── Minimal mocks (the integration suite has richer ones) ──

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Begin,
        End,
        Sel1(bool),
        Sel2(bool),
        Charge(bool),
        Delay(u32),
    }

    struct MockIo {
        present: bool,
        calls: Vec<Call>,
    }

    impl MockIo {
        fn new(present: bool) -> Self {
            Self {
                present,
                calls: Vec::new(),
            }
        }
    }

    impl InputPort for MockIo {
        fn switch_engaged_raw(&mut self) -> bool {
            false
        }
        fn power_present_raw(&mut self) -> bool {
            self.present
        }
        fn battery_charging_raw(&mut self, _battery: Battery) -> bool {
            false
        }
        fn sample_battery(&mut self, _battery: Battery) -> u16 {
            512
        }
    }

    impl OutputPort for MockIo {
        fn begin_switching(&mut self) {
            self.calls.push(Call::Begin);
        }
        fn end_switching(&mut self) {
            self.calls.push(Call::End);
        }
        fn set_source_select1(&mut self, on: bool) {
            self.calls.push(Call::Sel1(on));
        }
        fn set_source_select2(&mut self, on: bool) {
            self.calls.push(Call::Sel2(on));
        }
        fn set_charge_select(&mut self, on: bool) {
            self.calls.push(Call::Charge(on));
        }
        fn set_output_enabled(&mut self, _on: bool) {}
        fn set_fan(&mut self, _on: bool) {}
        fn set_power_led(&mut self, _red: bool, _green: bool) {}
        fn set_status_led(&mut self, _red: bool, _green: bool) {}
        fn set_buzzer(&mut self, _on: bool) {}
    }

    struct FakeClock {
        now: Cell<u32>,
    }

    impl FakeClock {
        fn at(ms: u32) -> Self {
            Self { now: Cell::new(ms) }
        }
        fn advance(&self, ms: u32) {
            self.now.set(self.now.get().wrapping_add(ms));
        }
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u32 {
            self.now.get()
        }
        fn delay_ms(&self, ms: u32) {
            self.advance(ms);
        }
    }

    struct NullSink;
    impl EventSink for NullSink {
        fn emit(&mut self, _event: &AppEvent) {}
    }

    fn config() -> UpsConfig {
        UpsConfig::default()
    }

    #[test]
    fn startup_de_energize_sequence_order() {
        let cell = PendingPowerCell::new();
        let clock = FakeClock::at(0);
        let mut inputs = MockIo::new(false);
        let mut outputs = MockIo::new(false);
        let arbiter = PowerArbiter::startup(&config(), &cell, &mut inputs, &mut outputs, &clock);

        assert_eq!(arbiter.state(), PowerState::BatteryOnly);
        assert_eq!(
            outputs.calls,
            vec![
                Call::Begin,
                Call::Charge(false),
                Call::Sel2(false),
                Call::Sel1(false),
                Call::End,
            ]
        );
        // Two inter-step delays of SWITCHDELAY each.
        assert_eq!(clock.now_ms(), 2 * config().switch_delay_ms);
    }

    #[test]
    fn startup_with_power_enters_pending() {
        let cell = PendingPowerCell::new();
        let clock = FakeClock::at(100);
        let mut inputs = MockIo::new(true);
        let mut outputs = MockIo::new(false);
        let arbiter = PowerArbiter::startup(&config(), &cell, &mut inputs, &mut outputs, &clock);

        assert_eq!(arbiter.state(), PowerState::PendingExternal { since_ms: 100 });
        assert!(outputs.calls.is_empty(), "no switching before the debounce");
    }

    fn battery_only_arbiter(cell: &PendingPowerCell) -> PowerArbiter {
        let clock = FakeClock::at(0);
        let mut inputs = MockIo::new(false);
        let mut outputs = MockIo::new(false);
        PowerArbiter::startup(&config(), cell, &mut inputs, &mut outputs, &clock)
    }

    #[test]
    fn energize_waits_for_on_delay() {
        let cell = PendingPowerCell::new();
        let mut arbiter = battery_only_arbiter(&cell);
        let clock = FakeClock::at(1000);
        let mut inputs = MockIo::new(true);
        let mut outputs = MockIo::new(false);
        let mut fan = FanController::new();
        let mut sink = NullSink;

        cell.publish(true, 1000);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        assert_eq!(arbiter.state(), PowerState::PendingExternal { since_ms: 1000 });
        assert!(outputs.calls.is_empty());

        // 1999 ms after the edge: still pending.
        clock.now.set(2999);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        assert!(outputs.calls.is_empty());
        assert!(!arbiter.power_present());

        // 2000 ms: energize runs, in order, inside the switching lock.
        clock.now.set(3000);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        assert!(arbiter.power_present());
        assert_eq!(
            outputs.calls,
            vec![
                Call::Begin,
                Call::Sel1(true),
                Call::Sel2(true),
                Call::Charge(true),
                Call::End,
            ]
        );
        assert!(fan.is_running(), "fan run requested on confirmation");
    }

    #[test]
    fn transient_pulse_never_activates() {
        let cell = PendingPowerCell::new();
        let mut arbiter = battery_only_arbiter(&cell);
        let clock = FakeClock::at(0);
        let mut inputs = MockIo::new(false);
        let mut outputs = MockIo::new(false);
        let mut fan = FanController::new();
        let mut sink = NullSink;

        // 500 ms pulse: present edge, then absent edge.
        cell.publish(true, 0);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        cell.publish(false, 500);
        clock.now.set(500);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);

        clock.now.set(10_000);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        assert!(!arbiter.power_present());
        assert_eq!(arbiter.state(), PowerState::BatteryOnly);
    }

    #[test]
    fn pending_discarded_if_line_low_at_expiry() {
        let cell = PendingPowerCell::new();
        let mut arbiter = battery_only_arbiter(&cell);
        let clock = FakeClock::at(0);
        let mut inputs = MockIo::new(false); // line reads absent
        let mut outputs = MockIo::new(false);
        let mut fan = FanController::new();
        let mut sink = NullSink;

        cell.publish(true, 0);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        clock.now.set(2500);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        assert_eq!(arbiter.state(), PowerState::BatteryOnly);
        assert!(outputs.calls.is_empty());
    }

    #[test]
    fn loss_de_energizes_and_expires_fan() {
        let cell = PendingPowerCell::new();
        let mut arbiter = battery_only_arbiter(&cell);
        let clock = FakeClock::at(0);
        let mut inputs = MockIo::new(true);
        let mut outputs = MockIo::new(false);
        let mut fan = FanController::new();
        let mut sink = NullSink;

        cell.publish(true, 0);
        clock.now.set(2100);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        assert!(arbiter.power_present());
        assert!(fan.is_running());
        outputs.calls.clear();

        cell.publish(false, 5000);
        clock.now.set(5000);
        inputs.present = false;
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        assert!(!arbiter.power_present());
        assert_eq!(
            outputs.calls,
            vec![
                Call::Begin,
                Call::Charge(false),
                Call::Sel2(false),
                Call::Sel1(false),
                Call::End,
            ]
        );
        // Fan duration expired: stops on its next unoverridden tick.
        assert!(fan.tick(5001));
    }

    #[test]
    fn repeated_edges_keep_latest_only() {
        let cell = PendingPowerCell::new();
        let mut arbiter = battery_only_arbiter(&cell);
        let clock = FakeClock::at(100);
        let mut inputs = MockIo::new(true);
        let mut outputs = MockIo::new(false);
        let mut fan = FanController::new();
        let mut sink = NullSink;

        // Chatter faster than the loop: only the last publish survives.
        cell.publish(true, 10);
        cell.publish(false, 20);
        cell.publish(true, 30);
        arbiter.poll(&cell, &mut inputs, &mut outputs, &clock, &mut fan, &mut sink);
        assert_eq!(arbiter.state(), PowerState::PendingExternal { since_ms: 30 });
    }
}
