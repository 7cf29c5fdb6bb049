//! UPSguard Firmware — Main Entry Point
//!
//! Hexagonal architecture around a fixed-cadence control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  HardwareInputs    HardwareOutputs    LogEventSink       │
//! │  (InputPort)       (OutputPort)       (EventSink)        │
//! │  SystemClock       Watchdog                              │
//! │  (Clock)           (WatchdogPort)                        │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ────────────────   │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │             UpsService (pure logic)                │  │
//! │  │  PowerArbiter · VoltageMonitor · FanController     │  │
//! │  │  ShutdownGuard · Signal engine                     │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod app;
pub mod config;
mod control;
mod diagnostics;
mod error;
mod pins;
mod power;
mod safety;
mod sensors;
mod signal;

mod adapters;
mod drivers;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::info;

use adapters::hardware::{HardwareInputs, HardwareOutputs};
use adapters::log_sink::LogEventSink;
use adapters::time::SystemClock;
use app::ports::Clock;
use app::service::UpsService;
use config::UpsConfig;
use drivers::indicators::IndicatorDriver;
use drivers::rails::RailDriver;
use drivers::watchdog::Watchdog;
use power::PENDING_POWER;

/// Control loop cadence. Well inside every timing window the controller
/// tracks (the tightest is the 100 ms shutdown-guard sample interval).
const LOOP_INTERVAL_MS: u32 = 10;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  UPSguard v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    diagnostics::install_panic_handler();

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt. The
        // watchdog resets the device after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = Watchdog::new();
    let clock = SystemClock::new();

    // ── 3. Construct adapters ─────────────────────────────────
    let mut inputs = HardwareInputs::new();
    let mut outputs = HardwareOutputs::new(RailDriver::new(), IndicatorDriver::new());
    let mut sink = LogEventSink::new();

    // ── 4. Bring the controller up, then arm the power ISR ────
    // Startup samples the presence line raw; the ISR goes live only once
    // the rails are in a known state, so no edge can race init.
    let mut service = UpsService::startup(
        UpsConfig::default(),
        &PENDING_POWER,
        &mut inputs,
        &mut outputs,
        &clock,
        &mut sink,
    );

    if let Err(e) = drivers::hw_init::init_isr_service() {
        log::error!("ISR service init failed: {} — continuing with polling only", e);
    }

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        service.tick(&mut inputs, &mut outputs, &clock, &watchdog, &mut sink);
        clock.delay_ms(LOOP_INTERVAL_MS);
    }
}
