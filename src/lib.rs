//! UPSguard firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod power;
pub mod safety;
pub mod sensors;
pub mod signal;

pub mod error;
mod pins;

// The ESPidf-only implementations inside these are guarded by cfg
// attributes; the host sees simulation stubs.
pub mod adapters;
pub mod drivers;
