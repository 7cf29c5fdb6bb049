//! Actuator-side control logic.

pub mod fan;
