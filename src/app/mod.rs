//! Application layer: port traits, outbound events, and the `UpsService`
//! orchestrator that runs one control pass per loop iteration.

pub mod events;
pub mod ports;
pub mod service;
