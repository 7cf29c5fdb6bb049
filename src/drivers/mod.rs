//! Hardware drivers: peripheral init plus thin line-level wrappers.

pub mod hw_init;
pub mod indicators;
pub mod rails;
pub mod watchdog;
