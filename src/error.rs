//! Firmware error types.
//!
//! Battery conditions (under-voltage, switch bounce, power glitches) are
//! *not* errors — they are physical states handled by the domain logic
//! (hysteresis, debounce, strike counter). Runtime line I/O is infallible
//! by design: a failed ADC conversion reads as zero and a failed GPIO read
//! as inactive, both of which the control logic tolerates. What remains is
//! one-shot peripheral initialisation, which can genuinely fail and must
//! halt boot.

use core::fmt;

/// Errors during one-shot peripheral initialisation. Carries the raw
/// ESP-IDF return code where one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={rc})"),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
        }
    }
}

impl std::error::Error for Error {}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
