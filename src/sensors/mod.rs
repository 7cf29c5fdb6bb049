//! Input-side domain logic: battery voltage monitoring and debounced
//! digital line sampling. Pure code — all hardware access goes through the
//! [`InputPort`](crate::app::ports::InputPort) trait.

pub mod battery;
pub mod inputs;
