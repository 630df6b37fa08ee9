//! Small helpers shared across the crate: hex formatting, timeout
//! defaults and the re-armable one-shot timer.

pub mod hex;
pub mod timeout;
pub mod timer;

pub use hex::*;
pub use timeout::*;
pub use timer::Timer;
