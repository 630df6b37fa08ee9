//! Timeout defaults and conversions.

use std::time::Duration;

/// Acknowledgement wait used when no configuration overrides it (ms).
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 1000;

/// Routing commit wait (ms).
pub const DEFAULT_COMMIT_TIMEOUT_MS: u64 = 2000;

/// Wait for the mode-set result that ends an EE reset (ms).
pub const DEFAULT_REACTIVATE_TIMEOUT_MS: u64 = 2000;

/// Upper bound on waiting for wired or contactless activity to finish
/// before a reset proceeds (ms).
pub const DEFAULT_TRANSACTION_WAIT_MS: u64 = 5000;

/// Shorthand for `Duration::from_millis`.
pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}
