//! Embedded secure element recovery parameters

use crate::types::EeHandle;

/// Only the embedded SE is power-cycled on removal
pub const RECOVERY_HANDLE: EeHandle = EeHandle::ESE;

/// Standby line low time (ms)
pub const STANDBY_LOW_MS: u64 = 10;
