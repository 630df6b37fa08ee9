// libnfcee/src/ee/quirks/embedded_se/mod.rs

//! Policy for controllers with an integrated secure element. Their eSE can
//! drop off the bus and report "removed"; toggling the standby line brings
//! it back.

pub mod config;

use std::time::Duration;

use crate::ee::quirks::Quirks;
use crate::types::EeHandle;
use crate::utils::ms;

/// Controllers with an embedded SE that needs a power cycle after removal
pub struct EmbeddedSeQuirks;

impl EmbeddedSeQuirks {
    pub fn new() -> Self {
        Self
    }
}

impl Quirks for EmbeddedSeQuirks {
    fn name(&self) -> &'static str {
        "embedded-se"
    }

    fn recover_on_removal(&self, handle: EeHandle) -> bool {
        handle == config::RECOVERY_HANDLE
    }

    fn power_cycle_delay(&self) -> Duration {
        ms(config::STANDBY_LOW_MS)
    }
}
