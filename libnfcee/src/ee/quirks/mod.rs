// libnfcee/src/ee/quirks/mod.rs

use std::time::Duration;

use crate::types::EeHandle;
use crate::utils::ms;

/// Controller family, selecting the errata policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChipId {
    Pn547C2,
    Pn65T,
    #[default]
    Pn548C2,
    Pn66T,
    Unknown(u8),
}

impl ChipId {
    /// Chip id as stored in the controller configuration.
    pub fn from_u8(v: u8) -> Self {
        match v {
            0x01 => Self::Pn547C2,
            0x02 => Self::Pn65T,
            0x03 => Self::Pn548C2,
            0x04 => Self::Pn66T,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Pn547C2 => 0x01,
            Self::Pn65T => 0x02,
            Self::Pn548C2 => 0x03,
            Self::Pn66T => 0x04,
            Self::Unknown(v) => v,
        }
    }

    /// Parts with an integrated secure element.
    pub fn has_embedded_se(self) -> bool {
        matches!(self, Self::Pn65T | Self::Pn66T)
    }
}

/// Chip-specific behaviour consulted by the registry and the lifecycle.
pub trait Quirks: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `handle` reporting "removed" after having been active should
    /// trigger the power-cycle recovery. Default never recovers.
    fn recover_on_removal(&self, _handle: EeHandle) -> bool {
        false
    }

    /// Time the standby line is held low during a power cycle.
    fn power_cycle_delay(&self) -> Duration {
        ms(crate::constants::POWER_CYCLE_DELAY_MS)
    }
}

mod noop;
pub use noop::NoopQuirks;

pub mod embedded_se;
pub use embedded_se::EmbeddedSeQuirks;

/// Factory selecting the policy for a chip. Chips without special handling
/// get the no-op policy.
pub fn create_quirks_for(chip: ChipId) -> Box<dyn Quirks> {
    match chip {
        ChipId::Pn65T | ChipId::Pn66T => Box::new(EmbeddedSeQuirks::new()),
        _ => Box::new(NoopQuirks::new()),
    }
}
