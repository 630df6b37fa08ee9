// libnfcee/src/routing/descriptor.rs

//! Packed route descriptor bytes as handed down by the service layer.
//!
//! ```text
//!  bit 7     bits 6..5      bits 4..0
//!  tech F    EE selector    power-state mask
//! ```

use crate::types::{EeHandle, PowerMask};

const SELECTOR_MASK: u8 = 0x60;
const SELECTOR_SHIFT: u8 = 5;
const TECH_F_BIT: u8 = 0x80;

/// Decoded route descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub destination: EeHandle,
    pub power: PowerMask,
    pub tech_f: bool,
}

impl RouteDescriptor {
    /// Descriptor without the technology F bit.
    pub fn new(destination: EeHandle, power: PowerMask) -> Self {
        Self {
            destination,
            power,
            tech_f: false,
        }
    }

    /// Selector 0 is the host, 1 the embedded SE, anything else the UICC.
    pub fn decode(b: u8) -> Self {
        let destination = match (b & SELECTOR_MASK) >> SELECTOR_SHIFT {
            0 => EeHandle::DH,
            1 => EeHandle::ESE,
            _ => EeHandle::UICC,
        };
        Self {
            destination,
            power: PowerMask::from_bits_truncate(b),
            tech_f: b & TECH_F_BIT != 0,
        }
    }

    /// Pack back into the descriptor byte.
    pub fn encode(&self) -> u8 {
        let selector = match self.destination {
            EeHandle::DH => 0,
            EeHandle::ESE => 1,
            _ => 2,
        };
        let f = if self.tech_f { TECH_F_BIT } else { 0 };
        f | (selector << SELECTOR_SHIFT) | self.power.bits()
    }
}

impl From<u8> for RouteDescriptor {
    fn from(b: u8) -> Self {
        Self::decode(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_selectors() {
        assert_eq!(RouteDescriptor::decode(0x01).destination, EeHandle::DH);
        assert_eq!(RouteDescriptor::decode(0x21).destination, EeHandle::ESE);
        assert_eq!(RouteDescriptor::decode(0x41).destination, EeHandle::UICC);
        assert_eq!(RouteDescriptor::decode(0x61).destination, EeHandle::UICC);
    }

    #[test]
    fn decode_power_and_tech_bit() {
        let d = RouteDescriptor::decode(0x9F);
        assert_eq!(d.power, PowerMask::ALL);
        assert!(d.tech_f);
        assert_eq!(d.destination, EeHandle::DH);

        let d = RouteDescriptor::decode(0x29);
        assert_eq!(d.power, PowerMask::SWITCH_ON | PowerMask::SCREEN_OFF);
        assert!(!d.tech_f);
    }

    #[test]
    fn encode_inverts_decode_for_canonical_bytes() {
        for b in [0x00u8, 0x01, 0x21, 0x41, 0x9F, 0xBF, 0xC3] {
            assert_eq!(RouteDescriptor::decode(b).encode(), b);
        }
    }
}
