// libnfcee/src/types.rs

use derive_more::{BitAnd, BitOr, Display};

use crate::Error;
use crate::constants::{
    AID_MAX_LEN, AID_MIN_LEN, DH_HANDLE, EE_HANDLE_GROUP, EE_INTERFACE_HCI_ACCESS,
    EE_STATUS_ACTIVE, EE_STATUS_INACTIVE, EE_STATUS_REMOVED, ESE_HANDLE, HCI_NETWORK_HANDLE,
    NFCID2_LEN, REMOVE_ALL_AID, SYSTEM_CODE_LEN, UICC_HANDLE,
};

/// Execution environment handle as assigned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "{:#06x}", _0)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EeHandle(u16);

impl EeHandle {
    /// Well-known handles
    pub const DH: Self = Self(DH_HANDLE);
    pub const ESE: Self = Self(ESE_HANDLE);
    pub const UICC: Self = Self(UICC_HANDLE);
    pub const HCI_NETWORK: Self = Self(HCI_NETWORK_HANDLE);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Whether this is the device host.
    pub fn is_host(&self) -> bool {
        *self == Self::DH
    }

    /// NFCEE id without the handle group bits, as carried in routing TLVs.
    pub fn nfcee_id(&self) -> u8 {
        (self.0 & !EE_HANDLE_GROUP) as u8
    }

    /// Inverse of `nfcee_id`.
    pub fn from_nfcee_id(id: u8) -> Self {
        Self(EE_HANDLE_GROUP | id as u16)
    }

    /// Map to the generic DH / eSE / UICC class. Group bits are ignored, so
    /// `0x4C0` and `0xC0` both resolve to the eSE.
    pub fn generic_id(&self) -> GenericEeId {
        match self.nfcee_id() {
            0x00 => GenericEeId::Dh,
            0xC0 => GenericEeId::Ese,
            0x02 => GenericEeId::Uicc,
            _ => GenericEeId::Invalid,
        }
    }

    /// Resolve a route value supplied by the service layer. Generic ids
    /// (0, 1, 2) and the hardware handles of known EEs are accepted.
    pub fn from_route(route: u16) -> Option<Self> {
        match route {
            0x00..=0xFF => GenericEeId::from_u8(route as u8).handle(),
            DH_HANDLE | ESE_HANDLE | UICC_HANDLE => Some(Self(route)),
            _ => None,
        }
    }
}

impl From<u16> for EeHandle {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

/// Generic execution environment class
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GenericEeId {
    Dh = 0x00,
    Ese = 0x01,
    Uicc = 0x02,
    Invalid = 0xFF,
}

impl GenericEeId {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0x00 => Self::Dh,
            0x01 => Self::Ese,
            0x02 => Self::Uicc,
            _ => Self::Invalid,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Fixed handle of the class; `None` for `Invalid`.
    pub fn handle(self) -> Option<EeHandle> {
        match self {
            Self::Dh => Some(EeHandle::DH),
            Self::Ese => Some(EeHandle::ESE),
            Self::Uicc => Some(EeHandle::UICC),
            Self::Invalid => None,
        }
    }
}

/// RF technology bitmask (A / B / F)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, BitOr, BitAnd, Display)]
#[display(fmt = "{:#04x}", _0)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TechMask(u8);

impl TechMask {
    pub const NONE: Self = Self(0x00);
    pub const A: Self = Self(0x01);
    pub const B: Self = Self(0x02);
    pub const F: Self = Self(0x04);
    pub const ALL: Self = Self(0x07);

    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set.
    pub fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Clear the bits of `other`.
    pub fn without(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Protocol bitmask used by default protocol routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, BitOr, BitAnd, Display)]
#[display(fmt = "{:#04x}", _0)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtoMask(u8);

impl ProtoMask {
    pub const NONE: Self = Self(0x00);
    pub const T1T: Self = Self(0x01);
    pub const T2T: Self = Self(0x02);
    pub const T3T: Self = Self(0x04);
    pub const ISO_DEP: Self = Self(0x08);
    pub const NFC_DEP: Self = Self(0x10);
    pub const ISO7816: Self = Self(0x20);

    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Power-state bitmask (low five bits of a route descriptor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, BitOr, BitAnd, Display)]
#[display(fmt = "{:#04x}", _0)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerMask(u8);

impl PowerMask {
    pub const NONE: Self = Self(0x00);
    pub const SWITCH_ON: Self = Self(0x01);
    pub const SWITCH_OFF: Self = Self(0x02);
    pub const BATTERY_OFF: Self = Self(0x04);
    pub const SCREEN_OFF: Self = Self(0x08);
    pub const SCREEN_LOCK: Self = Self(0x10);
    pub const ALL: Self = Self(0x1F);

    /// Keep only the defined power bits.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & 0x1F)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Per power-state routing assignment, the argument shape of the default
/// technology and protocol routing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerTable<M> {
    pub switch_on: M,
    pub switch_off: M,
    pub battery_off: M,
    pub screen_off: M,
    pub screen_lock: M,
}

impl<M> PowerTable<M>
where
    M: Copy + Default + PartialEq + std::ops::BitOr<Output = M> + std::ops::BitAnd<Output = M>,
{
    /// Place `value` in every bucket whose bit is set in `power`. The screen
    /// buckets stay empty unless `strict` power-state routing is enabled.
    pub fn from_power(power: PowerMask, value: M, strict: bool) -> Self {
        let pick = |bit: PowerMask| {
            if power.contains(bit) {
                value
            } else {
                M::default()
            }
        };
        let mut table = Self {
            switch_on: pick(PowerMask::SWITCH_ON),
            switch_off: pick(PowerMask::SWITCH_OFF),
            battery_off: pick(PowerMask::BATTERY_OFF),
            screen_off: pick(PowerMask::SCREEN_OFF),
            screen_lock: pick(PowerMask::SCREEN_LOCK),
        };
        if !strict {
            table.screen_off = M::default();
            table.screen_lock = M::default();
        }
        table
    }

    /// Bucket-wise union.
    pub fn merge(self, other: Self) -> Self {
        Self {
            switch_on: self.switch_on | other.switch_on,
            switch_off: self.switch_off | other.switch_off,
            battery_off: self.battery_off | other.battery_off,
            screen_off: self.screen_off | other.screen_off,
            screen_lock: self.screen_lock | other.screen_lock,
        }
    }

    /// Intersect every bucket with `mask`.
    pub fn mask(self, mask: M) -> Self {
        Self {
            switch_on: self.switch_on & mask,
            switch_off: self.switch_off & mask,
            battery_off: self.battery_off & mask,
            screen_off: self.screen_off & mask,
            screen_lock: self.screen_lock & mask,
        }
    }

    /// Buckets in power-bit order: switch on, switch off, battery off,
    /// screen off, screen lock.
    pub fn buckets(&self) -> [M; 5] {
        [
            self.switch_on,
            self.switch_off,
            self.battery_off,
            self.screen_off,
            self.screen_lock,
        ]
    }

    /// Union of all buckets.
    pub fn any(&self) -> M {
        self.buckets()
            .into_iter()
            .fold(M::default(), |acc, m| acc | m)
    }

    pub fn is_empty(&self) -> bool {
        self.any() == M::default()
    }
}

/// Application identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aid(Vec<u8>);

impl Aid {
    /// The reserved wildcard that clears the whole AID table.
    pub fn remove_all() -> Self {
        Self(REMOVE_ALL_AID.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for the wildcard that clears the whole table.
    pub fn is_remove_all(&self) -> bool {
        self.0 == REMOVE_ALL_AID
    }

    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(&self.0)
    }
}

/// Parses hex text such as `"A0000000031010"` or `"A0:00:00:00:03"`.
impl std::str::FromStr for Aid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = crate::utils::parse_hex(s).map_err(Error::InvalidHex)?;
        Self::try_from(bytes.as_slice())
    }
}

impl TryFrom<&[u8]> for Aid {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if !(AID_MIN_LEN..=AID_MAX_LEN).contains(&bytes.len()) {
            return Err(Error::InvalidAidLength(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }
}

/// NFCID2 - Newtype Pattern (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nfcid2([u8; NFCID2_LEN]);

impl Nfcid2 {
    pub fn from_bytes(bytes: [u8; NFCID2_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NFCID2_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(&self.0)
    }
}

impl TryFrom<&[u8]> for Nfcid2 {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != NFCID2_LEN {
            return Err(Error::InvalidLength {
                expected: NFCID2_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; NFCID2_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// Felica system code (u16, big-endian on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemCode(u16);

impl SystemCode {
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// System code from its wire order.
    pub fn from_be_bytes(bytes: [u8; SYSTEM_CODE_LEN]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }
}

impl TryFrom<&[u8]> for SystemCode {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != SYSTEM_CODE_LEN {
            return Err(Error::InvalidLength {
                expected: SYSTEM_CODE_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self::from_be_bytes([bytes[0], bytes[1]]))
    }
}

/// EE status as reported by discover and mode-set results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EeStatus {
    Active,
    Inactive,
    Removed,
    Other(u8),
}

impl EeStatus {
    pub fn from_u8(v: u8) -> Self {
        match v {
            EE_STATUS_ACTIVE => Self::Active,
            EE_STATUS_INACTIVE => Self::Inactive,
            EE_STATUS_REMOVED => Self::Removed,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Active => EE_STATUS_ACTIVE,
            Self::Inactive => EE_STATUS_INACTIVE,
            Self::Removed => EE_STATUS_REMOVED,
            Self::Other(v) => v,
        }
    }
}

/// Capabilities and liveness of one execution environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EeInfo {
    pub handle: EeHandle,
    pub status: EeStatus,
    /// Supported NFCEE interfaces, first entry is the primary one
    pub interfaces: Vec<u8>,
    pub la_protocol: u8,
    pub lb_protocol: u8,
    pub lf_protocol: u8,
    pub lbp_protocol: u8,
}

impl EeInfo {
    /// EE with no interfaces and no listen protocols.
    pub fn new(handle: EeHandle, status: EeStatus) -> Self {
        Self {
            handle,
            status,
            interfaces: Vec::new(),
            la_protocol: 0,
            lb_protocol: 0,
            lf_protocol: 0,
            lbp_protocol: 0,
        }
    }

    /// Supported RF interfaces as reported at discovery.
    pub fn with_interfaces(mut self, interfaces: Vec<u8>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Set the per listen-type protocol bytes for A, B and F.
    pub fn with_listen(mut self, la: u8, lb: u8, lf: u8) -> Self {
        self.la_protocol = la;
        self.lb_protocol = lb;
        self.lf_protocol = lf;
        self
    }

    /// Technologies this EE can receive in listen mode.
    pub fn supported_technology(&self) -> TechMask {
        let mut mask = TechMask::NONE;
        if self.la_protocol != 0 {
            mask = mask | TechMask::A;
        }
        if self.lb_protocol != 0 {
            mask = mask | TechMask::B;
        }
        if self.lf_protocol != 0 {
            mask = mask | TechMask::F;
        }
        mask
    }

    /// Whether the EE may carry routing entries: active, reachable through a
    /// non-HCI interface and not the HCI network itself.
    pub fn is_routable(&self) -> bool {
        self.status == EeStatus::Active
            && self.handle != EeHandle::HCI_NETWORK
            && self
                .interfaces
                .first()
                .is_some_and(|&i| i != EE_INTERFACE_HCI_ACCESS)
    }
}

/// Mode-set target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EeMode {
    Activate,
    Deactivate,
}

impl EeMode {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Activate => 0x01,
            Self::Deactivate => 0x00,
        }
    }
}

/// Screen state as forwarded to the controller
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScreenState {
    Off = 0x01,
    Locked = 0x02,
    Unlocked = 0x03,
}

/// Selector kind of a single routing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Technology,
    Protocol,
    Aid,
}

impl RouteKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::Technology),
            0x02 => Some(Self::Protocol),
            0x04 => Some(Self::Aid),
            _ => None,
        }
    }
}

/// Bitmask of selector kinds, used when clearing routing entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BitOr, BitAnd)]
pub struct RouteKindMask(u8);

impl RouteKindMask {
    pub const TECHNOLOGY: Self = Self(0x01);
    pub const PROTOCOL: Self = Self(0x02);
    pub const AID: Self = Self(0x04);

    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// RF interface mode of an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfMode {
    Poll,
    Listen,
}

/// Delivery status of a host card-emulation data chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatus {
    Continue,
    Ok,
    Failed,
}
