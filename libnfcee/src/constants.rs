// libnfcee/src/constants.rs
//! Controller interface constants used across the crate

/// Handle group bits shared by every execution environment handle
pub const EE_HANDLE_GROUP: u16 = 0x400;

/// Device host handle
pub const DH_HANDLE: u16 = 0x400;

/// HCI network handle; never a routing destination
pub const HCI_NETWORK_HANDLE: u16 = 0x401;

/// UICC handle
pub const UICC_HANDLE: u16 = 0x402;

/// Embedded secure element handle
pub const ESE_HANDLE: u16 = 0x4C0;

/// Controller status codes
pub const STATUS_OK: u8 = 0x00;
pub const STATUS_REJECTED: u8 = 0x01;
pub const STATUS_FAILED: u8 = 0x03;
pub const STATUS_BUFFER_FULL: u8 = 0xE0;

/// NFCEE status values reported in discover and mode-set results
pub const EE_STATUS_ACTIVE: u8 = 0x00;
pub const EE_STATUS_INACTIVE: u8 = 0x01;
pub const EE_STATUS_REMOVED: u8 = 0x02;

/// NFCEE interface identifiers
pub const EE_INTERFACE_APDU: u8 = 0x00;
pub const EE_INTERFACE_HCI_ACCESS: u8 = 0x01;
pub const EE_INTERFACE_T3T: u8 = 0x02;
pub const EE_INTERFACE_TRANSPARENT: u8 = 0x03;

/// RF protocol identifiers as carried in activation and discover requests
pub const PROTOCOL_ISO_DEP: u8 = 0x04;
pub const PROTOCOL_NFC_DEP: u8 = 0x05;

/// Protocol byte value that withdraws a reader-mode technology request
pub const PROTOCOL_REMOVE: u8 = 0xFF;

/// AID length bounds (ISO/IEC 7816-5)
pub const AID_MIN_LEN: usize = 5;
pub const AID_MAX_LEN: usize = 16;

/// Largest extended-length command APDU: header, 3-byte Lc, 65535 data
/// bytes, 2-byte Le
pub const MAX_APDU_LEN: usize = 4 + 3 + 65_535 + 2;

/// Sentinel AID understood by the controller as "remove every AID entry"
pub const REMOVE_ALL_AID: [u8; 8] = [0xFF; 8];

/// Vendor-specific AID entry flag requesting prefix matching
pub const AID_PREFIX_MATCH: u8 = 0x10;

/// AID table size assumed when the transport does not report one
pub const DEFAULT_AID_TABLE_CAPACITY: usize = 32;

/// Routing table TLV header: type byte plus length byte
pub const TLV_HEADER_LEN: usize = 2;

/// Routing table TLV entry kinds (low nibble of the type byte)
pub const TLV_TECHNOLOGY: u8 = 0x00;
pub const TLV_PROTOCOL: u8 = 0x01;
pub const TLV_AID: u8 = 0x02;

/// Application-init payload status word signalling success
pub const APP_INIT_SUCCESS: [u8; 2] = [0x90, 0x00];

/// Felica-on-host limits
pub const NFCID2_LEN: usize = 8;
pub const SYSTEM_CODE_LEN: usize = 2;
pub const NFCID2_MAX_ENTRIES: usize = 4;

/// Reader-mode SWP coalescing window (ms)
pub const READER_COALESCE_MS: u64 = 50;

/// Guard window distinguishing a field dip from a finished transaction (ms)
pub const TRANSACTION_GUARD_MS: u64 = 50;

/// NFCID2 add/remove coalescing window (ms)
pub const NFCID2_COALESCE_MS: u64 = 100;

/// Standby line low time during an EE power cycle (ms)
pub const POWER_CYCLE_DELAY_MS: u64 = 10;
