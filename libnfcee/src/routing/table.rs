// libnfcee/src/routing/table.rs

//! Decoder for the routing table reported by the controller.
//!
//! Payload layout: `[more][count]` followed by `count` entries of
//! `{type, len, nfcee_id, power, value..}`. The low nibble of the type byte
//! selects technology, protocol or AID; bit 4 on an AID entry requests
//! prefix matching.

use crate::constants::{
    AID_PREFIX_MATCH, PROTOCOL_NFC_DEP, TLV_AID, TLV_HEADER_LEN, TLV_PROTOCOL, TLV_TECHNOLOGY,
};
use crate::types::{EeHandle, PowerMask, RouteKind};
use crate::{Error, Result};

const PAYLOAD_HEADER_LEN: usize = 2;
const ENTRY_MIN_VALUE_LEN: usize = 3;

/// One decoded routing TLV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTableEntry {
    pub kind: RouteKind,
    pub handle: EeHandle,
    pub power: PowerMask,
    /// Technology or protocol code, or the AID bytes
    pub value: Vec<u8>,
    pub prefix: bool,
}

/// Routing table as read back from the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    pub more: bool,
    pub entries: Vec<RoutingTableEntry>,
}

impl RoutingTable {
    /// Entries routed to `handle`.
    pub fn entries_for(&self, handle: EeHandle) -> impl Iterator<Item = &RoutingTableEntry> {
        self.entries.iter().filter(move |e| e.handle == handle)
    }
}

/// Decode a `[more][count]{type, len, nfcee_id, power, value..}` payload.
/// Any truncated entry fails the whole decode with `RoutingFormat`.
pub fn decode(payload: &[u8]) -> Result<RoutingTable> {
    if payload.len() < PAYLOAD_HEADER_LEN {
        return Err(Error::RoutingFormat(format!(
            "payload too short: {} bytes",
            payload.len()
        )));
    }
    let more = payload[0] != 0;
    let count = payload[1] as usize;
    let mut rest = &payload[PAYLOAD_HEADER_LEN..];
    let mut entries = Vec::with_capacity(count);

    for index in 0..count {
        if rest.len() < TLV_HEADER_LEN {
            return Err(Error::RoutingFormat(format!("entry {} truncated", index)));
        }
        let ty = rest[0];
        let len = rest[1] as usize;
        let value = rest
            .get(TLV_HEADER_LEN..TLV_HEADER_LEN + len)
            .ok_or_else(|| Error::RoutingFormat(format!("entry {} value truncated", index)))?;
        rest = &rest[TLV_HEADER_LEN + len..];

        if value.len() < ENTRY_MIN_VALUE_LEN {
            return Err(Error::RoutingFormat(format!(
                "entry {} too short: {} bytes",
                index, len
            )));
        }
        let kind = match ty & 0x0F {
            TLV_TECHNOLOGY => RouteKind::Technology,
            TLV_PROTOCOL => RouteKind::Protocol,
            TLV_AID => RouteKind::Aid,
            other => {
                return Err(Error::RoutingFormat(format!(
                    "entry {} unknown type {:#04x}",
                    index, other
                )));
            }
        };
        // NFC-DEP stays with the host stack and is not reported
        if kind == RouteKind::Protocol && value[value.len() - 1] == PROTOCOL_NFC_DEP {
            continue;
        }
        entries.push(RoutingTableEntry {
            kind,
            handle: EeHandle::from_nfcee_id(value[0]),
            power: PowerMask::from_bits_truncate(value[1]),
            value: value[2..].to_vec(),
            prefix: kind == RouteKind::Aid && ty & AID_PREFIX_MATCH != 0,
        });
    }

    if !rest.is_empty() {
        return Err(Error::RoutingFormat(format!(
            "{} trailing bytes",
            rest.len()
        )));
    }
    Ok(RoutingTable { more, entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mixed_entries() {
        let payload = [
            0x00, 0x03, //
            0x00, 0x03, 0x00, 0x01, 0x00, // tech A on host, switch on
            0x01, 0x03, 0xC0, 0x01, 0x04, // ISO-DEP on eSE
            0x12, 0x07, 0xC0, 0x01, 0xA0, 0x00, 0x00, 0x03, 0x10, // prefix AID
        ];
        let table = decode(&payload).unwrap();
        assert!(!table.more);
        assert_eq!(table.entries.len(), 3);
        assert_eq!(table.entries[0].handle, EeHandle::DH);
        assert_eq!(table.entries[1].kind, RouteKind::Protocol);
        assert_eq!(table.entries[1].handle, EeHandle::ESE);
        let aid = &table.entries[2];
        assert_eq!(aid.kind, RouteKind::Aid);
        assert!(aid.prefix);
        assert_eq!(aid.value, vec![0xA0, 0x00, 0x00, 0x03, 0x10]);
        assert_eq!(table.entries_for(EeHandle::ESE).count(), 2);
    }

    #[test]
    fn nfc_dep_entries_dropped() {
        let payload = [0x01, 0x01, 0x01, 0x03, 0x00, 0x01, 0x05];
        let table = decode(&payload).unwrap();
        assert!(table.more);
        assert!(table.entries.is_empty());
    }

    #[test]
    fn malformed_payloads_rejected() {
        assert!(matches!(decode(&[0x00]), Err(Error::RoutingFormat(_))));
        assert!(matches!(
            decode(&[0x00, 0x01, 0x00, 0x05, 0x00]),
            Err(Error::RoutingFormat(_))
        ));
        assert!(matches!(
            decode(&[0x00, 0x01, 0x07, 0x03, 0x00, 0x01, 0x00]),
            Err(Error::RoutingFormat(_))
        ));
        assert!(matches!(
            decode(&[0x00, 0x00, 0xFF]),
            Err(Error::RoutingFormat(_))
        ));
    }

    #[test]
    fn empty_table() {
        assert_eq!(decode(&[0x00, 0x00]).unwrap(), RoutingTable::default());
    }
}
