// libnfcee/src/error.rs

use thiserror::Error;

use crate::transport::AckKind;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("transport not configured")]
    TransportMissing,

    #[error("command {command} rejected: status={status:#04x}")]
    CommandRejected { command: &'static str, status: u8 },

    #[error("command {command} failed: status={status:#04x}")]
    CommandFailed { command: &'static str, status: u8 },

    #[error("acknowledgement {ack:?} not received within {timeout_ms} ms")]
    AckTimeout { ack: AckKind, timeout_ms: u64 },

    #[error("operation cancelled by shutdown")]
    Cancelled,

    #[error("aid routing table full")]
    AidTableFull,

    #[error("aid routing disabled by configuration")]
    AidRoutingDisabled,

    #[error("invalid aid length: {0} bytes")]
    InvalidAidLength(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid route: {0:#06x}")]
    InvalidRoute(u16),

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown execution environment {handle:#06x}")]
    UnknownEe { handle: u16 },

    #[error("routing table format error: {0}")]
    RoutingFormat(String),

    #[error("nfcid2 table full")]
    Nfcid2TableFull,

    #[error("nfcid2 already registered: {0}")]
    DuplicateNfcid2(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("worker thread error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_length_display() {
        let err = Error::InvalidLength {
            expected: 8,
            actual: 3,
        };
        let s = format!("{}", err);
        assert!(s.contains("expected 8"));
    }

    #[test]
    fn command_rejected_display() {
        let err = Error::CommandRejected {
            command: "ModeSet",
            status: 0x03,
        };
        let s = format!("{}", err);
        assert!(s.contains("ModeSet"));
        assert!(s.contains("0x03"));
    }

    #[test]
    fn ack_timeout_display() {
        let err = Error::AckTimeout {
            ack: AckKind::Updated,
            timeout_ms: 500,
        };
        let s = format!("{}", err);
        assert!(s.contains("Updated"));
        assert!(s.contains("500 ms"));
    }

    #[test]
    fn unknown_ee_and_route_display() {
        let e = Error::UnknownEe { handle: 0x4C0 };
        assert!(format!("{}", e).contains("0x04c0"));

        let r = Error::InvalidRoute(0x07);
        assert!(format!("{}", r).contains("0x0007"));
    }
}
