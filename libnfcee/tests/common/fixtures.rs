// fixtures.rs: EE descriptions, AIDs and configs shared by the tests

use libnfcee::config::RoutingConfigBuilder;
use libnfcee::test_support::{ese, uicc};
use libnfcee::{EeHandle, EeInfo, EeStatus};

/// Payment AID used across the routing tests.
pub const VISA_AID: &str = "A0000000031010";

pub const PPSE_AID: &str = "325041592E5359532E4444463031";

pub fn aid(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str).unwrap()
}

pub fn both_ees() -> Vec<EeInfo> {
    vec![ese(), uicc()]
}

pub fn ese_only() -> Vec<EeInfo> {
    vec![ese()]
}

/// An eSE that only listens on technology A.
pub fn ese_type_a() -> EeInfo {
    EeInfo::new(EeHandle::ESE, EeStatus::Active)
        .with_interfaces(vec![0x00])
        .with_listen(0x04, 0x00, 0x00)
}

/// Default config with short waits so failure paths stay quick.
pub fn fast_config() -> RoutingConfigBuilder {
    RoutingConfigBuilder::new()
        .with_ack_timeout_ms(300)
        .with_commit_timeout_ms(300)
        .with_reactivate_timeout_ms(200)
        .with_transaction_wait_ms(300)
}
