#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use libnfcee::DataStatus;
use libnfcee::transport::NfaEvent;

#[test]
fn chunked_apdu_delivered_once_complete() -> anyhow::Result<()> {
    let (_ctx, mock, listener) = common::context()?;
    let select = hex::decode("00A4040007A0000000031010")?;

    mock.inject(NfaEvent::HostCeActivated);
    mock.inject(NfaEvent::HostCeData {
        status: DataStatus::Continue,
        data: select[..5].to_vec(),
    });
    mock.inject(NfaEvent::HostCeData {
        status: DataStatus::Ok,
        data: select[5..].to_vec(),
    });
    mock.inject(NfaEvent::HostCeDeactivated);

    assert!(common::wait_until(Duration::from_secs(1), || {
        listener.host_activations() == (1, 1)
    }));
    assert_eq!(listener.host_data(), vec![select]);
    Ok(())
}

#[test]
fn failed_chunk_discards_partial_apdu() -> anyhow::Result<()> {
    let (_ctx, mock, listener) = common::context()?;
    mock.inject(NfaEvent::HostCeActivated);
    mock.inject(NfaEvent::HostCeData {
        status: DataStatus::Continue,
        data: vec![0x00, 0xA4],
    });
    mock.inject(NfaEvent::HostCeData {
        status: DataStatus::Failed,
        data: Vec::new(),
    });
    mock.inject(NfaEvent::HostCeData {
        status: DataStatus::Ok,
        data: vec![0x80, 0xCA, 0x00, 0x00],
    });
    assert!(common::wait_until(Duration::from_secs(1), || {
        !listener.host_data().is_empty()
    }));
    assert_eq!(listener.host_data(), vec![vec![0x80, 0xCA, 0x00, 0x00]]);
    Ok(())
}
