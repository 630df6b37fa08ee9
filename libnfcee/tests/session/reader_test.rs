#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use libnfcee::reader::ReaderState;
use libnfcee::transport::{DiscoverOp, DiscoverRequest, NfaEvent};
use libnfcee::{EeHandle, RfMode, TechMask};
use serial_test::serial;

fn discover_req(op: DiscoverOp, protocol: u8) -> NfaEvent {
    NfaEvent::DiscoverReq {
        requests: vec![DiscoverRequest {
            handle: EeHandle::UICC,
            op,
            pa_protocol: protocol,
            pb_protocol: protocol,
        }],
    }
}

#[test]
#[serial]
fn uicc_reader_mode_round_trip() -> anyhow::Result<()> {
    let (ctx, mock, listener) = common::context()?;
    let ab = TechMask::A | TechMask::B;

    mock.inject(discover_req(DiscoverOp::Add, 0x04));
    assert!(common::wait_until(Duration::from_secs(1), || {
        listener.reader_start_configs() == vec![(EeHandle::UICC, ab)]
    }));

    ctx.start_reader_mode()?;
    assert_eq!(ctx.reader().state(), ReaderState::Started);
    assert_eq!(mock.polling(), Some((ab, true)));
    assert_eq!(listener.reader_started(), vec![ab]);
    assert_eq!(
        mock.uicc_listen_history().last(),
        Some(&(EeHandle::UICC, TechMask::NONE))
    );
    assert!(mock.discovery_started());

    mock.inject(NfaEvent::Activated {
        mode: RfMode::Poll,
        protocol: 0x04,
    });
    assert!(common::wait_until(Duration::from_secs(1), || {
        ctx.reader().state() == ReaderState::Activated
    }));
    mock.inject(NfaEvent::Deactivated { mode: RfMode::Poll });
    assert!(common::wait_until(Duration::from_secs(1), || {
        ctx.reader().state() == ReaderState::Started
    }));

    mock.inject(discover_req(DiscoverOp::Remove, 0xFF));
    assert!(common::wait_until(Duration::from_secs(1), || {
        listener.reader_stop_configs() == vec![EeHandle::UICC]
    }));
    ctx.stop_reader_mode()?;
    assert_eq!(ctx.reader().state(), ReaderState::Stopped);
    assert_eq!(mock.polling(), None);
    assert_eq!(
        mock.uicc_listen_history().last(),
        Some(&(EeHandle::UICC, TechMask::ALL))
    );
    Ok(())
}

#[test]
fn start_without_request_is_invalid() -> anyhow::Result<()> {
    let (ctx, _mock, _l) = common::context()?;
    assert!(ctx.start_reader_mode().is_err());
    ctx.stop_reader_mode()?;
    Ok(())
}
