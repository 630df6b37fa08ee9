#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use libnfcee::test_support::ese;
use libnfcee::transport::NfaEvent;
use libnfcee::{EeHandle, EeStatus, Error};

#[test]
fn initialize_loads_registry() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    assert_eq!(ctx.registry().len(), 2);
    assert!(ctx.registry().is_active(EeHandle::ESE));
    assert_eq!(&mock.sent_names()[..2], &["RegisterEeCallback", "GetEeInfo"]);
    Ok(())
}

#[test]
fn discover_snapshot_replaces_registry() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    mock.inject(NfaEvent::EeDiscover { ees: vec![ese()] });
    assert!(common::wait_until(Duration::from_secs(1), || ctx.registry().len() == 1));
    assert_eq!(ctx.registry().status(EeHandle::UICC), None);
    Ok(())
}

#[test]
fn activation_is_reference_counted() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.activate_ee(EeHandle::UICC)?;
    ctx.activate_ee(EeHandle::UICC)?;
    assert_eq!(mock.count("ModeSet"), 0);

    ctx.deactivate_ee(EeHandle::UICC)?;
    assert_eq!(mock.ee_status(EeHandle::UICC), Some(EeStatus::Active));
    ctx.deactivate_ee(EeHandle::UICC)?;
    assert_eq!(mock.count("ModeSet"), 1);
    assert_eq!(mock.ee_status(EeHandle::UICC), Some(EeStatus::Inactive));
    assert!(common::wait_until(Duration::from_secs(1), || {
        ctx.registry().status(EeHandle::UICC) == Some(EeStatus::Inactive)
    }));
    Ok(())
}

#[test]
fn unknown_ee_rejected() -> anyhow::Result<()> {
    let (ctx, _mock, _l) = common::context()?;
    assert!(matches!(
        ctx.activate_ee(EeHandle::new(0x481)),
        Err(Error::UnknownEe { handle: 0x481 })
    ));
    Ok(())
}
