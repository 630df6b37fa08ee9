#[path = "../common/mod.rs"]
mod common;

use libnfcee::{EeHandle, Error, PowerMask, ProtoMask, RouteKind, RouteKindMask, TechMask};

#[test]
fn protocol_entry_then_commit() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.enable_discovery(TechMask::ALL, false)?;
    ctx.set_routing_entry(RouteKind::Protocol, 0x01, 0x4C0, PowerMask::SWITCH_ON)?;
    assert!(!mock.discovery_started());
    assert!(ctx.routing().has_uncommitted());

    ctx.commit_routing()?;
    assert!(mock.discovery_started());
    assert_eq!(mock.proto_routing(EeHandle::ESE).switch_on, ProtoMask::ISO_DEP);
    assert_eq!(mock.mutations_while_discovering(), 0);
    Ok(())
}

#[test]
fn entry_for_absent_ee_lands_on_host() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context_with(
        libnfcee::transport::MockTransport::new().with_ees(common::fixtures::ese_only()),
        common::fixtures::fast_config().build(),
    )?;
    ctx.set_routing_entry(RouteKind::Technology, 0x01, 0x402, PowerMask::SWITCH_ON)?;
    ctx.commit_routing()?;
    assert_eq!(mock.tech_routing(EeHandle::DH).switch_on, TechMask::A);
    assert!(mock.tech_routing(EeHandle::UICC).is_empty());
    Ok(())
}

#[test]
fn unsupported_values_rejected() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    mock.clear_sent();
    assert!(matches!(
        ctx.set_routing_entry(RouteKind::Protocol, 0x07, 0x00, PowerMask::SWITCH_ON),
        Err(Error::UnsupportedOperation(_))
    ));
    assert!(matches!(
        ctx.set_routing_entry(RouteKind::Technology, 0x01, 0x99, PowerMask::SWITCH_ON),
        Err(Error::InvalidRoute(0x99))
    ));
    Ok(())
}

#[test]
fn clearing_entries_empties_every_handle() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.set_default_route(0x01, 0x21, 0x01)?;
    ctx.clear_routing_entry(RouteKindMask::TECHNOLOGY | RouteKindMask::PROTOCOL)?;
    ctx.commit_routing()?;
    assert!(mock.tech_handles().is_empty());
    assert!(mock.proto_handles().is_empty());
    Ok(())
}
