#[path = "../common/mod.rs"]
mod common;

use libnfcee::transport::{MockHandle, MockTransport};
use libnfcee::{EeHandle, ProtoMask, TechMask};

const HANDLES: [EeHandle; 3] = [EeHandle::DH, EeHandle::UICC, EeHandle::ESE];

/// Handles whose technology table carries `tech` in any power state.
fn owners(mock: &MockHandle, tech: TechMask) -> Vec<EeHandle> {
    HANDLES
        .into_iter()
        .filter(|h| mock.tech_routing(*h).any().contains(tech))
        .collect()
}

#[test]
fn host_default_keeps_technologies_exclusive() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.set_default_route(0x01, 0x21, 0x01)?;

    assert_eq!(owners(&mock, TechMask::A), vec![EeHandle::DH]);
    assert_eq!(owners(&mock, TechMask::B), vec![EeHandle::DH]);
    assert_eq!(owners(&mock, TechMask::F), vec![EeHandle::UICC]);
    assert_eq!(mock.proto_routing(EeHandle::ESE).switch_on, ProtoMask::ISO_DEP);
    assert!(mock.proto_routing(EeHandle::DH).switch_on.contains(ProtoMask::ISO7816));
    assert_eq!(mock.count("RegisterAidWildcardOnHost"), 1);
    assert_eq!(mock.commits(), 1);
    Ok(())
}

#[test]
fn rerouting_moves_technologies_off_the_host() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.set_default_route(0x01, 0x21, 0x01)?;
    ctx.set_default_route(0x41, 0x41, 0x41)?;

    for tech in [TechMask::A, TechMask::B, TechMask::F] {
        assert_eq!(owners(&mock, tech), vec![EeHandle::UICC], "tech {}", tech);
    }
    assert!(mock.tech_routing(EeHandle::DH).is_empty());
    assert_eq!(mock.commits(), 2);
    Ok(())
}

#[test]
fn technologies_limited_to_what_the_ee_supports() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context_with(
        MockTransport::new().with_ees(vec![common::fixtures::ese_type_a()]),
        common::fixtures::fast_config().with_forwarding(true).build(),
    )?;
    ctx.set_default_route(0x01, 0x21, 0x21)?;

    let ese = mock.tech_routing(EeHandle::ESE);
    assert_eq!(ese.switch_on, TechMask::A);
    assert_eq!(owners(&mock, TechMask::A), vec![EeHandle::ESE]);
    assert_eq!(owners(&mock, TechMask::B), vec![EeHandle::DH]);
    Ok(())
}

#[test]
fn default_route_never_mutates_while_discovering() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.enable_discovery(TechMask::ALL, false)?;
    assert!(mock.discovery_started());

    ctx.set_default_route(0x01, 0x21, 0x01)?;
    assert_eq!(mock.mutations_while_discovering(), 0);
    assert!(mock.discovery_started());
    Ok(())
}

#[test]
fn uicc_listen_reconfigured_around_routing() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.set_default_route(0x01, 0x21, 0x01)?;
    assert_eq!(
        mock.uicc_listen_history(),
        vec![(EeHandle::UICC, TechMask::NONE), (EeHandle::UICC, TechMask::ALL)]
    );
    Ok(())
}
