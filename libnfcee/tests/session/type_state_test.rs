#[path = "../common/mod.rs"]
mod common;

use libnfcee::transport::MockTransport;
use libnfcee::{ChipId, Error, NfcContextBuilder, RoutingConfigBuilder};

#[test]
fn builder_without_transport_fails() {
    assert!(matches!(
        NfcContextBuilder::new().build_uninitialized(),
        Err(Error::TransportMissing)
    ));
}

#[test]
fn initialize_transitions_and_keeps_config() -> anyhow::Result<()> {
    let mock = MockTransport::new().with_ees(common::fixtures::both_ees());
    let handle = mock.handle();
    let ctx = NfcContextBuilder::new()
        .with_transport(Box::new(mock))
        .with_config(RoutingConfigBuilder::new().with_chip(ChipId::Pn65T).build())
        .build_uninitialized()?;

    // nothing is sent before initialize
    assert!(handle.sent().is_empty());
    assert!(ctx.registry().is_empty());

    let ctx = ctx.initialize()?;
    assert_eq!(ctx.config().chip, ChipId::Pn65T);
    assert_eq!(ctx.registry().len(), 2);
    Ok(())
}

#[test]
fn failed_ee_query_leaves_host_only_registry() -> anyhow::Result<()> {
    let mock = MockTransport::new().with_ees(common::fixtures::both_ees());
    mock.handle().fail("GetEeInfo");
    let (ctx, _mock, _l) = common::context_with(mock, common::fixtures::fast_config().build())?;
    assert!(ctx.registry().is_empty());
    Ok(())
}

#[test]
fn shutdown_detaches_transport() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.shutdown();
    // events injected after shutdown go nowhere
    mock.inject(libnfcee::transport::NfaEvent::RfField { on: true });
    Ok(())
}
