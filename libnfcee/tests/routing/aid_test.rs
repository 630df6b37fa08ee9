#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{PPSE_AID, VISA_AID, aid};
use libnfcee::transport::MockTransport;
use libnfcee::{EeHandle, Error, PowerMask, RouteKind};
use proptest::prelude::*;

#[test]
fn payment_aid_routed_to_ese_and_read_back() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    let visa = aid(VISA_AID);
    ctx.add_aid_routing(&visa, 0x4C0, PowerMask::SWITCH_ON, false)?;
    ctx.commit_routing()?;

    let entries = mock.aid_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].handle, EeHandle::ESE);
    assert_eq!(entries[0].aid.as_bytes(), visa.as_slice());

    let table = ctx.get_routing()?;
    let row = table
        .entries
        .iter()
        .find(|e| e.kind == RouteKind::Aid)
        .ok_or_else(|| anyhow::anyhow!("aid row missing"))?;
    assert_eq!(row.value, visa);
    assert_eq!(row.handle, EeHandle::ESE);
    Ok(())
}

#[test]
fn prefix_aid_keeps_prefix_flag() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.add_aid_routing(&aid(PPSE_AID), 0x00, PowerMask::SWITCH_ON, true)?;
    ctx.commit_routing()?;
    assert!(mock.aid_entries()[0].prefix);
    assert_eq!(mock.aid_entries()[0].handle, EeHandle::DH);
    Ok(())
}

#[test]
fn full_table_reports_and_notifies() -> anyhow::Result<()> {
    let (ctx, _mock, listener) = common::context_with(
        MockTransport::new()
            .with_ees(common::fixtures::both_ees())
            .with_aid_capacity(1),
        common::fixtures::fast_config().build(),
    )?;
    ctx.add_aid_routing(&aid(VISA_AID), 0x01, PowerMask::SWITCH_ON, false)?;
    let err = ctx
        .add_aid_routing(&aid(PPSE_AID), 0x01, PowerMask::SWITCH_ON, false)
        .unwrap_err();
    assert!(matches!(err, Error::AidTableFull));
    assert_eq!(listener.table_full_count(), 1);
    assert_eq!(ctx.routing().remaining_aid_capacity(), 0);
    Ok(())
}

#[test]
fn clearing_twice_restores_full_capacity() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.add_aid_routing(&aid(VISA_AID), 0x01, PowerMask::SWITCH_ON, false)?;
    ctx.add_aid_routing(&aid(PPSE_AID), 0x00, PowerMask::SWITCH_ON, false)?;
    ctx.clear_aid_table()?;
    ctx.clear_aid_table()?;
    ctx.commit_routing()?;
    assert!(mock.aid_entries().is_empty());
    assert_eq!(
        ctx.routing().remaining_aid_capacity(),
        ctx.routing().aid_table_max()
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn capacity_tracks_distinct_installed_aids(picks in proptest::collection::vec(0u8..6, 0..12)) {
        let (ctx, mock, _l) = common::context_with(
            MockTransport::new()
                .with_ees(common::fixtures::both_ees())
                .with_aid_capacity(4),
            common::fixtures::fast_config().build(),
        ).unwrap();
        let mut installed = std::collections::HashSet::new();
        for p in picks {
            let bytes = [0xA0, 0x00, 0x00, 0x00, p];
            let result = ctx.add_aid_routing(&bytes, 0x01, PowerMask::SWITCH_ON, false);
            if installed.contains(&p) || installed.len() < 4 {
                prop_assert!(result.is_ok());
                installed.insert(p);
            } else {
                prop_assert!(matches!(result, Err(Error::AidTableFull)));
            }
            prop_assert_eq!(ctx.routing().remaining_aid_capacity(), 4 - installed.len());
        }
        prop_assert_eq!(mock.aid_entries().len(), installed.len());
    }
}
