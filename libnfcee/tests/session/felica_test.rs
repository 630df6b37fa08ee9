#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use libnfcee::Error;
use serial_test::serial;

const NFCID2: [u8; 8] = [0x02, 0xFE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01];

#[test]
#[serial]
fn nfcid2_registered_after_coalescing() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.add_nfcid2_routing(&NFCID2, &[0x12, 0xFC], 0)?;
    assert!(common::wait_until(Duration::from_secs(1), || {
        mock.felica_registrations().len() == 1
    }));
    assert!(ctx.felica().entries()[0].handle.is_some());

    assert!(matches!(
        ctx.add_nfcid2_routing(&NFCID2, &[0x12, 0xFC], 0),
        Err(Error::DuplicateNfcid2(_))
    ));

    ctx.remove_nfcid2_routing(&NFCID2)?;
    assert!(common::wait_until(Duration::from_secs(1), || {
        mock.felica_registrations().is_empty()
    }));
    Ok(())
}
