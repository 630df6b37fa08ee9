#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use libnfcee::transport::{MockTransport, NfaEvent};
use libnfcee::{ChipId, EeHandle, EeInfo, EeStatus};
use serial_test::serial;

fn embedded_se_context() -> anyhow::Result<(
    libnfcee::NfcContext<libnfcee::Initialized>,
    libnfcee::transport::MockHandle,
    std::sync::Arc<libnfcee::test_support::RecordingListener>,
)> {
    common::context_with(
        MockTransport::new().with_ees(common::fixtures::both_ees()),
        common::fixtures::fast_config().with_chip(ChipId::Pn66T).build(),
    )
}

#[test]
#[serial]
fn removed_ese_is_power_cycled_and_reactivated() -> anyhow::Result<()> {
    let (ctx, mock, listener) = embedded_se_context()?;
    mock.inject(NfaEvent::NewEe {
        handle: EeHandle::ESE,
        ee_status: EeStatus::Removed,
    });

    assert!(common::wait_until(Duration::from_secs(3), || {
        listener.recovered() == vec![EeHandle::ESE]
    }));
    assert_eq!(mock.standby_history(), vec![false, true]);
    assert_eq!(mock.ee_status(EeHandle::ESE), Some(EeStatus::Active));
    assert!(common::wait_until(Duration::from_secs(1), || {
        ctx.registry().is_active(EeHandle::ESE)
    }));
    assert!(ctx.lifecycle().is_available(EeHandle::ESE));
    Ok(())
}

#[test]
#[serial]
fn removals_during_recovery_fold_into_one_reset() -> anyhow::Result<()> {
    let (ctx, mock, listener) = embedded_se_context()?;
    // keep the recovery busy while the extra removals arrive
    mock.delay("ModeSet", Duration::from_millis(150));
    mock.clear_sent();

    let removed = |handle| NfaEvent::NewEe {
        handle,
        ee_status: EeStatus::Removed,
    };
    let active = |handle| NfaEvent::NewEe {
        handle,
        ee_status: EeStatus::Active,
    };
    mock.inject(removed(EeHandle::ESE));
    mock.inject(active(EeHandle::ESE));
    mock.inject(removed(EeHandle::ESE));
    mock.inject(active(EeHandle::ESE));
    mock.inject(NfaEvent::EeDiscover {
        ees: vec![
            EeInfo::new(EeHandle::ESE, EeStatus::Removed),
            libnfcee::test_support::uicc(),
        ],
    });

    assert!(common::wait_until(Duration::from_secs(3), || {
        !listener.recovered().is_empty()
    }));
    assert!(ctx.lifecycle().wait_for_recovery(Duration::from_secs(2)));
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(listener.recovered(), vec![EeHandle::ESE]);
    assert!(listener.recovery_failed().is_empty());
    assert_eq!(mock.standby_history(), vec![false, true]);
    assert_eq!(mock.count("ModeSet"), 2);
    assert_eq!(mock.ee_status(EeHandle::ESE), Some(EeStatus::Active));
    Ok(())
}

#[test]
#[serial]
fn silent_reactivation_gives_up() -> anyhow::Result<()> {
    let (ctx, mock, listener) = embedded_se_context()?;
    mock.set_silence_activation(true);
    mock.inject(NfaEvent::NewEe {
        handle: EeHandle::ESE,
        ee_status: EeStatus::Removed,
    });

    assert!(common::wait_until(Duration::from_secs(3), || {
        listener.recovery_failed() == vec![EeHandle::ESE]
    }));
    assert!(listener.recovered().is_empty());
    assert!(!ctx.lifecycle().is_available(EeHandle::ESE));
    Ok(())
}

#[test]
#[serial]
fn chips_without_embedded_se_do_not_recover() -> anyhow::Result<()> {
    let (_ctx, mock, listener) = common::context()?;
    mock.inject(NfaEvent::NewEe {
        handle: EeHandle::ESE,
        ee_status: EeStatus::Removed,
    });
    std::thread::sleep(Duration::from_millis(200));
    assert!(mock.standby_history().is_empty());
    assert!(listener.recovered().is_empty());
    Ok(())
}

#[test]
fn shutdown_deactivates_routable_ees() -> anyhow::Result<()> {
    let (ctx, mock, _l) = embedded_se_context()?;
    ctx.on_nfcc_shutdown()?;
    assert_eq!(mock.ee_status(EeHandle::ESE), Some(EeStatus::Inactive));
    assert_eq!(mock.ee_status(EeHandle::UICC), Some(EeStatus::Inactive));
    Ok(())
}
