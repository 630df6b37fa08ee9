#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::fixtures::{VISA_AID, aid};
use libnfcee::transport::{ActionTrigger, NfaEvent};
use libnfcee::{EeHandle, ScreenState, TechMask};
use serial_test::serial;

fn select_from_ese() -> NfaEvent {
    NfaEvent::Action {
        handle: EeHandle::ESE,
        trigger: ActionTrigger::Select { aid: aid(VISA_AID) },
    }
}

#[test]
fn screen_state_applied_immediately_when_idle() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.set_screen_state(ScreenState::Unlocked)?;
    assert_eq!(mock.screen_states(), vec![ScreenState::Unlocked]);
    assert_eq!(ctx.screen_state(), Some(ScreenState::Unlocked));
    Ok(())
}

#[test]
#[serial]
fn screen_state_deferred_until_field_drops() -> anyhow::Result<()> {
    let (ctx, mock, listener) = common::context()?;
    mock.inject(select_from_ese());
    assert!(common::wait_until(Duration::from_secs(1), || {
        ctx.transaction().in_progress()
    }));

    ctx.set_screen_state(ScreenState::Off)?;
    assert!(mock.screen_states().is_empty());
    assert_eq!(ctx.screen_state(), None);

    mock.inject(NfaEvent::RfField { on: false });
    assert!(common::wait_until(Duration::from_secs(1), || {
        mock.screen_states() == vec![ScreenState::Off]
    }));
    assert!(common::wait_until(Duration::from_secs(1), || {
        !ctx.transaction().in_progress()
    }));
    assert_eq!(
        listener.transactions(),
        vec![(aid(VISA_AID), Vec::new(), EeHandle::ESE)]
    );
    assert_eq!(listener.rf_fields(), vec![false]);
    Ok(())
}

#[test]
#[serial]
fn last_deferred_request_wins() -> anyhow::Result<()> {
    let (ctx, mock, _l) = common::context()?;
    ctx.enable_discovery(TechMask::ALL, false)?;
    mock.inject(select_from_ese());
    assert!(common::wait_until(Duration::from_secs(1), || {
        ctx.transaction().in_progress()
    }));

    ctx.set_screen_state(ScreenState::Off)?;
    ctx.set_screen_state(ScreenState::Locked)?;
    ctx.disable_discovery()?;
    assert!(mock.discovery_started());

    mock.inject(NfaEvent::RfField { on: false });
    assert!(common::wait_until(Duration::from_secs(1), || {
        !mock.discovery_started()
    }));
    assert_eq!(mock.screen_states(), vec![ScreenState::Locked]);
    Ok(())
}

#[test]
fn app_init_reported_only_on_success() -> anyhow::Result<()> {
    let (_ctx, mock, listener) = common::context()?;
    let visa = aid(VISA_AID);
    mock.inject(NfaEvent::Action {
        handle: EeHandle::UICC,
        trigger: ActionTrigger::AppInit {
            aid: visa.clone(),
            data: vec![0x01, 0x6A, 0x82],
        },
    });
    mock.inject(NfaEvent::Action {
        handle: EeHandle::UICC,
        trigger: ActionTrigger::AppInit {
            aid: visa.clone(),
            data: vec![0x01, 0x90, 0x00],
        },
    });
    mock.inject(NfaEvent::Connectivity {
        handle: EeHandle::UICC,
    });
    assert!(common::wait_until(Duration::from_secs(1), || {
        listener.connectivity() == vec![EeHandle::UICC]
    }));
    assert_eq!(
        listener.transactions(),
        vec![(visa, vec![0x01, 0x90, 0x00], EeHandle::UICC)]
    );
    Ok(())
}
