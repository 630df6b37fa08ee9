// Shared helpers for the integration tests.
#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use libnfcee::config::RoutingConfig;
use libnfcee::test_support::RecordingListener;
use libnfcee::transport::{MockHandle, MockTransport};
use libnfcee::{Initialized, NfcContext, NfcContextBuilder};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Initialized context over `mock`, recording every notification.
pub fn context_with(
    mock: MockTransport,
    config: RoutingConfig,
) -> anyhow::Result<(NfcContext<Initialized>, MockHandle, Arc<RecordingListener>)> {
    init_logging();
    let handle = mock.handle();
    let listener = Arc::new(RecordingListener::default());
    let ctx = NfcContextBuilder::new()
        .with_transport(Box::new(mock))
        .with_config(config)
        .with_listener(listener.clone())
        .build_uninitialized()?
        .initialize()?;
    Ok((ctx, handle, listener))
}

/// Context over a controller with both an eSE and a UICC.
pub fn context() -> anyhow::Result<(NfcContext<Initialized>, MockHandle, Arc<RecordingListener>)> {
    context_with(
        MockTransport::new().with_ees(fixtures::both_ees()),
        fixtures::fast_config().build(),
    )
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
