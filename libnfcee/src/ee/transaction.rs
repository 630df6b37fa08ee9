// libnfcee/src/ee/transaction.rs

//! Guard against reconfiguring the controller in the middle of an
//! off-host or host card-emulation transaction.
//!
//! Screen-state and discovery requests arriving while a transaction is in
//! progress are parked (last one wins) and replayed from a worker once the
//! transaction ends. The end is recognised from the RF field: a field drop
//! after an EE action or CE deactivation starts a short guard window; the
//! field coming back within it means the reader is still talking.

use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::constants::PROTOCOL_NFC_DEP;
use crate::discovery::DiscoveryRequest;
use crate::types::{RfMode, ScreenState};
use crate::utils::Timer;

/// Where the guard is in a card-emulation transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    Default,
    Activated,
    EeAction,
    CeActivated,
    CeDeactivated,
    FieldOff,
    TransStart,
    TransEnd,
}

/// Target for requests replayed after a transaction.
pub trait DeferredSink: Send + Sync {
    fn flush_deferred(&self, screen: Option<ScreenState>, discovery: Option<DiscoveryRequest>);
}

#[derive(Debug, Default)]
struct Inner {
    state: TransactionState,
    screen: Option<ScreenState>,
    discovery: Option<DiscoveryRequest>,
}

/// Tracks an ongoing transaction and parks screen and discovery requests
/// until it ends.
pub struct TransactionGuard {
    inner: Mutex<Inner>,
    timer: Timer,
    window: Duration,
    sink: Weak<dyn DeferredSink>,
    this: Weak<TransactionGuard>,
}

impl TransactionGuard {
    /// `window` is the settle time after field off before deferred requests
    /// are replayed.
    pub fn new(window: Duration, sink: Weak<dyn DeferredSink>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            inner: Mutex::new(Inner::default()),
            timer: Timer::new("transaction-guard"),
            window,
            sink,
            this: this.clone(),
        })
    }

    pub fn state(&self) -> TransactionState {
        self.inner.lock().state
    }

    /// Whether requests are currently being deferred.
    pub fn in_progress(&self) -> bool {
        is_busy(self.state())
    }

    fn set(&self, inner: &mut Inner, next: TransactionState) {
        if inner.state != next {
            debug!("transaction {:?} -> {:?}", inner.state, next);
            inner.state = next;
        }
    }

    /// Listen-mode activation other than NFC-DEP starts a transaction.
    pub fn on_activated(&self, mode: RfMode, protocol: u8) {
        if mode != RfMode::Listen || protocol == PROTOCOL_NFC_DEP {
            return;
        }
        let mut inner = self.inner.lock();
        if matches!(
            inner.state,
            TransactionState::Default | TransactionState::TransEnd
        ) {
            self.set(&mut inner, TransactionState::Activated);
        }
    }

    /// EE action event; an off-host transaction is under way.
    pub fn on_ee_action(&self) {
        let mut inner = self.inner.lock();
        if matches!(
            inner.state,
            TransactionState::Default | TransactionState::Activated
        ) {
            self.set(&mut inner, TransactionState::EeAction);
        }
    }

    /// Host card emulation started.
    pub fn on_ce_activated(&self) {
        let mut inner = self.inner.lock();
        self.set(&mut inner, TransactionState::CeActivated);
    }

    /// Host card emulation ended; the transaction closes with the field.
    pub fn on_ce_deactivated(&self) {
        let mut inner = self.inner.lock();
        self.set(&mut inner, TransactionState::CeDeactivated);
    }

    /// Field off after an action or a host deactivation ends the transaction
    /// once the settle window passes.
    pub fn on_rf_field(&self, on: bool) {
        let mut inner = self.inner.lock();
        match (on, inner.state) {
            (false, TransactionState::EeAction | TransactionState::CeDeactivated) => {
                self.set(&mut inner, TransactionState::FieldOff);
                drop(inner);
                let this = self.this.clone();
                self.timer.arm(self.window, move || {
                    if let Some(guard) = this.upgrade() {
                        guard.cleanup();
                    }
                });
            }
            (true, TransactionState::FieldOff) => {
                self.set(&mut inner, TransactionState::TransStart);
                self.timer.cancel();
            }
            (false, TransactionState::TransStart | TransactionState::Activated) => {
                drop(inner);
                self.cleanup();
            }
            _ => {}
        }
    }

    /// Park a screen-state request if a transaction is running.
    pub fn defer_screen_state(&self, state: ScreenState) -> bool {
        let mut inner = self.inner.lock();
        if is_busy(inner.state) {
            inner.screen = Some(state);
            true
        } else {
            false
        }
    }

    /// Park a discovery request if a transaction is running.
    pub fn defer_discovery(&self, request: DiscoveryRequest) -> bool {
        let mut inner = self.inner.lock();
        if is_busy(inner.state) {
            inner.discovery = Some(request);
            true
        } else {
            false
        }
    }

    /// End the transaction and replay parked requests on a worker.
    pub fn cleanup(&self) {
        self.timer.cancel();
        let (screen, discovery) = {
            let mut inner = self.inner.lock();
            self.set(&mut inner, TransactionState::TransEnd);
            (inner.screen.take(), inner.discovery.take())
        };
        if screen.is_none() && discovery.is_none() {
            self.finish();
            return;
        }

        let sink = self.sink.clone();
        let this = self.this.clone();
        let spawned = thread::Builder::new()
            .name("nfcee-trans-flush".into())
            .spawn(move || {
                if let Some(sink) = sink.upgrade() {
                    sink.flush_deferred(screen, discovery);
                }
                if let Some(guard) = this.upgrade() {
                    guard.finish();
                }
            });
        if let Err(e) = spawned {
            warn!("cannot spawn transaction flush: {}", e);
            self.finish();
        }
    }

    fn finish(&self) {
        let mut inner = self.inner.lock();
        if inner.state == TransactionState::TransEnd {
            self.set(&mut inner, TransactionState::Default);
        }
    }
}

fn is_busy(state: TransactionState) -> bool {
    !matches!(state, TransactionState::Default | TransactionState::TransEnd)
}
