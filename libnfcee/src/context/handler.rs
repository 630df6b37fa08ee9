// libnfcee/src/context/handler.rs

//! Components shared between the context, the dispatcher thread and the
//! workers, plus the event routing between them.

use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::ce::{FelicaRouting, HostCardEmulation};
use crate::config::RoutingConfig;
use crate::constants::{APP_INIT_SUCCESS, NFCID2_COALESCE_MS, TRANSACTION_GUARD_MS};
use crate::discovery::{DiscoveryCoordinator, DiscoveryRequest};
use crate::dispatch::{CommandChannel, EventHandler};
use crate::ee::{DeferredSink, EeLifecycle, EeRegistry, LifecycleTimeouts, Quirks, TransactionGuard};
use crate::listener::ServiceListener;
use crate::reader::{ReaderSession, ReaderTimings};
use crate::routing::RoutingManager;
use crate::transport::{ActionTrigger, NfaCommand, NfaEvent};
use crate::types::{EeHandle, EeStatus, RfMode, ScreenState};
use crate::utils::{bytes_to_hex_spaced, ms};
use crate::Result;

pub(crate) struct Shared {
    pub(crate) config: RoutingConfig,
    pub(crate) channel: Arc<CommandChannel>,
    pub(crate) registry: Arc<EeRegistry>,
    pub(crate) discovery: Arc<DiscoveryCoordinator>,
    pub(crate) routing: RoutingManager,
    pub(crate) lifecycle: Arc<EeLifecycle>,
    pub(crate) transaction: Arc<TransactionGuard>,
    pub(crate) reader: Arc<ReaderSession>,
    pub(crate) host_ce: HostCardEmulation,
    pub(crate) felica: Arc<FelicaRouting>,
    pub(crate) listener: Arc<dyn ServiceListener>,
    screen: Mutex<Option<ScreenState>>,
}

impl Shared {
    pub(crate) fn new(
        config: RoutingConfig,
        channel: Arc<CommandChannel>,
        listener: Arc<dyn ServiceListener>,
        quirks: Arc<dyn Quirks>,
    ) -> Arc<Self> {
        let registry = Arc::new(EeRegistry::new());
        let discovery = Arc::new(DiscoveryCoordinator::new(Arc::clone(&channel)));
        let routing = RoutingManager::new(
            Arc::clone(&channel),
            Arc::clone(&discovery),
            Arc::clone(&registry),
            Arc::clone(&listener),
            config.clone(),
        );
        let lifecycle = Arc::new(EeLifecycle::new(
            Arc::clone(&channel),
            Arc::clone(&registry),
            quirks,
            Arc::clone(&listener),
            LifecycleTimeouts {
                ack: config.ack_timeout(),
                reactivate: config.reactivate_timeout(),
                transaction_wait: config.transaction_wait(),
            },
        ));
        let reader = ReaderSession::new(
            Arc::clone(&channel),
            Arc::clone(&discovery),
            Arc::clone(&listener),
            config.uicc_listen_tech,
            ReaderTimings::from_config(&config),
        );
        let felica = FelicaRouting::new(
            Arc::clone(&channel),
            Arc::clone(&discovery),
            ms(NFCID2_COALESCE_MS),
        );
        let host_ce = HostCardEmulation::new(Arc::clone(&listener));

        Arc::new_cyclic(|this: &Weak<Shared>| {
            let sink: Weak<dyn DeferredSink> = this.clone();
            Self {
                transaction: TransactionGuard::new(ms(TRANSACTION_GUARD_MS), sink),
                config,
                channel,
                registry,
                discovery,
                routing,
                lifecycle,
                reader,
                host_ce,
                felica,
                listener,
                screen: Mutex::new(None),
            }
        })
    }

    pub(crate) fn screen_state(&self) -> Option<ScreenState> {
        *self.screen.lock()
    }

    pub(crate) fn apply_screen_state(&self, state: ScreenState) -> Result<()> {
        self.channel.request(NfaCommand::SetScreenState(state))?;
        *self.screen.lock() = Some(state);
        debug!("screen state {:?}", state);
        Ok(())
    }

    fn on_ee_status(&self, handle: EeHandle, status: EeStatus) {
        let (_, removed) = self.registry.set_status(handle, status);
        if removed {
            self.on_removed(handle);
        }
    }

    fn on_removed(&self, handle: EeHandle) {
        warn!("ee {} removed", handle);
        if self.lifecycle.quirks().recover_on_removal(handle) {
            self.lifecycle.schedule_recovery(handle);
        }
    }

    fn on_action(&self, handle: EeHandle, trigger: &ActionTrigger) {
        self.transaction.on_ee_action();
        if handle == EeHandle::ESE {
            self.lifecycle.set_contactless(true);
        }
        match trigger {
            ActionTrigger::Select { aid } => {
                self.listener.on_transaction(aid, &[], handle);
            }
            ActionTrigger::AppInit { aid, data } => {
                if data.ends_with(&APP_INIT_SUCCESS) {
                    self.listener.on_transaction(aid, data, handle);
                } else {
                    debug!(
                        "app init from {} without success status: {}",
                        handle,
                        bytes_to_hex_spaced(data)
                    );
                }
            }
            other => debug!("ee {} action {:?}", handle, other),
        }
    }
}

impl EventHandler for Shared {
    fn handle(&self, event: &NfaEvent) {
        match event {
            NfaEvent::EeDiscover { ees } => {
                for handle in self.registry.replace(ees.clone()) {
                    self.on_removed(handle);
                }
            }
            NfaEvent::NewEe { handle, ee_status } => self.on_ee_status(*handle, *ee_status),
            NfaEvent::ModeSet {
                status,
                handle,
                ee_status,
            } if status.is_ok() => self.on_ee_status(*handle, *ee_status),
            NfaEvent::Action { handle, trigger } => self.on_action(*handle, trigger),
            NfaEvent::Connectivity { handle } => self.listener.on_connectivity(*handle),
            NfaEvent::RfField { on } => {
                if !*on {
                    self.lifecycle.set_contactless(false);
                }
                self.transaction.on_rf_field(*on);
                self.listener.on_rf_field(*on);
            }
            NfaEvent::Activated { mode, protocol } => {
                self.transaction.on_activated(*mode, *protocol);
                if *mode == RfMode::Poll {
                    self.reader.on_activated();
                }
            }
            NfaEvent::Deactivated { mode } => {
                if *mode == RfMode::Poll {
                    self.reader.on_deactivated();
                }
            }
            NfaEvent::HostCeActivated => {
                self.transaction.on_ce_activated();
                self.host_ce.on_activated();
            }
            NfaEvent::HostCeDeactivated => {
                self.transaction.on_ce_deactivated();
                self.host_ce.on_deactivated();
            }
            NfaEvent::HostCeData { status, data } => self.host_ce.on_data(*status, data),
            NfaEvent::DiscoverReq { requests } => self.reader.on_discover_req(requests),
            _ => {}
        }
    }
}

impl DeferredSink for Shared {
    fn flush_deferred(&self, screen: Option<ScreenState>, discovery: Option<DiscoveryRequest>) {
        if let Some(state) = screen {
            info!("replaying screen state {:?}", state);
            if let Err(e) = self.apply_screen_state(state) {
                warn!("deferred screen state failed: {}", e);
            }
        }
        if let Some(request) = discovery {
            info!("replaying discovery request {:?}", request);
            if let Err(e) = self.discovery.apply(request) {
                warn!("deferred discovery request failed: {}", e);
            }
        }
    }
}
