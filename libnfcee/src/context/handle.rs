// libnfcee/src/context/handle.rs

use std::marker::PhantomData;
use std::sync::Arc;

use crossbeam_channel::unbounded;
use log::{info, warn};

use crate::ce::FelicaRouting;
use crate::config::RoutingConfig;
use crate::context::handler::Shared;
use crate::discovery::{DiscoveryCoordinator, DiscoveryRequest};
use crate::dispatch::{CommandChannel, Dispatcher, EventHandler, PendingTable};
use crate::ee::{EeLifecycle, EeRegistry, Quirks, TransactionGuard};
use crate::listener::ServiceListener;
use crate::reader::ReaderSession;
use crate::routing::{RoutingManager, RoutingTable};
use crate::transport::{NfaCommand, Transport};
use crate::types::{EeHandle, PowerMask, RouteKind, RouteKindMask, ScreenState, TechMask};
use crate::Result;

/// Type-state markers
pub struct Uninitialized;
/// Registered for EE events with the registry loaded.
pub struct Initialized;

/// Running event thread plus the shared components. Dropping it cancels
/// outstanding waits and stops the dispatcher.
struct Session {
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.channel.shutdown();
        self.dispatcher.stop();
    }
}

/// Owner of every routing and EE component for one controller.
pub struct NfcContext<State = Uninitialized> {
    session: Session,
    _state: PhantomData<State>,
}

impl NfcContext<Uninitialized> {
    /// Attach `transport` and start the event thread. No command is sent
    /// until `initialize`.
    pub fn new_with_transport(
        mut transport: Box<dyn Transport>,
        config: RoutingConfig,
        listener: Arc<dyn ServiceListener>,
        quirks: Arc<dyn Quirks>,
    ) -> Result<Self> {
        let (tx, rx) = unbounded();
        transport.attach(tx)?;
        let pending = Arc::new(PendingTable::new());
        let channel = Arc::new(CommandChannel::new(
            transport,
            Arc::clone(&pending),
            config.ack_timeout(),
        ));
        info!("nfc context: chip {:?}, quirks {}", config.chip, quirks.name());
        let shared = Shared::new(config, channel, listener, quirks);
        let handler: Arc<dyn EventHandler> = Arc::clone(&shared) as Arc<dyn EventHandler>;
        let dispatcher = Dispatcher::spawn(rx, pending, handler)?;
        Ok(Self {
            session: Session { shared, dispatcher },
            _state: PhantomData,
        })
    }

    /// Register for EE events and load the EE registry.
    pub fn initialize(self) -> Result<NfcContext<Initialized>> {
        let shared = &self.session.shared;
        shared.channel.request(NfaCommand::RegisterEeCallback)?;
        let removed = shared.registry.refresh(&shared.channel);
        if !removed.is_empty() {
            warn!("ees removed at start: {:?}", removed);
        }
        info!("nfc context ready, {} ee(s)", shared.registry.len());
        Ok(NfcContext {
            session: self.session,
            _state: PhantomData,
        })
    }
}

impl<S> NfcContext<S> {
    /// Configuration the context was built with.
    pub fn config(&self) -> &RoutingConfig {
        &self.session.shared.config
    }

    /// Current EE snapshot.
    pub fn registry(&self) -> &EeRegistry {
        &self.session.shared.registry
    }
}

impl NfcContext<Initialized> {
    fn shared(&self) -> &Shared {
        &self.session.shared
    }

    /// Routing operations.
    pub fn routing(&self) -> &RoutingManager {
        &self.shared().routing
    }

    /// Activation bookkeeping and reset recovery.
    pub fn lifecycle(&self) -> &Arc<EeLifecycle> {
        &self.shared().lifecycle
    }

    /// RF discovery holds and polling.
    pub fn discovery(&self) -> &DiscoveryCoordinator {
        &self.shared().discovery
    }

    /// Guard that defers screen and discovery changes during a transaction.
    pub fn transaction(&self) -> &TransactionGuard {
        &self.shared().transaction
    }

    /// Reader-mode-over-SWP session.
    pub fn reader(&self) -> &ReaderSession {
        &self.shared().reader
    }

    /// Host Felica NFCID2 registrations.
    pub fn felica(&self) -> &FelicaRouting {
        &self.shared().felica
    }

    pub fn listener(&self) -> &Arc<dyn ServiceListener> {
        &self.shared().listener
    }

    /// Route `aid` to the EE named by `route`, a generic id or a handle.
    /// The change takes effect on `commit_routing`.
    pub fn add_aid_routing(&self, aid: &[u8], route: u16, power: PowerMask, is_prefix: bool) -> Result<()> {
        self.routing().add_aid_routing(aid, route, power, is_prefix)
    }

    /// Route `aid` to the configured off-host EE.
    pub fn add_offhost_aid_routing(&self, aid: &[u8], power: PowerMask, is_prefix: bool) -> Result<()> {
        self.routing().add_offhost_aid_routing(aid, power, is_prefix)
    }

    /// Withdraw `aid`. Removing an AID that was never added succeeds.
    pub fn remove_aid_routing(&self, aid: &[u8]) -> Result<()> {
        self.routing().remove_aid_routing(aid)
    }

    /// Reprogram default technology and protocol routing from three packed
    /// descriptor bytes and commit.
    pub fn set_default_route(&self, default_route: u8, proto_route: u8, tech_route: u8) -> Result<()> {
        self.routing()
            .set_default_route(default_route, proto_route, tech_route)
    }

    /// Remove every AID entry.
    pub fn clear_aid_table(&self) -> Result<()> {
        self.routing().clear_aid_table()
    }

    /// Route one technology or protocol value. Inactive EEs fall back to the
    /// host.
    pub fn set_routing_entry(&self, kind: RouteKind, value: u8, route: u16, power: PowerMask) -> Result<()> {
        self.routing().set_routing_entry(kind, value, route, power)
    }

    /// Zero the routing entries of the given kinds.
    pub fn clear_routing_entry(&self, kinds: RouteKindMask) -> Result<()> {
        self.routing().clear_routing_entry(kinds)
    }

    /// Commit pending routing changes and restart discovery if it was running.
    pub fn commit_routing(&self) -> Result<()> {
        self.routing().commit_routing()
    }

    /// Read back the routing table held by the controller.
    pub fn get_routing(&self) -> Result<RoutingTable> {
        self.routing().get_routing()
    }

    /// Activate `handle`, counting nested activations.
    pub fn activate_ee(&self, handle: EeHandle) -> Result<()> {
        self.lifecycle().activate(handle)
    }

    /// Drop one activation of `handle`; the last one deactivates it.
    pub fn deactivate_ee(&self, handle: EeHandle) -> Result<()> {
        self.lifecycle().deactivate(handle)
    }

    /// Apply a screen state, or park it until the running transaction ends.
    pub fn set_screen_state(&self, state: ScreenState) -> Result<()> {
        if self.transaction().defer_screen_state(state) {
            info!("screen state {:?} deferred by transaction", state);
            return Ok(());
        }
        self.shared().apply_screen_state(state)
    }

    /// Last screen state sent to the controller.
    pub fn screen_state(&self) -> Option<ScreenState> {
        self.shared().screen_state()
    }

    /// Enable polling for `tech`, deferred while a transaction runs.
    pub fn enable_discovery(&self, tech: TechMask, reader_mode: bool) -> Result<()> {
        self.request_discovery(DiscoveryRequest::Enable { tech, reader_mode })
    }

    /// Disable polling, deferred while a transaction runs.
    pub fn disable_discovery(&self) -> Result<()> {
        self.request_discovery(DiscoveryRequest::Disable)
    }

    fn request_discovery(&self, request: DiscoveryRequest) -> Result<()> {
        if self.transaction().defer_discovery(request) {
            info!("discovery request {:?} deferred by transaction", request);
            return Ok(());
        }
        self.discovery().apply(request)
    }

    /// Start the reader mode requested by a UICC.
    pub fn start_reader_mode(&self) -> Result<()> {
        self.reader().start()
    }

    /// Stop reader mode and restore listen configuration.
    pub fn stop_reader_mode(&self) -> Result<()> {
        self.reader().stop()
    }

    /// Queue a host Felica registration for `nfcid2` with `system_code`.
    pub fn add_nfcid2_routing(&self, nfcid2: &[u8], system_code: &[u8], opt: u8) -> Result<()> {
        self.felica().add_nfcid2_routing(nfcid2, system_code, opt)
    }

    /// Queue the removal of a registered `nfcid2`.
    pub fn remove_nfcid2_routing(&self, nfcid2: &[u8]) -> Result<()> {
        self.felica().remove_nfcid2_routing(nfcid2)
    }

    /// Deactivate every routable EE ahead of controller power-down.
    pub fn on_nfcc_shutdown(&self) -> Result<()> {
        self.lifecycle().on_nfcc_shutdown()
    }

    /// Stop the event thread and cancel outstanding waits.
    pub fn shutdown(self) {
        info!("nfc context shutting down");
        drop(self.session);
    }
}

#[cfg(feature = "diagnostics")]
pub use diagnostics::Diagnostics;

#[cfg(feature = "diagnostics")]
mod diagnostics {
    use super::*;
    use crate::ee::{LifecycleState, TransactionState};
    use crate::reader::ReaderSwp;
    use crate::types::EeInfo;

    /// Point-in-time view of the session state
    #[derive(Debug, Clone)]
    pub struct Diagnostics {
        pub ees: Vec<EeInfo>,
        pub aid_remaining: usize,
        pub aid_max: usize,
        pub discovery_started: bool,
        pub reader: ReaderSwp,
        pub lifecycle: LifecycleState,
        pub ee_flags: u8,
        pub transaction: TransactionState,
        pub screen: Option<ScreenState>,
    }

    impl NfcContext<Initialized> {
        /// Capture the current state for logging or a bug report.
        pub fn snapshot(&self) -> Diagnostics {
            let shared = self.shared();
            Diagnostics {
                ees: shared.registry.snapshot().as_ref().clone(),
                aid_remaining: shared.routing.remaining_aid_capacity(),
                aid_max: shared.routing.aid_table_max(),
                discovery_started: shared.discovery.is_started(),
                reader: shared.reader.snapshot(),
                lifecycle: shared.lifecycle.state(),
                ee_flags: shared.lifecycle.flags(),
                transaction: shared.transaction.state(),
                screen: shared.screen_state(),
            }
        }
    }
}
