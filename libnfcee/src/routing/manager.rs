// libnfcee/src/routing/manager.rs

//! Listen-mode routing operations.
//!
//! Every change is issued with RF discovery stopped. `set_default_route`
//! is self-contained: it pauses discovery, runs its plan, commits and
//! resumes. Standalone mutations (AID add/remove, single entries) take a
//! discovery hold that stays until the caller commits.
//!
//! Public operations are serialized on one lock, so a commit never lands
//! between the steps of another caller's plan.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::config::RoutingConfig;
use crate::constants::STATUS_BUFFER_FULL;
use crate::discovery::DiscoveryCoordinator;
use crate::dispatch::CommandChannel;
use crate::ee::EeRegistry;
use crate::listener::ServiceListener;
use crate::routing::{
    AidEntry, AidTable, EeView, RouteDescriptor, RoutingPlan, RoutingTable,
    build_clear_plan, build_default_route_plan, build_entry_plan, table,
};
use crate::transport::{NfaCommand, NfaEvent};
use crate::types::{Aid, EeHandle, PowerMask, RouteKind, RouteKindMask};
use crate::{Error, Result};

/// Routing operations against one controller.
pub struct RoutingManager {
    channel: Arc<CommandChannel>,
    discovery: Arc<DiscoveryCoordinator>,
    registry: Arc<EeRegistry>,
    listener: Arc<dyn ServiceListener>,
    config: RoutingConfig,
    aids: Mutex<AidTable>,
    /// Discovery hold taken by uncommitted standalone mutations
    uncommitted: Mutex<bool>,
    /// Held for the whole of each public operation
    op: Mutex<()>,
}

impl RoutingManager {
    /// Sizes the AID mirror from the transport's reported capacity.
    pub fn new(
        channel: Arc<CommandChannel>,
        discovery: Arc<DiscoveryCoordinator>,
        registry: Arc<EeRegistry>,
        listener: Arc<dyn ServiceListener>,
        config: RoutingConfig,
    ) -> Self {
        let capacity = channel.aid_table_capacity();
        Self {
            channel,
            discovery,
            registry,
            listener,
            config,
            aids: Mutex::new(AidTable::new(capacity)),
            uncommitted: Mutex::new(false),
            op: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// AID slots still free in the local mirror.
    pub fn remaining_aid_capacity(&self) -> usize {
        self.aids.lock().remaining()
    }

    /// AID table size reported by the transport.
    pub fn aid_table_max(&self) -> usize {
        self.aids.lock().max()
    }

    /// Mirror entry for `aid`, if one was added and not removed since.
    pub fn installed_aid(&self, aid: &[u8]) -> Option<AidEntry> {
        let aid = Aid::try_from(aid).ok()?;
        self.aids.lock().get(&aid).copied()
    }

    /// Whether standalone changes are waiting for `commit_routing`.
    pub fn has_uncommitted(&self) -> bool {
        *self.uncommitted.lock()
    }

    fn view(&self) -> EeView {
        EeView::from_registry(&self.registry)
    }

    fn run(&self, plan: RoutingPlan) -> Result<()> {
        debug!("routing plan {}", plan);
        for command in plan.into_steps() {
            self.channel.request(command)?;
        }
        Ok(())
    }

    fn commit_now(&self) -> Result<()> {
        self.channel
            .request_with_timeout(NfaCommand::UpdateNow, self.config.commit_timeout())?;
        Ok(())
    }

    /// Take the standalone discovery hold unless one is already held.
    fn hold_for_mutation(&self) -> Result<()> {
        let mut held = self.uncommitted.lock();
        if !*held {
            self.discovery.suspend()?;
            *held = true;
        }
        Ok(())
    }

    fn release_mutation_hold(&self, keep_stopped: bool) -> Result<()> {
        let mut held = self.uncommitted.lock();
        if !*held {
            return Ok(());
        }
        *held = false;
        if keep_stopped {
            self.discovery.resume_keep_stopped()
        } else {
            self.discovery.resume()
        }
    }

    /// Reprogram default technology and protocol routing from the three
    /// packed descriptor bytes, then commit.
    pub fn set_default_route(&self, default_route: u8, proto_route: u8, tech_route: u8) -> Result<()> {
        let default_route = RouteDescriptor::decode(default_route);
        let proto_route = RouteDescriptor::decode(proto_route);
        let tech_route = RouteDescriptor::decode(tech_route);
        let _op = self.op.lock();
        info!(
            "default route: default={} proto={} tech={}",
            default_route.destination, proto_route.destination, tech_route.destination
        );
        let plan = build_default_route_plan(
            default_route,
            proto_route,
            tech_route,
            &self.view(),
            &self.config,
        );

        let pause = self.discovery.pause()?;
        self.run(plan)?;
        self.commit_now()?;
        pause.finish()?;
        self.release_mutation_hold(false)
    }

    /// Route `aid` to `route`. Fails with `AidTableFull` when neither the
    /// mirror nor the controller has room.
    pub fn add_aid_routing(&self, aid: &[u8], route: u16, power: PowerMask, is_prefix: bool) -> Result<()> {
        if !self.config.add_aid_enabled {
            return Err(Error::AidRoutingDisabled);
        }
        let handle = EeHandle::from_route(route).ok_or(Error::InvalidRoute(route))?;
        let aid = Aid::try_from(aid)?;
        let _op = self.op.lock();

        if !self.aids.lock().has_room_for(&aid) {
            warn!("aid table full, {} not added", aid.to_hex());
            self.listener.on_aid_routing_table_full();
            return Err(Error::AidTableFull);
        }

        self.hold_for_mutation()?;
        let command = NfaCommand::AddAidRouting {
            handle,
            aid: aid.clone(),
            power,
            prefix: is_prefix,
        };
        match self.channel.request(command) {
            Ok(_) => {}
            Err(Error::CommandFailed { status, .. }) if status == STATUS_BUFFER_FULL => {
                warn!("controller aid table full at {}", aid.to_hex());
                self.listener.on_aid_routing_table_full();
                return Err(Error::AidTableFull);
            }
            Err(e) => return Err(e),
        }

        debug!("aid {} -> {} power {}", aid.to_hex(), handle, power);
        let entry = AidEntry {
            handle,
            power,
            prefix: is_prefix,
        };
        self.aids.lock().insert(aid, entry).map(|_| ())
    }

    /// Route `aid` to the configured off-host destination.
    pub fn add_offhost_aid_routing(&self, aid: &[u8], power: PowerMask, is_prefix: bool) -> Result<()> {
        let route = u16::from(self.config.default_offhost_route);
        self.add_aid_routing(aid, route, power, is_prefix)
    }

    /// Withdraw `aid` from the controller table and the mirror.
    pub fn remove_aid_routing(&self, aid: &[u8]) -> Result<()> {
        let aid = Aid::try_from(aid)?;
        let _op = self.op.lock();
        self.hold_for_mutation()?;
        let installed = self.aids.lock().contains(&aid);
        match self.channel.request(NfaCommand::RemoveAidRouting { aid: aid.clone() }) {
            Ok(_) => {}
            Err(Error::CommandFailed { .. }) if !installed => {
                debug!("aid {} was not installed", aid.to_hex());
            }
            Err(e) => return Err(e),
        }
        self.aids.lock().remove(&aid);
        Ok(())
    }

    /// Remove every AID entry and reset the remaining capacity.
    pub fn clear_aid_table(&self) -> Result<()> {
        let _op = self.op.lock();
        self.clear_aids()
    }

    fn clear_aids(&self) -> Result<()> {
        self.hold_for_mutation()?;
        self.channel.request(NfaCommand::RemoveAidRouting {
            aid: Aid::remove_all(),
        })?;
        self.aids.lock().clear();
        info!("aid table cleared");
        Ok(())
    }

    /// Route one technology or protocol value to `route`.
    pub fn set_routing_entry(&self, kind: RouteKind, value: u8, route: u16, power: PowerMask) -> Result<()> {
        let _op = self.op.lock();
        let plan = build_entry_plan(kind, value, route, power, &self.view(), &self.config)?;
        self.hold_for_mutation()?;
        self.run(plan)
    }

    /// Zero technology and/or protocol routing; the AID bit also empties
    /// the AID table.
    pub fn clear_routing_entry(&self, kinds: RouteKindMask) -> Result<()> {
        let _op = self.op.lock();
        let plan = build_clear_plan(kinds);
        if !plan.is_empty() {
            self.hold_for_mutation()?;
            self.run(plan)?;
        }
        if kinds.contains(RouteKindMask::AID) {
            self.clear_aids()?;
        }
        Ok(())
    }

    /// Commit pending changes and restart discovery if it was running.
    pub fn commit_routing(&self) -> Result<()> {
        self.commit(false)
    }

    /// Commit pending changes leaving discovery stopped.
    pub fn commit_routing_keep_stopped(&self) -> Result<()> {
        self.commit(true)
    }

    fn commit(&self, keep_stopped: bool) -> Result<()> {
        let _op = self.op.lock();
        let held = *self.uncommitted.lock();
        if held {
            let committed = self.commit_now();
            self.release_mutation_hold(keep_stopped)?;
            return committed;
        }
        let pause = self.discovery.pause()?;
        self.commit_now()?;
        if keep_stopped {
            pause.keep_stopped()
        } else {
            pause.finish()
        }
    }

    /// Read back and decode the controller's routing table.
    pub fn get_routing(&self) -> Result<RoutingTable> {
        match self.channel.request(NfaCommand::GetRouting)? {
            NfaEvent::RoutingTable { tlvs, .. } => table::decode(&tlvs),
            other => Err(Error::RoutingFormat(format!(
                "unexpected reply {:?}",
                other.ack_kind()
            ))),
        }
    }
}
