// libnfcee/src/ee/registry.rs

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::dispatch::CommandChannel;
use crate::transport::{NfaCommand, NfaEvent};
use crate::types::{EeHandle, EeInfo, EeStatus, GenericEeId, TechMask};

#[derive(Debug, Default)]
struct Inner {
    ees: Arc<Vec<EeInfo>>,
    /// Handles seen active at least once; removal only matters after that
    seen_active: HashSet<EeHandle>,
}

/// Snapshot of the execution environments known to the controller.
///
/// The list is replaced wholesale by every discover result; readers get a
/// cheap `Arc` clone of the current snapshot.
#[derive(Debug, Default)]
pub struct EeRegistry {
    inner: RwLock<Inner>,
}

impl EeRegistry {
    /// Empty registry; `refresh` or `replace` fills it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current EE list. Cheap to clone and never torn.
    pub fn snapshot(&self) -> Arc<Vec<EeInfo>> {
        Arc::clone(&self.inner.read().ees)
    }

    /// Query the controller for all EEs and replace the snapshot. A failed
    /// query leaves an empty registry, which callers treat as host-only.
    pub fn refresh(&self, channel: &CommandChannel) -> Vec<EeHandle> {
        match channel.request(NfaCommand::GetEeInfo) {
            Ok(NfaEvent::EeInfo { ees }) => {
                info!("ee registry refreshed: {} entries", ees.len());
                self.replace(ees)
            }
            Ok(other) => {
                warn!("unexpected ee info reply: {:?}", other);
                self.replace(Vec::new())
            }
            Err(e) => {
                warn!("ee info query failed, assuming host only: {}", e);
                self.replace(Vec::new())
            }
        }
    }

    /// Install a discover snapshot. Returns the handles that went from
    /// active to removed.
    pub fn replace(&self, ees: Vec<EeInfo>) -> Vec<EeHandle> {
        let mut inner = self.inner.write();
        let removed: Vec<EeHandle> = ees
            .iter()
            .filter(|e| e.status == EeStatus::Removed && inner.seen_active.contains(&e.handle))
            .map(|e| e.handle)
            .collect();
        for e in ees.iter().filter(|e| e.status == EeStatus::Active) {
            inner.seen_active.insert(e.handle);
        }
        for h in &removed {
            inner.seen_active.remove(h);
        }
        inner.ees = Arc::new(ees);
        removed
    }

    /// Apply a status change from a new-EE or mode-set event. Returns the
    /// previous status and whether this was a removal of an active EE.
    pub fn set_status(&self, handle: EeHandle, status: EeStatus) -> (Option<EeStatus>, bool) {
        let mut inner = self.inner.write();
        let mut ees = (*inner.ees).clone();
        let previous = match ees.iter_mut().find(|e| e.handle == handle) {
            Some(e) => Some(std::mem::replace(&mut e.status, status)),
            None => {
                ees.push(EeInfo::new(handle, status));
                None
            }
        };
        let removed_after_active =
            status == EeStatus::Removed && inner.seen_active.remove(&handle);
        if status == EeStatus::Active {
            inner.seen_active.insert(handle);
        }
        inner.ees = Arc::new(ees);
        debug!("ee {} status {:?} -> {:?}", handle, previous, status);
        (previous, removed_after_active)
    }

    /// Info for `handle`, if the controller reported it.
    pub fn get(&self, handle: EeHandle) -> Option<EeInfo> {
        self.inner
            .read()
            .ees
            .iter()
            .find(|e| e.handle == handle)
            .cloned()
    }

    /// Last reported status of `handle`.
    pub fn status(&self, handle: EeHandle) -> Option<EeStatus> {
        self.inner
            .read()
            .ees
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.status)
    }

    /// Whether `handle` is reported and active.
    pub fn is_active(&self, handle: EeHandle) -> bool {
        self.status(handle) == Some(EeStatus::Active)
    }

    /// Generic class of `handle`, `Invalid` for unknown EEs.
    pub fn lookup_generic_id(&self, handle: EeHandle) -> GenericEeId {
        handle.generic_id()
    }

    /// Handle of the first reported EE of class `id`.
    pub fn handle_for_generic_id(&self, id: GenericEeId) -> Option<EeHandle> {
        id.handle()
    }

    /// Listen technologies `handle` can take. The host takes all of them;
    /// unknown handles take none.
    pub fn supported_technology(&self, handle: EeHandle) -> TechMask {
        if handle.is_host() {
            return TechMask::ALL;
        }
        self.inner
            .read()
            .ees
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.supported_technology())
            .unwrap_or(TechMask::NONE)
    }

    /// Handles that may carry routing entries.
    pub fn active_handles(&self) -> Vec<EeHandle> {
        self.inner
            .read()
            .ees
            .iter()
            .filter(|e| e.is_routable())
            .map(|e| e.handle)
            .collect()
    }

    /// Number of reported EEs.
    pub fn len(&self) -> usize {
        self.inner.read().ees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
