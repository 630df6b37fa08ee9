// libnfcee/src/ee/lifecycle.rs

//! EE activation, wired/contactless access flags and the removal recovery
//! worker.
//!
//! The lifecycle lock serializes wired sessions against resets. A reset
//! holds it from before the deactivation until the reactivation result
//! arrives or its bounded wait expires.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::dispatch::CommandChannel;
use crate::ee::quirks::Quirks;
use crate::ee::registry::EeRegistry;
use crate::listener::ServiceListener;
use crate::transport::{NfaCommand, NfaEvent};
use crate::types::{EeHandle, EeMode, EeStatus};
use crate::{Error, Result};

/// Access flag bits
pub const TRANS_IDLE: u8 = 0x00;
/// Flag bits reported by `EeLifecycle::flags`
pub const TRANS_WIRED_ONGOING: u8 = 0x01;
pub const TRANS_CL_ONGOING: u8 = 0x02;
pub const RESET_BLOCKED: u8 = 0x04;

/// Coarse lifecycle state, derived from the flags and the recovery worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    WiredTransactionOngoing,
    ContactlessTransactionOngoing,
    ResetInProgress,
}

#[derive(Debug, Default)]
struct Recovery {
    current: Option<EeHandle>,
    queue: VecDeque<EeHandle>,
}

/// Timing knobs for the lifecycle
#[derive(Debug, Clone, Copy)]
pub struct LifecycleTimeouts {
    pub ack: Duration,
    pub reactivate: Duration,
    pub transaction_wait: Duration,
}

/// Reference-counted activation, transaction flags and reset recovery
/// for the routable EEs.
pub struct EeLifecycle {
    channel: Arc<CommandChannel>,
    registry: Arc<EeRegistry>,
    quirks: Arc<dyn Quirks>,
    listener: Arc<dyn ServiceListener>,
    timeouts: LifecycleTimeouts,
    flags: Mutex<u8>,
    flags_cond: Condvar,
    lock: Mutex<()>,
    selections: Mutex<HashMap<EeHandle, usize>>,
    recovery: Mutex<Recovery>,
    recovery_cond: Condvar,
    unavailable: Mutex<HashSet<EeHandle>>,
}

impl EeLifecycle {
    /// Recovery and mode-set waits are bounded by `timeouts`.
    pub fn new(
        channel: Arc<CommandChannel>,
        registry: Arc<EeRegistry>,
        quirks: Arc<dyn Quirks>,
        listener: Arc<dyn ServiceListener>,
        timeouts: LifecycleTimeouts,
    ) -> Self {
        Self {
            channel,
            registry,
            quirks,
            listener,
            timeouts,
            flags: Mutex::new(TRANS_IDLE),
            flags_cond: Condvar::new(),
            lock: Mutex::new(()),
            selections: Mutex::new(HashMap::new()),
            recovery: Mutex::new(Recovery::default()),
            recovery_cond: Condvar::new(),
            unavailable: Mutex::new(HashSet::new()),
        }
    }

    /// Chip policy in use.
    pub fn quirks(&self) -> &dyn Quirks {
        self.quirks.as_ref()
    }

    /// Select `handle`. The mode-set is only issued for the first selection
    /// of an EE that is not already active.
    pub fn activate(&self, handle: EeHandle) -> Result<()> {
        self.check_known(handle)?;
        let first = {
            let mut sel = self.selections.lock();
            let n = sel.entry(handle).or_insert(0);
            *n += 1;
            *n == 1
        };
        if first && !self.registry.is_active(handle) {
            if let Err(e) = self.mode_set(handle, EeMode::Activate) {
                self.unselect(handle);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drop one selection of `handle`; the EE is only deactivated when the
    /// last selection goes.
    pub fn deactivate(&self, handle: EeHandle) -> Result<()> {
        self.check_known(handle)?;
        let remaining = {
            let mut sel = self.selections.lock();
            match sel.get_mut(&handle) {
                Some(n) if *n > 1 => {
                    *n -= 1;
                    *n
                }
                _ => {
                    sel.remove(&handle);
                    0
                }
            }
        };
        if remaining > 0 {
            debug!("ee {} still selected {} time(s)", handle, remaining);
            return Ok(());
        }
        self.mode_set(handle, EeMode::Deactivate).map(|_| ())
    }

    /// Outstanding activations of `handle`.
    pub fn selections(&self, handle: EeHandle) -> usize {
        self.selections.lock().get(&handle).copied().unwrap_or(0)
    }

    fn unselect(&self, handle: EeHandle) {
        let mut sel = self.selections.lock();
        if let Some(n) = sel.get_mut(&handle) {
            *n = n.saturating_sub(1);
            if *n == 0 {
                sel.remove(&handle);
            }
        }
    }

    fn check_known(&self, handle: EeHandle) -> Result<()> {
        if self.registry.get(handle).is_none() {
            return Err(Error::UnknownEe {
                handle: handle.as_u16(),
            });
        }
        Ok(())
    }

    /// Issue a mode-set and wait for its result. A deactivation first waits
    /// for wired and contactless activity to finish, flagging the wait as
    /// `RESET_BLOCKED`.
    pub fn mode_set(&self, handle: EeHandle, mode: EeMode) -> Result<EeStatus> {
        self.mode_set_with_timeout(handle, mode, self.timeouts.ack)
    }

    fn mode_set_with_timeout(
        &self,
        handle: EeHandle,
        mode: EeMode,
        timeout: Duration,
    ) -> Result<EeStatus> {
        if mode == EeMode::Deactivate {
            self.wait_for_idle();
        }
        let event = self
            .channel
            .request_with_timeout(NfaCommand::ModeSet { handle, mode }, timeout)?;
        let status = match event {
            NfaEvent::ModeSet { ee_status, .. } => ee_status,
            _ => EeStatus::Other(0xFF),
        };
        info!("ee {} mode-set {:?} -> {:?}", handle, mode, status);
        Ok(status)
    }

    /// Block while a wired or contactless transaction is flagged, bounded
    /// by the transaction wait. Returns false when the bound expired.
    fn wait_for_idle(&self) -> bool {
        let deadline = Instant::now() + self.timeouts.transaction_wait;
        let mut flags = self.flags.lock();
        if *flags & (TRANS_WIRED_ONGOING | TRANS_CL_ONGOING) == 0 {
            return true;
        }
        *flags |= RESET_BLOCKED;
        debug!("reset blocked, flags={:#04x}", *flags);
        while *flags & (TRANS_WIRED_ONGOING | TRANS_CL_ONGOING) != 0 {
            if self.flags_cond.wait_until(&mut flags, deadline).timed_out() {
                warn!("transaction still flagged ({:#04x}), proceeding", *flags);
                *flags &= !RESET_BLOCKED;
                return false;
            }
        }
        *flags &= !RESET_BLOCKED;
        true
    }

    /// Raw transaction and reset flags.
    pub fn flags(&self) -> u8 {
        *self.flags.lock()
    }

    /// Mark contactless activity on the embedded SE.
    pub fn set_contactless(&self, on: bool) {
        let mut flags = self.flags.lock();
        if on {
            *flags |= TRANS_CL_ONGOING;
        } else if *flags & TRANS_CL_ONGOING != 0 {
            *flags &= !TRANS_CL_ONGOING;
            self.flags_cond.notify_all();
        }
    }

    /// Open a wired (APDU) session. The lifecycle lock is held until the
    /// returned guard drops, so no reset can start meanwhile.
    pub fn begin_wired(&self) -> WiredSession<'_> {
        let lock = self.lock.lock();
        *self.flags.lock() |= TRANS_WIRED_ONGOING;
        WiredSession {
            lifecycle: self,
            _lock: lock,
        }
    }

    fn end_wired(&self) {
        let mut flags = self.flags.lock();
        *flags &= !TRANS_WIRED_ONGOING;
        self.flags_cond.notify_all();
    }

    /// Coarse state derived from the flags and the recovery worker.
    pub fn state(&self) -> LifecycleState {
        if self.recovery.lock().current.is_some() {
            return LifecycleState::ResetInProgress;
        }
        let flags = self.flags();
        if flags & TRANS_WIRED_ONGOING != 0 {
            LifecycleState::WiredTransactionOngoing
        } else if flags & TRANS_CL_ONGOING != 0 {
            LifecycleState::ContactlessTransactionOngoing
        } else {
            LifecycleState::Idle
        }
    }

    /// False after a recovery of `handle` gave up.
    pub fn is_available(&self, handle: EeHandle) -> bool {
        !self.unavailable.lock().contains(&handle)
    }

    /// Queue a power-cycle recovery of `handle`. A request for the EE being
    /// recovered right now, or already queued, is folded into that one.
    pub fn schedule_recovery(self: &Arc<Self>, handle: EeHandle) {
        let mut rec = self.recovery.lock();
        if rec.current == Some(handle) || rec.queue.contains(&handle) {
            debug!("recovery of {} already pending", handle);
            return;
        }
        if rec.current.is_some() {
            rec.queue.push_back(handle);
            return;
        }
        rec.current = Some(handle);
        drop(rec);

        let this = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("nfcee-recovery".into())
            .spawn(move || this.recovery_worker(handle));
        if let Err(e) = spawned {
            error!("cannot spawn recovery worker: {}", e);
            let mut rec = self.recovery.lock();
            rec.current = None;
            rec.queue.clear();
            self.recovery_cond.notify_all();
        }
    }

    fn recovery_worker(&self, first: EeHandle) {
        let mut next = Some(first);
        while let Some(handle) = next {
            self.recover(handle);
            let mut rec = self.recovery.lock();
            next = rec.queue.pop_front();
            rec.current = next;
            if next.is_none() {
                self.recovery_cond.notify_all();
            }
        }
    }

    /// Deactivate, toggle standby, reactivate. Never cancelled once begun.
    fn recover(&self, handle: EeHandle) {
        let _lock = self.lock.lock();
        info!("ee {} recovery start", handle);

        if let Err(e) = self.mode_set(handle, EeMode::Deactivate) {
            warn!("ee {} deactivate before power cycle: {}", handle, e);
        }
        if let Err(e) = self.power_cycle() {
            warn!("ee {} standby toggle: {}", handle, e);
        }
        let result = self.mode_set_with_timeout(handle, EeMode::Activate, self.timeouts.reactivate);
        match result {
            Ok(EeStatus::Active) => {
                self.unavailable.lock().remove(&handle);
                info!("ee {} recovered", handle);
                self.listener.on_ee_recovered(handle);
            }
            other => {
                error!("ee {} recovery failed: {:?}", handle, other);
                self.unavailable.lock().insert(handle);
                self.registry.set_status(handle, EeStatus::Inactive);
                self.listener.on_ee_recovery_failed(handle);
            }
        }
    }

    fn power_cycle(&self) -> Result<()> {
        self.channel.set_standby(false)?;
        thread::sleep(self.quirks.power_cycle_delay());
        self.channel.set_standby(true)
    }

    /// Wait until no recovery is running. Returns false on timeout.
    pub fn wait_for_recovery(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut rec = self.recovery.lock();
        while rec.current.is_some() {
            if self.recovery_cond.wait_until(&mut rec, deadline).timed_out() {
                return rec.current.is_none();
            }
        }
        true
    }

    /// Deactivate every routable EE ahead of controller shutdown.
    pub fn on_nfcc_shutdown(&self) -> Result<()> {
        self.selections.lock().clear();
        let mut first_err = None;
        for handle in self.registry.active_handles() {
            if let Err(e) = self.mode_set(handle, EeMode::Deactivate) {
                warn!("ee {} deactivate on shutdown: {}", handle, e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Open wired session; clears the wired flag and releases the lifecycle
/// lock on drop.
pub struct WiredSession<'a> {
    lifecycle: &'a EeLifecycle,
    _lock: MutexGuard<'a, ()>,
}

impl Drop for WiredSession<'_> {
    fn drop(&mut self) {
        self.lifecycle.end_wired();
    }
}
