// libnfcee/src/dispatch/pending.rs

use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::transport::{AckKind, NfaEvent};
use crate::{Error, Result};

/// Handle for one outstanding acknowledgement wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    id: u64,
    kind: AckKind,
}

impl Ticket {
    pub fn kind(&self) -> AckKind {
        self.kind
    }
}

#[derive(Debug)]
struct Slot {
    id: u64,
    kind: AckKind,
    result: Option<NfaEvent>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    slots: Vec<Slot>,
    /// Acknowledgements owed to timed-out tickets, with the instant after
    /// which a late arrival is no longer expected
    late: Vec<(AckKind, Instant)>,
    shutdown: bool,
}

/// Correlation table between submitted commands and their acknowledgement
/// events. Waiters block on a condition variable with a deadline; the
/// dispatcher fills slots as acknowledgements arrive.
///
/// Slots are matched by acknowledgement kind only. When a wait times out,
/// the acknowledgement it was owed is expected for one more timeout period
/// and discarded if it turns up, so it cannot complete a newer ticket of
/// the same kind.
#[derive(Debug, Default)]
pub struct PendingTable {
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for the next acknowledgement of `kind`.
    pub fn register(&self, kind: AckKind) -> Result<Ticket> {
        let mut inner = self.inner.lock();
        if inner.shutdown {
            return Err(Error::Cancelled);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.slots.push(Slot {
            id,
            kind,
            result: None,
        });
        Ok(Ticket { id, kind })
    }

    /// Hand an acknowledgement to the oldest unfilled slot of its kind.
    /// Returns false when nobody was waiting for it.
    pub fn complete(&self, event: NfaEvent) -> bool {
        let Some(kind) = event.ack_kind() else {
            return false;
        };
        let mut inner = self.inner.lock();
        let now = Instant::now();
        inner.late.retain(|(_, until)| *until > now);
        if let Some(pos) = inner.late.iter().position(|(k, _)| *k == kind) {
            inner.late.remove(pos);
            debug!("late acknowledgement {:?} discarded", kind);
            return false;
        }
        match inner
            .slots
            .iter_mut()
            .find(|s| s.kind == kind && s.result.is_none())
        {
            Some(slot) => {
                slot.result = Some(event);
                self.cond.notify_all();
                true
            }
            None => {
                debug!("unsolicited acknowledgement {:?}", kind);
                false
            }
        }
    }

    /// Block until the ticket is completed, the deadline passes or the table
    /// shuts down. The slot is released on every path.
    pub fn wait(&self, ticket: Ticket, timeout: Duration) -> Result<NfaEvent> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            let pos = inner.slots.iter().position(|s| s.id == ticket.id);
            let Some(pos) = pos else {
                return Err(Error::Cancelled);
            };
            if inner.slots[pos].result.is_some() {
                let slot = inner.slots.remove(pos);
                if let Some(event) = slot.result {
                    return Ok(event);
                }
            }
            if inner.shutdown {
                inner.slots.remove(pos);
                return Err(Error::Cancelled);
            }
            if self.cond.wait_until(&mut inner, deadline).timed_out() {
                inner.slots.retain(|s| s.id != ticket.id);
                inner.late.push((ticket.kind, Instant::now() + timeout));
                return Err(Error::AckTimeout {
                    ack: ticket.kind,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }
    }

    /// Drop a ticket whose command never reached the controller.
    pub fn cancel(&self, ticket: Ticket) {
        self.inner.lock().slots.retain(|s| s.id != ticket.id);
    }

    /// Fail every current and future wait with `Error::Cancelled`.
    pub fn shutdown(&self) {
        self.inner.lock().shutdown = true;
        self.cond.notify_all();
    }

    /// Tickets still waiting or holding an unread result.
    pub fn outstanding(&self) -> usize {
        self.inner.lock().slots.len()
    }
}
