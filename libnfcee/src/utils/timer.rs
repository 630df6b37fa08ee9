// libnfcee/src/utils/timer.rs

//! Re-armable one-shot timer.
//!
//! Each `arm` spawns a short-lived thread that waits on `after(delay)` and a
//! cancel channel. Re-arming or cancelling bumps the generation so a stale
//! expiry that already raced past the `select!` does not fire.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Sender, after, bounded, select};
use log::{debug, warn};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    cancel: Option<Sender<()>>,
}

/// Named one-shot timer. Arming again replaces the pending callback.
#[derive(Debug, Clone)]
pub struct Timer {
    name: &'static str,
    slot: Arc<Mutex<Slot>>,
}

impl Timer {
    /// Idle timer; `name` shows up in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Arm the timer, replacing any pending expiry.
    pub fn arm<F>(&self, delay: Duration, on_expiry: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = bounded::<()>(1);
        let generation = {
            let mut slot = self.slot.lock();
            slot.generation += 1;
            // dropping the old sender wakes the previous waiter
            slot.cancel = Some(tx);
            slot.generation
        };

        let slot = Arc::clone(&self.slot);
        let name = self.name;
        let spawned = thread::Builder::new()
            .name(format!("timer-{}", name))
            .spawn(move || {
                select! {
                    recv(rx) -> _ => {}
                    recv(after(delay)) -> _ => {
                        let current = {
                            let mut s = slot.lock();
                            if s.generation == generation {
                                s.cancel = None;
                                true
                            } else {
                                false
                            }
                        };
                        if current {
                            debug!("timer {} expired", name);
                            on_expiry();
                        }
                    }
                }
            });
        if let Err(e) = spawned {
            warn!("timer {}: cannot spawn waiter: {}", self.name, e);
            self.slot.lock().cancel = None;
        }
    }

    /// Cancel a pending expiry. No-op when idle.
    pub fn cancel(&self) {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        slot.cancel = None;
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().cancel.is_some()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
