// libnfcee/src/dispatch/dispatcher.rs

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::{debug, trace};

use crate::Result;
use crate::dispatch::PendingTable;
use crate::transport::NfaEvent;

/// Consumer of controller events. Implementations must not submit commands
/// or block on acknowledgements; multi-step work goes to a worker thread.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &NfaEvent);
}

/// Owns the event thread. Every event is first offered to the handler and,
/// if it is an acknowledgement, then completes the matching pending ticket,
/// so state derived from a result is visible before its requester wakes.
pub struct Dispatcher {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the event thread over `events`.
    pub fn spawn(
        events: Receiver<NfaEvent>,
        pending: Arc<PendingTable>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let thread = thread::Builder::new()
            .name("nfcee-dispatch".into())
            .spawn(move || {
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(events) -> msg => match msg {
                            Ok(event) => {
                                trace!("event {:?}", event);
                                handler.handle(&event);
                                if event.ack_kind().is_some() {
                                    pending.complete(event);
                                }
                            }
                            Err(_) => break,
                        },
                    }
                }
                debug!("dispatcher exiting");
            })?;
        Ok(Self {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Stop the event thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.take();
        if let Some(t) = self.thread.take() {
            if t.thread().id() != thread::current().id() {
                let _ = t.join();
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{AckKind, Status};
    use crossbeam_channel::unbounded;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<NfaEvent>>,
    }

    impl EventHandler for Recorder {
        fn handle(&self, event: &NfaEvent) {
            self.seen.lock().push(event.clone());
        }
    }

    #[test]
    fn routes_events_to_handler_and_pending() {
        let (tx, rx) = unbounded();
        let pending = Arc::new(PendingTable::new());
        let rec = Arc::new(Recorder::default());
        let mut d = Dispatcher::spawn(rx, Arc::clone(&pending), rec.clone()).unwrap();

        let ticket = pending.register(AckKind::Updated).unwrap();
        tx.send(NfaEvent::RfField { on: true }).unwrap();
        tx.send(NfaEvent::Updated { status: Status::Ok }).unwrap();
        assert!(pending.wait(ticket, Duration::from_secs(2)).is_ok());

        d.stop();
        assert_eq!(rec.seen.lock().len(), 2);
    }

    #[test]
    fn exits_when_senders_drop() {
        let (tx, rx) = unbounded();
        let mut d = Dispatcher::spawn(
            rx,
            Arc::new(PendingTable::new()),
            Arc::new(Recorder::default()),
        )
        .unwrap();
        drop(tx);
        d.stop();
        d.stop();
    }
}
