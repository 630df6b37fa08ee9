// libnfcee/src/ce/felica.rs

//! Felica card emulation on the host.
//!
//! NFCID2 / system code pairs are registered with the controller in
//! batches: add and remove requests are queued and a short coalescing
//! timer hands the whole batch to one flush, which runs with discovery
//! stopped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::constants::NFCID2_MAX_ENTRIES;
use crate::discovery::DiscoveryCoordinator;
use crate::dispatch::CommandChannel;
use crate::transport::{NfaCommand, NfaEvent};
use crate::types::{Nfcid2, SystemCode};
use crate::utils::Timer;
use crate::{Error, Result};

/// One NFCID2 slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nfcid2Entry {
    pub nfcid2: Nfcid2,
    pub system_code: SystemCode,
    pub opt: u8,
    /// Controller handle once registered
    pub handle: Option<u16>,
}

#[derive(Debug, Default)]
struct Queue {
    entries: Vec<Nfcid2Entry>,
    pending_remove: Vec<u16>,
}

/// Queue of host Felica registrations, flushed in coalesced batches.
pub struct FelicaRouting {
    queue: Mutex<Queue>,
    channel: Arc<CommandChannel>,
    discovery: Arc<DiscoveryCoordinator>,
    timer: Timer,
    window: Duration,
    this: Weak<FelicaRouting>,
}

impl FelicaRouting {
    /// `window` is how long requests are gathered before one flush.
    pub fn new(
        channel: Arc<CommandChannel>,
        discovery: Arc<DiscoveryCoordinator>,
        window: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            queue: Mutex::new(Queue::default()),
            channel,
            discovery,
            timer: Timer::new("nfcid2"),
            window,
            this: this.clone(),
        })
    }

    /// Current slots, registered or still queued.
    pub fn entries(&self) -> Vec<Nfcid2Entry> {
        self.queue.lock().entries.clone()
    }

    /// Queue `nfcid2` for registration with `system_code`.
    pub fn add_nfcid2_routing(&self, nfcid2: &[u8], system_code: &[u8], opt: u8) -> Result<()> {
        let nfcid2 = Nfcid2::try_from(nfcid2)?;
        let system_code = SystemCode::try_from(system_code)?;
        {
            let mut q = self.queue.lock();
            if q.entries.iter().any(|e| e.nfcid2 == nfcid2) {
                return Err(Error::DuplicateNfcid2(nfcid2.to_hex()));
            }
            if q.entries.len() >= NFCID2_MAX_ENTRIES {
                return Err(Error::Nfcid2TableFull);
            }
            q.entries.push(Nfcid2Entry {
                nfcid2,
                system_code,
                opt,
                handle: None,
            });
        }
        debug!("nfcid2 {} queued", nfcid2.to_hex());
        self.schedule();
        Ok(())
    }

    /// Queue the registration of `nfcid2` for removal.
    pub fn remove_nfcid2_routing(&self, nfcid2: &[u8]) -> Result<()> {
        let nfcid2 = Nfcid2::try_from(nfcid2)?;
        let handle = {
            let mut q = self.queue.lock();
            let index = q
                .entries
                .iter()
                .position(|e| e.nfcid2 == nfcid2)
                .ok_or_else(|| {
                    Error::InvalidState(format!("nfcid2 {} not registered", nfcid2.to_hex()))
                })?;
            let entry = q.entries.remove(index);
            if let Some(handle) = entry.handle {
                q.pending_remove.push(handle);
            }
            entry.handle
        };
        if handle.is_some() {
            self.schedule();
        }
        Ok(())
    }

    fn schedule(&self) {
        let this = self.this.clone();
        self.timer.arm(self.window, move || {
            if let Some(felica) = this.upgrade() {
                if let Err(e) = felica.flush() {
                    warn!("nfcid2 flush failed: {}", e);
                }
            }
        });
    }

    /// Send queued registrations and removals now.
    pub fn flush(&self) -> Result<()> {
        let (removals, additions) = {
            let mut q = self.queue.lock();
            let additions: Vec<Nfcid2Entry> =
                q.entries.iter().filter(|e| e.handle.is_none()).copied().collect();
            (std::mem::take(&mut q.pending_remove), additions)
        };
        if removals.is_empty() && additions.is_empty() {
            return Ok(());
        }

        self.discovery.suspend()?;
        let result = self.apply(removals, additions);
        let resumed = self.discovery.resume();
        result.and(resumed)
    }

    fn apply(&self, removals: Vec<u16>, additions: Vec<Nfcid2Entry>) -> Result<()> {
        for handle in removals {
            self.channel
                .request(NfaCommand::DeregisterFelicaSystemCodeOnHost { handle })?;
            debug!("nfcid2 handle {:#06x} deregistered", handle);
        }

        for entry in additions {
            let reply = self.channel.request(NfaCommand::RegisterFelicaSystemCodeOnHost {
                system_code: entry.system_code,
                nfcid2: entry.nfcid2,
            })?;
            let NfaEvent::CeRegistered { handle, .. } = reply else {
                warn!("unexpected registration reply {:?}", reply.ack_kind());
                continue;
            };
            info!("nfcid2 {} registered as {:#06x}", entry.nfcid2.to_hex(), handle);

            let mut q = self.queue.lock();
            match q.entries.iter_mut().find(|e| e.nfcid2 == entry.nfcid2) {
                Some(slot) => slot.handle = Some(handle),
                None => {
                    // removed while the registration was in flight
                    q.pending_remove.push(handle);
                    drop(q);
                    self.schedule();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pumped_channel;
    use crate::transport::{MockHandle, MockTransport};
    use serial_test::serial;
    use std::thread;

    const ID1: [u8; 8] = [0x02, 0xFE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
    const ID2: [u8; 8] = [0x02, 0xFE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02];

    fn felica(window: Duration) -> (Arc<FelicaRouting>, MockHandle) {
        let mock = MockTransport::new();
        let handle = mock.handle();
        let channel = pumped_channel(mock);
        let discovery = Arc::new(DiscoveryCoordinator::new(Arc::clone(&channel)));
        (FelicaRouting::new(channel, discovery, window), handle)
    }

    fn id(n: u8) -> [u8; 8] {
        [0x02, 0xFE, 0, 0, 0, 0, 0x10, n]
    }

    #[test]
    #[serial]
    fn coalesced_adds_register_in_one_batch() {
        let (f, mock) = felica(Duration::from_millis(40));
        f.add_nfcid2_routing(&ID1, &[0x12, 0xFC], 0).unwrap();
        f.add_nfcid2_routing(&ID2, &[0x88, 0xB4], 0).unwrap();
        assert!(mock.felica_registrations().is_empty());
        thread::sleep(Duration::from_millis(200));
        let regs = mock.felica_registrations();
        assert_eq!(regs.len(), 2);
        assert_eq!(regs[0].1, SystemCode::new(0x12FC));
        assert!(f.entries().iter().all(|e| e.handle.is_some()));
        assert_eq!(mock.count("StopRfDiscovery"), 0);
    }

    #[test]
    fn limits_and_duplicates() {
        let (f, _mock) = felica(Duration::from_secs(60));
        for n in 0..4 {
            f.add_nfcid2_routing(&id(n), &[0x12, 0xFC], 0).unwrap();
        }
        assert!(matches!(
            f.add_nfcid2_routing(&id(9), &[0x12, 0xFC], 0),
            Err(Error::Nfcid2TableFull)
        ));
        assert!(matches!(
            f.add_nfcid2_routing(&id(0), &[0x12, 0xFC], 0),
            Err(Error::DuplicateNfcid2(_))
        ));
        assert!(matches!(
            f.add_nfcid2_routing(&[0x01, 0x02], &[0x12, 0xFC], 0),
            Err(Error::InvalidLength { .. })
        ));
    }

    #[test]
    fn removal_deregisters_handle() {
        let (f, mock) = felica(Duration::from_secs(60));
        f.add_nfcid2_routing(&ID1, &[0x12, 0xFC], 0).unwrap();
        f.flush().unwrap();
        assert_eq!(mock.felica_registrations().len(), 1);

        f.remove_nfcid2_routing(&ID1).unwrap();
        f.flush().unwrap();
        assert!(mock.felica_registrations().is_empty());
        assert!(f.entries().is_empty());
        assert!(matches!(
            f.remove_nfcid2_routing(&ID1),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn removing_unsent_entry_sends_nothing() {
        let (f, mock) = felica(Duration::from_secs(60));
        f.add_nfcid2_routing(&ID1, &[0x12, 0xFC], 0).unwrap();
        f.remove_nfcid2_routing(&ID1).unwrap();
        f.flush().unwrap();
        assert!(mock.sent().is_empty());
    }

    #[test]
    fn flush_runs_with_discovery_stopped() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        let channel = pumped_channel(mock);
        let discovery = Arc::new(DiscoveryCoordinator::new(Arc::clone(&channel)));
        discovery.start().unwrap();
        let f = FelicaRouting::new(channel, Arc::clone(&discovery), Duration::from_secs(60));
        f.add_nfcid2_routing(&ID1, &[0x12, 0xFC], 0).unwrap();
        f.flush().unwrap();
        let names = handle.sent_names();
        let stop = names.iter().position(|n| *n == "StopRfDiscovery").unwrap();
        let reg = names
            .iter()
            .position(|n| *n == "RegisterFelicaSystemCodeOnHost")
            .unwrap();
        assert!(stop < reg);
        assert!(handle.discovery_started());
    }
}
