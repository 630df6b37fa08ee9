// libnfcee/src/discovery.rs

//! RF discovery coordination.
//!
//! Routing changes must reach the controller with discovery stopped.
//! Callers take a counted hold; the first hold stops discovery if it was
//! running and the last release restarts it, unless the releasing caller
//! asks to keep it stopped.

use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::Result;
use crate::dispatch::CommandChannel;
use crate::transport::NfaCommand;
use crate::types::TechMask;

/// Discovery configuration change requested by the service layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryRequest {
    Enable { tech: TechMask, reader_mode: bool },
    Disable,
}

#[derive(Debug, Default)]
struct State {
    started: bool,
    holds: usize,
    restart: bool,
}

/// Owner of RF discovery start/stop. Routing changes take counted holds
/// that keep discovery stopped.
pub struct DiscoveryCoordinator {
    channel: Arc<CommandChannel>,
    state: Mutex<State>,
}

impl DiscoveryCoordinator {
    pub fn new(channel: Arc<CommandChannel>) -> Self {
        Self {
            channel,
            state: Mutex::new(State::default()),
        }
    }

    /// Whether discovery is running right now.
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Number of outstanding holds.
    pub fn holds(&self) -> usize {
        self.state.lock().holds
    }

    /// Take a hold, stopping discovery on the first one.
    pub fn suspend(&self) -> Result<()> {
        let mut s = self.state.lock();
        if s.holds == 0 {
            if s.started {
                self.channel.request(NfaCommand::StopRfDiscovery)?;
                s.started = false;
                s.restart = true;
            } else {
                s.restart = false;
            }
            debug!("discovery suspended (restart={})", s.restart);
        }
        s.holds += 1;
        Ok(())
    }

    /// Release a hold; the last release restarts discovery if it was
    /// running when the first hold was taken.
    pub fn resume(&self) -> Result<()> {
        self.release(false, false)
    }

    /// Release a hold and always start discovery once no hold remains.
    pub fn resume_and_start(&self) -> Result<()> {
        self.release(true, false)
    }

    /// Release a hold leaving discovery stopped.
    pub fn resume_keep_stopped(&self) -> Result<()> {
        self.release(false, true)
    }

    fn release(&self, force_start: bool, keep_stopped: bool) -> Result<()> {
        let mut s = self.state.lock();
        if s.holds == 0 {
            warn!("discovery release without hold");
            return Ok(());
        }
        if force_start {
            s.restart = true;
        }
        if keep_stopped {
            s.restart = false;
        }
        s.holds -= 1;
        if s.holds == 0 && s.restart && !s.started {
            s.restart = false;
            self.channel.request(NfaCommand::StartRfDiscovery)?;
            s.started = true;
            debug!("discovery restarted");
        }
        Ok(())
    }

    /// Start discovery now, or once the outstanding holds are released.
    pub fn start(&self) -> Result<()> {
        let mut s = self.state.lock();
        if s.holds > 0 {
            s.restart = true;
            return Ok(());
        }
        if !s.started {
            self.channel.request(NfaCommand::StartRfDiscovery)?;
            s.started = true;
        }
        Ok(())
    }

    /// Stop discovery and cancel any pending restart.
    pub fn stop(&self) -> Result<()> {
        let mut s = self.state.lock();
        s.restart = false;
        if s.started {
            self.channel.request(NfaCommand::StopRfDiscovery)?;
            s.started = false;
        }
        Ok(())
    }

    /// Enable polling for `tech`; `reader_mode` suppresses listen mode.
    pub fn enable_polling(&self, tech: TechMask, reader_mode: bool) -> Result<()> {
        self.channel
            .request(NfaCommand::EnablePolling { tech, reader_mode })
            .map(|_| ())
    }

    pub fn disable_polling(&self) -> Result<()> {
        self.channel.request(NfaCommand::DisablePolling).map(|_| ())
    }

    /// Apply a service-layer discovery request.
    pub fn apply(&self, request: DiscoveryRequest) -> Result<()> {
        match request {
            DiscoveryRequest::Enable { tech, reader_mode } => {
                self.suspend()?;
                let polled = self.enable_polling(tech, reader_mode);
                self.resume_and_start()?;
                polled
            }
            DiscoveryRequest::Disable => self.stop(),
        }
    }

    /// Scoped hold released on drop.
    pub fn pause(&self) -> Result<DiscoveryPause<'_>> {
        self.suspend()?;
        Ok(DiscoveryPause {
            coordinator: self,
            released: false,
        })
    }
}

/// Hold on RF discovery for the duration of a routing update.
pub struct DiscoveryPause<'a> {
    coordinator: &'a DiscoveryCoordinator,
    released: bool,
}

impl DiscoveryPause<'_> {
    /// Release the hold, restarting discovery if it was running.
    pub fn finish(mut self) -> Result<()> {
        self.released = true;
        self.coordinator.resume()
    }

    /// Release the hold, leaving discovery stopped.
    pub fn keep_stopped(mut self) -> Result<()> {
        self.released = true;
        self.coordinator.resume_keep_stopped()
    }
}

impl Drop for DiscoveryPause<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.coordinator.resume() {
                warn!("discovery restart after update failed: {}", e);
            }
        }
    }
}
