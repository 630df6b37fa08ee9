// libnfcee/src/reader/mod.rs

//! Reader mode over SWP.
//!
//! A secure element can ask the controller to poll on its behalf through
//! discover-request notifications. Requests are coalesced for a short
//! window before the upper layer is told about the start or stop phase;
//! the upper layer then calls `start` or `stop`, which reprogram discovery
//! on the caller's thread.

pub mod state;

use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

pub use state::{ReaderState, ReaderSwp};

use crate::config::RoutingConfig;
use crate::constants::READER_COALESCE_MS;
use crate::discovery::DiscoveryCoordinator;
use crate::dispatch::CommandChannel;
use crate::listener::ServiceListener;
use crate::transport::{DiscoverRequest, NfaCommand};
use crate::types::{EeHandle, TechMask};
use crate::utils::{Timer, ms};
use crate::{Error, Result};

/// Timer settings for a reader session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderTimings {
    pub coalesce: Duration,
    /// Window for the upper layer to call `start` after the start notification
    pub start: Duration,
    /// Window for a tag to show up once polling runs
    pub tag_op: Duration,
    pub disc_ntf_timeout: u8,
}

impl ReaderTimings {
    /// Coalescing window from the constants, the rest from `config`.
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            coalesce: ms(READER_COALESCE_MS),
            start: config.reader_start_timeout(),
            tag_op: config.reader_tag_op_timeout(),
            disc_ntf_timeout: config.disc_ntf_timeout,
        }
    }
}

/// Reader-mode session driven by discover requests from a UICC.
pub struct ReaderSession {
    swp: Mutex<ReaderSwp>,
    channel: Arc<CommandChannel>,
    discovery: Arc<DiscoveryCoordinator>,
    listener: Arc<dyn ServiceListener>,
    uicc_listen_tech: TechMask,
    timings: ReaderTimings,
    coalesce_timer: Timer,
    protection_timer: Timer,
    this: Weak<ReaderSession>,
}

impl ReaderSession {
    pub fn new(
        channel: Arc<CommandChannel>,
        discovery: Arc<DiscoveryCoordinator>,
        listener: Arc<dyn ServiceListener>,
        uicc_listen_tech: TechMask,
        timings: ReaderTimings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            swp: Mutex::new(ReaderSwp::default()),
            channel,
            discovery,
            listener,
            uicc_listen_tech,
            timings,
            coalesce_timer: Timer::new("reader-coalesce"),
            protection_timer: Timer::new("reader-protection"),
            this: this.clone(),
        })
    }

    pub fn state(&self) -> ReaderState {
        self.swp.lock().state
    }

    /// Copy of the session bookkeeping.
    pub fn snapshot(&self) -> ReaderSwp {
        *self.swp.lock()
    }

    fn set_state(swp: &mut ReaderSwp, next: ReaderState) {
        if swp.state != next {
            debug!("reader {:?} -> {:?}", swp.state, next);
            swp.state = next;
        }
    }

    /// Feed a discover-request notification. Called on the dispatcher
    /// thread; only updates state and timers.
    pub fn on_discover_req(&self, requests: &[DiscoverRequest]) {
        let mut swp = self.swp.lock();
        let before = swp.state;
        let mut taken = false;
        for request in requests {
            if swp.apply(request) {
                taken = true;
            } else {
                debug!("reader request dropped: {:?} in {:?}", request, swp.state);
            }
        }
        if !taken {
            return;
        }
        if before != swp.state {
            debug!("reader {:?} -> {:?}", before, swp.state);
        }
        drop(swp);
        let this = self.this.clone();
        self.coalesce_timer.arm(self.timings.coalesce, move || {
            if let Some(session) = this.upgrade() {
                session.on_coalesce_expired();
            }
        });
    }

    fn on_coalesce_expired(&self) {
        let swp = self.snapshot();
        match (swp.state, swp.source) {
            (ReaderState::StartConfig, Some(source)) => {
                info!("reader mode start requested by {} ({})", source, swp.requested);
                self.listener.on_reader_mode_start_config(source, swp.requested);
                self.arm_protection(self.timings.start);
            }
            (ReaderState::StopConfig, Some(source)) => {
                info!("reader mode stop requested by {}", source);
                self.listener.on_reader_mode_stop_config(source);
            }
            _ => {}
        }
    }

    fn arm_protection(&self, delay: Duration) {
        let this = self.this.clone();
        self.protection_timer.arm(delay, move || {
            if let Some(session) = this.upgrade() {
                session.on_protection_expired();
            }
        });
    }

    fn on_protection_expired(&self) {
        let state = self.state();
        if matches!(state, ReaderState::StartConfig | ReaderState::Started) {
            warn!("reader mode timed out in {:?}", state);
            self.listener
                .on_reader_mode_timeout(self.timings.disc_ntf_timeout);
        }
    }

    /// Switch discovery to reader mode for the requesting EE.
    pub fn start(&self) -> Result<()> {
        let (source, tech) = {
            let mut swp = self.swp.lock();
            if swp.state != ReaderState::StartConfig {
                return Err(Error::InvalidState(format!(
                    "reader start in {:?}",
                    swp.state
                )));
            }
            let source = swp
                .source
                .ok_or_else(|| Error::InvalidState("reader start without source".into()))?;
            Self::set_state(&mut swp, ReaderState::StartInProgress);
            swp.current = swp.current | swp.requested;
            (source, swp.current)
        };
        self.protection_timer.cancel();

        self.discovery.suspend()?;
        let configured = self.configure_reader(source, tech);
        let resumed = self.discovery.resume_and_start();
        if let Err(e) = configured.and(resumed) {
            warn!("reader mode start failed: {}", e);
            self.swp.lock().reset();
            return Err(e);
        }

        Self::set_state(&mut self.swp.lock(), ReaderState::Started);
        self.listener.on_reader_mode_started(tech);
        self.arm_protection(self.timings.tag_op);
        Ok(())
    }

    fn configure_reader(&self, source: EeHandle, tech: TechMask) -> Result<()> {
        self.discovery.disable_polling()?;
        self.channel.request(NfaCommand::ConfigureUiccListenTech {
            handle: source,
            tech: TechMask::NONE,
        })?;
        self.discovery.enable_polling(tech, true)
    }

    /// A tag was activated while polling for the EE.
    pub fn on_activated(&self) {
        let mut swp = self.swp.lock();
        if swp.state == ReaderState::Started {
            Self::set_state(&mut swp, ReaderState::Activated);
            drop(swp);
            self.protection_timer.cancel();
        }
    }

    /// Tag gone; the tag-operation timer runs again.
    pub fn on_deactivated(&self) {
        let mut swp = self.swp.lock();
        if swp.state == ReaderState::Activated {
            Self::set_state(&mut swp, ReaderState::Started);
            drop(swp);
            self.arm_protection(self.timings.tag_op);
        }
    }

    /// Leave reader mode and give listen technologies back to the EE.
    pub fn stop(&self) -> Result<()> {
        self.coalesce_timer.cancel();
        self.protection_timer.cancel();
        let source = {
            let mut swp = self.swp.lock();
            if swp.state == ReaderState::Stopped {
                return Ok(());
            }
            Self::set_state(&mut swp, ReaderState::StopInProgress);
            swp.source
        };

        let restored = self.discovery.suspend().and_then(|_| {
            let configured = self.restore_listen(source);
            let resumed = self.discovery.resume_and_start();
            configured.and(resumed)
        });
        self.swp.lock().reset();
        debug!("reader stopped");
        restored
    }

    fn restore_listen(&self, source: Option<EeHandle>) -> Result<()> {
        self.discovery.disable_polling()?;
        if let Some(handle) = source {
            self.channel.request(NfaCommand::ConfigureUiccListenTech {
                handle,
                tech: self.uicc_listen_tech & TechMask::ALL,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingListener, pumped_channel};
    use crate::transport::{DiscoverOp, MockHandle, MockTransport};
    use serial_test::serial;
    use std::thread;

    fn timings() -> ReaderTimings {
        ReaderTimings {
            coalesce: Duration::from_millis(20),
            start: Duration::from_millis(150),
            tag_op: Duration::from_millis(150),
            disc_ntf_timeout: 7,
        }
    }

    fn session() -> (Arc<ReaderSession>, Arc<RecordingListener>, MockHandle) {
        let mock = MockTransport::new();
        let handle = mock.handle();
        let channel = pumped_channel(mock);
        let discovery = Arc::new(DiscoveryCoordinator::new(Arc::clone(&channel)));
        let listener = Arc::new(RecordingListener::default());
        let session = ReaderSession::new(
            channel,
            discovery,
            Arc::clone(&listener) as Arc<dyn ServiceListener>,
            TechMask::ALL,
            timings(),
        );
        (session, listener, handle)
    }

    fn add(pa: u8, pb: u8) -> DiscoverRequest {
        DiscoverRequest {
            handle: EeHandle::UICC,
            op: DiscoverOp::Add,
            pa_protocol: pa,
            pb_protocol: pb,
        }
    }

    fn remove() -> DiscoverRequest {
        DiscoverRequest {
            handle: EeHandle::UICC,
            op: DiscoverOp::Remove,
            pa_protocol: 0xFF,
            pb_protocol: 0xFF,
        }
    }

    #[test]
    #[serial]
    fn coalesced_requests_notify_once() {
        let (s, l, _mock) = session();
        s.on_discover_req(&[add(0x04, 0x00)]);
        s.on_discover_req(&[add(0x00, 0x04)]);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(
            l.reader_start_configs(),
            vec![(EeHandle::UICC, TechMask::A | TechMask::B)]
        );
    }

    #[test]
    #[serial]
    fn start_reprograms_discovery_for_reader_mode() {
        let (s, l, mock) = session();
        s.on_discover_req(&[add(0x04, 0x04)]);
        thread::sleep(Duration::from_millis(60));
        s.start().unwrap();
        assert_eq!(s.state(), ReaderState::Started);
        assert_eq!(mock.polling(), Some((TechMask::A | TechMask::B, true)));
        assert_eq!(mock.uicc_listen_history(), vec![(EeHandle::UICC, TechMask::NONE)]);
        assert!(mock.discovery_started());
        assert_eq!(l.reader_started(), vec![TechMask::A | TechMask::B]);

        s.on_activated();
        assert_eq!(s.state(), ReaderState::Activated);
        thread::sleep(Duration::from_millis(250));
        assert!(l.reader_timeouts().is_empty());
    }

    #[test]
    #[serial]
    fn stop_restores_listen_and_clears_source() {
        let (s, l, mock) = session();
        s.on_discover_req(&[add(0x04, 0x00)]);
        thread::sleep(Duration::from_millis(60));
        s.start().unwrap();
        s.on_discover_req(&[remove()]);
        assert_eq!(s.state(), ReaderState::StopConfig);
        thread::sleep(Duration::from_millis(60));
        assert_eq!(l.reader_stop_configs(), vec![EeHandle::UICC]);

        s.stop().unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.state, ReaderState::Stopped);
        assert_eq!(snap.source, None);
        assert_eq!(snap.current, TechMask::NONE);
        assert_eq!(
            mock.uicc_listen_history().last(),
            Some(&(EeHandle::UICC, TechMask::ALL))
        );
        assert!(mock.discovery_started());
    }

    #[test]
    #[serial]
    fn protection_timer_reports_timeout() {
        let (s, l, _mock) = session();
        s.on_discover_req(&[add(0x04, 0x00)]);
        thread::sleep(Duration::from_millis(300));
        assert_eq!(l.reader_timeouts(), vec![7]);
    }

    #[test]
    fn start_outside_start_config_rejected() {
        let (s, _l, mock) = session();
        assert!(matches!(s.start(), Err(Error::InvalidState(_))));
        assert!(mock.sent().is_empty());
    }

    #[test]
    fn stop_when_stopped_is_noop() {
        let (s, _l, mock) = session();
        s.stop().unwrap();
        assert!(mock.sent().is_empty());
    }
}
