//! Test support helpers intended for use by unit and integration tests.
//!
//! These helpers centralize MockTransport wiring and a listener that
//! records every notification, so tests across the crate and the tests/
//! directory share the same setup.
#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use parking_lot::Mutex;

use crate::constants::EE_INTERFACE_APDU;
use crate::dispatch::{CommandChannel, PendingTable};
use crate::listener::ServiceListener;
use crate::transport::{MockTransport, NfaEvent, Transport};
use crate::types::{EeHandle, EeInfo, EeStatus, TechMask};

/// Acknowledgement bound used by `pumped_channel`.
#[doc(hidden)]
pub const TEST_ACK_TIMEOUT: Duration = Duration::from_millis(500);

/// Wrap `mock` in a CommandChannel whose acknowledgements are completed by
/// a pump thread standing in for the dispatcher. Notifications that are
/// not acknowledgements are dropped.
#[doc(hidden)]
pub fn pumped_channel(mut mock: MockTransport) -> Arc<CommandChannel> {
    let (tx, rx) = unbounded::<NfaEvent>();
    // MockTransport::attach never fails
    let _ = mock.attach(tx);
    let pending = Arc::new(PendingTable::new());
    let pump = Arc::clone(&pending);
    thread::spawn(move || {
        for event in rx.iter() {
            pump.complete(event);
        }
    });
    Arc::new(CommandChannel::new(Box::new(mock), pending, TEST_ACK_TIMEOUT))
}

/// Active eSE reachable over APDU, listening on A and B.
#[doc(hidden)]
pub fn ese() -> EeInfo {
    EeInfo::new(EeHandle::ESE, EeStatus::Active)
        .with_interfaces(vec![EE_INTERFACE_APDU])
        .with_listen(0x04, 0x04, 0x00)
}

/// Active UICC reachable over APDU, listening on A, B and F.
#[doc(hidden)]
pub fn uicc() -> EeInfo {
    EeInfo::new(EeHandle::UICC, EeStatus::Active)
        .with_interfaces(vec![EE_INTERFACE_APDU])
        .with_listen(0x04, 0x04, 0x02)
}

#[derive(Debug, Default)]
struct Recorded {
    host_activated: usize,
    host_deactivated: usize,
    host_data: Vec<Vec<u8>>,
    table_full: usize,
    transactions: Vec<(Vec<u8>, Vec<u8>, EeHandle)>,
    connectivity: Vec<EeHandle>,
    rf_fields: Vec<bool>,
    reader_start_configs: Vec<(EeHandle, TechMask)>,
    reader_stop_configs: Vec<EeHandle>,
    reader_started: Vec<TechMask>,
    reader_timeouts: Vec<u8>,
    recovered: Vec<EeHandle>,
    recovery_failed: Vec<EeHandle>,
}

/// Listener that keeps every notification for later assertions.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct RecordingListener {
    inner: Mutex<Recorded>,
}

impl RecordingListener {
    pub fn host_activations(&self) -> (usize, usize) {
        let r = self.inner.lock();
        (r.host_activated, r.host_deactivated)
    }

    pub fn host_data(&self) -> Vec<Vec<u8>> {
        self.inner.lock().host_data.clone()
    }

    pub fn table_full_count(&self) -> usize {
        self.inner.lock().table_full
    }

    pub fn transactions(&self) -> Vec<(Vec<u8>, Vec<u8>, EeHandle)> {
        self.inner.lock().transactions.clone()
    }

    pub fn connectivity(&self) -> Vec<EeHandle> {
        self.inner.lock().connectivity.clone()
    }

    pub fn rf_fields(&self) -> Vec<bool> {
        self.inner.lock().rf_fields.clone()
    }

    pub fn reader_start_configs(&self) -> Vec<(EeHandle, TechMask)> {
        self.inner.lock().reader_start_configs.clone()
    }

    pub fn reader_stop_configs(&self) -> Vec<EeHandle> {
        self.inner.lock().reader_stop_configs.clone()
    }

    pub fn reader_started(&self) -> Vec<TechMask> {
        self.inner.lock().reader_started.clone()
    }

    pub fn reader_timeouts(&self) -> Vec<u8> {
        self.inner.lock().reader_timeouts.clone()
    }

    pub fn recovered(&self) -> Vec<EeHandle> {
        self.inner.lock().recovered.clone()
    }

    pub fn recovery_failed(&self) -> Vec<EeHandle> {
        self.inner.lock().recovery_failed.clone()
    }
}

impl ServiceListener for RecordingListener {
    fn on_host_emu_activated(&self) {
        self.inner.lock().host_activated += 1;
    }

    fn on_host_emu_deactivated(&self) {
        self.inner.lock().host_deactivated += 1;
    }

    fn on_host_emu_data(&self, data: &[u8]) {
        self.inner.lock().host_data.push(data.to_vec());
    }

    fn on_aid_routing_table_full(&self) {
        self.inner.lock().table_full += 1;
    }

    fn on_transaction(&self, aid: &[u8], data: &[u8], source: EeHandle) {
        self.inner
            .lock()
            .transactions
            .push((aid.to_vec(), data.to_vec(), source));
    }

    fn on_connectivity(&self, source: EeHandle) {
        self.inner.lock().connectivity.push(source);
    }

    fn on_rf_field(&self, on: bool) {
        self.inner.lock().rf_fields.push(on);
    }

    fn on_reader_mode_start_config(&self, source: EeHandle, tech: TechMask) {
        self.inner.lock().reader_start_configs.push((source, tech));
    }

    fn on_reader_mode_stop_config(&self, source: EeHandle) {
        self.inner.lock().reader_stop_configs.push(source);
    }

    fn on_reader_mode_started(&self, tech: TechMask) {
        self.inner.lock().reader_started.push(tech);
    }

    fn on_reader_mode_timeout(&self, disc_ntf_timeout: u8) {
        self.inner.lock().reader_timeouts.push(disc_ntf_timeout);
    }

    fn on_ee_recovered(&self, handle: EeHandle) {
        self.inner.lock().recovered.push(handle);
    }

    fn on_ee_recovery_failed(&self, handle: EeHandle) {
        self.inner.lock().recovery_failed.push(handle);
    }
}
