// libnfcee/src/listener.rs

//! Upward notifications to the service layer.

use crate::types::{EeHandle, TechMask};

/// Receiver of service-level notifications. Every method defaults to a
/// no-op so implementors only override what they consume. Calls arrive on
/// the dispatcher thread or on timer and worker threads; implementations
/// must return promptly.
pub trait ServiceListener: Send + Sync {
    fn on_host_emu_activated(&self) {}

    fn on_host_emu_deactivated(&self) {}

    /// A complete host card-emulation command APDU.
    fn on_host_emu_data(&self, _data: &[u8]) {}

    fn on_aid_routing_table_full(&self) {}

    /// Off-host transaction event raised by `source`.
    fn on_transaction(&self, _aid: &[u8], _data: &[u8], _source: EeHandle) {}

    fn on_connectivity(&self, _source: EeHandle) {}

    fn on_rf_field(&self, _on: bool) {}

    fn on_reader_mode_start_config(&self, _source: EeHandle, _tech: TechMask) {}

    fn on_reader_mode_stop_config(&self, _source: EeHandle) {}

    fn on_reader_mode_started(&self, _tech: TechMask) {}

    fn on_reader_mode_timeout(&self, _disc_ntf_timeout: u8) {}

    fn on_ee_recovered(&self, _handle: EeHandle) {}

    fn on_ee_recovery_failed(&self, _handle: EeHandle) {}
}

/// Listener that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl ServiceListener for NoopListener {}
