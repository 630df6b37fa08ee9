// libnfcee/src/ce/host.rs

use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::constants::MAX_APDU_LEN;
use crate::listener::ServiceListener;
use crate::types::DataStatus;
use crate::utils::bytes_to_hex_spaced;

#[derive(Debug, Default)]
struct Assembly {
    data: Vec<u8>,
    /// Set once the current APDU outgrew `MAX_APDU_LEN`; its remaining
    /// chunks are dropped up to the final one
    overflowed: bool,
}

impl Assembly {
    fn reset(&mut self) {
        self.data = Vec::new();
        self.overflowed = false;
    }

    fn push(&mut self, chunk: &[u8]) {
        if self.overflowed {
            return;
        }
        if self.data.len() + chunk.len() > MAX_APDU_LEN {
            warn!("host ce apdu exceeds {} bytes, dropping it", MAX_APDU_LEN);
            self.data = Vec::new();
            self.overflowed = true;
            return;
        }
        self.data.extend_from_slice(chunk);
    }
}

/// Reassembles host card-emulation command APDUs delivered in chunks.
pub struct HostCardEmulation {
    buffer: Mutex<Assembly>,
    listener: Arc<dyn ServiceListener>,
}

impl HostCardEmulation {
    pub fn new(listener: Arc<dyn ServiceListener>) -> Self {
        Self {
            buffer: Mutex::new(Assembly::default()),
            listener,
        }
    }

    /// Start of a host emulation session; any partial APDU is dropped.
    pub fn on_activated(&self) {
        self.buffer.lock().reset();
        self.listener.on_host_emu_activated();
    }

    /// End of a host emulation session.
    pub fn on_deactivated(&self) {
        self.buffer.lock().reset();
        self.listener.on_host_emu_deactivated();
    }

    /// Append one chunk; the final chunk hands the whole APDU to the
    /// listener and a failed one discards it.
    pub fn on_data(&self, status: DataStatus, chunk: &[u8]) {
        let complete = {
            let mut buffer = self.buffer.lock();
            match status {
                DataStatus::Continue => {
                    buffer.push(chunk);
                    return;
                }
                DataStatus::Ok => {
                    buffer.push(chunk);
                    let overflowed = buffer.overflowed;
                    let data = std::mem::take(&mut buffer.data);
                    buffer.reset();
                    if overflowed {
                        return;
                    }
                    data
                }
                DataStatus::Failed => {
                    warn!("host ce data failed, dropping {} bytes", buffer.data.len());
                    buffer.reset();
                    return;
                }
            }
        };
        debug!("host ce apdu {} bytes", complete.len());
        trace!("host ce apdu: {}", bytes_to_hex_spaced(&complete));
        self.listener.on_host_emu_data(&complete);
    }

    /// Bytes of the APDU being assembled.
    pub fn buffered_len(&self) -> usize {
        self.buffer.lock().data.len()
    }
}
