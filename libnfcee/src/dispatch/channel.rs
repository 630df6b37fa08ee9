// libnfcee/src/dispatch/channel.rs

use std::sync::Arc;
use std::time::Duration;

use log::{error, trace, warn};
use parking_lot::Mutex;

use crate::dispatch::PendingTable;
use crate::transport::{NfaCommand, NfaEvent, Status, Transport};
use crate::{Error, Result};

/// Serialized request/acknowledge path to the transport. One request is
/// outstanding at a time; each waits on its acknowledgement with a bound.
pub struct CommandChannel {
    transport: Mutex<Box<dyn Transport>>,
    serial: Mutex<()>,
    pending: Arc<PendingTable>,
    ack_timeout: Duration,
}

impl CommandChannel {
    /// `ack_timeout` bounds `request`; `request_with_timeout` overrides it.
    pub fn new(transport: Box<dyn Transport>, pending: Arc<PendingTable>, ack_timeout: Duration) -> Self {
        Self {
            transport: Mutex::new(transport),
            serial: Mutex::new(()),
            pending,
            ack_timeout,
        }
    }

    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    /// Submit `command` and wait for its acknowledgement.
    pub fn request(&self, command: NfaCommand) -> Result<NfaEvent> {
        self.request_with_timeout(command, self.ack_timeout)
    }

    /// As `request`, with an explicit acknowledgement bound. A non-OK
    /// acknowledgement is returned as `Error::CommandFailed`.
    pub fn request_with_timeout(&self, command: NfaCommand, timeout: Duration) -> Result<NfaEvent> {
        let _serial = self.serial.lock();
        let ticket = self.pending.register(command.ack_kind())?;
        trace!("submit {}", command.name());

        let submitted = self.transport.lock().submit(&command);
        if let Err(e) = submitted {
            self.pending.cancel(ticket);
            error!("{} refused: {}", command.name(), e);
            return Err(e);
        }

        match self.pending.wait(ticket, timeout) {
            Ok(event) => match event.status() {
                Status::Ok => Ok(event),
                status => {
                    error!("{} failed with status {:?}", command.name(), status);
                    Err(Error::CommandFailed {
                        command: command.name(),
                        status: status.as_u8(),
                    })
                }
            },
            Err(e @ Error::AckTimeout { .. }) => {
                warn!("{}: {}", command.name(), e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Drive the standby control line through the transport.
    pub fn set_standby(&self, high: bool) -> Result<()> {
        self.transport.lock().set_standby(high)
    }

    pub fn aid_table_capacity(&self) -> usize {
        self.transport.lock().aid_table_capacity()
    }

    /// Cancel outstanding waits and detach the transport.
    pub fn shutdown(&self) {
        self.pending.shutdown();
        self.transport.lock().detach();
    }
}
