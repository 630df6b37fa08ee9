// libnfcee/src/transport/traits.rs

use crate::Result;
use crate::constants::DEFAULT_AID_TABLE_CAPACITY;
use crate::transport::{EventSender, NfaCommand};

/// Transport trait abstracts the controller stack away from routing and
/// lifecycle logic. Commands go down through `submit`; acknowledgements and
/// notifications come back asynchronously on the sender handed to `attach`.
pub trait Transport: Send {
    /// Install the event sink. Called once before any command is submitted.
    fn attach(&mut self, events: EventSender) -> Result<()>;

    /// Submit one command. An `Err` means the stack refused the command
    /// outright and no acknowledgement will follow.
    fn submit(&mut self, command: &NfaCommand) -> Result<()>;

    /// Maximum number of AID entries the controller routing table holds.
    fn aid_table_capacity(&self) -> usize {
        DEFAULT_AID_TABLE_CAPACITY
    }

    /// Drive the secure element standby control line. Transports without
    /// one accept the request and do nothing.
    fn set_standby(&mut self, _high: bool) -> Result<()> {
        Ok(())
    }

    /// Drop the event sink. Default does nothing.
    fn detach(&mut self) {}
}
