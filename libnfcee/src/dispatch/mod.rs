// libnfcee/src/dispatch/mod.rs

//! Event dispatch and command/acknowledgement correlation.

pub mod channel;
pub mod dispatcher;
pub mod pending;

pub use channel::CommandChannel;
pub use dispatcher::{Dispatcher, EventHandler};
pub use pending::{PendingTable, Ticket};
