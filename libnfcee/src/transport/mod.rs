// libnfcee/src/transport/mod.rs

pub mod command;
pub mod event;
pub mod mock;
pub mod traits;

pub use command::NfaCommand;
pub use event::{
    AckKind, ActionTrigger, DiscoverOp, DiscoverRequest, EventSender, NfaEvent, Status,
};
pub use mock::{MockHandle, MockTransport};
pub use traits::Transport;
