// libnfcee/src/prelude.rs

pub use crate::config::{RoutingConfig, RoutingConfigBuilder};
pub use crate::context::{Initialized, NfcContext, NfcContextBuilder, Uninitialized};
pub use crate::ee::ChipId;
pub use crate::listener::{NoopListener, ServiceListener};
pub use crate::routing::{RouteDescriptor, RoutingManager, RoutingTable};
pub use crate::transport::{MockTransport, NfaCommand, NfaEvent, Transport};
pub use crate::{
    Aid, DataStatus, EeHandle, EeInfo, EeStatus, Error, GenericEeId, Nfcid2, PowerMask, ProtoMask,
    Result, RouteKind, RouteKindMask, ScreenState, SystemCode, TechMask,
};

#[cfg(feature = "async")]
pub use crate::async_api::{AsyncNfcContext, AsyncRoutingApi};

// Re-export small utilities for convenience
pub use crate::utils::{bytes_to_hex, bytes_to_hex_spaced, ms, parse_hex};
