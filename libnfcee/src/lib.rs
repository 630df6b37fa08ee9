// libnfcee/src/lib.rs

//! libnfcee
//!
//! Listen-mode routing and secure element lifecycle control for NCI
//! controllers: technology, protocol and AID routing, EE discovery and
//! reset recovery, the transaction guard, reader mode over SWP and host
//! card emulation.
#![warn(missing_docs)]

#[cfg(feature = "async")]
pub mod async_api;
pub mod ce;
pub mod config;
pub mod constants;
pub mod context;
pub mod discovery;
pub mod dispatch;
pub mod ee;
pub mod error;
pub mod listener;
pub mod prelude;
pub mod reader;
pub mod routing;
pub mod test_support;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export common types at crate root so `crate::Error`, `crate::Result`
// and the newtypes in `types` are available to consumers and to the
// `prelude` re-exports.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
