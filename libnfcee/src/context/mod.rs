// libnfcee/src/context/mod.rs

//! The session object tying transport, dispatcher and components together.

pub mod builder;
pub mod handle;
mod handler;

pub use builder::NfcContextBuilder;
#[cfg(feature = "diagnostics")]
pub use handle::Diagnostics;
pub use handle::{Initialized, NfcContext, Uninitialized};
