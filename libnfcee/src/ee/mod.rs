// libnfcee/src/ee/mod.rs

//! Execution environments: registry, lifecycle and reset handling, the
//! transaction guard and chip errata policies.

pub mod lifecycle;
pub mod quirks;
pub mod registry;
pub mod transaction;

pub use lifecycle::{EeLifecycle, LifecycleState, LifecycleTimeouts, WiredSession};
pub use quirks::{ChipId, Quirks, create_quirks_for};
pub use registry::EeRegistry;
pub use transaction::{DeferredSink, TransactionGuard, TransactionState};
