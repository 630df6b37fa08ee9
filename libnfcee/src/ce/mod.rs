// libnfcee/src/ce/mod.rs

//! Card emulation on the host: APDU reassembly and Felica NFCID2 routing.

pub mod felica;
pub mod host;

pub use felica::{FelicaRouting, Nfcid2Entry};
pub use host::HostCardEmulation;
