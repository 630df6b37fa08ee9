// libnfcee/src/routing/mod.rs

//! Listen-mode routing: descriptor decoding, plan computation, the AID
//! capacity mirror, routing table read-back and the manager that issues
//! it all.

pub mod aid;
pub mod descriptor;
pub mod manager;
pub mod plan;
pub mod table;

pub use aid::{AidEntry, AidTable};
pub use descriptor::RouteDescriptor;
pub use manager::RoutingManager;
pub use plan::{EeView, RoutingPlan, build_clear_plan, build_default_route_plan, build_entry_plan};
pub use table::{RoutingTable, RoutingTableEntry};
