//! Storage trait definitions and backends.
//!
//! The traits define the abstract interface the generator and game rules
//! run against. `memory` backs tests and embedded use; `postgrest` talks to
//! the hosted Supabase database.

mod memory;
#[cfg(feature = "supabase")]
mod postgrest;
mod traits;

pub use memory::{
    InMemoryDiscoveryStore, InMemoryGridStore, InMemoryInventoryStore, InMemoryRelicStore,
    InMemoryReportStore, InMemoryShipStore, InMemoryStores,
};
#[cfg(feature = "supabase")]
pub use postgrest::PostgrestStore;
pub use traits::{
    DiscoveryStore, GridStore, InsertOutcome, InventoryStore, RelicStore, ReportStore, ShipStore,
    StorageError,
};
