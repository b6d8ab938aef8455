//! Abstract storage traits for Starcritters.
//!
//! These traits define the contract that storage backends must implement:
//! - In-memory backends for tests and embedded use
//! - The Supabase (PostgREST) backend for production

use chrono::NaiveDate;
use thiserror::Error;

use crate::game::{Discovery, FragmentStack, PlayerId, Ship, ShipDelta, ShipUpdate};
use crate::grid::{Coord, DailyGrid, GridId};
use crate::relic::{Relic, RelicId};
use crate::report::EconomicReport;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Connection failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl StorageError {
    /// Returns true if the same call may succeed later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

/// Outcome of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was written.
    Inserted,
    /// A row with the same unique key already existed; nothing was written.
    AlreadyExists,
}

/// Storage trait for daily economic reports.
pub trait ReportStore: Send + Sync {
    /// The report with the most recent `report_date`, if any.
    fn latest(&self) -> Result<Option<EconomicReport>, StorageError>;

    /// Record a report. Returns `DuplicateKey` if one exists for that date.
    fn insert(&self, report: EconomicReport) -> Result<(), StorageError>;
}

/// Storage trait for the relic catalog.
pub trait RelicStore: Send + Sync {
    /// Every relic in the catalog. Order is backend-defined.
    fn all(&self) -> Result<Vec<Relic>, StorageError>;

    /// Add a relic. Returns `DuplicateKey` if the ID is taken.
    fn insert(&self, relic: Relic) -> Result<(), StorageError>;
}

/// Storage trait for daily grids.
///
/// # Safety Considerations
/// `insert_if_absent` must be atomic on `grid_date`: concurrent callers for the
/// same date see exactly one `Inserted`, every other caller `AlreadyExists`.
pub trait GridStore: Send + Sync {
    /// Insert the grid unless one already exists for its date.
    fn insert_if_absent(&self, grid: DailyGrid) -> Result<InsertOutcome, StorageError>;

    /// Get the grid for a calendar date.
    fn get_by_date(&self, date: NaiveDate) -> Result<Option<DailyGrid>, StorageError>;

    /// The grid with the most recent date.
    fn latest(&self) -> Result<Option<DailyGrid>, StorageError>;
}

/// Storage trait for player ships.
pub trait ShipStore: Send + Sync {
    /// Get a player's ship.
    fn get(&self, player: PlayerId) -> Result<Option<Ship>, StorageError>;

    /// Register a ship. Returns `DuplicateKey` if the player already has one.
    fn insert(&self, ship: Ship) -> Result<(), StorageError>;

    /// Atomically apply a relative change.
    ///
    /// The delta is applied against the current stored state, never a
    /// caller-held copy. Returns `Rejected` without writing if any counter
    /// would go negative, and `NotFound` if the player has no ship.
    fn apply(&self, player: PlayerId, delta: ShipDelta) -> Result<ShipUpdate, StorageError>;
}

/// Storage trait for probe history.
pub trait DiscoveryStore: Send + Sync {
    /// Record a probe, unique on `(grid, player, x, y)`.
    fn record(&self, discovery: Discovery) -> Result<InsertOutcome, StorageError>;

    /// Drop a recorded probe so the cell can be probed again.
    ///
    /// Releasing a cell that was never recorded is not an error.
    fn release(&self, grid: GridId, player: PlayerId, coord: Coord) -> Result<(), StorageError>;

    /// All probes made by a player on one grid.
    fn probed_by(&self, grid: GridId, player: PlayerId) -> Result<Vec<Discovery>, StorageError>;
}

/// Storage trait for collected relic fragments.
pub trait InventoryStore: Send + Sync {
    /// Add one fragment of `relic` to the player's inventory, returning the new quantity.
    fn award_fragment(&self, player: PlayerId, relic: &RelicId) -> Result<u32, StorageError>;

    /// Every fragment stack the player holds.
    fn fragments(&self, player: PlayerId) -> Result<Vec<FragmentStack>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure traits are object-safe
    fn _assert_report_store_object_safe(_: &dyn ReportStore) {}
    fn _assert_relic_store_object_safe(_: &dyn RelicStore) {}
    fn _assert_grid_store_object_safe(_: &dyn GridStore) {}
    fn _assert_ship_store_object_safe(_: &dyn ShipStore) {}
    fn _assert_discovery_store_object_safe(_: &dyn DiscoveryStore) {}
    fn _assert_inventory_store_object_safe(_: &dyn InventoryStore) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::NotFound("ship for player 42".to_string());
        assert!(err.to_string().contains("Not found"));

        let err = StorageError::BackendError("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_only_connection_errors_are_transient() {
        assert!(StorageError::ConnectionError("reset".into()).is_transient());
        assert!(!StorageError::DuplicateKey("2024-06-01".into()).is_transient());
        assert!(!StorageError::BackendError("boom".into()).is_transient());
    }
}
