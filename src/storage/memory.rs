//! In-memory storage backend.
//!
//! This module provides thread-safe in-memory implementations of the storage traits.
//! It is intended for embedded usage, tests, and as a reference implementation of
//! the uniqueness and atomicity guarantees the traits require.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::game::{Discovery, FragmentStack, GameStores, PlayerId, Ship, ShipDelta, ShipUpdate};
use crate::generator::{GeneratorPolicy, GridGenerator};
use crate::grid::{Coord, DailyGrid, GridId};
use crate::placement::PlacementProvider;
use crate::relic::{Relic, RelicId};
use crate::report::EconomicReport;
use crate::storage::traits::{
    DiscoveryStore, GridStore, InsertOutcome, InventoryStore, RelicStore, ReportStore, ShipStore,
    StorageError,
};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory report store, ordered by date.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    by_date: RwLock<BTreeMap<NaiveDate, EconomicReport>>,
}

impl InMemoryReportStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportStore for InMemoryReportStore {
    fn latest(&self) -> Result<Option<EconomicReport>, StorageError> {
        let reports = self.by_date.read().map_err(|_| lock_err("report.latest"))?;
        Ok(reports.values().next_back().cloned())
    }

    fn insert(&self, report: EconomicReport) -> Result<(), StorageError> {
        let mut reports = self.by_date.write().map_err(|_| lock_err("report.insert"))?;
        if reports.contains_key(&report.report_date) {
            return Err(StorageError::DuplicateKey(report.report_date.to_string()));
        }
        reports.insert(report.report_date, report);
        Ok(())
    }
}

/// Thread-safe in-memory relic catalog. Preserves insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRelicStore {
    relics: RwLock<Vec<Relic>>,
}

impl InMemoryRelicStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RelicStore for InMemoryRelicStore {
    fn all(&self) -> Result<Vec<Relic>, StorageError> {
        let relics = self.relics.read().map_err(|_| lock_err("relic.all"))?;
        Ok(relics.clone())
    }

    fn insert(&self, relic: Relic) -> Result<(), StorageError> {
        let mut relics = self.relics.write().map_err(|_| lock_err("relic.insert"))?;
        if relics.iter().any(|r| r.id == relic.id) {
            return Err(StorageError::DuplicateKey(relic.id.to_string()));
        }
        relics.push(relic);
        Ok(())
    }
}

/// Thread-safe in-memory grid store keyed by date.
#[derive(Debug, Default)]
pub struct InMemoryGridStore {
    by_date: RwLock<BTreeMap<NaiveDate, DailyGrid>>,
}

impl InMemoryGridStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored grids.
    pub fn len(&self) -> Result<usize, StorageError> {
        let grids = self.by_date.read().map_err(|_| lock_err("grid.len"))?;
        Ok(grids.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl GridStore for InMemoryGridStore {
    fn insert_if_absent(&self, grid: DailyGrid) -> Result<InsertOutcome, StorageError> {
        // Check and insert under one write guard.
        let mut grids = self.by_date.write().map_err(|_| lock_err("grid.insert"))?;
        if grids.contains_key(&grid.grid_date) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        grids.insert(grid.grid_date, grid);
        Ok(InsertOutcome::Inserted)
    }

    fn get_by_date(&self, date: NaiveDate) -> Result<Option<DailyGrid>, StorageError> {
        let grids = self.by_date.read().map_err(|_| lock_err("grid.get_by_date"))?;
        Ok(grids.get(&date).cloned())
    }

    fn latest(&self) -> Result<Option<DailyGrid>, StorageError> {
        let grids = self.by_date.read().map_err(|_| lock_err("grid.latest"))?;
        Ok(grids.values().next_back().cloned())
    }
}

/// Thread-safe in-memory ship store.
#[derive(Debug, Default)]
pub struct InMemoryShipStore {
    by_player: RwLock<HashMap<PlayerId, Ship>>,
}

impl InMemoryShipStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShipStore for InMemoryShipStore {
    fn get(&self, player: PlayerId) -> Result<Option<Ship>, StorageError> {
        let ships = self.by_player.read().map_err(|_| lock_err("ship.get"))?;
        Ok(ships.get(&player).cloned())
    }

    fn insert(&self, ship: Ship) -> Result<(), StorageError> {
        let mut ships = self.by_player.write().map_err(|_| lock_err("ship.insert"))?;
        if ships.contains_key(&ship.player_id) {
            return Err(StorageError::DuplicateKey(ship.player_id.to_string()));
        }
        ships.insert(ship.player_id, ship);
        Ok(())
    }

    fn apply(&self, player: PlayerId, delta: ShipDelta) -> Result<ShipUpdate, StorageError> {
        let mut ships = self.by_player.write().map_err(|_| lock_err("ship.apply"))?;
        let ship = ships
            .get_mut(&player)
            .ok_or_else(|| StorageError::NotFound(format!("ship for player {player}")))?;
        match ship.with_delta(&delta) {
            Some(next) => {
                *ship = next.clone();
                Ok(ShipUpdate::Applied(next))
            }
            None => Ok(ShipUpdate::Rejected(ship.clone())),
        }
    }
}

type DiscoveryKey = (GridId, PlayerId, u32, u32);

/// Thread-safe in-memory discovery store.
#[derive(Debug, Default)]
pub struct InMemoryDiscoveryStore {
    by_key: RwLock<HashMap<DiscoveryKey, Discovery>>,
}

impl InMemoryDiscoveryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiscoveryStore for InMemoryDiscoveryStore {
    fn record(&self, discovery: Discovery) -> Result<InsertOutcome, StorageError> {
        let key = (
            discovery.grid_id,
            discovery.player_id,
            discovery.coord_x,
            discovery.coord_y,
        );
        let mut rows = self.by_key.write().map_err(|_| lock_err("discovery.record"))?;
        if rows.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        rows.insert(key, discovery);
        Ok(InsertOutcome::Inserted)
    }

    fn release(&self, grid: GridId, player: PlayerId, coord: Coord) -> Result<(), StorageError> {
        let mut rows = self.by_key.write().map_err(|_| lock_err("discovery.release"))?;
        rows.remove(&(grid, player, coord.x, coord.y));
        Ok(())
    }

    fn probed_by(&self, grid: GridId, player: PlayerId) -> Result<Vec<Discovery>, StorageError> {
        let rows = self.by_key.read().map_err(|_| lock_err("discovery.probed_by"))?;
        let mut out: Vec<Discovery> = rows
            .values()
            .filter(|d| d.grid_id == grid && d.player_id == player)
            .cloned()
            .collect();
        out.sort_by_key(|d| (d.coord_y, d.coord_x));
        Ok(out)
    }
}

/// Thread-safe in-memory inventory store.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    quantities: RwLock<HashMap<PlayerId, BTreeMap<RelicId, u32>>>,
}

impl InMemoryInventoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn award_fragment(&self, player: PlayerId, relic: &RelicId) -> Result<u32, StorageError> {
        let mut all = self.quantities.write().map_err(|_| lock_err("inventory.award"))?;
        let quantity = all.entry(player).or_default().entry(relic.clone()).or_insert(0);
        *quantity = quantity
            .checked_add(1)
            .ok_or_else(|| StorageError::BackendError("fragment quantity overflow".to_string()))?;
        Ok(*quantity)
    }

    fn fragments(&self, player: PlayerId) -> Result<Vec<FragmentStack>, StorageError> {
        let all = self.quantities.read().map_err(|_| lock_err("inventory.fragments"))?;
        Ok(all
            .get(&player)
            .map(|stacks| {
                stacks
                    .iter()
                    .map(|(relic_id, &quantity)| FragmentStack {
                        player_id: player,
                        relic_id: relic_id.clone(),
                        quantity,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Bundle of every in-memory store, shared behind `Arc`s.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStores {
    /// Economic report store.
    pub reports: Arc<InMemoryReportStore>,
    /// Relic catalog.
    pub relics: Arc<InMemoryRelicStore>,
    /// Daily grid store.
    pub grids: Arc<InMemoryGridStore>,
    /// Ship store.
    pub ships: Arc<InMemoryShipStore>,
    /// Discovery store.
    pub discoveries: Arc<InMemoryDiscoveryStore>,
    /// Inventory store.
    pub inventory: Arc<InMemoryInventoryStore>,
}

impl InMemoryStores {
    /// Create a new bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator over these stores.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the policy is invalid.
    pub fn generator(
        &self,
        provider: Arc<dyn PlacementProvider>,
        policy: GeneratorPolicy,
    ) -> Result<GridGenerator, ValidationError> {
        GridGenerator::new(
            self.reports.clone(),
            self.relics.clone(),
            self.grids.clone(),
            provider,
            policy,
        )
    }

    /// The game-side view of these stores.
    #[must_use]
    pub fn game_stores(&self) -> GameStores {
        GameStores {
            grids: self.grids.clone(),
            ships: self.ships.clone(),
            discoveries: self.discoveries.clone(),
            inventory: self.inventory.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::grid::GridDistribution;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn grid(d: u32) -> DailyGrid {
        DailyGrid::new(date(d), "theme", "url", GridDistribution::new())
    }

    #[test]
    fn report_latest_is_most_recent_date() {
        let store = InMemoryReportStore::new();
        assert!(store.latest().unwrap().is_none());

        store.insert(EconomicReport::new(date(2), 200.0).unwrap()).unwrap();
        store.insert(EconomicReport::new(date(1), 100.0).unwrap()).unwrap();
        store.insert(EconomicReport::new(date(3), 300.0).unwrap()).unwrap();

        assert_eq!(store.latest().unwrap().unwrap().report_date, date(3));
        assert!(matches!(
            store.insert(EconomicReport::new(date(3), 1.0).unwrap()),
            Err(StorageError::DuplicateKey(_))
        ));
    }

    #[test]
    fn relic_store_rejects_duplicate_ids() {
        let store = InMemoryRelicStore::new();
        store.insert(Relic::new("a", "Amber", 5.0, 1.0).unwrap()).unwrap();
        assert!(store.insert(Relic::new("a", "Again", 6.0, 1.0).unwrap()).is_err());
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[test]
    fn grid_insert_is_unique_per_date() {
        let store = InMemoryGridStore::new();
        let first = grid(1);
        let first_id = first.id;

        assert_eq!(store.insert_if_absent(first).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_if_absent(grid(1)).unwrap(), InsertOutcome::AlreadyExists);
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get_by_date(date(1)).unwrap().unwrap().id, first_id);
    }

    #[test]
    fn grid_latest() {
        let store = InMemoryGridStore::new();
        store.insert_if_absent(grid(5)).unwrap();
        store.insert_if_absent(grid(2)).unwrap();
        assert_eq!(store.latest().unwrap().unwrap().grid_date, date(5));
    }

    #[test]
    fn concurrent_grid_inserts_yield_one_row() {
        let store = Arc::new(InMemoryGridStore::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.insert_if_absent(grid(1)).unwrap()
                })
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let inserted = outcomes.iter().filter(|o| **o == InsertOutcome::Inserted).count();
        assert_eq!(inserted, 1);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn ship_apply_is_guarded() {
        let store = InMemoryShipStore::new();
        let player = PlayerId::new();
        let mut ship = Ship::new(player);
        ship.energy_cores = 1;
        store.insert(ship).unwrap();

        let update = store.apply(player, ShipDelta::probe(1, 10)).unwrap();
        assert!(matches!(update, ShipUpdate::Applied(ref s) if s.energy_cores == 0));

        let update = store.apply(player, ShipDelta::probe(1, 10)).unwrap();
        let ShipUpdate::Rejected(current) = update else {
            panic!("expected rejection");
        };
        assert_eq!(current.energy_cores, 0);
        assert_eq!(current.chrono_particles, 10);

        assert!(matches!(
            store.apply(PlayerId::new(), ShipDelta::default()),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn discovery_unique_per_cell() {
        let store = InMemoryDiscoveryStore::new();
        let grid_id = GridId::new();
        let player = PlayerId::new();
        let d = Discovery::new(grid_id, player, Coord::new(3, 4), None);

        assert_eq!(store.record(d.clone()).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.record(d).unwrap(), InsertOutcome::AlreadyExists);

        let other = PlayerId::new();
        let d2 = Discovery::new(grid_id, other, Coord::new(3, 4), None);
        assert_eq!(store.record(d2).unwrap(), InsertOutcome::Inserted);

        assert_eq!(store.probed_by(grid_id, player).unwrap().len(), 1);

        store.release(grid_id, player, Coord::new(3, 4)).unwrap();
        store.release(grid_id, player, Coord::new(9, 9)).unwrap();
        assert!(store.probed_by(grid_id, player).unwrap().is_empty());
        assert_eq!(
            store.record(Discovery::new(grid_id, player, Coord::new(3, 4), None)).unwrap(),
            InsertOutcome::Inserted
        );
    }

    #[test]
    fn inventory_counts_fragments() {
        let store = InMemoryInventoryStore::new();
        let player = PlayerId::new();
        let relic = RelicId::new("amber");

        assert_eq!(store.award_fragment(player, &relic).unwrap(), 1);
        assert_eq!(store.award_fragment(player, &relic).unwrap(), 2);
        store.award_fragment(player, &RelicId::new("basalt")).unwrap();

        let stacks = store.fragments(player).unwrap();
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].relic_id.as_str(), "amber");
        assert_eq!(stacks[0].quantity, 2);
        assert!(store.fragments(PlayerId::new()).unwrap().is_empty());
    }
}
