//! Explicit per-player game context.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::error::GameError;
use crate::game::{Discovery, FragmentStack, PlayerId, Ship, ShipDelta, ShipSystem, ShipUpdate};
use crate::grid::{Coord, DailyGrid};
use crate::relic::RelicId;
use crate::storage::{
    DiscoveryStore, GridStore, InsertOutcome, InventoryStore, ShipStore, StorageError,
};

/// Energy cores spent per probe.
pub const PROBE_ENERGY_COST: u32 = 1;

/// Chrono particles awarded for probing an empty cell.
pub const EMPTY_PROBE_REWARD: u32 = 10;

/// Stores the game rules read and write.
#[derive(Clone)]
pub struct GameStores {
    pub grids: Arc<dyn GridStore>,
    pub ships: Arc<dyn ShipStore>,
    pub discoveries: Arc<dyn DiscoveryStore>,
    pub inventory: Arc<dyn InventoryStore>,
}

/// What a probe revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// A relic fragment was found and added to the inventory.
    RelicFound {
        relic_id: RelicId,
        /// Fragments of this relic held after the award.
        quantity: u32,
    },
    /// Nothing here; the player earns chrono particles instead.
    Empty {
        particles_awarded: u32,
    },
}

/// Result of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub coord: Coord,
    pub outcome: ProbeOutcome,
    /// Ship state right after the probe was paid for.
    pub ship: Ship,
}

/// One player's view of one daily grid.
pub struct GameSession {
    player: PlayerId,
    grid: DailyGrid,
    grid_size: u32,
    stores: GameStores,
}

impl GameSession {
    /// Creates a session on an already loaded grid.
    #[must_use]
    pub fn new(player: PlayerId, grid: DailyGrid, grid_size: u32, stores: GameStores) -> Self {
        Self {
            player,
            grid,
            grid_size,
            stores,
        }
    }

    /// Opens a session on the most recent grid.
    ///
    /// # Errors
    ///
    /// `NoActiveGrid` if no grid has been generated yet.
    pub fn open(player: PlayerId, grid_size: u32, stores: GameStores) -> Result<Self, GameError> {
        let grid = stores.grids.latest()?.ok_or(GameError::NoActiveGrid)?;
        Ok(Self::new(player, grid, grid_size, stores))
    }

    pub const fn player(&self) -> PlayerId {
        self.player
    }

    pub const fn grid(&self) -> &DailyGrid {
        &self.grid
    }

    /// Current ship state.
    pub fn ship(&self) -> Result<Ship, GameError> {
        self.stores
            .ships
            .get(self.player)?
            .ok_or_else(|| self.ship_not_found())
    }

    /// Cells this player already probed on this grid.
    pub fn probed_cells(&self) -> Result<BTreeSet<Coord>, GameError> {
        Ok(self
            .stores
            .discoveries
            .probed_by(self.grid.id, self.player)?
            .iter()
            .map(Discovery::coord)
            .collect())
    }

    /// The player's collected fragments.
    pub fn inventory(&self) -> Result<Vec<FragmentStack>, GameError> {
        Ok(self.stores.inventory.fragments(self.player)?)
    }

    /// Probes one cell.
    ///
    /// The cell is claimed before energy is spent, so a repeated probe
    /// fails with `AlreadyProbed` and costs nothing. If the spend or the
    /// fragment award fails afterwards, the claim is released and any
    /// charge refunded, leaving the cell probeable.
    pub fn probe(&self, x: u32, y: u32) -> Result<ProbeResult, GameError> {
        let coord = Coord::new(x, y);
        if !coord.within(self.grid_size) {
            return Err(GameError::OutOfBounds {
                x,
                y,
                grid_size: self.grid_size,
            });
        }

        let ship = self.ship()?;
        if ship.energy_cores < PROBE_ENERGY_COST {
            return Err(GameError::OutOfEnergy);
        }

        let relic = self.grid.relic_at(coord).cloned();
        let discovery = Discovery::new(self.grid.id, self.player, coord, relic.clone());
        if self.stores.discoveries.record(discovery)? == InsertOutcome::AlreadyExists {
            return Err(GameError::AlreadyProbed { x, y });
        }

        let reward = if relic.is_some() { 0 } else { EMPTY_PROBE_REWARD };
        let delta = ShipDelta::probe(PROBE_ENERGY_COST, reward);
        let ship = match self.apply(delta) {
            Ok(ShipUpdate::Applied(ship)) => ship,
            // Another action drained the last core between the read and the spend.
            Ok(ShipUpdate::Rejected(_)) => {
                self.release(coord);
                return Err(GameError::OutOfEnergy);
            }
            Err(e) => {
                self.release(coord);
                return Err(e);
            }
        };

        let outcome = match relic {
            Some(relic_id) => {
                let quantity = match self.stores.inventory.award_fragment(self.player, &relic_id) {
                    Ok(quantity) => quantity,
                    Err(e) => {
                        self.refund(delta);
                        self.release(coord);
                        return Err(e.into());
                    }
                };
                tracing::info!(player = %self.player, %coord, %relic_id, quantity, "relic fragment found");
                ProbeOutcome::RelicFound { relic_id, quantity }
            }
            None => {
                tracing::debug!(player = %self.player, %coord, "empty node probed");
                ProbeOutcome::Empty {
                    particles_awarded: reward,
                }
            }
        };

        Ok(ProbeResult {
            coord,
            outcome,
            ship,
        })
    }

    /// Buys one level of a ship system.
    ///
    /// # Errors
    ///
    /// `InsufficientParticles` if the ship cannot afford it; nothing changes.
    pub fn upgrade(&self, system: ShipSystem) -> Result<Ship, GameError> {
        match self.apply(ShipDelta::upgrade(system))? {
            ShipUpdate::Applied(ship) => {
                tracing::info!(
                    player = %self.player,
                    %system,
                    level = ship.level(system),
                    "ship system upgraded"
                );
                Ok(ship)
            }
            ShipUpdate::Rejected(current) => Err(GameError::InsufficientParticles {
                needed: system.upgrade_cost(),
                available: current.chrono_particles,
            }),
        }
    }

    fn apply(&self, delta: ShipDelta) -> Result<ShipUpdate, GameError> {
        match self.stores.ships.apply(self.player, delta) {
            Err(StorageError::NotFound(_)) => Err(self.ship_not_found()),
            other => Ok(other?),
        }
    }

    /// Frees a claimed cell after the probe failed.
    fn release(&self, coord: Coord) {
        if let Err(e) = self.stores.discoveries.release(self.grid.id, self.player, coord) {
            tracing::error!(player = %self.player, %coord, error = %e, "failed to release probed cell");
        }
    }

    /// Returns what a failed probe already charged.
    fn refund(&self, delta: ShipDelta) {
        match self.stores.ships.apply(self.player, delta.refund()) {
            Ok(ShipUpdate::Applied(_)) => {}
            Ok(ShipUpdate::Rejected(_)) => {
                tracing::error!(player = %self.player, "probe refund rejected");
            }
            Err(e) => {
                tracing::error!(player = %self.player, error = %e, "probe refund failed");
            }
        }
    }

    fn ship_not_found(&self) -> GameError {
        GameError::ShipNotFound {
            player: self.player.to_string(),
        }
    }
}
