//! Player ships and their upgradeable systems.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::game::PlayerId;

/// Energy cores a new ship starts with.
pub const STARTING_ENERGY_CORES: u32 = 100;

/// An upgradeable ship system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipSystem {
    Engine,
    Reactor,
    Fabricator,
    Scanner,
}

impl ShipSystem {
    pub const ALL: [Self; 4] = [Self::Engine, Self::Reactor, Self::Fabricator, Self::Scanner];

    /// Chrono-particle cost of one upgrade level.
    #[must_use]
    pub const fn upgrade_cost(self) -> u64 {
        match self {
            Self::Engine => 100,
            Self::Reactor => 120,
            Self::Fabricator => 150,
            Self::Scanner => 200,
        }
    }
}

impl fmt::Display for ShipSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine => write!(f, "engine"),
            Self::Reactor => write!(f, "reactor"),
            Self::Fabricator => write!(f, "fabricator"),
            Self::Scanner => write!(f, "scanner"),
        }
    }
}

impl FromStr for ShipSystem {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "engine" => Ok(Self::Engine),
            "reactor" => Ok(Self::Reactor),
            "fabricator" => Ok(Self::Fabricator),
            "scanner" => Ok(Self::Scanner),
            _ => Err(ValidationError::UnknownSystem {
                name: s.to_string(),
            }),
        }
    }
}

/// A player's ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    pub player_id: PlayerId,
    pub energy_cores: u32,
    pub chrono_particles: u64,
    pub engine_level: u32,
    pub reactor_level: u32,
    pub fabricator_level: u32,
    pub scanner_level: u32,
}

impl Ship {
    /// A fresh level-1 ship.
    #[must_use]
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            energy_cores: STARTING_ENERGY_CORES,
            chrono_particles: 0,
            engine_level: 1,
            reactor_level: 1,
            fabricator_level: 1,
            scanner_level: 1,
        }
    }

    #[must_use]
    pub const fn level(&self, system: ShipSystem) -> u32 {
        match system {
            ShipSystem::Engine => self.engine_level,
            ShipSystem::Reactor => self.reactor_level,
            ShipSystem::Fabricator => self.fabricator_level,
            ShipSystem::Scanner => self.scanner_level,
        }
    }

    fn level_mut(&mut self, system: ShipSystem) -> &mut u32 {
        match system {
            ShipSystem::Engine => &mut self.engine_level,
            ShipSystem::Reactor => &mut self.reactor_level,
            ShipSystem::Fabricator => &mut self.fabricator_level,
            ShipSystem::Scanner => &mut self.scanner_level,
        }
    }

    /// Returns the ship after `delta`, or `None` if any counter would go
    /// negative or overflow.
    #[must_use]
    pub fn with_delta(&self, delta: &ShipDelta) -> Option<Self> {
        let mut next = self.clone();
        next.energy_cores = offset_u32(self.energy_cores, delta.energy_cores)?;
        next.chrono_particles = offset_u64(self.chrono_particles, delta.chrono_particles)?;
        if let Some(system) = delta.upgrade {
            let level = next.level_mut(system);
            *level = level.checked_add(1)?;
        }
        Some(next)
    }
}

fn offset_u32(value: u32, delta: i64) -> Option<u32> {
    u32::try_from(i64::from(value).checked_add(delta)?).ok()
}

fn offset_u64(value: u64, delta: i64) -> Option<u64> {
    if delta >= 0 {
        value.checked_add(delta.unsigned_abs())
    } else {
        value.checked_sub(delta.unsigned_abs())
    }
}

/// A relative change to a ship, applied atomically by the ship store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipDelta {
    pub energy_cores: i64,
    pub chrono_particles: i64,
    pub upgrade: Option<ShipSystem>,
}

impl ShipDelta {
    /// Cost and reward of one probe.
    #[must_use]
    pub fn probe(energy_cost: u32, particle_reward: u32) -> Self {
        Self {
            energy_cores: -i64::from(energy_cost),
            chrono_particles: i64::from(particle_reward),
            upgrade: None,
        }
    }

    /// Counter change that undoes this one. Upgrade levels are not reverted.
    #[must_use]
    pub const fn refund(&self) -> Self {
        Self {
            energy_cores: -self.energy_cores,
            chrono_particles: -self.chrono_particles,
            upgrade: None,
        }
    }

    /// Pays for and applies one upgrade level.
    #[must_use]
    pub fn upgrade(system: ShipSystem) -> Self {
        Self {
            energy_cores: 0,
            chrono_particles: -i64::try_from(system.upgrade_cost()).unwrap_or(i64::MAX),
            upgrade: Some(system),
        }
    }
}

/// Result of a guarded ship mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipUpdate {
    /// The delta was applied; holds the new state.
    Applied(Ship),
    /// The delta would have driven a counter negative; holds the untouched state.
    Rejected(Ship),
}
