//! Player-facing game rules: probing grid cells and upgrading ships.
//!
//! Every action runs against an explicit [`GameSession`] and mutates ship
//! counters through the store's atomic [`ShipStore::apply`](crate::storage::ShipStore::apply),
//! never by writing back a locally computed copy.

mod discovery;
mod session;
mod ship;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use discovery::{Discovery, FragmentStack};
pub use session::{GameSession, GameStores, ProbeOutcome, ProbeResult, EMPTY_PROBE_REWARD, PROBE_ENERGY_COST};
pub use ship::{Ship, ShipDelta, ShipSystem, ShipUpdate, STARTING_ENERGY_CORES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(uuid::Uuid);

impl PlayerId {
    /// Creates a new random player ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wraps an existing auth user ID.
    #[must_use]
    pub const fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
