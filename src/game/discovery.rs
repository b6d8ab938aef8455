//! Probe history and collected fragments.

use serde::{Deserialize, Serialize};

use crate::game::PlayerId;
use crate::grid::{Coord, GridId};
use crate::relic::RelicId;

/// One probe of one cell by one player.
///
/// At most one discovery exists per `(grid_id, player_id, coord_x, coord_y)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    pub grid_id: GridId,
    pub player_id: PlayerId,
    pub coord_x: u32,
    pub coord_y: u32,
    /// The relic found, or `None` for an empty cell.
    pub relic_id: Option<RelicId>,
}

impl Discovery {
    #[must_use]
    pub fn new(grid_id: GridId, player_id: PlayerId, coord: Coord, relic_id: Option<RelicId>) -> Self {
        Self {
            grid_id,
            player_id,
            coord_x: coord.x,
            coord_y: coord.y,
            relic_id,
        }
    }

    #[must_use]
    pub const fn coord(&self) -> Coord {
        Coord::new(self.coord_x, self.coord_y)
    }
}

/// How many fragments of one relic a player holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentStack {
    pub player_id: PlayerId,
    pub relic_id: RelicId,
    pub quantity: u32,
}
