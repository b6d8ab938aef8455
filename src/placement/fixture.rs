//! Fixed stand-in provider.
//!
//! Always proposes the same five cells: three fragments of the first catalog
//! relic and two of the second. Used until a generative provider is wired in.

use crate::grid::{Coord, GridDistribution};
use crate::placement::{PlacementError, PlacementProposal, PlacementProvider, PlacementRequest};

/// Theme of the stand-in layout.
pub const FIXTURE_THEME: &str = "A raccoon astronaut discovering a crystal cave";

const FIRST_RELIC_CELLS: [(u32, u32); 3] = [(10, 15), (25, 40), (50, 5)];
const SECOND_RELIC_CELLS: [(u32, u32); 2] = [(5, 60), (33, 33)];

/// The fixed stand-in provider.
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider;

impl FixtureProvider {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PlacementProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    fn propose(&self, request: &PlacementRequest<'_>) -> Result<PlacementProposal, PlacementError> {
        let relics = request.catalog.relics();
        let first = relics
            .first()
            .ok_or_else(|| PlacementError::new("catalog has no relics to place"))?;
        // A one-relic catalog reuses it for the second slot.
        let second = relics.get(1).unwrap_or(first);

        let mut distribution = GridDistribution::new();
        for (x, y) in FIRST_RELIC_CELLS {
            distribution.place(Coord::new(x, y), first.id.clone());
        }
        for (x, y) in SECOND_RELIC_CELLS {
            distribution.place(Coord::new(x, y), second.id.clone());
        }

        Ok(PlacementProposal {
            theme: FIXTURE_THEME.to_string(),
            distribution,
        })
    }
}
