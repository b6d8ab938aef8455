//! Daily grid records and their reward distribution.
//!
//! A distribution maps cell coordinates to relic placements. On the wire
//! (and in the `daily_grids.grid_distribution` column) it is a JSON object
//! keyed by `"x_y"`:
//!
//! ```json
//! { "10_15": { "relic_id": "..." }, "33_33": { "relic_id": "..." } }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::relic::RelicId;

/// Default width and height of the probe grid.
pub const DEFAULT_GRID_SIZE: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridId(uuid::Uuid);

impl GridId {
    /// Creates a new random grid ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for GridId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// The `"x_y"` lookup key used by clients.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Returns true if the cell lies inside a `grid_size` x `grid_size` grid.
    #[must_use]
    pub const fn within(&self, grid_size: u32) -> bool {
        self.x < grid_size && self.y < grid_size
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

impl FromStr for Coord {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidCoordinateKey { key: s.to_string() };
        let (x, y) = s.split_once('_').ok_or_else(invalid)?;
        // Reject signs and whitespace that `u32::from_str` would otherwise accept.
        if !x.bytes().all(|b| b.is_ascii_digit()) || !y.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let x = x.parse().map_err(|_| invalid())?;
        let y = y.parse().map_err(|_| invalid())?;
        Ok(Self { x, y })
    }
}

impl From<Coord> for String {
    fn from(coord: Coord) -> Self {
        coord.to_string()
    }
}

impl TryFrom<String> for Coord {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What lies under a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub relic_id: RelicId,
}

impl Placement {
    #[must_use]
    pub fn new(relic_id: RelicId) -> Self {
        Self { relic_id }
    }
}

/// Mapping of cells to relic placements.
///
/// Keys are unique by construction; iteration order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridDistribution(BTreeMap<Coord, Placement>);

impl GridDistribution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a relic, returning the placement it replaced, if any.
    pub fn place(&mut self, coord: Coord, relic_id: RelicId) -> Option<Placement> {
        self.0.insert(coord, Placement::new(relic_id))
    }

    pub fn get(&self, coord: Coord) -> Option<&Placement> {
        self.0.get(&coord)
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.0.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Coord, &Placement)> {
        self.0.iter()
    }
}

impl FromIterator<(Coord, RelicId)> for GridDistribution {
    fn from_iter<T: IntoIterator<Item = (Coord, RelicId)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(coord, relic_id)| (coord, Placement::new(relic_id)))
                .collect(),
        )
    }
}

/// One persisted grid per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGrid {
    pub id: GridId,
    pub grid_date: NaiveDate,
    pub mystery_image_theme: String,
    pub mystery_image_url: String,
    pub grid_distribution: GridDistribution,
}

impl DailyGrid {
    /// Creates a new grid record with a fresh ID.
    #[must_use]
    pub fn new(
        grid_date: NaiveDate,
        mystery_image_theme: impl Into<String>,
        mystery_image_url: impl Into<String>,
        grid_distribution: GridDistribution,
    ) -> Self {
        Self {
            id: GridId::new(),
            grid_date,
            mystery_image_theme: mystery_image_theme.into(),
            mystery_image_url: mystery_image_url.into(),
            grid_distribution,
        }
    }

    /// Looks up the relic hidden at a cell.
    pub fn relic_at(&self, coord: Coord) -> Option<&RelicId> {
        self.grid_distribution.get(coord).map(|p| &p.relic_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_parses_key() {
        assert_eq!("10_15".parse::<Coord>().unwrap(), Coord::new(10, 15));
        assert_eq!(Coord::new(5, 60).key(), "5_60");
    }

    #[test]
    fn coord_rejects_malformed_keys() {
        for key in ["", "10", "10_", "_5", "a_b", "-1_2", "+1_2", "1_2_3", " 1_2"] {
            assert!(key.parse::<Coord>().is_err(), "accepted {key:?}");
        }
    }

    #[test]
    fn coord_bounds() {
        assert!(Coord::new(31, 31).within(32));
        assert!(!Coord::new(32, 0).within(32));
        assert!(!Coord::new(0, 0).within(0));
    }

    #[test]
    fn distribution_uses_string_keys() {
        let dist: GridDistribution = [
            (Coord::new(10, 15), RelicId::new("r1")),
            (Coord::new(33, 33), RelicId::new("r2")),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&dist).unwrap();
        assert_eq!(json["10_15"]["relic_id"], "r1");
        assert_eq!(json["33_33"]["relic_id"], "r2");

        let back: GridDistribution = serde_json::from_value(json).unwrap();
        assert_eq!(back, dist);
    }

    #[test]
    fn distribution_rejects_bad_key_on_decode() {
        let raw = r#"{"ten_fifteen": {"relic_id": "r1"}}"#;
        assert!(serde_json::from_str::<GridDistribution>(raw).is_err());
    }

    #[test]
    fn daily_grid_lookup() {
        let mut dist = GridDistribution::new();
        dist.place(Coord::new(1, 2), RelicId::new("r1"));
        let grid = DailyGrid::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            "theme",
            "url",
            dist,
        );
        assert_eq!(grid.relic_at(Coord::new(1, 2)), Some(&RelicId::new("r1")));
        assert_eq!(grid.relic_at(Coord::new(2, 1)), None);
    }
}
