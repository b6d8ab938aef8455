//! Validation of proposed grid distributions.
//!
//! Proposals come from a pluggable provider and are not trusted: every
//! placement is bounds-checked and priced against the catalog fetched in
//! the same invocation before anything is written.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::economy::BudgetPlan;
use crate::error::{GenerationError, ValidationError};
use crate::grid::{Coord, GridDistribution};
use crate::relic::RelicCatalog;

/// How to treat placements that reference a relic missing from the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownRelicPolicy {
    /// Count the placement as worth nothing and keep going.
    #[default]
    Skip,
    /// Fail the attempt.
    Reject,
}

impl fmt::Display for UnknownRelicPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for UnknownRelicPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "reject" => Ok(Self::Reject),
            other => Err(ValidationError::InvalidSetting {
                field: "unknown_relics".to_string(),
                reason: format!("expected 'skip' or 'reject', got '{other}'"),
            }),
        }
    }
}

/// Rules a distribution is checked against.
#[derive(Debug, Clone, Copy)]
pub struct DistributionRules<'a> {
    pub catalog: &'a RelicCatalog,
    pub budget: &'a BudgetPlan,
    pub grid_size: u32,
    pub unknown_relics: UnknownRelicPolicy,
}

/// Result of a successful validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementSummary {
    /// Total catalog value of every priced placement.
    pub placed_value_usd: f64,
    /// Number of placements in the distribution.
    pub placement_count: usize,
    /// Cells whose relic was not in the catalog (only under `Skip`).
    pub unknown_relics: Vec<Coord>,
}

/// Checks a proposed distribution.
///
/// # Errors
///
/// - `OutOfBounds` if a cell lies outside the grid
/// - `UnknownRelic` if a relic is missing and the policy is `Reject`
/// - `BudgetExceeded` if the total value is strictly greater than the budget
pub fn validate_distribution(
    distribution: &GridDistribution,
    rules: &DistributionRules<'_>,
) -> Result<PlacementSummary, GenerationError> {
    if rules.grid_size == 0 {
        return Err(ValidationError::EmptyGrid.into());
    }

    let mut placed_value_usd = 0.0;
    let mut unknown_relics = Vec::new();

    for (coord, placement) in distribution.iter() {
        if !coord.within(rules.grid_size) {
            return Err(GenerationError::OutOfBounds {
                coord: *coord,
                grid_size: rules.grid_size,
            });
        }
        match rules.catalog.value_of(&placement.relic_id) {
            Some(value) => placed_value_usd += value,
            None => match rules.unknown_relics {
                UnknownRelicPolicy::Skip => unknown_relics.push(*coord),
                UnknownRelicPolicy::Reject => {
                    return Err(GenerationError::UnknownRelic {
                        coord: *coord,
                        relic_id: placement.relic_id.clone(),
                    });
                }
            },
        }
    }

    if !rules.budget.allows(placed_value_usd) {
        return Err(GenerationError::BudgetExceeded {
            placed_usd: placed_value_usd,
            budget_usd: rules.budget.prize_budget_usd,
        });
    }

    Ok(PlacementSummary {
        placed_value_usd,
        placement_count: distribution.len(),
        unknown_relics,
    })
}
