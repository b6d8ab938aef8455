//! Deterministic procedural provider.
//!
//! Seeds a BLAKE3 output stream from the grid date, then places up to
//! `fragment_count` fragments on free cells. Relics are drawn weighted by
//! desirability and only while they still fit in the remaining budget, so
//! the proposal always validates. The same date always yields the same grid.

use crate::grid::{Coord, GridDistribution};
use crate::placement::{PlacementError, PlacementProposal, PlacementProvider, PlacementRequest};
use crate::relic::Relic;

const SEED_CONTEXT: &str = "starcritters 2024-06 procedural grid placement";

/// Free-cell draws attempted per fragment before giving up on the grid.
const CELL_ATTEMPTS: u32 = 32;

const THEMES: [&str; 8] = [
    "A raccoon astronaut discovering a crystal cave",
    "An abandoned orbital greenhouse overgrown with glowing moss",
    "A fox pilot charting a nebula made of paper lanterns",
    "Ancient machinery buried under the ice of a frozen moon",
    "A lighthouse floating in an asteroid field",
    "Otters repairing a comet-powered engine",
    "A desert planet where the dunes are made of copper",
    "A whale-shaped starship sleeping in a gas giant's rings",
];

/// Deterministic stream of pseudo-random values.
struct SeedStream {
    reader: blake3::OutputReader,
}

impl SeedStream {
    fn new(request: &PlacementRequest<'_>) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(SEED_CONTEXT);
        hasher.update(request.grid_date.to_string().as_bytes());
        hasher.update(&request.grid_size.to_le_bytes());
        Self {
            reader: hasher.finalize_xof(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.reader.fill(&mut buf);
        u64::from_le_bytes(buf)
    }

    /// Uniform value in `[0, bound)`. `bound` must be non-zero.
    #[allow(clippy::cast_possible_truncation)]
    fn below(&mut self, bound: u32) -> u32 {
        (self.next_u64() % u64::from(bound)) as u32
    }

    /// Uniform value in `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Procedural, budget-aware provider.
#[derive(Debug, Clone, Default)]
pub struct ProceduralProvider;

impl ProceduralProvider {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn weight(relic: &Relic) -> f64 {
    relic.desirability_score.max(0.0)
}

/// Draws one relic among those still affordable.
fn pick<'a>(stream: &mut SeedStream, affordable: &[&'a Relic]) -> Option<&'a Relic> {
    let total: f64 = affordable.iter().map(|r| weight(r)).sum();
    if total <= 0.0 {
        let len = u32::try_from(affordable.len()).ok()?;
        if len == 0 {
            return None;
        }
        return affordable.get(stream.below(len) as usize).copied();
    }

    let mut target = stream.unit() * total;
    for relic in affordable {
        target -= weight(relic);
        if target < 0.0 {
            return Some(relic);
        }
    }
    affordable.last().copied()
}

fn free_cell(stream: &mut SeedStream, grid_size: u32, taken: &GridDistribution) -> Option<Coord> {
    (0..CELL_ATTEMPTS)
        .map(|_| Coord::new(stream.below(grid_size), stream.below(grid_size)))
        .find(|coord| !taken.contains(*coord))
}

fn priced_total(distribution: &GridDistribution, request: &PlacementRequest<'_>) -> f64 {
    distribution
        .iter()
        .filter_map(|(_, p)| request.catalog.value_of(&p.relic_id))
        .sum()
}

impl PlacementProvider for ProceduralProvider {
    fn name(&self) -> &str {
        "procedural"
    }

    fn propose(&self, request: &PlacementRequest<'_>) -> Result<PlacementProposal, PlacementError> {
        if request.grid_size == 0 {
            return Err(PlacementError::new("grid size is zero"));
        }
        if request.catalog.is_empty() {
            return Err(PlacementError::new("catalog has no relics to place"));
        }

        let mut stream = SeedStream::new(request);
        #[allow(clippy::cast_possible_truncation)]
        let theme = THEMES[stream.below(THEMES.len() as u32) as usize].to_string();

        let cells = u64::from(request.grid_size) * u64::from(request.grid_size);
        let target = u64::from(request.budget.fragment_count).min(cells);

        let mut distribution = GridDistribution::new();
        let mut remaining = request.budget.prize_budget_usd;
        let mut order: Vec<Coord> = Vec::new();

        while (distribution.len() as u64) < target {
            let affordable: Vec<&Relic> = request
                .catalog
                .relics()
                .iter()
                .filter(|r| r.value_usd <= remaining)
                .collect();
            let Some(relic) = pick(&mut stream, &affordable) else {
                break;
            };
            let Some(coord) = free_cell(&mut stream, request.grid_size, &distribution) else {
                break;
            };
            distribution.place(coord, relic.id.clone());
            order.push(coord);
            remaining -= relic.value_usd;
        }

        // Summation order differs between here and validation; trim the
        // newest placements if rounding pushed the map-order total over.
        let mut rebuilt = distribution.clone();
        while priced_total(&rebuilt, request) > request.budget.prize_budget_usd {
            let Some(last) = order.pop() else { break };
            rebuilt = rebuilt
                .iter()
                .filter(|(c, _)| **c != last)
                .map(|(c, p)| (*c, p.relic_id.clone()))
                .collect();
        }

        tracing::debug!(
            provider = self.name(),
            placements = rebuilt.len(),
            target,
            "procedural distribution proposed"
        );

        Ok(PlacementProposal {
            theme,
            distribution: rebuilt,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::economy::BudgetPlan;
    use crate::relic::RelicCatalog;
    use crate::report::EconomicReport;
    use crate::validation::{validate_distribution, DistributionRules, UnknownRelicPolicy};

    fn catalog() -> RelicCatalog {
        RelicCatalog::new(vec![
            Relic::new("dust", "Dust Vial", 0.5, 0.9).unwrap(),
            Relic::new("lens", "Star Lens", 2.0, 0.4).unwrap(),
            Relic::new("crown", "Nebula Crown", 75.0, 0.05).unwrap(),
        ])
        .unwrap()
    }

    fn propose(date: NaiveDate, budget: BudgetPlan, grid_size: u32) -> PlacementProposal {
        let report = EconomicReport::new(date, budget.prize_budget_usd * 2.0).unwrap();
        let catalog = catalog();
        ProceduralProvider::new()
            .propose(&PlacementRequest {
                report: &report,
                catalog: &catalog,
                budget: &budget,
                grid_size,
                grid_date: date,
            })
            .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn same_date_same_grid() {
        let budget = BudgetPlan {
            prize_budget_usd: 100.0,
            fragment_count: 40,
        };
        assert_eq!(propose(day(1), budget, 64), propose(day(1), budget, 64));
    }

    #[test]
    fn different_dates_differ() {
        let budget = BudgetPlan {
            prize_budget_usd: 100.0,
            fragment_count: 40,
        };
        assert_ne!(
            propose(day(1), budget, 64).distribution,
            propose(day(2), budget, 64).distribution
        );
    }

    #[test]
    fn respects_budget_and_count() {
        let budget = BudgetPlan {
            prize_budget_usd: 60.0,
            fragment_count: 250,
        };
        let catalog = catalog();
        for d in 1..=10 {
            let proposal = propose(day(d), budget, 64);
            assert!(proposal.distribution.len() <= 250);
            let rules = DistributionRules {
                catalog: &catalog,
                budget: &budget,
                grid_size: 64,
                unknown_relics: UnknownRelicPolicy::Reject,
            };
            validate_distribution(&proposal.distribution, &rules).unwrap();
        }
    }

    #[test]
    fn caps_at_grid_capacity() {
        let budget = BudgetPlan {
            prize_budget_usd: 10_000.0,
            fragment_count: 250,
        };
        let proposal = propose(day(3), budget, 4);
        assert!(proposal.distribution.len() <= 16);
        assert!(proposal.distribution.iter().all(|(c, _)| c.within(4)));
    }

    #[test]
    fn zero_budget_places_nothing_costly() {
        let budget = BudgetPlan {
            prize_budget_usd: 0.0,
            fragment_count: 250,
        };
        assert!(propose(day(4), budget, 64).distribution.is_empty());
    }
}
