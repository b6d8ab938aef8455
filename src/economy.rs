//! Economic policy and prize budgeting.
//!
//! The prize budget for a day is the share of yesterday's revenue that is
//! not kept as margin: `revenue * (1 - target_margin)`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::report::EconomicReport;

/// Fraction of revenue retained as profit.
pub const DEFAULT_TARGET_MARGIN: f64 = 0.5;

/// Baseline number of fragments per grid.
pub const DEFAULT_BASE_FRAGMENTS: u32 = 250;

/// Knobs of the daily grid economy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EconomicPolicy {
    /// Fraction of revenue kept, in `[0.0, 1.0]`.
    pub target_margin: f64,
    /// Fragments to place per grid.
    pub base_fragment_count: u32,
}

impl Default for EconomicPolicy {
    fn default() -> Self {
        Self {
            target_margin: DEFAULT_TARGET_MARGIN,
            base_fragment_count: DEFAULT_BASE_FRAGMENTS,
        }
    }
}

impl EconomicPolicy {
    /// Validates the policy.
    ///
    /// Must be called before budgeting; a margin outside `[0, 1]` would
    /// produce a negative or inflated budget.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.target_margin) {
            return Err(ValidationError::MarginOutOfRange {
                value: self.target_margin,
            });
        }
        Ok(())
    }

    /// Computes today's budget plan from the latest report.
    pub fn plan(&self, report: &EconomicReport) -> Result<BudgetPlan, ValidationError> {
        self.validate()?;
        report.validate()?;
        Ok(BudgetPlan {
            prize_budget_usd: report.total_revenue_usd * (1.0 - self.target_margin),
            // Static for now; player growth is not yet an input.
            fragment_count: self.base_fragment_count,
        })
    }
}

/// Output of the budgeting phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetPlan {
    /// Maximum total relic value the grid may hold.
    pub prize_budget_usd: f64,
    /// Target fragment count. Providers may treat it as an upper bound;
    /// validation does not enforce it.
    pub fragment_count: u32,
}

impl BudgetPlan {
    /// Returns true if `placed_usd` fits. Equal to the budget is accepted.
    #[must_use]
    pub fn allows(&self, placed_usd: f64) -> bool {
        placed_usd <= self.prize_budget_usd
    }
}
