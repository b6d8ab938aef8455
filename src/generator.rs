//! Daily grid generation.
//!
//! One invocation runs four phases:
//!
//! 1. **Ingest**: latest economic report and the full relic catalog
//! 2. **Budget**: `prize_budget = revenue * (1 - target_margin)`
//! 3. **Propose**: ask the placement provider for a distribution
//! 4. **Validate & commit**: price the proposal, derive the image URL, and
//!    insert exactly one grid row for the date
//!
//! Phases 1–3 and validation are read-only. The insert is the only mutation
//! and relies on the grid store's uniqueness on `grid_date`; a second
//! invocation for the same date reports `DuplicateDate` and writes nothing.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::economy::{BudgetPlan, EconomicPolicy};
use crate::error::{GenerationError, ValidationError};
use crate::grid::{DailyGrid, DEFAULT_GRID_SIZE};
use crate::imagery::{mystery_image_url, DEFAULT_IMAGE_URL_TEMPLATE, THEME_PLACEHOLDER};
use crate::placement::{PlacementProvider, PlacementRequest};
use crate::relic::RelicCatalog;
use crate::report::EconomicReport;
use crate::storage::{GridStore, InsertOutcome, RelicStore, ReportStore, StorageError};
use crate::validation::{validate_distribution, DistributionRules, PlacementSummary, UnknownRelicPolicy};

/// Settings for the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorPolicy {
    pub economy: EconomicPolicy,
    /// Width and height of the grid; placements must fall inside it.
    pub grid_size: u32,
    pub unknown_relics: UnknownRelicPolicy,
    /// Image service URL containing a `{theme}` placeholder.
    pub image_url_template: String,
}

impl Default for GeneratorPolicy {
    fn default() -> Self {
        Self {
            economy: EconomicPolicy::default(),
            grid_size: DEFAULT_GRID_SIZE,
            unknown_relics: UnknownRelicPolicy::default(),
            image_url_template: DEFAULT_IMAGE_URL_TEMPLATE.to_string(),
        }
    }
}

impl GeneratorPolicy {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.economy.validate()?;
        if self.grid_size == 0 {
            return Err(ValidationError::EmptyGrid);
        }
        if !self.image_url_template.contains(THEME_PLACEHOLDER) {
            return Err(ValidationError::InvalidSetting {
                field: "image_url_template".to_string(),
                reason: format!("must contain {THEME_PLACEHOLDER}"),
            });
        }
        Ok(())
    }
}

/// A committed grid and how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedGrid {
    pub grid: DailyGrid,
    pub budget: BudgetPlan,
    pub summary: PlacementSummary,
    pub provider: String,
}

/// Produces and records one budget-constrained grid per calendar day.
#[derive(Clone)]
pub struct GridGenerator {
    reports: Arc<dyn ReportStore>,
    relics: Arc<dyn RelicStore>,
    grids: Arc<dyn GridStore>,
    provider: Arc<dyn PlacementProvider>,
    policy: GeneratorPolicy,
}

impl GridGenerator {
    /// Create a generator over the given stores and provider.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the policy is invalid.
    pub fn new(
        reports: Arc<dyn ReportStore>,
        relics: Arc<dyn RelicStore>,
        grids: Arc<dyn GridStore>,
        provider: Arc<dyn PlacementProvider>,
        policy: GeneratorPolicy,
    ) -> Result<Self, ValidationError> {
        policy.validate()?;
        Ok(Self {
            reports,
            relics,
            grids,
            provider,
            policy,
        })
    }

    pub fn policy(&self) -> &GeneratorPolicy {
        &self.policy
    }

    /// Get a reference to the grid store.
    pub fn grid_store(&self) -> &Arc<dyn GridStore> {
        &self.grids
    }

    /// Generates the grid for the current UTC date.
    pub fn generate_today(&self) -> Result<GeneratedGrid, GenerationError> {
        self.generate_for(Utc::now().date_naive())
    }

    /// Generates and commits the grid for `grid_date`.
    pub fn generate_for(&self, grid_date: NaiveDate) -> Result<GeneratedGrid, GenerationError> {
        let report = self.latest_report()?;
        let catalog = self.catalog()?;

        let budget = self.policy.economy.plan(&report)?;
        tracing::info!(
            %grid_date,
            report_date = %report.report_date,
            prize_budget_usd = budget.prize_budget_usd,
            fragment_count = budget.fragment_count,
            "prize budget computed"
        );

        let proposal = self
            .provider
            .propose(&PlacementRequest {
                report: &report,
                catalog: &catalog,
                budget: &budget,
                grid_size: self.policy.grid_size,
                grid_date,
            })
            .map_err(|e| GenerationError::Provider {
                provider: self.provider.name().to_string(),
                reason: e.reason,
            })?;

        let summary = validate_distribution(
            &proposal.distribution,
            &DistributionRules {
                catalog: &catalog,
                budget: &budget,
                grid_size: self.policy.grid_size,
                unknown_relics: self.policy.unknown_relics,
            },
        )?;
        if !summary.unknown_relics.is_empty() {
            tracing::warn!(
                cells = summary.unknown_relics.len(),
                "placements reference relics missing from the catalog; counted as zero value"
            );
        }
        tracing::info!(
            placed_value_usd = summary.placed_value_usd,
            placements = summary.placement_count,
            "proposal within budget"
        );

        let image_url = mystery_image_url(&self.policy.image_url_template, &proposal.theme);
        let grid = DailyGrid::new(grid_date, proposal.theme, image_url, proposal.distribution);

        match self.grids.insert_if_absent(grid.clone()) {
            Ok(InsertOutcome::Inserted) => {}
            Ok(InsertOutcome::AlreadyExists) | Err(StorageError::DuplicateKey(_)) => {
                tracing::warn!(%grid_date, "grid already exists");
                return Err(GenerationError::DuplicateDate { date: grid_date });
            }
            Err(e) => return Err(GenerationError::store("inserting daily grid", e)),
        }
        tracing::info!(%grid_date, grid_id = %grid.id, "daily grid committed");

        Ok(GeneratedGrid {
            grid,
            budget,
            summary,
            provider: self.provider.name().to_string(),
        })
    }

    fn latest_report(&self) -> Result<EconomicReport, GenerationError> {
        let report = self
            .reports
            .latest()
            .map_err(|e| GenerationError::store("fetching latest economic report", e))?
            .ok_or(GenerationError::NoEconomicReport)?;
        report.validate().map_err(|e| {
            GenerationError::store(
                "reading latest economic report",
                StorageError::SerializationError(e.to_string()),
            )
        })?;
        Ok(report)
    }

    fn catalog(&self) -> Result<RelicCatalog, GenerationError> {
        let relics = self
            .relics
            .all()
            .map_err(|e| GenerationError::store("fetching relics catalog", e))?;
        if relics.is_empty() {
            return Err(GenerationError::EmptyCatalog);
        }
        RelicCatalog::new(relics).map_err(|e| {
            GenerationError::store(
                "reading relics catalog",
                StorageError::SerializationError(e.to_string()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::placement::FixtureProvider;
    use crate::relic::Relic;
    use crate::storage::{InMemoryGridStore, InMemoryRelicStore, InMemoryReportStore};

    struct FailingGrids;

    impl GridStore for FailingGrids {
        fn insert_if_absent(&self, _grid: DailyGrid) -> Result<InsertOutcome, StorageError> {
            Err(StorageError::ConnectionError("reset by peer".to_string()))
        }

        fn get_by_date(&self, _date: NaiveDate) -> Result<Option<DailyGrid>, StorageError> {
            Ok(None)
        }

        fn latest(&self) -> Result<Option<DailyGrid>, StorageError> {
            Ok(None)
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn seeded(grids: Arc<dyn GridStore>) -> GridGenerator {
        let reports = Arc::new(InMemoryReportStore::new());
        reports
            .insert(EconomicReport::new(date().pred_opt().unwrap(), 1000.0).unwrap())
            .unwrap();
        let relics = Arc::new(InMemoryRelicStore::new());
        relics.insert(Relic::new("a", "Amber", 10.0, 0.5).unwrap()).unwrap();
        GridGenerator::new(
            reports,
            relics,
            grids,
            Arc::new(FixtureProvider::new()),
            GeneratorPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn policy_rejects_template_without_placeholder() {
        let policy = GeneratorPolicy {
            image_url_template: "https://img.test/static.png".to_string(),
            ..GeneratorPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn policy_rejects_zero_grid() {
        let policy = GeneratorPolicy {
            grid_size: 0,
            ..GeneratorPolicy::default()
        };
        assert_eq!(policy.validate().unwrap_err(), ValidationError::EmptyGrid);
    }

    #[test]
    fn store_failure_on_commit_is_tagged() {
        let generator = seeded(Arc::new(FailingGrids));
        let err = generator.generate_for(date()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::StoreFailure);
        assert!(err.to_string().contains("inserting daily grid"));
    }

    #[test]
    fn fixture_grid_commits_with_image_url() {
        let grids = Arc::new(InMemoryGridStore::new());
        let generator = seeded(grids.clone());
        let generated = generator.generate_for(date()).unwrap();

        assert_eq!(generated.provider, "fixture");
        assert!((generated.summary.placed_value_usd - 50.0).abs() < 1e-9);
        assert!(generated
            .grid
            .mystery_image_url
            .ends_with("?A+raccoon+astronaut+discovering+a+crystal+cave"));
        assert_eq!(grids.get_by_date(date()).unwrap().unwrap(), generated.grid);
    }
}
