//! Placement providers.
//!
//! A provider proposes where the day's relics go. The generator never trusts
//! a proposal: it validates and prices it independently, so providers can be
//! swapped (fixed stand-in, procedural, generative service) without touching
//! the validation or commit logic.

mod fixture;
mod procedural;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::economy::BudgetPlan;
use crate::error::ValidationError;
use crate::grid::GridDistribution;
use crate::relic::RelicCatalog;
use crate::report::EconomicReport;

pub use fixture::{FixtureProvider, FIXTURE_THEME};
pub use procedural::ProceduralProvider;

/// Inputs handed to a provider.
#[derive(Debug, Clone, Copy)]
pub struct PlacementRequest<'a> {
    pub report: &'a EconomicReport,
    pub catalog: &'a RelicCatalog,
    pub budget: &'a BudgetPlan,
    pub grid_size: u32,
    pub grid_date: NaiveDate,
}

/// A candidate layout plus the theme its imagery is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementProposal {
    #[serde(rename = "mystery_image_theme")]
    pub theme: String,
    #[serde(rename = "grid_distribution")]
    pub distribution: GridDistribution,
}

/// Provider failure. The generator reports it as an invalid proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementError {
    pub reason: String,
}

impl PlacementError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for PlacementError {}

/// Source of candidate distributions.
pub trait PlacementProvider: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Proposes a distribution for the requested day.
    fn propose(&self, request: &PlacementRequest<'_>) -> Result<PlacementProposal, PlacementError>;
}

/// Built-in providers selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Fixture,
    Procedural,
}

impl ProviderKind {
    /// Instantiates the provider.
    #[must_use]
    pub fn build(self) -> Box<dyn PlacementProvider> {
        match self {
            Self::Fixture => Box::new(FixtureProvider::new()),
            Self::Procedural => Box::new(ProceduralProvider::new()),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fixture => "fixture",
            Self::Procedural => "procedural",
        })
    }
}

impl FromStr for ProviderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixture" => Ok(Self::Fixture),
            "procedural" => Ok(Self::Procedural),
            other => Err(ValidationError::InvalidSetting {
                field: "placement".to_string(),
                reason: format!("expected 'fixture' or 'procedural', got '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_provider_object_safe(_: &dyn PlacementProvider) {}

    #[test]
    fn provider_kind_parses() {
        assert_eq!("procedural".parse::<ProviderKind>().unwrap(), ProviderKind::Procedural);
        assert_eq!(" Fixture ".parse::<ProviderKind>().unwrap(), ProviderKind::Fixture);
        assert!("llm".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_kind_builds_named_provider() {
        assert_eq!(ProviderKind::Fixture.build().name(), "fixture");
        assert_eq!(ProviderKind::Procedural.build().name(), "procedural");
    }

    #[test]
    fn proposal_uses_row_field_names() {
        let proposal = PlacementProposal {
            theme: "x".to_string(),
            distribution: GridDistribution::new(),
        };
        let json = serde_json::to_value(&proposal).unwrap();
        assert_eq!(json["mystery_image_theme"], "x");
        assert!(json["grid_distribution"].is_object());
    }
}
