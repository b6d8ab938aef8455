//! Error types for Starcritters.
//!
//! All errors are strongly typed using thiserror so callers can
//! pattern match on the failure cause. The grid generator in particular
//! reports every failure with a distinct tag (see [`FailureKind`]).

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::grid::Coord;
use crate::relic::RelicId;
use crate::storage::StorageError;

/// Validation errors that occur while constructing domain values.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Target margin {value} is out of range [0.0, 1.0]")]
    MarginOutOfRange {
        value: f64,
    },

    #[error("Field '{field}' must be a finite, non-negative amount (got {value})")]
    InvalidAmount {
        field: String,
        value: f64,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },

    #[error("Invalid coordinate key '{key}': expected \"x_y\"")]
    InvalidCoordinateKey {
        key: String,
    },

    #[error("Grid size must be greater than zero")]
    EmptyGrid,

    #[error("Unknown ship system '{name}'")]
    UnknownSystem {
        name: String,
    },

    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting {
        field: String,
        reason: String,
    },
}

/// Failure categories reported by the grid generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No economic report, or an empty relic catalog.
    UpstreamDataMissing,
    /// The proposed distribution is worth more than the prize budget.
    BudgetExceeded,
    /// A grid already exists for the target date.
    DuplicateDate,
    /// Any other read or write failure from the backing store.
    StoreFailure,
    /// The placement provider failed or produced an unusable layout.
    InvalidProposal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpstreamDataMissing => write!(f, "upstream_data_missing"),
            Self::BudgetExceeded => write!(f, "budget_exceeded"),
            Self::DuplicateDate => write!(f, "duplicate_date"),
            Self::StoreFailure => write!(f, "store_failure"),
            Self::InvalidProposal => write!(f, "invalid_proposal"),
        }
    }
}

/// Errors raised by a single grid generation attempt.
///
/// Every variant aborts the attempt; nothing is written and nothing is
/// retried internally.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Could not fetch latest economic report: No reports found")]
    NoEconomicReport,

    #[error("Could not fetch relics catalog: catalog is empty")]
    EmptyCatalog,

    #[error("Budget Exceeded: Placed value (${placed_usd}) is greater than budget (${budget_usd}).")]
    BudgetExceeded {
        placed_usd: f64,
        budget_usd: f64,
    },

    #[error("A grid for date {date} already exists.")]
    DuplicateDate {
        date: NaiveDate,
    },

    #[error("Storage failure while {context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("Placement provider '{provider}' failed: {reason}")]
    Provider {
        provider: String,
        reason: String,
    },

    #[error("Placement at {coord} is outside the {grid_size}x{grid_size} grid")]
    OutOfBounds {
        coord: Coord,
        grid_size: u32,
    },

    #[error("Placement at {coord} references unknown relic '{relic_id}'")]
    UnknownRelic {
        coord: Coord,
        relic_id: RelicId,
    },

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

impl GenerationError {
    /// Wraps a storage failure with the phase it happened in.
    #[must_use]
    pub fn store(context: &'static str, source: StorageError) -> Self {
        Self::Store { context, source }
    }

    /// Returns the failure category of this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NoEconomicReport | Self::EmptyCatalog => FailureKind::UpstreamDataMissing,
            Self::BudgetExceeded { .. } => FailureKind::BudgetExceeded,
            Self::DuplicateDate { .. } => FailureKind::DuplicateDate,
            Self::Store { .. } => FailureKind::StoreFailure,
            Self::Provider { .. }
            | Self::OutOfBounds { .. }
            | Self::UnknownRelic { .. }
            | Self::Validation(_) => FailureKind::InvalidProposal,
        }
    }
}

/// Errors raised by player actions (probe, upgrade).
#[derive(Debug, Error)]
pub enum GameError {
    #[error("No ship registered for player {player}")]
    ShipNotFound {
        player: String,
    },

    #[error("Not enough energy cores to probe")]
    OutOfEnergy,

    #[error("Node ({x}, {y}) has already been probed")]
    AlreadyProbed {
        x: u32,
        y: u32,
    },

    #[error("Node ({x}, {y}) is outside the {grid_size}x{grid_size} grid")]
    OutOfBounds {
        x: u32,
        y: u32,
        grid_size: u32,
    },

    #[error("Not enough chrono particles: need {needed}, have {available}")]
    InsufficientParticles {
        needed: u64,
        available: u64,
    },

    #[error("No daily grid has been generated yet")]
    NoActiveGrid,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable '{name}' is not set")]
    MissingVar {
        name: &'static str,
    },

    #[error("Environment variable '{name}' has invalid value '{value}': {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

/// Top-level error type for Starcritters.
#[derive(Debug, Error)]
pub enum StarcrittersError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl StarcrittersError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a generation error.
    #[must_use]
    pub const fn is_generation(&self) -> bool {
        matches!(self, Self::Generation(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if the caller may reasonably retry.
    ///
    /// Only transient store failures qualify. A duplicate date or a
    /// budget violation will fail the same way on every retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Generation(GenerationError::Store { source, .. })
            | Self::Game(GameError::Storage(source)) => source.is_transient(),
            _ => false,
        }
    }
}

/// Result type alias for Starcritters operations.
pub type StarcrittersResult<T> = Result<T, StarcrittersError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_exceeded_message() {
        let err = GenerationError::BudgetExceeded {
            placed_usd: 520.0,
            budget_usd: 500.0,
        };
        let msg = format!("{err}");
        assert!(msg.contains("Budget Exceeded"));
        assert!(msg.contains("520"));
        assert!(msg.contains("500"));
        assert_eq!(err.kind(), FailureKind::BudgetExceeded);
    }

    #[test]
    fn test_duplicate_date_message() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let err = GenerationError::DuplicateDate { date };
        assert_eq!(format!("{err}"), "A grid for date 2024-06-01 already exists.");
        assert_eq!(err.kind(), FailureKind::DuplicateDate);
    }

    #[test]
    fn test_upstream_kinds() {
        assert_eq!(
            GenerationError::NoEconomicReport.kind(),
            FailureKind::UpstreamDataMissing
        );
        assert_eq!(
            GenerationError::EmptyCatalog.kind(),
            FailureKind::UpstreamDataMissing
        );
    }

    #[test]
    fn test_store_kind_and_retry() {
        let err = GenerationError::store(
            "reading report",
            StorageError::ConnectionError("timeout".to_string()),
        );
        assert_eq!(err.kind(), FailureKind::StoreFailure);
        let top: StarcrittersError = err.into();
        assert!(top.is_generation());
        assert!(top.is_retryable());
    }

    #[test]
    fn test_not_retryable() {
        let top: StarcrittersError = GenerationError::BudgetExceeded {
            placed_usd: 1.0,
            budget_usd: 0.5,
        }
        .into();
        assert!(!top.is_retryable());

        let top: StarcrittersError = ValidationError::EmptyGrid.into();
        assert!(top.is_validation());
        assert!(!top.is_retryable());
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::DuplicateDate.to_string(), "duplicate_date");
        assert_eq!(FailureKind::InvalidProposal.to_string(), "invalid_proposal");
    }

    #[test]
    fn test_internal() {
        let err = StarcrittersError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("unexpected state"));
    }

    #[test]
    fn test_result_alias_collects_layer_errors() {
        fn check_margin(ok: bool) -> Result<(), ValidationError> {
            if ok {
                Ok(())
            } else {
                Err(ValidationError::MarginOutOfRange { value: 2.0 })
            }
        }

        fn startup(margin_ok: bool) -> StarcrittersResult<()> {
            check_margin(margin_ok)?;
            let missing: Result<(), ConfigError> = Err(ConfigError::MissingVar { name: "SUPABASE_URL" });
            missing?;
            Ok(())
        }

        assert!(startup(false).unwrap_err().is_validation());
        let err = startup(true).unwrap_err();
        assert!(matches!(err, StarcrittersError::Config(ConfigError::MissingVar { .. })));
        assert!(!err.is_retryable());
    }
}
