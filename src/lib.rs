//! # Starcritters - daily relic grid generation
//!
//! Once per day the backend turns the latest economic report into a prize
//! budget, asks a placement provider where relics should be hidden on the
//! exploration grid, checks the proposal against the budget, and commits
//! exactly one grid for the date.
//!
//! ## Core Concepts
//!
//! - **EconomicReport**: daily revenue figure driving the budget
//! - **Relic**: collectible with a dollar value and desirability score
//! - **DailyGrid**: the committed map of hidden relics plus a mystery image
//! - **PlacementProvider**: pluggable source of proposed distributions
//! - **GameSession**: probing cells and upgrading ships against a grid
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use starcritters::storage::InMemoryStores;
//! use starcritters::{FixtureProvider, GeneratorPolicy, GridGenerator};
//!
//! let stores = InMemoryStores::new();
//! let generator = GridGenerator::new(
//!     stores.reports.clone(),
//!     stores.relics.clone(),
//!     stores.grids.clone(),
//!     Arc::new(FixtureProvider::new()),
//!     GeneratorPolicy::default(),
//! )?;
//! let generated = generator.generate_today()?;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Records and rules
pub mod economy;
pub mod error;
pub mod grid;
pub mod imagery;
pub mod relic;
pub mod report;
pub mod validation;

// Generation
pub mod config;
pub mod generator;
pub mod placement;
pub mod storage;
pub mod trigger;

// Player actions
pub mod game;

#[cfg(feature = "transport-http")]
pub mod transport;

pub use economy::{BudgetPlan, EconomicPolicy};
pub use error::{
    ConfigError, FailureKind, GameError, GenerationError, StarcrittersError, StarcrittersResult,
    ValidationError,
};
pub use game::{GameSession, GameStores, PlayerId, ProbeOutcome, Ship, ShipSystem};
pub use generator::{GeneratedGrid, GeneratorPolicy, GridGenerator};
pub use grid::{Coord, DailyGrid, GridDistribution, GridId};
pub use placement::{
    FixtureProvider, PlacementProposal, PlacementProvider, PlacementRequest, ProceduralProvider,
    ProviderKind,
};
pub use relic::{Relic, RelicCatalog, RelicId};
pub use report::EconomicReport;
pub use storage::{GridStore, RelicStore, ReportStore, StorageError};
pub use validation::{validate_distribution, PlacementSummary, UnknownRelicPolicy};
