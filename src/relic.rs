//! Relic reference data.
//!
//! Relics are static catalog entries. Their `value_usd` is the monetary
//! weight used when budgeting a daily grid; `desirability_score` is only
//! consulted by placement providers that weight their picks.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a relic name.
pub const MAX_RELIC_NAME_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelicId(String);

impl RelicId {
    /// Creates a relic ID from its database key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelicId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A collectible relic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relic {
    pub id: RelicId,
    pub name: String,
    pub value_usd: f64,
    pub desirability_score: f64,
}

impl Relic {
    /// Creates a relic after checking its fields.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the name is empty or too long, or if
    /// `value_usd` is negative or not finite.
    pub fn new(
        id: impl Into<RelicId>,
        name: impl Into<String>,
        value_usd: f64,
        desirability_score: f64,
    ) -> Result<Self, ValidationError> {
        let relic = Self {
            id: id.into(),
            name: name.into(),
            value_usd,
            desirability_score,
        };
        relic.validate()?;
        Ok(relic)
    }

    /// Validates a relic loaded from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "id".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "name".to_string(),
            });
        }
        if self.name.len() > MAX_RELIC_NAME_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "name".to_string(),
                max_length: MAX_RELIC_NAME_LEN,
            });
        }
        if !self.value_usd.is_finite() || self.value_usd < 0.0 {
            return Err(ValidationError::InvalidAmount {
                field: "value_usd".to_string(),
                value: self.value_usd,
            });
        }
        if !self.desirability_score.is_finite() {
            return Err(ValidationError::InvalidAmount {
                field: "desirability_score".to_string(),
                value: self.desirability_score,
            });
        }
        Ok(())
    }
}

impl From<String> for RelicId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The full relic catalog fetched for one generation attempt.
///
/// Keeps the order the store returned (the fixture provider depends on it)
/// plus an index for value lookups.
#[derive(Debug, Clone, Default)]
pub struct RelicCatalog {
    relics: Vec<Relic>,
    by_id: HashMap<RelicId, usize>,
}

impl RelicCatalog {
    /// Builds a catalog, rejecting invalid or duplicate entries.
    pub fn new(relics: Vec<Relic>) -> Result<Self, ValidationError> {
        let mut by_id = HashMap::with_capacity(relics.len());
        for (idx, relic) in relics.iter().enumerate() {
            relic.validate()?;
            if by_id.insert(relic.id.clone(), idx).is_some() {
                return Err(ValidationError::InvalidSetting {
                    field: "relics".to_string(),
                    reason: format!("duplicate relic id '{}'", relic.id),
                });
            }
        }
        Ok(Self { relics, by_id })
    }

    pub fn is_empty(&self) -> bool {
        self.relics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.relics.len()
    }

    /// Relics in store order.
    pub fn relics(&self) -> &[Relic] {
        &self.relics
    }

    pub fn get(&self, id: &RelicId) -> Option<&Relic> {
        self.by_id.get(id).map(|&idx| &self.relics[idx])
    }

    /// Monetary value of a relic, if it is in the catalog.
    pub fn value_of(&self, id: &RelicId) -> Option<f64> {
        self.get(id).map(|r| r.value_usd)
    }

    pub fn contains(&self, id: &RelicId) -> bool {
        self.by_id.contains_key(id)
    }
}
