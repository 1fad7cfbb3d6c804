//! Configuration types for surcharge classification.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::TypeCatalog;

/// Metadata about the rule book and defaults for the recompute job.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineMetadata {
    /// Human-readable name of the rule book.
    pub name: String,
    /// Jurisdiction or legal reference the rules follow.
    pub jurisdiction: String,
    /// Defaults applied when the recompute job is run without overrides.
    #[serde(default)]
    pub recompute: RecomputeDefaults,
}

/// Default settings for the recompute job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecomputeDefaults {
    /// Hours difference under which a persisted detail is considered unchanged.
    pub tolerance: Decimal,
    /// Number of worker threads; 1 processes records sequentially.
    pub workers: usize,
}

impl Default for RecomputeDefaults {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(1, 2),
            workers: 1,
        }
    }
}

/// The legal constants the classifier works with.
///
/// Passed explicitly into every classification so a recomputation can
/// target the exact rule set in force for a period.
///
/// # Example
///
/// ```
/// use surcharge_engine::config::ClassifierConfig;
/// use rust_decimal::Decimal;
///
/// let config = ClassifierConfig::default();
/// assert_eq!(config.ordinary_threshold, Decimal::from(10));
/// assert_eq!(config.night_start, Decimal::from(19));
/// assert_eq!(config.night_end, Decimal::from(6));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Hours per day paid as ordinary (or RD on special days) before overtime starts.
    pub ordinary_threshold: Decimal,
    /// Clock hour at which the night window opens.
    pub night_start: Decimal,
    /// Clock hour at which the night window closes (may be before `night_start`).
    pub night_end: Decimal,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ordinary_threshold: Decimal::from(10),
            night_start: Decimal::from(19),
            night_end: Decimal::from(6),
        }
    }
}

impl ClassifierConfig {
    /// Checks that every constant is a usable clock value.
    pub fn validate(&self) -> EngineResult<()> {
        let day_length = Decimal::from(24);

        if self.ordinary_threshold <= Decimal::ZERO || self.ordinary_threshold > day_length {
            return Err(invalid(
                "ordinary_threshold",
                format!("{} must be greater than 0 and at most 24", self.ordinary_threshold),
            ));
        }

        for (field, value) in [("night_start", self.night_start), ("night_end", self.night_end)] {
            if value < Decimal::ZERO || value > day_length {
                return Err(invalid(field, format!("{} must be between 0 and 24", value)));
            }
        }

        Ok(())
    }
}

/// A rule set effective from a given date.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleSet {
    /// The date these rules take effect.
    pub effective_date: NaiveDate,
    /// Reference to the legal source of the constants.
    #[serde(default)]
    pub reference: String,
    /// The classifier constants.
    #[serde(flatten)]
    pub classifier: ClassifierConfig,
}

/// The complete engine configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rule book metadata.
    metadata: EngineMetadata,
    /// Surcharge type catalog.
    catalog: TypeCatalog,
    /// Rule sets by effective date (sorted oldest first).
    rules: Vec<RuleSet>,
}

impl EngineConfig {
    /// Creates a new EngineConfig from its component parts.
    pub fn new(metadata: EngineMetadata, catalog: TypeCatalog, rules: Vec<RuleSet>) -> Self {
        let mut sorted_rules = rules;
        sorted_rules.sort_by(|a, b| a.effective_date.cmp(&b.effective_date));
        Self {
            metadata,
            catalog,
            rules: sorted_rules,
        }
    }

    /// Returns the rule book metadata.
    pub fn metadata(&self) -> &EngineMetadata {
        &self.metadata
    }

    /// Returns the surcharge type catalog.
    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Returns all rule sets, oldest first.
    pub fn rules(&self) -> &[RuleSet] {
        &self.rules
    }
}

pub(super) fn invalid(field: &str, message: String) -> EngineError {
    EngineError::InvalidConfig {
        field: field.to_string(),
        message,
    }
}
