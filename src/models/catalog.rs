//! Surcharge type catalog.
//!
//! The catalog is external reference data: the engine only reads it to
//! resolve a [`SurchargeCode`] into the id that detail rows reference.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SurchargeCode;

/// Identifier of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurchargeTypeId(pub u32);

impl fmt::Display for SurchargeTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single surcharge type as configured in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurchargeType {
    /// Catalog identifier referenced by detail rows.
    pub id: SurchargeTypeId,
    /// The category this entry prices.
    pub code: SurchargeCode,
    /// Display name.
    pub name: String,
    /// Percentage surcharge applied on top of the base hourly rate (e.g. 75 for 75%).
    pub percentage: Decimal,
    /// Inactive entries are kept for history but never used for new rows.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Read-only lookup of surcharge types.
///
/// # Example
///
/// ```
/// use surcharge_engine::models::{SurchargeCode, SurchargeType, SurchargeTypeId, TypeCatalog};
/// use rust_decimal::Decimal;
///
/// let catalog = TypeCatalog::new(vec![SurchargeType {
///     id: SurchargeTypeId(5),
///     code: SurchargeCode::Rn,
///     name: "Recargo nocturno".to_string(),
///     percentage: Decimal::new(35, 0),
///     active: true,
/// }]);
///
/// assert_eq!(catalog.active_id(SurchargeCode::Rn), Some(SurchargeTypeId(5)));
/// assert_eq!(catalog.active_id(SurchargeCode::Hed), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCatalog {
    types: Vec<SurchargeType>,
}

impl TypeCatalog {
    /// Creates a catalog from its entries.
    pub fn new(types: Vec<SurchargeType>) -> Self {
        Self { types }
    }

    /// Returns every entry, active or not.
    pub fn entries(&self) -> &[SurchargeType] {
        &self.types
    }

    /// Resolves the id of the active entry for a category.
    pub fn active_id(&self, code: SurchargeCode) -> Option<SurchargeTypeId> {
        self.types
            .iter()
            .find(|t| t.active && t.code == code)
            .map(|t| t.id)
    }

    /// Looks up an entry by id, including inactive entries.
    pub fn get(&self, id: SurchargeTypeId) -> Option<&SurchargeType> {
        self.types.iter().find(|t| t.id == id)
    }

    /// Returns the category code a persisted detail row refers to.
    pub fn code_of(&self, id: SurchargeTypeId) -> Option<SurchargeCode> {
        self.get(id).map(|t| t.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, code: SurchargeCode, active: bool) -> SurchargeType {
        SurchargeType {
            id: SurchargeTypeId(id),
            code,
            name: code.to_string(),
            percentage: Decimal::new(25, 0),
            active,
        }
    }

    #[test]
    fn test_inactive_entries_are_not_resolved() {
        let catalog = TypeCatalog::new(vec![
            entry(1, SurchargeCode::Hed, false),
            entry(2, SurchargeCode::Hed, true),
        ]);
        assert_eq!(catalog.active_id(SurchargeCode::Hed), Some(SurchargeTypeId(2)));
    }

    #[test]
    fn test_code_of_resolves_inactive_entries() {
        let catalog = TypeCatalog::new(vec![entry(9, SurchargeCode::Rd, false)]);
        assert_eq!(catalog.code_of(SurchargeTypeId(9)), Some(SurchargeCode::Rd));
        assert_eq!(catalog.code_of(SurchargeTypeId(10)), None);
    }

    #[test]
    fn test_active_defaults_to_true_when_omitted() {
        let yaml = r#"
types:
  - id: 1
    code: HEN
    name: Hora extra nocturna
    percentage: 75
"#;
        let catalog: TypeCatalog = serde_yaml::from_str(yaml).unwrap();
        assert!(catalog.entries()[0].active);
        assert_eq!(catalog.entries()[0].percentage, Decimal::new(75, 0));
    }
}
