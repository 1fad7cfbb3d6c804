//! Surcharge detail model.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DayId, SurchargeTypeId};

/// Identifier of a surcharge detail row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetailId(pub u64);

impl fmt::Display for DetailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hours of one surcharge category on one work day.
///
/// Hours are always positive and rounded to one decimal place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurchargeDetail {
    /// Detail identifier.
    pub id: DetailId,
    /// Owning work day.
    pub day_id: DayId,
    /// Catalog entry this row is priced with.
    pub surcharge_type_id: SurchargeTypeId,
    /// Classified hours.
    pub hours: Decimal,
    /// Set when the row was produced by the classifier rather than typed in.
    pub computed_automatically: bool,
    /// Actor that wrote the row.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SurchargeDetail {
    /// Returns true once the row has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
