//! Materializes a classification as surcharge detail rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;
use uuid::Uuid;

use crate::calculation::{SurchargeBreakdown, round_hours};
use crate::error::{EngineError, EngineResult};
use crate::models::{DayId, SurchargeDetail, SurchargeTypeId, TypeCatalog};
use crate::store::Transaction;

/// Who writes detail rows, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteStamp {
    /// The invoking actor.
    pub actor: Uuid,
    /// Timestamp applied to every row written.
    pub at: DateTime<Utc>,
}

impl WriteStamp {
    /// Stamps rows with `actor` and the current time.
    pub fn now(actor: Uuid) -> Self {
        Self {
            actor,
            at: Utc::now(),
        }
    }
}

/// Writes one detail row per surcharge category with positive hours.
///
/// Every category is resolved against the catalog before anything is
/// inserted, so a missing entry fails the call without a partial write. The
/// caller decides whether [`EngineError::MissingCatalogEntry`] aborts the
/// surrounding transaction or is recorded and skipped.
pub fn write_details(
    tx: &mut Transaction<'_>,
    day_id: DayId,
    breakdown: &SurchargeBreakdown,
    catalog: &TypeCatalog,
    stamp: WriteStamp,
) -> EngineResult<Vec<SurchargeDetail>> {
    let rows = resolve(day_id, breakdown, catalog)?;

    let mut written = Vec::with_capacity(rows.len());
    for (surcharge_type_id, hours) in rows {
        let detail = tx
            .insert_detail(|id| SurchargeDetail {
                id,
                day_id,
                surcharge_type_id,
                hours,
                computed_automatically: true,
                created_by: stamp.actor,
                created_at: stamp.at,
                deleted_at: None,
            })
            .ok_or(EngineError::DayNotFound { id: day_id })?;
        written.push(detail.clone());
    }

    Ok(written)
}

/// Tombstones every live detail of a day, then writes the new set.
pub fn replace_details(
    tx: &mut Transaction<'_>,
    day_id: DayId,
    breakdown: &SurchargeBreakdown,
    catalog: &TypeCatalog,
    stamp: WriteStamp,
) -> EngineResult<Vec<SurchargeDetail>> {
    tx.tombstone_details_of(day_id, stamp.at);
    write_details(tx, day_id, breakdown, catalog, stamp)
}

pub(crate) fn resolve(
    day_id: DayId,
    breakdown: &SurchargeBreakdown,
    catalog: &TypeCatalog,
) -> EngineResult<Vec<(SurchargeTypeId, Decimal)>> {
    let mut rows = Vec::new();
    for (code, hours) in breakdown.nonzero() {
        let hours = round_hours(hours);
        if hours <= Decimal::ZERO {
            continue;
        }
        let Some(type_id) = catalog.active_id(code) else {
            warn!(day_id = %day_id, code = %code, "No active catalog entry for surcharge category");
            return Err(EngineError::MissingCatalogEntry { code });
        };
        rows.push((type_id, hours));
    }
    Ok(rows)
}
