//! Interactive record operations.
//!
//! Each operation validates its input up front and then runs as a single
//! store transaction, so a failure never leaves a partial tree behind. Unlike
//! the recompute job, a missing catalog entry aborts the whole operation.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::config::ClassifierConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    NewRecord, Period, RecordId, RecordStatus, RecordTotals, SurchargeCode, SurchargeRecord,
    TypeCatalog, WorkDayInput,
};
use crate::store::{Store, StoreView, Transaction};

use super::aggregator::refresh_totals;
use super::detail_writer::WriteStamp;
use super::reconcile::Reconciler;

/// Hours per surcharge category across a record's live details.
pub type CategoryTotals = BTreeMap<SurchargeCode, Decimal>;

/// Creates, replaces, deletes and reads surcharge records.
///
/// # Example
///
/// ```
/// use surcharge_engine::config::ClassifierConfig;
/// use surcharge_engine::engine::RecordService;
/// use surcharge_engine::models::{NewRecord, Period, TypeCatalog, WorkDayInput};
/// use surcharge_engine::store::Store;
/// use rust_decimal::Decimal;
/// use uuid::Uuid;
///
/// let store = Store::new();
/// let catalog = TypeCatalog::default();
/// let rules = ClassifierConfig::default();
/// let service = RecordService::new(&store, &catalog, rules);
///
/// // 06:00 to 16:00 has no surcharges, so an empty catalog is enough.
/// let record = service
///     .create_record(
///         NewRecord {
///             driver_id: "driver-1".to_string(),
///             vehicle_id: "ABC123".to_string(),
///             client_id: "client-1".to_string(),
///             period: Period { month: 3, year: 2025 },
///             identifier: String::new(),
///             days: vec![WorkDayInput {
///                 day: 3,
///                 start_hour: Decimal::from(6),
///                 end_hour: Decimal::from(16),
///                 total_hours: Decimal::from(10),
///                 is_holiday: false,
///                 is_sunday: false,
///                 is_availability_day: false,
///             }],
///         },
///         Uuid::nil(),
///     )
///     .unwrap();
///
/// assert_eq!(record.version, 1);
/// assert_eq!(record.totals.total_ordinary_hours, Decimal::from(10));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RecordService<'a> {
    store: &'a Store,
    catalog: &'a TypeCatalog,
    rules: ClassifierConfig,
}

impl<'a> RecordService<'a> {
    /// Creates a service writing to `store` with the given rules.
    pub fn new(store: &'a Store, catalog: &'a TypeCatalog, rules: ClassifierConfig) -> Self {
        Self {
            store,
            catalog,
            rules,
        }
    }

    /// Creates a record with its days, their details and aggregate totals.
    pub fn create_record(&self, input: NewRecord, actor: Uuid) -> EngineResult<SurchargeRecord> {
        validate_days(&input.period, &input.days)?;

        let record = self.store.transaction(|tx| {
            let now = Utc::now();
            let record_id = tx
                .insert_record(|id| SurchargeRecord {
                    id,
                    driver_id: input.driver_id.clone(),
                    vehicle_id: input.vehicle_id.clone(),
                    client_id: input.client_id.clone(),
                    period: input.period,
                    identifier: input.identifier.clone(),
                    status: RecordStatus::Pending,
                    version: 1,
                    totals: RecordTotals::default(),
                    created_by: actor,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                })
                .id;

            self.insert_days(tx, record_id, &input.days, WriteStamp { actor, at: now })?;
            refresh_totals(tx, record_id, &self.rules, now)?;
            current(tx.view(), record_id)
        })?;

        info!(
            record_id = %record.id,
            driver_id = %record.driver_id,
            period = %record.period,
            days = record.totals.total_days,
            "Surcharge record created"
        );
        Ok(record)
    }

    /// Replaces every day of a record with `days`.
    pub fn update_record(
        &self,
        record_id: RecordId,
        days: &[WorkDayInput],
        actor: Uuid,
    ) -> EngineResult<SurchargeRecord> {
        let period = self.store.read(|view| live(view, record_id).map(|r| r.period))?;
        validate_days(&period, days)?;

        let record = self.store.transaction(|tx| {
            let now = Utc::now();
            live(tx.view(), record_id)?;

            remove_days(tx, record_id, now);
            self.insert_days(tx, record_id, days, WriteStamp { actor, at: now })?;
            refresh_totals(tx, record_id, &self.rules, now)?;
            bump_version(tx, record_id, now)?;
            current(tx.view(), record_id)
        })?;

        info!(
            record_id = %record.id,
            version = record.version,
            days = record.totals.total_days,
            "Surcharge record updated"
        );
        Ok(record)
    }

    /// Soft-deletes a record together with its days and details.
    ///
    /// Tombstones are applied bottom-up in one transaction.
    pub fn delete_record(&self, record_id: RecordId) -> EngineResult<()> {
        self.store.transaction(|tx| {
            let now = Utc::now();
            live(tx.view(), record_id)?;

            remove_days(tx, record_id, now);
            tx.tombstone_record(record_id, now);
            Ok::<_, EngineError>(())
        })?;

        info!(record_id = %record_id, "Surcharge record deleted");
        Ok(())
    }

    /// Moves a record to another lifecycle status.
    pub fn set_status(&self, record_id: RecordId, status: RecordStatus) -> EngineResult<SurchargeRecord> {
        self.store.transaction(|tx| {
            let now = Utc::now();
            live(tx.view(), record_id)?;

            tx.update_record(record_id, |record| record.status = status)
                .ok_or(EngineError::RecordNotFound { id: record_id })?;
            bump_version(tx, record_id, now)?;
            current(tx.view(), record_id)
        })
    }

    /// Sums the record's live detail hours per category.
    pub fn record_breakdown(&self, record_id: RecordId) -> EngineResult<CategoryTotals> {
        self.store.read(|view| {
            live(view, record_id)?;
            Ok(category_totals(view, record_id, self.catalog))
        })
    }

    fn insert_days(
        &self,
        tx: &mut Transaction<'_>,
        record_id: RecordId,
        days: &[WorkDayInput],
        stamp: WriteStamp,
    ) -> EngineResult<()> {
        let reconciler = Reconciler::new(&self.rules, self.catalog, stamp);

        for input in days {
            let day = tx
                .insert_day(|id| input.to_work_day(id, record_id, stamp.actor, stamp.at))
                .cloned()
                .ok_or(EngineError::RecordNotFound { id: record_id })?;
            reconciler.reconcile(tx, &day)?;
        }

        Ok(())
    }
}

/// Hours per surcharge category across a record's live details.
///
/// Rows whose type is not in the catalog are left out.
pub fn category_totals(view: StoreView<'_>, record_id: RecordId, catalog: &TypeCatalog) -> CategoryTotals {
    let mut totals = CategoryTotals::new();
    for day in view.live_days_of(record_id) {
        for detail in view.live_details_of(day.id) {
            if let Some(code) = catalog.code_of(detail.surcharge_type_id) {
                *totals.entry(code).or_default() += detail.hours;
            }
        }
    }
    totals
}

fn validate_days(period: &Period, days: &[WorkDayInput]) -> EngineResult<()> {
    if period.days_in_month().is_none() {
        return Err(EngineError::InvalidPeriod {
            month: period.month,
            year: period.year,
        });
    }

    let mut seen = BTreeSet::new();
    for day in days {
        day.validate(period)?;
        if !seen.insert(day.day) {
            return Err(EngineError::InvalidWorkDay {
                day: day.day,
                message: "submitted more than once".to_string(),
            });
        }
    }

    Ok(())
}

/// Returns the record if it exists and has not been deleted.
fn live(view: StoreView<'_>, record_id: RecordId) -> EngineResult<&SurchargeRecord> {
    match view.record(record_id) {
        None => Err(EngineError::RecordNotFound { id: record_id }),
        Some(record) if record.is_deleted() => Err(EngineError::RecordDeleted { id: record_id }),
        Some(record) => Ok(record),
    }
}

fn current(view: StoreView<'_>, record_id: RecordId) -> EngineResult<SurchargeRecord> {
    view.record(record_id)
        .cloned()
        .ok_or(EngineError::RecordNotFound { id: record_id })
}

/// Tombstones every live day of a record and the details under it.
fn remove_days(tx: &mut Transaction<'_>, record_id: RecordId, at: DateTime<Utc>) {
    let day_ids: Vec<_> = tx.view().live_days_of(record_id).iter().map(|d| d.id).collect();
    for day_id in day_ids {
        tx.tombstone_details_of(day_id, at);
        tx.tombstone_day(day_id, at);
    }
}

fn bump_version(tx: &mut Transaction<'_>, record_id: RecordId, at: DateTime<Utc>) -> EngineResult<()> {
    tx.update_record(record_id, |record| {
        record.version += 1;
        record.updated_at = at;
    })
    .map(|_| ())
    .ok_or(EngineError::RecordNotFound { id: record_id })
}
