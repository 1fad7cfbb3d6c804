//! Reconciliation of a work day's persisted details with its classification.
//!
//! Both the interactive service and the recompute job bring a day's detail
//! rows in line through [`Reconciler::reconcile`]: availability days are
//! emptied, other days are classified and rewritten only when the persisted
//! hours differ from the new breakdown.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculation::{SurchargeBreakdown, classify_work_day};
use crate::config::ClassifierConfig;
use crate::error::EngineResult;
use crate::models::{DayId, SurchargeCode, TypeCatalog, WorkDay};
use crate::store::{StoreView, Transaction};

use super::detail_writer::{WriteStamp, replace_details, resolve};

/// Hours currently persisted for a day, keyed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedHours {
    hours: BTreeMap<SurchargeCode, Decimal>,
    stray_rows: usize,
    rows: usize,
}

impl PersistedHours {
    /// Reads the live details of a day.
    ///
    /// Rows whose type is unknown to the catalog, or whose hours are not
    /// positive, are counted as stray and force a rewrite.
    pub fn read(view: StoreView<'_>, day_id: DayId, catalog: &TypeCatalog) -> Self {
        let mut persisted = PersistedHours::default();
        for detail in view.live_details_of(day_id) {
            persisted.rows += 1;
            match catalog.code_of(detail.surcharge_type_id) {
                Some(code) if detail.hours > Decimal::ZERO => {
                    *persisted.hours.entry(code).or_default() += detail.hours;
                }
                _ => persisted.stray_rows += 1,
            }
        }
        persisted
    }

    /// Hours persisted under a category.
    pub fn hours(&self, code: SurchargeCode) -> Decimal {
        self.hours.get(&code).copied().unwrap_or_default()
    }

    /// Number of live detail rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// True when every category is within `tolerance` of the breakdown.
    pub fn matches(&self, breakdown: &SurchargeBreakdown, tolerance: Decimal) -> bool {
        self.stray_rows == 0
            && breakdown
                .surcharges()
                .into_iter()
                .all(|(code, expected)| (self.hours(code) - expected).abs() <= tolerance)
    }

    /// The persisted hours as a breakdown (ordinary hours are never persisted).
    pub fn to_breakdown(&self) -> SurchargeBreakdown {
        SurchargeBreakdown {
            ordinary: Decimal::ZERO,
            hed: self.hours(SurchargeCode::Hed),
            hen: self.hours(SurchargeCode::Hen),
            hefd: self.hours(SurchargeCode::Hefd),
            hefn: self.hours(SurchargeCode::Hefn),
            rn: self.hours(SurchargeCode::Rn),
            rd: self.hours(SurchargeCode::Rd),
        }
    }
}

/// Why a day's details were rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Correction {
    /// An availability day still owned detail rows; they were deleted.
    AvailabilityCleanup {
        /// Rows tombstoned.
        removed: usize,
    },
    /// Persisted hours disagreed with the classification and were rewritten.
    Reclassified {
        /// Hours persisted before the rewrite.
        previous: SurchargeBreakdown,
        /// Hours produced by the classifier.
        current: SurchargeBreakdown,
    },
}

/// Result of reconciling one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Persisted details already matched.
    Unchanged,
    /// Details were (or, in a dry run, would be) rewritten.
    Corrected(Correction),
}

/// Brings a day's detail rows in line with the classifier.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    rules: &'a ClassifierConfig,
    catalog: &'a TypeCatalog,
    stamp: WriteStamp,
    tolerance: Decimal,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler that writes with `stamp` and compares exactly.
    pub fn new(rules: &'a ClassifierConfig, catalog: &'a TypeCatalog, stamp: WriteStamp) -> Self {
        Self {
            rules,
            catalog,
            stamp,
            tolerance: Decimal::ZERO,
            dry_run: false,
        }
    }

    /// Treats persisted hours within `tolerance` of the classification as equal.
    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Reports corrections without writing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconciles one day inside `tx`.
    ///
    /// On error nothing has been written for the day as long as the caller
    /// drops the transaction.
    pub fn reconcile(&self, tx: &mut Transaction<'_>, day: &WorkDay) -> EngineResult<Reconciliation> {
        let persisted = PersistedHours::read(tx.view(), day.id, self.catalog);

        if day.is_availability_day {
            if persisted.rows() == 0 {
                return Ok(Reconciliation::Unchanged);
            }
            let removed = if self.dry_run {
                persisted.rows()
            } else {
                tx.tombstone_details_of(day.id, self.stamp.at)
            };
            debug!(day_id = %day.id, removed, "Availability day details removed");
            return Ok(Reconciliation::Corrected(Correction::AvailabilityCleanup { removed }));
        }

        let current = classify_work_day(day, self.rules);
        if persisted.matches(&current, self.tolerance) {
            return Ok(Reconciliation::Unchanged);
        }

        if self.dry_run {
            // Surface the catalog errors the write would hit.
            resolve(day.id, &current, self.catalog)?;
        } else {
            replace_details(tx, day.id, &current, self.catalog, self.stamp)?;
        }

        debug!(day_id = %day.id, dry_run = self.dry_run, "Day details reclassified");
        Ok(Reconciliation::Corrected(Correction::Reclassified {
            previous: persisted.to_breakdown(),
            current,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{availability, catalog, catalog_without, dec, input, seed_record};
    use crate::error::EngineError;
    use crate::models::SurchargeTypeId;
    use crate::store::Store;
    use uuid::Uuid;

    fn day(store: &Store, id: DayId) -> WorkDay {
        store.read(|view| view.day(id).cloned()).unwrap()
    }

    fn reconcile(store: &Store, reconciler: Reconciler<'_>, id: DayId) -> EngineResult<Reconciliation> {
        let day = day(store, id);
        store.transaction(|tx| reconciler.reconcile(tx, &day))
    }

    #[test]
    fn test_fresh_day_is_written_then_unchanged() {
        let store = Store::new();
        let (_, days) = seed_record(&store, &[input(3, "14", "23", "9")]);
        let rules = ClassifierConfig::default();
        let catalog = catalog();
        let reconciler = Reconciler::new(&rules, &catalog, WriteStamp::now(Uuid::nil()));

        let first = reconcile(&store, reconciler, days[0]).unwrap();
        assert!(matches!(first, Reconciliation::Corrected(Correction::Reclassified { .. })));

        let details = store.read(|view| {
            view.live_details_of(days[0])
                .iter()
                .map(|d| (d.surcharge_type_id, d.hours))
                .collect::<Vec<_>>()
        });
        assert_eq!(details, vec![(SurchargeTypeId(5), dec("4"))]);

        let second = reconcile(&store, reconciler, days[0]).unwrap();
        assert_eq!(second, Reconciliation::Unchanged);
    }

    #[test]
    fn test_differences_within_tolerance_are_unchanged() {
        let store = Store::new();
        let (_, days) = seed_record(&store, &[input(3, "14", "23", "9")]);
        let catalog = catalog();
        store
            .transaction(|tx| {
                tx.insert_detail(|id| crate::models::SurchargeDetail {
                    id,
                    day_id: days[0],
                    surcharge_type_id: SurchargeTypeId(5),
                    hours: dec("4.01"),
                    computed_automatically: true,
                    created_by: Uuid::nil(),
                    created_at: chrono::Utc::now(),
                    deleted_at: None,
                });
                Ok::<_, ()>(())
            })
            .unwrap();

        let rules = ClassifierConfig::default();
        let reconciler =
            Reconciler::new(&rules, &catalog, WriteStamp::now(Uuid::nil())).with_tolerance(dec("0.01"));
        assert_eq!(reconcile(&store, reconciler, days[0]).unwrap(), Reconciliation::Unchanged);

        let exact = Reconciler::new(&rules, &catalog, WriteStamp::now(Uuid::nil()));
        assert!(matches!(
            reconcile(&store, exact, days[0]).unwrap(),
            Reconciliation::Corrected(_)
        ));
    }

    #[test]
    fn test_availability_day_is_emptied() {
        let store = Store::new();
        let (_, days) = seed_record(&store, &[availability(5)]);
        let rules = ClassifierConfig::default();
        let catalog = catalog();
        store
            .transaction(|tx| {
                crate::engine::detail_writer::write_details(
                    tx,
                    days[0],
                    &SurchargeBreakdown {
                        rn: dec("3"),
                        hed: dec("1"),
                        ..SurchargeBreakdown::default()
                    },
                    &catalog,
                    WriteStamp::now(Uuid::nil()),
                )
            })
            .unwrap();

        let reconciler = Reconciler::new(&rules, &catalog, WriteStamp::now(Uuid::nil()));
        let result = reconcile(&store, reconciler, days[0]).unwrap();

        assert_eq!(
            result,
            Reconciliation::Corrected(Correction::AvailabilityCleanup { removed: 2 })
        );
        assert_eq!(store.read(|view| view.live_details_of(days[0]).len()), 0);
        assert_eq!(reconcile(&store, reconciler, days[0]).unwrap(), Reconciliation::Unchanged);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let store = Store::new();
        let (_, days) = seed_record(&store, &[input(3, "14", "23", "9")]);
        let rules = ClassifierConfig::default();
        let catalog = catalog();
        let reconciler = Reconciler::new(&rules, &catalog, WriteStamp::now(Uuid::nil())).dry_run(true);

        let result = reconcile(&store, reconciler, days[0]).unwrap();

        assert!(matches!(result, Reconciliation::Corrected(_)));
        assert_eq!(store.read(|view| view.live_details_of(days[0]).len()), 0);
    }

    #[test]
    fn test_missing_catalog_entry_is_an_error() {
        let store = Store::new();
        let (_, days) = seed_record(&store, &[input(3, "14", "23", "9")]);
        let rules = ClassifierConfig::default();
        let catalog = catalog_without(crate::models::SurchargeCode::Rn);
        let reconciler = Reconciler::new(&rules, &catalog, WriteStamp::now(Uuid::nil()));

        let result = reconcile(&store, reconciler, days[0]);

        assert!(matches!(result, Err(EngineError::MissingCatalogEntry { .. })));
        assert_eq!(store.read(|view| view.live_details_of(days[0]).len()), 0);
    }

    #[test]
    fn test_unknown_type_forces_rewrite() {
        let store = Store::new();
        let (_, days) = seed_record(&store, &[input(3, "6", "16", "10")]);
        store
            .transaction(|tx| {
                tx.insert_detail(|id| crate::models::SurchargeDetail {
                    id,
                    day_id: days[0],
                    surcharge_type_id: SurchargeTypeId(99),
                    hours: dec("1"),
                    computed_automatically: false,
                    created_by: Uuid::nil(),
                    created_at: chrono::Utc::now(),
                    deleted_at: None,
                });
                Ok::<_, ()>(())
            })
            .unwrap();
        let rules = ClassifierConfig::default();
        let catalog = catalog();
        let reconciler = Reconciler::new(&rules, &catalog, WriteStamp::now(Uuid::nil()));

        let result = reconcile(&store, reconciler, days[0]).unwrap();

        assert!(matches!(result, Reconciliation::Corrected(_)));
        assert_eq!(store.read(|view| view.live_details_of(days[0]).len()), 0);
    }
}
