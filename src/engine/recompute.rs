//! Batch recomputation of persisted surcharge details.
//!
//! The job re-runs the classifier over every live work day, rewrites the
//! details of days whose persisted hours disagree with the result, refreshes
//! the totals of every record it touched and finally reads everything back
//! for the audit report.
//!
//! Each day is reconciled in its own transaction: a failing day is rolled
//! back, reported as failed and the run moves on. Records share no state, so
//! with more than one worker the records are spread over a thread pool while
//! the days of a record are still handled in order by a single worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ClassifierConfig, RecomputeDefaults};
use crate::error::{EngineError, EngineResult};
use crate::models::{DayId, RecordId, RecordTotals, TypeCatalog};
use crate::store::Store;

use super::aggregator::{aggregate, refresh_totals};
use super::detail_writer::WriteStamp;
use super::reconcile::{Reconciler, Reconciliation};
use super::records::{CategoryTotals, category_totals};
use super::report::{
    AuditEntry, AuditLine, DayOutcome, DayState, RecomputeReport, RecordSummary, RunFailure,
};

/// Tuning of a recompute run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeOptions {
    /// Per-category hours difference still considered a match.
    pub tolerance: Decimal,
    /// Worker threads; 1 runs sequentially.
    pub workers: usize,
    /// Classify and compare only, without writing.
    pub dry_run: bool,
}

impl Default for RecomputeOptions {
    fn default() -> Self {
        Self::from(&RecomputeDefaults::default())
    }
}

impl From<&RecomputeDefaults> for RecomputeOptions {
    fn from(defaults: &RecomputeDefaults) -> Self {
        Self {
            tolerance: defaults.tolerance,
            workers: defaults.workers,
            dry_run: false,
        }
    }
}

/// Re-derives persisted surcharge details with a given rule set.
///
/// # Example
///
/// ```
/// use surcharge_engine::config::ClassifierConfig;
/// use surcharge_engine::engine::RecomputeJob;
/// use surcharge_engine::models::TypeCatalog;
/// use surcharge_engine::store::Store;
/// use uuid::Uuid;
///
/// let store = Store::new();
/// let catalog = TypeCatalog::default();
/// let report = RecomputeJob::new(&store, &catalog, ClassifierConfig::default(), Uuid::nil()).run();
///
/// assert_eq!(report.outcomes.len(), 0);
/// assert!(report.is_clean());
/// ```
#[derive(Debug, Clone)]
pub struct RecomputeJob<'a> {
    store: &'a Store,
    catalog: &'a TypeCatalog,
    rules: ClassifierConfig,
    actor: Uuid,
    options: RecomputeOptions,
}

/// What happened to one record during a run.
#[derive(Debug)]
struct RecordRun {
    record_id: RecordId,
    outcomes: Vec<DayOutcome>,
    summary: Option<RecordSummary>,
    failures: Vec<RunFailure>,
}

impl<'a> RecomputeJob<'a> {
    /// Creates a job with default options.
    pub fn new(
        store: &'a Store,
        catalog: &'a TypeCatalog,
        rules: ClassifierConfig,
        actor: Uuid,
    ) -> Self {
        Self {
            store,
            catalog,
            rules,
            actor,
            options: RecomputeOptions::default(),
        }
    }

    /// Replaces the options of the job.
    pub fn with_options(mut self, options: RecomputeOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the job to completion.
    ///
    /// Never fails as a whole: per-day and per-record errors are collected in
    /// the report.
    pub fn run(&self) -> RecomputeReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let plan = self.plan();
        let workers = self.options.workers.max(1).min(plan.len().max(1));

        info!(
            run_id = %run_id,
            records = plan.len(),
            workers,
            dry_run = self.options.dry_run,
            "Starting surcharge recompute"
        );

        let runs: Vec<RecordRun> = if workers == 1 {
            plan.iter()
                .map(|(record_id, days)| self.process_record(run_id, *record_id, days))
                .collect()
        } else {
            self.run_parallel(run_id, &plan, workers)
        };

        let mut outcomes = Vec::new();
        let mut summaries = Vec::new();
        let mut failures = Vec::new();
        for run in runs {
            outcomes.extend(run.outcomes);
            summaries.extend(run.summary);
            failures.extend(run.failures);
        }
        outcomes.sort_by_key(|o| o.day_id);

        let report = RecomputeReport {
            run_id,
            dry_run: self.options.dry_run,
            rules: self.rules,
            tolerance: self.options.tolerance,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            summaries,
            failures,
            audit: self.verify(),
        };

        info!(
            run_id = %run_id,
            unchanged = report.unchanged(),
            corrected = report.corrected(),
            availability_cleaned = report.availability_cleaned(),
            failed = report.failed(),
            "Surcharge recompute finished"
        );

        report
    }

    /// Live day ids grouped by record, both in id order.
    fn plan(&self) -> Vec<(RecordId, Vec<DayId>)> {
        self.store.read(|view| {
            let mut plan: Vec<(RecordId, Vec<DayId>)> = Vec::new();
            let mut days: Vec<_> = view
                .live_days()
                .filter(|d| view.record(d.record_id).is_some_and(|r| !r.is_deleted()))
                .map(|d| (d.record_id, d.id))
                .collect();
            days.sort();

            for (record_id, day_id) in days {
                match plan.last_mut() {
                    Some((last, ids)) if *last == record_id => ids.push(day_id),
                    _ => plan.push((record_id, vec![day_id])),
                }
            }
            plan
        })
    }

    fn run_parallel(
        &self,
        run_id: Uuid,
        plan: &[(RecordId, Vec<DayId>)],
        workers: usize,
    ) -> Vec<RecordRun> {
        let next_index = AtomicUsize::new(0);
        let results = Mutex::new(Vec::with_capacity(plan.len()));

        thread::scope(|scope| {
            for worker_id in 0..workers {
                let next_index = &next_index;
                let results = &results;
                scope.spawn(move || {
                    loop {
                        let index = next_index.fetch_add(1, Ordering::SeqCst);
                        let Some((record_id, days)) = plan.get(index) else {
                            break;
                        };
                        debug!(run_id = %run_id, worker_id, record_id = %record_id, "Worker picked up record");

                        let run = self.process_record(run_id, *record_id, days);
                        results
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(run);
                    }
                });
            }
        });

        let mut runs = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        runs.sort_by_key(|run: &RecordRun| run.record_id);
        runs
    }

    fn process_record(&self, run_id: Uuid, record_id: RecordId, day_ids: &[DayId]) -> RecordRun {
        let stamp = WriteStamp::now(self.actor);
        let reconciler = Reconciler::new(&self.rules, self.catalog, stamp)
            .with_tolerance(self.options.tolerance)
            .dry_run(self.options.dry_run);

        let mut run = RecordRun {
            record_id,
            outcomes: Vec::with_capacity(day_ids.len()),
            summary: None,
            failures: Vec::new(),
        };

        for &day_id in day_ids {
            let result = self.store.transaction(|tx| {
                let day = tx
                    .view()
                    .day(day_id)
                    .filter(|d| !d.is_deleted())
                    .cloned()
                    .ok_or(EngineError::DayNotFound { id: day_id })?;
                let reconciliation = reconciler.reconcile(tx, &day)?;
                Ok::<_, EngineError>((day.day, reconciliation))
            });

            let (day, state) = match result {
                Ok((day, Reconciliation::Unchanged)) => (day, DayState::Unchanged),
                Ok((day, Reconciliation::Corrected(correction))) => {
                    debug!(run_id = %run_id, record_id = %record_id, day_id = %day_id, "Day corrected");
                    (day, DayState::Corrected { correction })
                }
                Err(error) => {
                    warn!(
                        run_id = %run_id,
                        record_id = %record_id,
                        day_id = %day_id,
                        error = %error,
                        "Day recompute failed"
                    );
                    run.failures.push(RunFailure {
                        record_id,
                        day_id: Some(day_id),
                        message: error.to_string(),
                    });
                    let day = self.store.read(|view| view.day(day_id).map(|d| d.day)).unwrap_or(0);
                    (day, DayState::Failed { error: error.to_string() })
                }
            };

            run.outcomes.push(DayOutcome {
                record_id,
                day_id,
                day,
                state,
            });
        }

        let days_corrected = run.outcomes.iter().filter(|o| o.is_corrected()).count();
        if days_corrected == 0 {
            return run;
        }

        match self.refresh(record_id) {
            Ok((totals, hours)) => {
                info!(
                    run_id = %run_id,
                    record_id = %record_id,
                    days_corrected,
                    total_hours = %totals.total_hours,
                    "Record recomputed"
                );
                run.summary = Some(RecordSummary {
                    record_id,
                    days_corrected,
                    totals,
                    hours,
                });
            }
            Err(error) => {
                warn!(run_id = %run_id, record_id = %record_id, error = %error, "Record totals refresh failed");
                run.failures.push(RunFailure {
                    record_id,
                    day_id: None,
                    message: error.to_string(),
                });
            }
        }

        run
    }

    /// Refreshes the totals of a record in its own transaction.
    fn refresh(&self, record_id: RecordId) -> EngineResult<(RecordTotals, CategoryTotals)> {
        if self.options.dry_run {
            return self.store.read(|view| {
                let totals = aggregate(view, record_id, &self.rules)?;
                Ok((totals, category_totals(view, record_id, self.catalog)))
            });
        }

        self.store.transaction(|tx| {
            let totals = refresh_totals(tx, record_id, &self.rules, Utc::now())?;
            Ok((totals, category_totals(tx.view(), record_id, self.catalog)))
        })
    }

    /// Reads back every live day, ordered by record then day of month.
    fn verify(&self) -> Vec<AuditLine> {
        self.store.read(|view| {
            let mut days: Vec<_> = view
                .live_days()
                .filter(|d| view.record(d.record_id).is_some_and(|r| !r.is_deleted()))
                .collect();
            days.sort_by_key(|d| (d.record_id, d.day, d.id));

            days.into_iter()
                .map(|day| AuditLine {
                    record_id: day.record_id,
                    day_id: day.id,
                    day: day.day,
                    availability: day.is_availability_day,
                    entries: view
                        .live_details_of(day.id)
                        .into_iter()
                        .map(|detail| AuditEntry {
                            surcharge_type_id: detail.surcharge_type_id,
                            code: self.catalog.code_of(detail.surcharge_type_id),
                            hours: detail.hours,
                        })
                        .collect(),
                })
                .collect()
        })
    }
}
