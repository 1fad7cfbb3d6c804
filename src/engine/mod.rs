//! Persistence-aware parts of the engine.
//!
//! - [`detail_writer`] turns a classification into detail rows.
//! - [`aggregator`] rolls record totals up from work days.
//! - [`reconcile`] brings one day's details in line with the classifier and
//!   is shared by the interactive service and the recompute job.
//! - [`records`] is the interactive path: create, replace, delete.
//! - [`recompute`] is the batch path, reporting through [`report`].

pub mod aggregator;
pub mod detail_writer;
pub mod recompute;
pub mod reconcile;
pub mod records;
pub mod report;

pub use aggregator::{aggregate, refresh_totals};
pub use detail_writer::{WriteStamp, replace_details, write_details};
pub use recompute::{RecomputeJob, RecomputeOptions};
pub use reconcile::{Correction, PersistedHours, Reconciler, Reconciliation};
pub use records::{CategoryTotals, RecordService, category_totals};
pub use report::{
    AuditEntry, AuditLine, DayOutcome, DayState, RecomputeReport, RecordSummary, RunFailure,
};
