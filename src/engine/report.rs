//! Outcome of a recompute run.
//!
//! The report is both a machine-readable document (it serializes to JSON)
//! and, through its `Display` implementation, the operator-facing audit text.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ClassifierConfig;
use crate::models::{DayId, RecordId, RecordTotals, SurchargeCode, SurchargeTypeId};

use super::reconcile::Correction;
use super::records::CategoryTotals;

/// Final state of one work day in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DayState {
    /// Persisted details already matched the classification.
    Unchanged,
    /// Details were rewritten (or would be, in a dry run).
    Corrected {
        /// What was corrected.
        correction: Correction,
    },
    /// The day could not be processed; its details were left untouched.
    Failed {
        /// The error that stopped the day.
        error: String,
    },
}

/// Outcome for one work day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOutcome {
    /// Owning record.
    pub record_id: RecordId,
    /// The day processed.
    pub day_id: DayId,
    /// Day of the month.
    pub day: u32,
    /// What happened to it.
    #[serde(flatten)]
    pub state: DayState,
}

impl DayOutcome {
    /// True for any correction, availability cleanups included.
    pub fn is_corrected(&self) -> bool {
        matches!(self.state, DayState::Corrected { .. })
    }

    /// True when an availability day had its details removed.
    pub fn is_availability_cleanup(&self) -> bool {
        matches!(
            self.state,
            DayState::Corrected {
                correction: Correction::AvailabilityCleanup { .. }
            }
        )
    }

    /// True when the day failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.state, DayState::Failed { .. })
    }
}

/// A failure surfaced by the run.
///
/// `day_id` is `None` when the record's aggregate refresh failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Record concerned.
    pub record_id: RecordId,
    /// Day concerned, if the failure was per day.
    pub day_id: Option<DayId>,
    /// Error message.
    pub message: String,
}

/// Recompute summary for a record that owns at least one corrected day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    /// The record.
    pub record_id: RecordId,
    /// Days corrected in this run.
    pub days_corrected: usize,
    /// Totals after the refresh. In a dry run these are the unchanged totals.
    pub totals: RecordTotals,
    /// Surcharge hours per category after the run.
    pub hours: CategoryTotals,
}

/// One detail row as read back by the verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Catalog entry referenced by the row.
    pub surcharge_type_id: SurchargeTypeId,
    /// Category of that entry, if the catalog knows it.
    pub code: Option<SurchargeCode>,
    /// Hours on the row.
    pub hours: Decimal,
}

/// The details of one work day after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLine {
    /// Owning record.
    pub record_id: RecordId,
    /// The day.
    pub day_id: DayId,
    /// Day of the month.
    pub day: u32,
    /// Whether the day is an availability day.
    pub availability: bool,
    /// Live detail rows.
    pub entries: Vec<AuditEntry>,
}

/// Everything a recompute run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeReport {
    /// Identifier of the run, also attached to its log events.
    pub run_id: Uuid,
    /// Whether writes were suppressed.
    pub dry_run: bool,
    /// Rules the days were classified with.
    pub rules: ClassifierConfig,
    /// Per-category tolerance used when comparing hours.
    pub tolerance: Decimal,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Per-day outcomes, ordered by day id.
    pub outcomes: Vec<DayOutcome>,
    /// Records that owned a corrected day, ordered by record id.
    pub summaries: Vec<RecordSummary>,
    /// Failures, ordered by record then day.
    pub failures: Vec<RunFailure>,
    /// Verification pass, ordered by record then day of month.
    pub audit: Vec<AuditLine>,
}

impl RecomputeReport {
    /// Number of days whose details already matched.
    pub fn unchanged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == DayState::Unchanged)
            .count()
    }

    /// Number of corrected days, availability cleanups included.
    pub fn corrected(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_corrected()).count()
    }

    /// Number of availability days whose details were removed.
    pub fn availability_cleaned(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.is_availability_cleanup())
            .count()
    }

    /// Number of failed days.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// True when nothing failed, including aggregate refreshes.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RecomputeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "Surcharge recompute {}{}", self.run_id, mode)?;
        writeln!(
            f,
            "Rules: ordinary threshold {}h, night window [{}, {}), tolerance {}",
            self.rules.ordinary_threshold, self.rules.night_start, self.rules.night_end, self.tolerance
        )?;
        writeln!(
            f,
            "Days: {} processed, {} unchanged, {} corrected ({} availability cleanup), {} failed",
            self.outcomes.len(),
            self.unchanged(),
            self.corrected(),
            self.availability_cleaned(),
            self.failed()
        )?;

        if !self.summaries.is_empty() {
            writeln!(f)?;
            writeln!(f, "Records recomputed:")?;
            for summary in &self.summaries {
                writeln!(
                    f,
                    "  record {}: {} day(s) corrected, {} days, {}h worked, {}h ordinary, {}",
                    summary.record_id,
                    summary.days_corrected,
                    summary.totals.total_days,
                    summary.totals.total_hours,
                    summary.totals.total_ordinary_hours,
                    format_hours(summary.hours.iter().map(|(code, hours)| (code.as_str(), *hours)))
                )?;
            }
        }

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures:")?;
            for failure in &self.failures {
                match failure.day_id {
                    Some(day_id) => writeln!(
                        f,
                        "  record {} day #{}: {}",
                        failure.record_id, day_id, failure.message
                    )?,
                    None => writeln!(
                        f,
                        "  record {} totals: {}",
                        failure.record_id, failure.message
                    )?,
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "Verification:")?;
        for line in &self.audit {
            write!(f, "  record {} day {:02}: ", line.record_id, line.day)?;
            if line.availability && line.entries.is_empty() {
                writeln!(f, "availability, no details")?;
            } else {
                let entries = line.entries.iter().map(|entry| {
                    let code = entry.code.map(|c| c.as_str()).unwrap_or("?");
                    (code, entry.hours)
                });
                writeln!(f, "{}", format_hours(entries))?;
            }
        }

        Ok(())
    }
}

fn format_hours<'a>(entries: impl Iterator<Item = (&'a str, Decimal)>) -> String {
    let parts: Vec<String> = entries
        .map(|(code, hours)| format!("{} {}", code, hours))
        .collect();
    if parts.is_empty() {
        "no surcharges".to_string()
    } else {
        parts.join(", ")
    }
}
