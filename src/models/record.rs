//! Surcharge record model.
//!
//! A surcharge record ("planilla") groups one driver's work days for one
//! vehicle and client during a calendar month.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WorkDayInput;

/// Identifier of a surcharge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Month of the year (1-12).
    pub month: u32,
    /// Calendar year.
    pub year: i32,
}

impl Period {
    /// Returns the first day of the month, or `None` if the period is invalid.
    ///
    /// # Example
    ///
    /// ```
    /// use surcharge_engine::models::Period;
    /// use chrono::NaiveDate;
    ///
    /// let period = Period { month: 2, year: 2025 };
    /// assert_eq!(period.first_day(), NaiveDate::from_ymd_opt(2025, 2, 1));
    /// assert_eq!(period.days_in_month(), Some(28));
    /// ```
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Returns the number of days in the month, or `None` if the period is invalid.
    pub fn days_in_month(&self) -> Option<u32> {
        self.first_day()?;
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)?
        };
        Some(next.pred_opt()?.day())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Lifecycle status of a surcharge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Days captured, not yet settled.
    Pending,
    /// Hours agreed with the driver.
    Settled,
    /// Billed to the client.
    Invoiced,
    /// Withdrawn without deletion.
    Cancelled,
}

/// Denormalized totals cached on a record.
///
/// Always recomputed from the record's live days, never incremented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTotals {
    /// Number of live work days.
    pub total_days: u32,
    /// Sum of the days' total hours.
    pub total_hours: Decimal,
    /// Sum of each day's hours capped at the ordinary threshold.
    pub total_ordinary_hours: Decimal,
}

/// A persisted surcharge record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurchargeRecord {
    /// Record identifier.
    pub id: RecordId,
    /// Driver the record belongs to.
    pub driver_id: String,
    /// Vehicle driven during the period.
    pub vehicle_id: String,
    /// Client the work was performed for.
    pub client_id: String,
    /// Month covered by the record.
    pub period: Period,
    /// Free-text identifier shown to operators.
    pub identifier: String,
    /// Lifecycle status.
    pub status: RecordStatus,
    /// Incremented on every interactive mutation.
    pub version: u32,
    /// Cached aggregate totals.
    pub totals: RecordTotals,
    /// Actor that created the record.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SurchargeRecord {
    /// Returns true once the record has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for creating a record together with its first batch of days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Driver the record belongs to.
    pub driver_id: String,
    /// Vehicle driven during the period.
    pub vehicle_id: String,
    /// Client the work was performed for.
    pub client_id: String,
    /// Month covered by the record.
    pub period: Period,
    /// Free-text identifier shown to operators.
    #[serde(default)]
    pub identifier: String,
    /// Days worked.
    pub days: Vec<WorkDayInput>,
}
