//! Work day model and submission input.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Period, RecordId};
use crate::error::{EngineError, EngineResult};

/// Identifier of a work day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayId(pub u64);

impl fmt::Display for DayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One day of work as submitted by a client.
///
/// Hours are fractional clock hours (`6.5` is 06:30). A shift that crosses
/// midnight keeps its start hour; the classifier walks
/// `[start_hour, start_hour + total_hours)` so the end hour is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDayInput {
    /// Day of the month.
    pub day: u32,
    /// Clock-in hour.
    pub start_hour: Decimal,
    /// Clock-out hour.
    pub end_hour: Decimal,
    /// Hours actually worked.
    pub total_hours: Decimal,
    /// Public holiday flag.
    #[serde(default)]
    pub is_holiday: bool,
    /// Sunday flag.
    #[serde(default)]
    pub is_sunday: bool,
    /// On-call day with no driving; never classified.
    #[serde(default)]
    pub is_availability_day: bool,
}

impl WorkDayInput {
    /// Validates the day against the record's period.
    pub fn validate(&self, period: &Period) -> EngineResult<()> {
        let days_in_month = period.days_in_month().ok_or(EngineError::InvalidPeriod {
            month: period.month,
            year: period.year,
        })?;

        if self.day == 0 || self.day > days_in_month {
            return Err(self.invalid(format!(
                "day must be between 1 and {} for {}",
                days_in_month, period
            )));
        }

        let day_length = Decimal::from(24);
        if self.start_hour < Decimal::ZERO || self.start_hour > day_length {
            return Err(self.invalid(format!("start_hour {} is outside 0-24", self.start_hour)));
        }

        // Shifts crossing midnight may encode the clock-out past 24.
        let latest_end = day_length + day_length;
        if self.end_hour < Decimal::ZERO || self.end_hour > latest_end {
            return Err(self.invalid(format!("end_hour {} is outside 0-48", self.end_hour)));
        }

        if self.total_hours < Decimal::ZERO || self.total_hours > day_length {
            return Err(self.invalid(format!(
                "total hours {} is outside 0-24",
                self.total_hours
            )));
        }

        Ok(())
    }

    /// Builds the persisted row for this input.
    pub fn to_work_day(
        &self,
        id: DayId,
        record_id: RecordId,
        created_by: Uuid,
        created_at: DateTime<Utc>,
    ) -> WorkDay {
        WorkDay {
            id,
            record_id,
            day: self.day,
            start_hour: self.start_hour,
            end_hour: self.end_hour,
            total_hours: self.total_hours,
            is_holiday: self.is_holiday,
            is_sunday: self.is_sunday,
            is_availability_day: self.is_availability_day,
            created_by,
            created_at,
            deleted_at: None,
        }
    }

    fn invalid(&self, message: String) -> EngineError {
        EngineError::InvalidWorkDay {
            day: self.day,
            message,
        }
    }
}

/// A persisted work day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDay {
    /// Day identifier.
    pub id: DayId,
    /// Owning record.
    pub record_id: RecordId,
    /// Day of the month.
    pub day: u32,
    /// Clock-in hour.
    pub start_hour: Decimal,
    /// Clock-out hour.
    pub end_hour: Decimal,
    /// Hours actually worked.
    pub total_hours: Decimal,
    /// Public holiday flag.
    pub is_holiday: bool,
    /// Sunday flag.
    pub is_sunday: bool,
    /// On-call day with no driving.
    pub is_availability_day: bool,
    /// Actor that wrote the day.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl WorkDay {
    /// Sundays and public holidays are special days.
    pub fn is_special_day(&self) -> bool {
        self.is_sunday || self.is_holiday
    }

    /// Returns true once the day has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
