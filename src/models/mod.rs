//! Core data models for the surcharge engine.
//!
//! This module contains the persisted domain models (records, work days,
//! details) and the read-only surcharge type catalog.

mod catalog;
mod detail;
mod record;
mod surcharge_code;
mod work_day;

pub use catalog::{SurchargeType, SurchargeTypeId, TypeCatalog};
pub use detail::{DetailId, SurchargeDetail};
pub use record::{NewRecord, Period, RecordId, RecordStatus, RecordTotals, SurchargeRecord};
pub use surcharge_code::SurchargeCode;
pub use work_day::{DayId, WorkDay, WorkDayInput};
