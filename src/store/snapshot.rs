//! Serializable image of the store.

use serde::{Deserialize, Serialize};

use crate::models::{SurchargeDetail, SurchargeRecord, WorkDay};

/// Every row of the store, tombstoned rows included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Surcharge records.
    pub records: Vec<SurchargeRecord>,
    /// Work days.
    pub days: Vec<WorkDay>,
    /// Surcharge details.
    pub details: Vec<SurchargeDetail>,
}
