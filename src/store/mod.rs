//! Persistence for surcharge records.
//!
//! The [`Store`] is an in-memory arena of records, work days and details
//! shared between threads. Writes go through [`Store::transaction`], which is
//! all-or-nothing; reads go through [`Store::read`]. The whole arena can be
//! saved to and restored from a JSON snapshot.

mod arena;
mod snapshot;

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{EngineError, EngineResult};

use arena::Tables;

pub use arena::{StoreView, Transaction};
pub use snapshot::StoreSnapshot;

/// Thread-safe arena of surcharge records.
///
/// # Example
///
/// ```
/// use surcharge_engine::store::Store;
///
/// let store = Store::new();
/// let live = store.read(|view| view.live_records().count());
/// assert_eq!(live, 0);
/// ```
#[derive(Debug, Default)]
pub struct Store {
    tables: Mutex<Tables>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // Transactions roll back on unwind, so a poisoned lock still holds consistent tables.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs a read-only query.
    pub fn read<T>(&self, query: impl FnOnce(StoreView<'_>) -> T) -> T {
        let tables = self.lock();
        query(StoreView::new(&tables))
    }

    /// Runs `work` as one atomic unit.
    ///
    /// If `work` returns `Err` (or panics) every change it made is undone
    /// before the lock is released, so other threads never observe a partial
    /// write.
    pub fn transaction<T, E>(
        &self,
        work: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut tables = self.lock();
        let mut tx = Transaction::begin(&mut tables);
        let result = work(&mut tx);
        if result.is_ok() {
            tx.commit();
        }
        result
    }

    /// Copies every row into a serializable snapshot.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.lock().to_snapshot()
    }

    /// Rebuilds a store from a snapshot, checking foreign keys.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> EngineResult<Self> {
        let tables = Tables::from_snapshot(snapshot).map_err(|message| EngineError::Snapshot {
            path: "<memory>".to_string(),
            message,
        })?;
        Ok(Self {
            tables: Mutex::new(tables),
        })
    }

    /// Writes the store to a JSON file.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> EngineResult<()> {
        let path = path.as_ref();
        let snapshot_error = |message: String| EngineError::Snapshot {
            path: path.display().to_string(),
            message,
        };

        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| snapshot_error(e.to_string()))?;
        fs::write(path, json).map_err(|e| snapshot_error(e.to_string()))
    }

    /// Loads a store from a JSON file written by [`Store::save_snapshot`].
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let snapshot_error = |message: String| EngineError::Snapshot {
            path: path.display().to_string(),
            message,
        };

        let content = fs::read_to_string(path).map_err(|e| snapshot_error(e.to_string()))?;
        let snapshot: StoreSnapshot =
            serde_json::from_str(&content).map_err(|e| snapshot_error(e.to_string()))?;
        let tables = Tables::from_snapshot(snapshot).map_err(snapshot_error)?;

        Ok(Self {
            tables: Mutex::new(tables),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::models::{
        DayId, DetailId, Period, RecordId, RecordStatus, RecordTotals, SurchargeDetail,
        SurchargeRecord, SurchargeTypeId, WorkDay,
    };

    fn record(id: RecordId) -> SurchargeRecord {
        let now = Utc::now();
        SurchargeRecord {
            id,
            driver_id: "driver-1".to_string(),
            vehicle_id: "TRK-100".to_string(),
            client_id: "client-1".to_string(),
            period: Period { month: 3, year: 2025 },
            identifier: "PL-2025-03".to_string(),
            status: RecordStatus::Pending,
            version: 1,
            totals: RecordTotals::default(),
            created_by: Uuid::nil(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn day(id: DayId, record_id: RecordId, day: u32) -> WorkDay {
        WorkDay {
            id,
            record_id,
            day,
            start_hour: Decimal::from(6),
            end_hour: Decimal::from(16),
            total_hours: Decimal::from(10),
            is_holiday: false,
            is_sunday: false,
            is_availability_day: false,
            created_by: Uuid::nil(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn detail(id: DetailId, day_id: DayId) -> SurchargeDetail {
        SurchargeDetail {
            id,
            day_id,
            surcharge_type_id: SurchargeTypeId(5),
            hours: Decimal::from(2),
            computed_automatically: true,
            created_by: Uuid::nil(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    /// Inserts one record with one day and one detail, returning their ids.
    fn seed(store: &Store) -> (RecordId, DayId, DetailId) {
        store
            .transaction(|tx| {
                let record_id = tx.insert_record(record).id;
                let day_id = tx.insert_day(|id| day(id, record_id, 3)).ok_or(())?.id;
                let detail_id = tx.insert_detail(|id| detail(id, day_id)).ok_or(())?.id;
                Ok::<_, ()>((record_id, day_id, detail_id))
            })
            .unwrap()
    }

    #[test]
    fn test_committed_transaction_is_visible() {
        let store = Store::new();
        let (record_id, day_id, _) = seed(&store);

        store.read(|view| {
            assert!(view.record(record_id).is_some());
            assert_eq!(view.live_days_of(record_id).len(), 1);
            assert_eq!(view.live_details_of(day_id).len(), 1);
        });
    }

    #[test]
    fn test_failed_transaction_rolls_back_everything() {
        let store = Store::new();
        let (record_id, day_id, _) = seed(&store);
        let before = store.snapshot();

        let result: Result<(), &str> = store.transaction(|tx| {
            let at = Utc::now();
            tx.tombstone_details_of(day_id, at);
            tx.tombstone_day(day_id, at);
            tx.tombstone_record(record_id, at);
            tx.insert_day(|id| day(id, record_id, 4));
            Err("abort")
        });

        assert_eq!(result, Err("abort"));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_rollback_restores_id_allocation() {
        let store = Store::new();
        let (record_id, _, _) = seed(&store);

        let _: Result<(), ()> = store.transaction(|tx| {
            tx.insert_day(|id| day(id, record_id, 5));
            Err(())
        });

        let next = store
            .transaction(|tx| {
                tx.insert_day(|id| day(id, record_id, 6))
                    .map(|d| d.id)
                    .ok_or(())
            })
            .unwrap();
        assert_eq!(next, DayId(2));
    }

    #[test]
    fn test_panicking_transaction_rolls_back() {
        let store = Store::new();
        let (record_id, _, _) = seed(&store);
        let before = store.snapshot();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<(), ()> = store.transaction(|tx| {
                tx.tombstone_record(record_id, Utc::now());
                panic!("storage failure");
            });
        }));

        assert!(outcome.is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_tombstones_hide_rows_from_live_queries() {
        let store = Store::new();
        let (record_id, day_id, _) = seed(&store);

        store
            .transaction(|tx| {
                let at = Utc::now();
                assert_eq!(tx.tombstone_details_of(day_id, at), 1);
                assert!(tx.tombstone_day(day_id, at));
                assert!(!tx.tombstone_day(day_id, at));
                Ok::<_, ()>(())
            })
            .unwrap();

        store.read(|view| {
            assert!(view.live_days_of(record_id).is_empty());
            assert!(view.live_details_of(day_id).is_empty());
            assert!(view.day(day_id).unwrap().is_deleted());
            assert_eq!(view.live_days().count(), 0);
        });
    }

    #[test]
    fn test_insert_day_for_missing_record_fails() {
        let store = Store::new();
        let inserted = store
            .transaction(|tx| Ok::<_, ()>(tx.insert_day(|id| day(id, RecordId(42), 1)).is_some()))
            .unwrap();
        assert!(!inserted);
    }

    #[test]
    fn test_days_are_ordered_by_day_of_month() {
        let store = Store::new();
        let (record_id, _, _) = seed(&store);
        store
            .transaction(|tx| {
                tx.insert_day(|id| day(id, record_id, 1));
                Ok::<_, ()>(())
            })
            .unwrap();

        let days: Vec<u32> =
            store.read(|view| view.live_days_of(record_id).iter().map(|d| d.day).collect());
        assert_eq!(days, vec![1, 3]);
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let store = Store::new();
        seed(&store);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        store.save_snapshot(&path).unwrap();

        let restored = Store::load_snapshot(&path).unwrap();
        assert_eq!(restored.snapshot(), store.snapshot());

        // Ids keep increasing after a reload.
        let next = restored
            .transaction(|tx| Ok::<_, ()>(tx.insert_record(record).id))
            .unwrap();
        assert_eq!(next, RecordId(2));
    }

    #[test]
    fn test_snapshot_with_dangling_day_is_rejected() {
        let snapshot = StoreSnapshot {
            records: vec![],
            days: vec![day(DayId(1), RecordId(9), 1)],
            details: vec![],
        };
        match Store::from_snapshot(snapshot) {
            Err(EngineError::Snapshot { message, .. }) => {
                assert!(message.contains("missing record 9"))
            }
            other => panic!("Expected Snapshot error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_snapshot_file_is_reported() {
        let result = Store::load_snapshot("/nonexistent/store.json");
        assert!(matches!(result, Err(EngineError::Snapshot { .. })));
    }
}
