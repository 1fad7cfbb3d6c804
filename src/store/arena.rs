//! Three-level arena of records, work days and surcharge details.
//!
//! Ownership is expressed through foreign keys (`WorkDay::record_id`,
//! `SurchargeDetail::day_id`) plus per-parent child indexes. Rows are never
//! removed; deletion sets a `deleted_at` tombstone.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{
    DayId, DetailId, RecordId, SurchargeDetail, SurchargeRecord, WorkDay,
};

use super::snapshot::StoreSnapshot;

/// Backing tables of the store.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    records: BTreeMap<RecordId, SurchargeRecord>,
    days: BTreeMap<DayId, WorkDay>,
    details: BTreeMap<DetailId, SurchargeDetail>,
    record_days: BTreeMap<RecordId, Vec<DayId>>,
    day_details: BTreeMap<DayId, Vec<DetailId>>,
    next_record_id: u64,
    next_day_id: u64,
    next_detail_id: u64,
}

impl Tables {
    /// Rebuilds the tables and child indexes from a snapshot.
    pub(crate) fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, String> {
        let mut tables = Tables::default();

        for record in snapshot.records {
            tables.next_record_id = tables.next_record_id.max(record.id.0);
            tables.record_days.entry(record.id).or_default();
            if tables.records.insert(record.id, record).is_some() {
                return Err("duplicate record id".to_string());
            }
        }

        for day in snapshot.days {
            if !tables.records.contains_key(&day.record_id) {
                return Err(format!(
                    "work day {} references missing record {}",
                    day.id, day.record_id
                ));
            }
            tables.next_day_id = tables.next_day_id.max(day.id.0);
            tables.record_days.entry(day.record_id).or_default().push(day.id);
            if tables.days.insert(day.id, day).is_some() {
                return Err("duplicate work day id".to_string());
            }
        }

        for detail in snapshot.details {
            if !tables.days.contains_key(&detail.day_id) {
                return Err(format!(
                    "detail {} references missing work day {}",
                    detail.id, detail.day_id
                ));
            }
            tables.next_detail_id = tables.next_detail_id.max(detail.id.0);
            tables.day_details.entry(detail.day_id).or_default().push(detail.id);
            if tables.details.insert(detail.id, detail).is_some() {
                return Err("duplicate detail id".to_string());
            }
        }

        for ids in tables.record_days.values_mut() {
            ids.sort();
        }
        for ids in tables.day_details.values_mut() {
            ids.sort();
        }

        Ok(tables)
    }

    pub(crate) fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            records: self.records.values().cloned().collect(),
            days: self.days.values().cloned().collect(),
            details: self.details.values().cloned().collect(),
        }
    }
}

/// Read-only access to the store.
#[derive(Debug, Clone, Copy)]
pub struct StoreView<'a> {
    tables: &'a Tables,
}

impl<'a> StoreView<'a> {
    pub(crate) fn new(tables: &'a Tables) -> Self {
        Self { tables }
    }

    /// Looks up a record, including soft-deleted ones.
    pub fn record(&self, id: RecordId) -> Option<&'a SurchargeRecord> {
        self.tables.records.get(&id)
    }

    /// Every record that has not been soft-deleted, in id order.
    pub fn live_records(self) -> impl Iterator<Item = &'a SurchargeRecord> {
        self.tables.records.values().filter(|r| !r.is_deleted())
    }

    /// Looks up a work day, including soft-deleted ones.
    pub fn day(&self, id: DayId) -> Option<&'a WorkDay> {
        self.tables.days.get(&id)
    }

    /// Every work day that has not been soft-deleted, in id order.
    pub fn live_days(self) -> impl Iterator<Item = &'a WorkDay> {
        self.tables.days.values().filter(|d| !d.is_deleted())
    }

    /// Live work days of a record, ordered by day of month.
    pub fn live_days_of(&self, record_id: RecordId) -> Vec<&'a WorkDay> {
        let mut days: Vec<&WorkDay> = self
            .tables
            .record_days
            .get(&record_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tables.days.get(id))
            .filter(|d| !d.is_deleted())
            .collect();
        days.sort_by_key(|d| (d.day, d.id));
        days
    }

    /// Live surcharge details of a work day, in id order.
    pub fn live_details_of(&self, day_id: DayId) -> Vec<&'a SurchargeDetail> {
        self.tables
            .day_details
            .get(&day_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tables.details.get(id))
            .filter(|d| !d.is_deleted())
            .collect()
    }
}

/// Prior state of a row, replayed on rollback.
#[derive(Debug)]
enum Undo {
    Record(RecordId, Option<SurchargeRecord>),
    Day(DayId, Option<WorkDay>),
    Detail(DetailId, Option<SurchargeDetail>),
}

/// A journaled unit of work.
///
/// Every mutation records the row's previous state. Unless
/// [`Transaction::commit`] is reached, dropping the transaction replays the
/// journal in reverse and restores the tables exactly, including after a
/// panic inside the unit of work.
#[derive(Debug)]
pub struct Transaction<'a> {
    tables: &'a mut Tables,
    journal: Vec<Undo>,
    id_counters: (u64, u64, u64),
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(tables: &'a mut Tables) -> Self {
        let id_counters = (
            tables.next_record_id,
            tables.next_day_id,
            tables.next_detail_id,
        );
        Self {
            tables,
            journal: Vec::new(),
            id_counters,
            committed: false,
        }
    }

    pub(crate) fn commit(mut self) {
        self.committed = true;
        self.journal.clear();
    }

    /// Read access to the tables as modified so far.
    pub fn view(&self) -> StoreView<'_> {
        StoreView::new(self.tables)
    }

    /// Inserts a record built around a freshly allocated id.
    pub fn insert_record(
        &mut self,
        build: impl FnOnce(RecordId) -> SurchargeRecord,
    ) -> &SurchargeRecord {
        self.tables.next_record_id += 1;
        let id = RecordId(self.tables.next_record_id);
        let mut record = build(id);
        record.id = id;

        self.journal.push(Undo::Record(id, None));
        self.tables.record_days.entry(id).or_default();
        self.tables.records.entry(id).or_insert(record)
    }

    /// Applies `change` to a record. Returns `None` if the record does not exist.
    pub fn update_record(
        &mut self,
        id: RecordId,
        change: impl FnOnce(&mut SurchargeRecord),
    ) -> Option<&SurchargeRecord> {
        let record = self.tables.records.get_mut(&id)?;
        self.journal.push(Undo::Record(id, Some(record.clone())));
        change(record);
        record.id = id;
        Some(record)
    }

    /// Inserts a work day built around a freshly allocated id.
    ///
    /// Returns `None` if the owning record does not exist.
    pub fn insert_day(&mut self, build: impl FnOnce(DayId) -> WorkDay) -> Option<&WorkDay> {
        self.tables.next_day_id += 1;
        let id = DayId(self.tables.next_day_id);
        let mut day = build(id);
        day.id = id;

        let children = self.tables.record_days.get_mut(&day.record_id)?;
        children.push(id);
        self.journal.push(Undo::Day(id, None));
        Some(self.tables.days.entry(id).or_insert(day))
    }

    /// Inserts a surcharge detail built around a freshly allocated id.
    ///
    /// Returns `None` if the owning work day does not exist.
    pub fn insert_detail(
        &mut self,
        build: impl FnOnce(DetailId) -> SurchargeDetail,
    ) -> Option<&SurchargeDetail> {
        self.tables.next_detail_id += 1;
        let id = DetailId(self.tables.next_detail_id);
        let mut detail = build(id);
        detail.id = id;

        if !self.tables.days.contains_key(&detail.day_id) {
            return None;
        }
        self.tables.day_details.entry(detail.day_id).or_default().push(id);
        self.journal.push(Undo::Detail(id, None));
        Some(self.tables.details.entry(id).or_insert(detail))
    }

    /// Tombstones a record. Returns false if it was missing or already deleted.
    pub fn tombstone_record(&mut self, id: RecordId, at: DateTime<Utc>) -> bool {
        match self.tables.records.get_mut(&id) {
            Some(record) if !record.is_deleted() => {
                self.journal.push(Undo::Record(id, Some(record.clone())));
                record.deleted_at = Some(at);
                record.updated_at = at;
                true
            }
            _ => false,
        }
    }

    /// Tombstones a work day. Returns false if it was missing or already deleted.
    pub fn tombstone_day(&mut self, id: DayId, at: DateTime<Utc>) -> bool {
        match self.tables.days.get_mut(&id) {
            Some(day) if !day.is_deleted() => {
                self.journal.push(Undo::Day(id, Some(day.clone())));
                day.deleted_at = Some(at);
                true
            }
            _ => false,
        }
    }

    /// Tombstones every live detail of a work day, returning how many were deleted.
    pub fn tombstone_details_of(&mut self, day_id: DayId, at: DateTime<Utc>) -> usize {
        let ids: Vec<DetailId> = self.view().live_details_of(day_id).iter().map(|d| d.id).collect();

        for id in &ids {
            if let Some(detail) = self.tables.details.get_mut(id) {
                self.journal.push(Undo::Detail(*id, Some(detail.clone())));
                detail.deleted_at = Some(at);
            }
        }

        ids.len()
    }

    fn rollback(&mut self) {
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Record(id, Some(previous)) => {
                    self.tables.records.insert(id, previous);
                }
                Undo::Record(id, None) => {
                    self.tables.records.remove(&id);
                    self.tables.record_days.remove(&id);
                }
                Undo::Day(id, Some(previous)) => {
                    self.tables.days.insert(id, previous);
                }
                Undo::Day(id, None) => {
                    if let Some(day) = self.tables.days.remove(&id) {
                        if let Some(children) = self.tables.record_days.get_mut(&day.record_id) {
                            children.retain(|child| *child != id);
                        }
                    }
                    self.tables.day_details.remove(&id);
                }
                Undo::Detail(id, Some(previous)) => {
                    self.tables.details.insert(id, previous);
                }
                Undo::Detail(id, None) => {
                    if let Some(detail) = self.tables.details.remove(&id) {
                        if let Some(children) = self.tables.day_details.get_mut(&detail.day_id) {
                            children.retain(|child| *child != id);
                        }
                    }
                }
            }
        }

        let (records, days, details) = self.id_counters;
        self.tables.next_record_id = records;
        self.tables.next_day_id = days;
        self.tables.next_detail_id = details;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}
