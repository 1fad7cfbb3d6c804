//! Record-level totals rolled up from work days.
//!
//! Totals are always recomputed in full from the live children; there is no
//! incremental path.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::ClassifierConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{RecordId, RecordTotals};
use crate::store::{StoreView, Transaction};

/// Computes the totals of a record from its live work days.
///
/// Fails only when the record does not exist. A record without days yields
/// zero totals.
pub fn aggregate(
    view: StoreView<'_>,
    record_id: RecordId,
    config: &ClassifierConfig,
) -> EngineResult<RecordTotals> {
    if view.record(record_id).is_none() {
        return Err(EngineError::RecordNotFound { id: record_id });
    }

    let days = view.live_days_of(record_id);
    let totals = RecordTotals {
        total_days: days.len() as u32,
        total_hours: days.iter().map(|d| d.total_hours).sum(),
        total_ordinary_hours: days
            .iter()
            .map(|d| d.total_hours.min(config.ordinary_threshold).max(Decimal::ZERO))
            .sum(),
    };

    Ok(totals)
}

/// Recomputes the totals of a record and stores them on the record.
pub fn refresh_totals(
    tx: &mut Transaction<'_>,
    record_id: RecordId,
    config: &ClassifierConfig,
    at: DateTime<Utc>,
) -> EngineResult<RecordTotals> {
    let totals = aggregate(tx.view(), record_id, config)?;

    tx.update_record(record_id, |record| {
        record.totals = totals.clone();
        record.updated_at = at;
    })
    .ok_or(EngineError::RecordNotFound { id: record_id })?;

    debug!(
        record_id = %record_id,
        total_days = totals.total_days,
        total_hours = %totals.total_hours,
        "Record totals refreshed"
    );

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{dec, input, seed_record};
    use crate::store::Store;

    #[test]
    fn test_sums_live_days() {
        let store = Store::new();
        let (record_id, _) = seed_record(
            &store,
            &[input(1, "6", "16", "10"), input(2, "6", "18", "12"), input(3, "14", "23", "9")],
        );

        let totals = store
            .read(|view| aggregate(view, record_id, &ClassifierConfig::default()))
            .unwrap();

        assert_eq!(totals.total_days, 3);
        assert_eq!(totals.total_hours, dec("31"));
        // The 12 hour day only counts its first 10 hours.
        assert_eq!(totals.total_ordinary_hours, dec("29"));
    }

    #[test]
    fn test_tombstoned_days_are_ignored() {
        let store = Store::new();
        let (record_id, days) =
            seed_record(&store, &[input(1, "6", "16", "10"), input(2, "6", "14", "8")]);
        store
            .transaction(|tx| {
                tx.tombstone_day(days[0], Utc::now());
                Ok::<_, ()>(())
            })
            .unwrap();

        let totals = store
            .read(|view| aggregate(view, record_id, &ClassifierConfig::default()))
            .unwrap();

        assert_eq!(totals.total_days, 1);
        assert_eq!(totals.total_hours, dec("8"));
    }

    #[test]
    fn test_record_without_days_has_zero_totals() {
        let store = Store::new();
        let (record_id, _) = seed_record(&store, &[]);

        let totals = store
            .read(|view| aggregate(view, record_id, &ClassifierConfig::default()))
            .unwrap();

        assert_eq!(totals, RecordTotals::default());
    }

    #[test]
    fn test_missing_record_fails() {
        let store = Store::new();

        let result = store.read(|view| aggregate(view, RecordId(9), &ClassifierConfig::default()));

        assert!(matches!(result, Err(EngineError::RecordNotFound { id: RecordId(9) })));
    }

    #[test]
    fn test_refresh_persists_totals() {
        let store = Store::new();
        let (record_id, _) = seed_record(&store, &[input(1, "6", "18", "12")]);
        let config = ClassifierConfig {
            ordinary_threshold: dec("8"),
            ..ClassifierConfig::default()
        };

        store
            .transaction(|tx| refresh_totals(tx, record_id, &config, Utc::now()))
            .unwrap();

        let totals = store.read(|view| view.record(record_id).map(|r| r.totals.clone()));
        let totals = totals.unwrap();
        assert_eq!(totals.total_hours, dec("12"));
        assert_eq!(totals.total_ordinary_hours, dec("8"));
    }
}
