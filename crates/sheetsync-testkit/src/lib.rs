//! Test doubles and a harness for driving `Reconciler` without network or DB.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sheetsync_config::{RateRefresh, StalenessAnchor, SyncSettings};
use sheetsync_db::{OrderKey, PersistedRecord};
use sheetsync_feeds::RawRow;
use sheetsync_reconcile::Reconciler;

mod mem_store;
mod scripted;

pub use mem_store::MemRecordStore;
pub use scripted::{ManualClock, ScriptedRate, ScriptedSheet};

/// Header rows used by [`sync_settings`] and [`Harness::new`].
pub const HEADER_ROWS: u32 = 1;

/// Baseline settings: columns A:D, one header row, no post-pass.
pub fn sync_settings(chunk_size: u32) -> SyncSettings {
    SyncSettings {
        chunk_size,
        header_row_count: HEADER_ROWS,
        left_column: "A".to_string(),
        right_column: "D".to_string(),
        delete_removed: false,
        update_price_for_removed: false,
        crawl_period_sec: 0,
        staleness_anchor: StalenessAnchor::CurrentRun,
        rate_refresh: RateRefresh::PerPage,
    }
}

/// Sheet row `[row_index, order_id, price, delivery_date]`.
pub fn sheet_row(row_index: i64, order_id: i64, price: &str, date: &str) -> RawRow {
    vec![
        row_index.to_string(),
        order_id.to_string(),
        price.to_string(),
        date.to_string(),
    ]
}

/// `n` well-formed rows with prices 10, 20, 30, ...
pub fn sheet_rows(n: i64) -> Vec<RawRow> {
    (1..=n)
        .map(|i| sheet_row(i, 1000 + i, &(10 * i).to_string(), "17.05.2024"))
        .collect()
}

pub fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, h, m, s)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Record as an earlier run would have left it.
pub fn stored(row_index: i64, order_id: i64, price: f64, rate: f64, at: DateTime<Utc>) -> PersistedRecord {
    PersistedRecord {
        key: OrderKey::new(row_index, order_id),
        original_price: price,
        converted_price: price * rate,
        delivery_date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap_or(NaiveDate::MIN),
        created_at: at,
        updated_at: at,
    }
}

/// Shared handles to every collaborator of one reconciler.
pub struct Harness {
    pub sheet: Arc<ScriptedSheet>,
    pub rate: Arc<ScriptedRate>,
    pub store: Arc<MemRecordStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Sheet with [`HEADER_ROWS`] header rows, fixed rate, empty store, clock at 12:00
    /// stepping one second per reading.
    pub fn new(data: Vec<RawRow>, rate: f64) -> Self {
        Self {
            sheet: Arc::new(ScriptedSheet::new(HEADER_ROWS, data)),
            rate: Arc::new(ScriptedRate::fixed(rate)),
            store: Arc::new(MemRecordStore::new()),
            clock: Arc::new(ManualClock::with_step(ts(12, 0, 0), chrono::Duration::seconds(1))),
        }
    }

    pub fn reconciler(&self, settings: SyncSettings) -> Reconciler {
        Reconciler::new(
            settings,
            self.sheet.clone(),
            self.rate.clone(),
            self.store.clone(),
            self.clock.clone(),
        )
    }
}
