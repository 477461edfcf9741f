use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sheetsync_config::SyncSettings;
use sheetsync_db::{NewRecord, OrderKey};
use sheetsync_feeds::RawRow;
use uuid::Uuid;

use crate::cast::DELIVERY_DATE_FORMAT;

/// One cast spreadsheet row. Lives only for the duration of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: OrderKey,
    pub original_price: f64,
    pub delivery_date: NaiveDate,
}

impl Row {
    /// Attach the converted price for the given multiplier.
    pub fn enrich(&self, rate: f64) -> NewRecord {
        NewRecord {
            key: self.key,
            original_price: self.original_price,
            converted_price: self.original_price * rate,
            delivery_date: self.delivery_date,
        }
    }

    /// Render back into sheet cells (index, order id, price, date).
    pub fn to_raw(&self) -> RawRow {
        vec![
            self.key.row_index.to_string(),
            self.key.order_id.to_string(),
            self.original_price.to_string(),
            self.delivery_date.format(DELIVERY_DATE_FORMAT).to_string(),
        ]
    }
}

/// What happens to stored keys that the current run did not see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostPass {
    None,
    DeleteStale,
    RepriceStale,
}

impl PostPass {
    /// Delete wins when both flags are set.
    pub fn from_settings(s: &SyncSettings) -> Self {
        if s.delete_removed {
            PostPass::DeleteStale
        } else if s.update_price_for_removed {
            PostPass::RepriceStale
        } else {
            PostPass::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostPass::None => "none",
            PostPass::DeleteStale => "delete_stale",
            PostPass::RepriceStale => "reprice_stale",
        }
    }
}

/// Outcome of one complete run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    /// Correlates the log lines of one run.
    pub run_id: Uuid,
    /// Non-blank rows observed in the source (not the table size).
    pub rows_seen: u64,
    pub pages: u32,
    pub inserted: u64,
    pub updated: u64,
    pub post_pass: PostPass,
    pub stale_deleted: u64,
    pub stale_repriced: u64,
    /// Records with `updated_at` below this were considered removed.
    pub threshold: DateTime<Utc>,
}
