//! Persistence boundary used by the reconciler.
//!
//! Everything here is backend-agnostic: `PgRecordStore` implements it for
//! Postgres and the testkit provides an in-memory version.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Composite primary key. Ordering is `(row_index, order_id)`, which is also
/// the keyset order used by stale scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey {
    pub row_index: i64,
    pub order_id: i64,
}

impl OrderKey {
    pub fn new(row_index: i64, order_id: i64) -> Self {
        Self {
            row_index,
            order_id,
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row_index, self.order_id)
    }
}

/// One validated, enriched row ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub key: OrderKey,
    pub original_price: f64,
    pub converted_price: f64,
    pub delivery_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
    pub key: OrderKey,
    pub original_price: f64,
    pub converted_price: f64,
    pub delivery_date: NaiveDate,
    /// Set once, at first insert.
    pub created_at: DateTime<Utc>,
    /// Write time of the last upsert that touched this key.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertOutcome {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Backend failure for a named store operation.
#[derive(Debug, Clone)]
pub struct StoreError {
    pub op: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store {} failed: {}", self.op, self.message)
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or update every record, all stamped with `written_at`.
    ///
    /// All-or-nothing: on error no record of the batch is visible.
    /// `created_at` is only set on insert.
    async fn upsert_batch(
        &self,
        records: &[NewRecord],
        written_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Up to `limit` records with `updated_at < threshold`, ordered by key,
    /// strictly after `after` when given.
    async fn query_stale(
        &self,
        threshold: DateTime<Utc>,
        after: Option<OrderKey>,
        limit: u32,
    ) -> Result<Vec<PersistedRecord>, StoreError>;

    /// Overwrite `converted_price` for exactly these keys. Does not touch
    /// `updated_at`. Returns the number of rows changed.
    async fn reprice_batch(&self, prices: &[(OrderKey, f64)]) -> Result<u64, StoreError>;

    /// Delete every record with `updated_at < threshold`.
    async fn delete_stale(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn get(&self, key: OrderKey) -> Result<Option<PersistedRecord>, StoreError>;
}
