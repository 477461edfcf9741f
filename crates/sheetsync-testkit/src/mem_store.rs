//! In-memory `RecordStore` with failure injection.
//!
//! Batches are validated before any mutation, so an injected failure leaves
//! the map exactly as it was (same all-or-nothing contract as Postgres).

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use sheetsync_db::{NewRecord, OrderKey, PersistedRecord, RecordStore, StoreError, UpsertOutcome};

#[derive(Default)]
struct MemState {
    rows: BTreeMap<OrderKey, PersistedRecord>,
    calls: HashMap<&'static str, usize>,
    /// op -> 1-based call number that fails.
    fail_on: HashMap<&'static str, usize>,
    ignore_cursor: bool,
}

impl MemState {
    /// Count the call and report whether it was scheduled to fail.
    fn enter(&mut self, op: &'static str) -> Result<(), StoreError> {
        let n = {
            let c = self.calls.entry(op).or_insert(0);
            *c += 1;
            *c
        };
        if self.fail_on.get(op) == Some(&n) {
            return Err(StoreError::new(op, format!("injected failure on call {n}")));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemRecordStore {
    state: Mutex<MemState>,
}

impl MemRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemState> {
        // A panicking test thread must not hide the store from the assertions.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Preload records as if written by an earlier run.
    pub fn seed(&self, records: impl IntoIterator<Item = PersistedRecord>) {
        let mut st = self.lock();
        for r in records {
            st.rows.insert(r.key, r);
        }
    }

    /// Make the `nth` (1-based) call of `op` fail. `op` is the trait method name.
    pub fn fail_on(&self, op: &'static str, nth: usize) {
        self.lock().fail_on.insert(op, nth);
    }

    /// Simulate a backend whose stale scan ignores the keyset cursor.
    pub fn ignore_cursor(&self, on: bool) {
        self.lock().ignore_cursor = on;
    }

    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records in key order.
    pub fn snapshot(&self) -> Vec<PersistedRecord> {
        self.lock().rows.values().cloned().collect()
    }

    pub fn record(&self, key: OrderKey) -> Option<PersistedRecord> {
        self.lock().rows.get(&key).cloned()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemRecordStore {
    async fn upsert_batch(
        &self,
        records: &[NewRecord],
        written_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut st = self.lock();
        st.enter("upsert_batch")?;

        let mut out = UpsertOutcome::default();
        for rec in records {
            match st.rows.get_mut(&rec.key) {
                Some(existing) => {
                    existing.original_price = rec.original_price;
                    existing.converted_price = rec.converted_price;
                    existing.delivery_date = rec.delivery_date;
                    existing.updated_at = written_at;
                    out.updated += 1;
                }
                None => {
                    st.rows.insert(
                        rec.key,
                        PersistedRecord {
                            key: rec.key,
                            original_price: rec.original_price,
                            converted_price: rec.converted_price,
                            delivery_date: rec.delivery_date,
                            created_at: written_at,
                            updated_at: written_at,
                        },
                    );
                    out.inserted += 1;
                }
            }
        }
        Ok(out)
    }

    async fn query_stale(
        &self,
        threshold: DateTime<Utc>,
        after: Option<OrderKey>,
        limit: u32,
    ) -> Result<Vec<PersistedRecord>, StoreError> {
        let mut st = self.lock();
        st.enter("query_stale")?;

        let lower = match after {
            Some(k) if !st.ignore_cursor => Bound::Excluded(k),
            _ => Bound::Unbounded,
        };
        Ok(st
            .rows
            .range((lower, Bound::Unbounded))
            .map(|(_, r)| r)
            .filter(|r| r.updated_at < threshold)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn reprice_batch(&self, prices: &[(OrderKey, f64)]) -> Result<u64, StoreError> {
        let mut st = self.lock();
        st.enter("reprice_batch")?;

        let mut n = 0;
        for (key, price) in prices {
            if let Some(r) = st.rows.get_mut(key) {
                r.converted_price = *price;
                n += 1;
            }
        }
        Ok(n)
    }

    async fn delete_stale(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut st = self.lock();
        st.enter("delete_stale")?;

        let before = st.rows.len();
        st.rows.retain(|_, r| r.updated_at >= threshold);
        Ok((before - st.rows.len()) as u64)
    }

    async fn get(&self, key: OrderKey) -> Result<Option<PersistedRecord>, StoreError> {
        let mut st = self.lock();
        st.enter("get")?;
        Ok(st.rows.get(&key).cloned())
    }
}
