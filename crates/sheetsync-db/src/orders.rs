// Postgres-backed `RecordStore` over the `orders` table.
//
// Timestamps always come from the caller; the SQL never calls now().

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::store::{NewRecord, OrderKey, PersistedRecord, RecordStore, StoreError, UpsertOutcome};

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn store_err(op: &'static str) -> impl FnOnce(anyhow::Error) -> StoreError {
    move |e| StoreError::new(op, format!("{e:#}"))
}

fn record_from_row(r: &PgRow) -> Result<PersistedRecord> {
    Ok(PersistedRecord {
        key: OrderKey {
            row_index: r.try_get::<i64, _>("row_index").context("orders.row_index")?,
            order_id: r.try_get::<i64, _>("order_id").context("orders.order_id")?,
        },
        original_price: r
            .try_get::<f64, _>("original_price")
            .context("orders.original_price")?,
        converted_price: r
            .try_get::<f64, _>("converted_price")
            .context("orders.converted_price")?,
        delivery_date: r.try_get("delivery_date").context("orders.delivery_date")?,
        created_at: r.try_get("created_at").context("orders.created_at")?,
        updated_at: r.try_get("updated_at").context("orders.updated_at")?,
    })
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

async fn upsert_batch_tx(
    pool: &PgPool,
    records: &[NewRecord],
    written_at: DateTime<Utc>,
) -> Result<UpsertOutcome> {
    let mut tx = pool.begin().await.context("begin upsert tx failed")?;
    let mut out = UpsertOutcome::default();

    for rec in records {
        // inserted = (xmax = 0) in Postgres (true on insert, false on update).
        let inserted: bool = sqlx::query_scalar(
            r#"
            insert into orders (
              row_index, order_id, original_price, converted_price,
              delivery_date, created_at, updated_at
            ) values ($1, $2, $3, $4, $5, $6, $6)
            on conflict (row_index, order_id) do update set
              original_price = excluded.original_price,
              converted_price = excluded.converted_price,
              delivery_date = excluded.delivery_date,
              updated_at = excluded.updated_at
            returning (xmax = 0)
            "#,
        )
        .bind(rec.key.row_index)
        .bind(rec.key.order_id)
        .bind(rec.original_price)
        .bind(rec.converted_price)
        .bind(rec.delivery_date)
        .bind(written_at)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("upsert orders key={} failed", rec.key))?;

        if inserted {
            out.inserted += 1;
        } else {
            out.updated += 1;
        }
    }

    tx.commit().await.context("commit upsert tx failed")?;
    Ok(out)
}

async fn query_stale_rows(
    pool: &PgPool,
    threshold: DateTime<Utc>,
    after: Option<OrderKey>,
    limit: u32,
) -> Result<Vec<PersistedRecord>> {
    let rows = sqlx::query(
        r#"
        select
          row_index, order_id, original_price, converted_price,
          delivery_date, created_at, updated_at
        from orders
        where updated_at < $1
          and ($2::bigint is null or (row_index, order_id) > ($2, $3))
        order by row_index asc, order_id asc
        limit $4
        "#,
    )
    .bind(threshold)
    .bind(after.map(|k| k.row_index))
    .bind(after.map(|k| k.order_id).unwrap_or(i64::MIN))
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await
    .context("query_stale select failed")?;

    rows.iter().map(record_from_row).collect()
}

async fn reprice_rows(pool: &PgPool, prices: &[(OrderKey, f64)]) -> Result<u64> {
    let row_index: Vec<i64> = prices.iter().map(|(k, _)| k.row_index).collect();
    let order_id: Vec<i64> = prices.iter().map(|(k, _)| k.order_id).collect();
    let converted: Vec<f64> = prices.iter().map(|(_, p)| *p).collect();

    let res = sqlx::query(
        r#"
        update orders o set
          converted_price = v.converted_price
        from unnest($1::bigint[], $2::bigint[], $3::double precision[])
          as v(row_index, order_id, converted_price)
        where o.row_index = v.row_index
          and o.order_id = v.order_id
        "#,
    )
    .bind(&row_index)
    .bind(&order_id)
    .bind(&converted)
    .execute(pool)
    .await
    .context("reprice orders failed")?;

    Ok(res.rows_affected())
}

async fn delete_stale_rows(pool: &PgPool, threshold: DateTime<Utc>) -> Result<u64> {
    let res = sqlx::query("delete from orders where updated_at < $1")
        .bind(threshold)
        .execute(pool)
        .await
        .context("delete stale orders failed")?;
    Ok(res.rows_affected())
}

async fn get_row(pool: &PgPool, key: OrderKey) -> Result<Option<PersistedRecord>> {
    let row = sqlx::query(
        r#"
        select
          row_index, order_id, original_price, converted_price,
          delivery_date, created_at, updated_at
        from orders
        where row_index = $1 and order_id = $2
        "#,
    )
    .bind(key.row_index)
    .bind(key.order_id)
    .fetch_optional(pool)
    .await
    .context("get order failed")?;

    row.as_ref().map(record_from_row).transpose()
}

// ---------------------------------------------------------------------------
// RecordStore impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn upsert_batch(
        &self,
        records: &[NewRecord],
        written_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }
        let out = upsert_batch_tx(&self.pool, records, written_at)
            .await
            .map_err(store_err("upsert_batch"))?;
        debug!(
            inserted = out.inserted,
            updated = out.updated,
            "orders batch committed"
        );
        Ok(out)
    }

    async fn query_stale(
        &self,
        threshold: DateTime<Utc>,
        after: Option<OrderKey>,
        limit: u32,
    ) -> Result<Vec<PersistedRecord>, StoreError> {
        query_stale_rows(&self.pool, threshold, after, limit)
            .await
            .map_err(store_err("query_stale"))
    }

    async fn reprice_batch(&self, prices: &[(OrderKey, f64)]) -> Result<u64, StoreError> {
        if prices.is_empty() {
            return Ok(0);
        }
        reprice_rows(&self.pool, prices)
            .await
            .map_err(store_err("reprice_batch"))
    }

    async fn delete_stale(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError> {
        delete_stale_rows(&self.pool, threshold)
            .await
            .map_err(store_err("delete_stale"))
    }

    async fn get(&self, key: OrderKey) -> Result<Option<PersistedRecord>, StoreError> {
        get_row(&self.pool, key).await.map_err(store_err("get"))
    }
}
