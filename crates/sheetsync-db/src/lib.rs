use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod orders;
mod store;

pub use orders::PgRecordStore;
pub use store::{NewRecord, OrderKey, PersistedRecord, RecordStore, StoreError, UpsertOutcome};

pub const ENV_DB_URL: &str = "SHEETSYNC_DATABASE_URL";

/// Connect to Postgres using SHEETSYNC_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

/// Number of stored orders; 0 when the schema is not migrated yet.
pub async fn count_orders(pool: &PgPool) -> Result<i64> {
    let st = status(pool).await?;
    if !st.has_orders_table {
        return Ok(0);
    }

    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*)::bigint from orders")
        .fetch_one(pool)
        .await
        .context("count_orders failed")?;

    Ok(n)
}
