/// Migrating twice must be idempotent.
///
/// DB-backed test, skipped if SHEETSYNC_DATABASE_URL is not set.
#[tokio::test]
async fn migrate_idempotent_on_clean_db() -> anyhow::Result<()> {
    let url = match std::env::var(sheetsync_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: SHEETSYNC_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = sheetsync_db::connect(&url).await?;

    sheetsync_db::migrate(&pool).await?;
    sheetsync_db::migrate(&pool).await?;

    let st = sheetsync_db::status(&pool).await?;
    assert!(st.ok);
    assert!(st.has_orders_table);

    Ok(())
}
