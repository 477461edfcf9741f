use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sheetsync_config::{resolve_secrets, Settings, UnusedKeyPolicy};
use sheetsync_db::PgRecordStore;
use sheetsync_feeds::{CbrRateProvider, GoogleSheetsSource};
use sheetsync_reconcile::{Reconciler, SyncReport, SystemClock};
use tracing::{error, info};

use super::{group_thousands, load_settings};

/// Wire the production adapters around one settings value.
async fn build_reconciler(settings: &Settings) -> Result<Reconciler> {
    let secrets = resolve_secrets(settings)?;

    let pool = sheetsync_db::connect_from_env().await?;
    sheetsync_db::migrate(&pool).await?;

    let sheet = GoogleSheetsSource::new(
        settings.sheet.base_url.clone(),
        settings.sheet.spreadsheet_id.clone(),
        secrets.sheets_token.clone(),
    );
    let rate = CbrRateProvider::new(settings.rate.feed_url.clone(), settings.rate.currency.clone());

    Ok(Reconciler::new(
        settings.sync.clone(),
        Arc::new(sheet),
        Arc::new(rate),
        Arc::new(PgRecordStore::new(pool)),
        Arc::new(SystemClock),
    ))
}

fn print_report(r: &SyncReport) {
    println!("run_id={}", r.run_id);
    println!("rows_seen={}", r.rows_seen);
    println!("pages={}", r.pages);
    println!("inserted={}", r.inserted);
    println!("updated={}", r.updated);
    println!("post_pass={}", r.post_pass.as_str());
    println!("stale_deleted={}", r.stale_deleted);
    println!("stale_repriced={}", r.stale_repriced);
    println!("threshold={}", r.threshold.to_rfc3339());
}

pub async fn sync_once(config_paths: &[String], policy: UnusedKeyPolicy, json: bool) -> Result<()> {
    let (loaded, settings) = load_settings(config_paths, policy)?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let reconciler = build_reconciler(&settings).await?;
    let report = reconciler.run().await.context("sync run failed")?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report failed")?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Run until Ctrl-C. A failed run is logged and retried after the period.
pub async fn sync_forever(config_paths: &[String], policy: UnusedKeyPolicy) -> Result<()> {
    let (loaded, settings) = load_settings(config_paths, policy)?;
    let period = Duration::from_secs(settings.sync.crawl_period_sec);
    info!(
        config_hash = %loaded.config_hash,
        crawl_period_sec = settings.sync.crawl_period_sec,
        "sync loop starting"
    );

    let reconciler = build_reconciler(&settings).await?;

    loop {
        match reconciler.run().await {
            Ok(report) => {
                info!("{} rows is crawled.", group_thousands(report.rows_seen));
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, "sync run failed; retrying next period");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; stopping sync loop");
                return Ok(());
            }
        }
    }
}
