use std::sync::Arc;

use chrono::{DateTime, Utc};
use sheetsync_config::{RateRefresh, StalenessAnchor, SyncSettings};
use sheetsync_db::{NewRecord, OrderKey, RecordStore, StoreError};
use sheetsync_feeds::{RateProvider, SheetRange, SheetSource};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cast::cast_page;
use crate::clock::Clock;
use crate::error::SyncError;
use crate::types::{PostPass, SyncReport};

// ---------------------------------------------------------------------------
// Rate cache
// ---------------------------------------------------------------------------

/// Per-run view of the rate provider. `PerRun` fetches once and reuses it.
struct RunRate {
    refresh: RateRefresh,
    cached: Option<f64>,
}

impl RunRate {
    fn new(refresh: RateRefresh) -> Self {
        Self {
            refresh,
            cached: None,
        }
    }

    async fn get(&mut self, provider: &dyn RateProvider) -> Result<f64, SyncError> {
        if let (RateRefresh::PerRun, Some(r)) = (self.refresh, self.cached) {
            return Ok(r);
        }
        let r = provider.get_rate().await.map_err(SyncError::RateUnavailable)?;
        self.cached = Some(r);
        debug!(provider = provider.name(), rate = r, "rate fetched");
        Ok(r)
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// One-shot spreadsheet → `orders` reconciliation.
///
/// A run is strictly sequential: pages, rate calls and post-pass batches are
/// awaited one after another. Two runs against the same table at the same
/// time are not safe; the staleness threshold of one can delete rows the
/// other just wrote.
pub struct Reconciler {
    settings: SyncSettings,
    sheet: Arc<dyn SheetSource>,
    rate: Arc<dyn RateProvider>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        settings: SyncSettings,
        sheet: Arc<dyn SheetSource>,
        rate: Arc<dyn RateProvider>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            sheet,
            rate,
            store,
            clock,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Ingest every page, then apply the configured post-pass.
    ///
    /// Pages written before a failure stay committed; the failing page is
    /// not written at all.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let run_id = Uuid::new_v4();
        self.run_inner(run_id)
            .instrument(info_span!("sync_run", %run_id))
            .await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<SyncReport, SyncError> {
        let post_pass = PostPass::from_settings(&self.settings);
        let chunk_size = self.settings.chunk_size.max(1);
        let mut rate = RunRate::new(self.settings.rate_refresh);

        let mut offset: u64 = 0;
        let mut threshold: Option<DateTime<Utc>> = None;
        let mut last_written: Option<DateTime<Utc>> = None;
        let mut report = SyncReport {
            run_id,
            rows_seen: 0,
            pages: 0,
            inserted: 0,
            updated: 0,
            post_pass,
            stale_deleted: 0,
            stale_repriced: 0,
            threshold: DateTime::<Utc>::MIN_UTC,
        };

        loop {
            let range = SheetRange::for_page(
                &self.settings.left_column,
                &self.settings.right_column,
                self.settings.header_row_count,
                chunk_size,
                offset,
            );
            let raw = self
                .sheet
                .fetch(&range)
                .await
                .map_err(SyncError::SourceUnavailable)?;

            let rows = cast_page(&raw, range.start_row)?;
            if rows.is_empty() {
                debug!(range = %range, "source exhausted");
                break;
            }

            // Stamps never go backwards within a run, even if the clock does.
            let now = self.clock.now();
            let written_at = match last_written {
                Some(prev) if prev > now => prev,
                _ => now,
            };
            if threshold.is_none() {
                threshold = Some(self.anchor_threshold(rows[0].key, written_at).await?);
            }

            let multiplier = rate.get(self.rate.as_ref()).await?;
            let records: Vec<NewRecord> = rows.iter().map(|r| r.enrich(multiplier)).collect();
            let out = self
                .store
                .upsert_batch(&records, written_at)
                .await
                .map_err(SyncError::StoreWrite)?;
            last_written = Some(written_at);

            report.rows_seen += rows.len() as u64;
            report.pages += 1;
            report.inserted += out.inserted;
            report.updated += out.updated;
            debug!(
                range = %range,
                rows = rows.len(),
                inserted = out.inserted,
                updated = out.updated,
                "page upserted"
            );

            offset += u64::from(chunk_size);
        }

        // Empty source: everything stored is stale.
        let threshold = match threshold {
            Some(t) => t,
            None => self.clock.now(),
        };
        report.threshold = threshold;

        match post_pass {
            PostPass::DeleteStale => {
                report.stale_deleted = self.delete_stale(threshold).await?;
            }
            PostPass::RepriceStale => {
                report.stale_repriced = self.reprice_with(threshold, &mut rate).await?;
            }
            PostPass::None => {}
        }

        info!(
            rows_seen = report.rows_seen,
            pages = report.pages,
            inserted = report.inserted,
            updated = report.updated,
            post_pass = post_pass.as_str(),
            stale_deleted = report.stale_deleted,
            stale_repriced = report.stale_repriced,
            threshold = %threshold,
            "sync run complete"
        );
        Ok(report)
    }

    /// Threshold for this run, captured while the first page is being written.
    async fn anchor_threshold(
        &self,
        first_key: OrderKey,
        written_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, SyncError> {
        match self.settings.staleness_anchor {
            StalenessAnchor::CurrentRun => Ok(written_at),
            StalenessAnchor::PreviousRun => {
                let prior = self
                    .store
                    .get(first_key)
                    .await
                    .map_err(SyncError::StoreRead)?;
                Ok(prior.map(|r| r.updated_at).unwrap_or(written_at))
            }
        }
    }

    /// Remove every record last written before `threshold`.
    pub async fn delete_stale(&self, threshold: DateTime<Utc>) -> Result<u64, SyncError> {
        let n = self
            .store
            .delete_stale(threshold)
            .await
            .map_err(SyncError::StoreWrite)?;
        if n > 0 {
            warn!(deleted = n, threshold = %threshold, "stale orders deleted");
        }
        Ok(n)
    }

    /// Recompute `converted_price` of every record last written before
    /// `threshold`, in key order, `chunk_size` at a time.
    pub async fn reprice_stale(&self, threshold: DateTime<Utc>) -> Result<u64, SyncError> {
        let mut rate = RunRate::new(self.settings.rate_refresh);
        self.reprice_with(threshold, &mut rate).await
    }

    async fn reprice_with(
        &self,
        threshold: DateTime<Utc>,
        rate: &mut RunRate,
    ) -> Result<u64, SyncError> {
        let limit = self.settings.chunk_size.max(1);
        let mut after: Option<OrderKey> = None;
        let mut repriced: u64 = 0;

        loop {
            let batch = self
                .store
                .query_stale(threshold, after, limit)
                .await
                .map_err(SyncError::StoreRead)?;
            let last = match batch.last() {
                Some(r) => r.key,
                None => break,
            };
            if let Some(prev) = after {
                if last <= prev {
                    return Err(SyncError::StoreRead(StoreError::new(
                        "query_stale",
                        format!("keyset cursor did not advance past {prev}"),
                    )));
                }
            }

            let multiplier = rate.get(self.rate.as_ref()).await?;
            let prices: Vec<(OrderKey, f64)> = batch
                .iter()
                .map(|r| (r.key, r.original_price * multiplier))
                .collect();
            repriced += self
                .store
                .reprice_batch(&prices)
                .await
                .map_err(SyncError::StoreWrite)?;

            debug!(batch = batch.len(), last = %last, "stale batch repriced");
            after = Some(last);
        }

        if repriced > 0 {
            info!(repriced, threshold = %threshold, "stale orders repriced");
        }
        Ok(repriced)
    }
}
