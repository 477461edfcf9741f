use sheetsync_db::OrderKey;
use sheetsync_reconcile::SyncError;
use sheetsync_testkit::{sheet_rows, stored, sync_settings, ts, Harness, ScriptedRate};
use std::sync::Arc;

#[tokio::test]
async fn store_write_failure_keeps_prior_pages_only() {
    let h = Harness::new(sheet_rows(4), 1.0);
    h.store.fail_on("upsert_batch", 2);

    let mut settings = sync_settings(2);
    settings.delete_removed = true;
    let err = h.reconciler(settings).run().await.unwrap_err();

    assert!(matches!(err, SyncError::StoreWrite(_)), "got {err:?}");
    assert_eq!(err.kind(), "STORE_WRITE");
    assert_eq!(h.store.len(), 2);
    assert!(h.store.record(OrderKey::new(3, 1003)).is_none());
    assert_eq!(h.store.calls("delete_stale"), 0);
}

#[tokio::test]
async fn rate_outage_aborts_before_any_write() {
    let mut h = Harness::new(sheet_rows(3), 1.0);
    h.rate = Arc::new(ScriptedRate::failing());

    let err = h.reconciler(sync_settings(10)).run().await.unwrap_err();
    assert!(matches!(err, SyncError::RateUnavailable(_)), "got {err:?}");
    assert!(h.store.is_empty());
    assert_eq!(h.store.calls("upsert_batch"), 0);
}

#[tokio::test]
async fn rate_outage_mid_run_keeps_committed_pages() {
    let mut h = Harness::new(sheet_rows(4), 1.0);
    h.rate = Arc::new(ScriptedRate::sequence(vec![Some(2.0), None]));

    let err = h.reconciler(sync_settings(2)).run().await.unwrap_err();
    assert!(matches!(err, SyncError::RateUnavailable(_)));
    assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn source_outage_is_fatal_and_skips_post_pass() {
    let h = Harness::new(sheet_rows(4), 1.0);
    h.store.seed([stored(50, 50, 1.0, 1.0, ts(8, 0, 0))]);
    h.sheet.fail_on_fetch(2);

    let mut settings = sync_settings(2);
    settings.delete_removed = true;
    let err = h.reconciler(settings).run().await.unwrap_err();

    assert!(matches!(err, SyncError::SourceUnavailable(_)), "got {err:?}");
    assert!(h.store.record(OrderKey::new(50, 50)).is_some());
    assert_eq!(h.store.calls("delete_stale"), 0);
}

#[tokio::test]
async fn failed_delete_surfaces_as_store_write() {
    let h = Harness::new(sheet_rows(1), 1.0);
    h.store.fail_on("delete_stale", 1);

    let mut settings = sync_settings(2);
    settings.delete_removed = true;
    let err = h.reconciler(settings).run().await.unwrap_err();
    assert!(matches!(err, SyncError::StoreWrite(_)));
}
