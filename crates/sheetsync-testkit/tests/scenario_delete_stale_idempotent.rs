use sheetsync_db::OrderKey;
use sheetsync_testkit::{sheet_rows, sync_settings, Harness};

#[tokio::test]
async fn removed_row_is_deleted_once() {
    let h = Harness::new(sheet_rows(3), 90.0);
    let mut settings = sync_settings(2);
    settings.delete_removed = true;

    let first = h.reconciler(settings.clone()).run().await.unwrap();
    assert_eq!(first.stale_deleted, 0);
    assert_eq!(h.store.len(), 3);

    // Row 3 disappears from the sheet.
    h.sheet.set_data(1, sheet_rows(2));
    let rec = h.reconciler(settings);
    let second = rec.run().await.unwrap();
    assert_eq!(second.stale_deleted, 1);
    assert!(h.store.record(OrderKey::new(3, 1003)).is_none());
    assert_eq!(h.store.len(), 2);

    // Same threshold again: nothing left to delete, no error.
    assert_eq!(rec.delete_stale(second.threshold).await.unwrap(), 0);
    assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn delete_wins_when_both_flags_are_set() {
    let h = Harness::new(sheet_rows(2), 90.0);
    let mut settings = sync_settings(10);
    settings.delete_removed = true;
    settings.update_price_for_removed = true;

    h.reconciler(settings.clone()).run().await.unwrap();
    h.sheet.set_data(1, sheet_rows(1));
    let report = h.reconciler(settings).run().await.unwrap();

    assert_eq!(report.stale_deleted, 1);
    assert_eq!(report.stale_repriced, 0);
    assert_eq!(h.store.calls("reprice_batch"), 0);
}
