use sheetsync_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

/// scenario_unused_keys_warn_or_fail
///
/// Validates:
/// 1) A misspelled key is reported in WARN mode without error.
/// 2) The same key fails the load in FAIL mode.
/// 3) Every key the settings loader reads is considered consumed.

const FULL_YAML: &str = r#"
sync:
  chunk_size: 500
  header_row_count: 1
  left_column: A
  right_column: D
  delete_removed: true
  update_price_for_removed: false
  crawl_period_sec: 60
  staleness_anchor: current_run
  rate_refresh: per_page
sheet:
  spreadsheet_id: "abc"
  base_url: "https://sheets.googleapis.com"
  token_env: "SHEETSYNC_SHEETS_TOKEN"
rate:
  currency: USD
  feed_url: "https://www.cbr.ru/scripts/XML_daily.asp"
"#;

#[test]
fn full_config_is_clean() {
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .expect("every key in the full config is consumed");
    assert!(report.is_clean());
}

#[test]
fn warn_mode_reports_typo_without_error() {
    let overlay = r#"
sync:
  delete_remove: true
"#;
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML, overlay]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/sync/delete_remove".to_string()]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let overlay = r#"
extra:
  b: 2
  a: 1
"#;
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML, overlay]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS"), "got: {err}");
    assert!(err.contains("/extra/a"), "got: {err}");
}
