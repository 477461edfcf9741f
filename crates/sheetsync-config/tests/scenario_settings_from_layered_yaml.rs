//! scenario_settings_from_layered_yaml
//!
//! Validates:
//! 1) A base + overlay pair yields typed settings with overlay values winning.
//! 2) Optional knobs fall back to their defaults.
//! 3) Missing or malformed required keys fail with the dotted key name.
//! 4) Column bounds are validated (order and minimum span).
//! 5) Literal secrets in YAML are rejected before settings are built.

use sheetsync_config::{
    load_layered_yaml, load_layered_yaml_from_strings, RateRefresh, Settings, StalenessAnchor,
};

const BASE_YAML: &str = r#"
sync:
  chunk_size: 500
  header_row_count: 1
  left_column: A
  right_column: D
  delete_removed: "true"
  update_price_for_removed: "false"
  crawl_period_sec: 60
sheet:
  spreadsheet_id: "sheet-under-test"
rate:
  currency: usd
"#;

const OVERLAY_YAML: &str = r#"
sync:
  chunk_size: 50
  delete_removed: false
  update_price_for_removed: true
  staleness_anchor: previous_run
  rate_refresh: per_run
"#;

#[test]
fn base_only_uses_defaults_for_optional_knobs() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let s = loaded.settings().unwrap();

    assert_eq!(s.sync.chunk_size, 500);
    assert_eq!(s.sync.header_row_count, 1);
    assert_eq!(s.sync.left_column, "A");
    assert_eq!(s.sync.right_column, "D");
    assert!(s.sync.delete_removed);
    assert!(!s.sync.update_price_for_removed);
    assert_eq!(s.sync.crawl_period_sec, 60);
    assert_eq!(s.sync.staleness_anchor, StalenessAnchor::CurrentRun);
    assert_eq!(s.sync.rate_refresh, RateRefresh::PerPage);

    assert_eq!(s.sheet.spreadsheet_id, "sheet-under-test");
    assert_eq!(s.sheet.base_url, "https://sheets.googleapis.com");
    assert_eq!(s.sheet.token_env, None);

    assert_eq!(s.rate.currency, "USD", "currency is upper-cased");
    assert!(s.rate.feed_url.contains("cbr.ru"));
}

#[test]
fn overlay_overrides_base() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let s = loaded.settings().unwrap();

    assert_eq!(s.sync.chunk_size, 50);
    assert!(!s.sync.delete_removed);
    assert!(s.sync.update_price_for_removed);
    assert_eq!(s.sync.staleness_anchor, StalenessAnchor::PreviousRun);
    assert_eq!(s.sync.rate_refresh, RateRefresh::PerRun);
    // untouched by overlay
    assert_eq!(s.sync.left_column, "A");
}

#[test]
fn layered_files_on_disk_match_in_memory_load() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&overlay, OVERLAY_YAML).unwrap();

    let from_disk = load_layered_yaml(&[base.to_str().unwrap(), overlay.to_str().unwrap()]).unwrap();
    let from_mem = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_disk.config_hash, from_mem.config_hash);
}

#[test]
fn missing_required_key_names_the_key() {
    let yaml = BASE_YAML.replace("  chunk_size: 500\n", "");
    let loaded = load_layered_yaml_from_strings(&[&yaml]).unwrap();
    let err = loaded.settings().unwrap_err().to_string();
    assert!(err.contains("sync.chunk_size"), "got: {err}");
}

#[test]
fn non_numeric_chunk_size_is_rejected() {
    let yaml = BASE_YAML.replace("chunk_size: 500", "chunk_size: \"lots\"");
    let loaded = load_layered_yaml_from_strings(&[&yaml]).unwrap();
    let err = loaded.settings().unwrap_err().to_string();
    assert!(err.contains("sync.chunk_size"), "got: {err}");
}

#[test]
fn zero_chunk_size_is_rejected() {
    let yaml = BASE_YAML.replace("chunk_size: 500", "chunk_size: 0");
    let loaded = load_layered_yaml_from_strings(&[&yaml]).unwrap();
    assert!(loaded.settings().is_err());
}

#[test]
fn reversed_columns_are_rejected() {
    let yaml = BASE_YAML
        .replace("left_column: A", "left_column: F")
        .replace("right_column: D", "right_column: B");
    let loaded = load_layered_yaml_from_strings(&[&yaml]).unwrap();
    let err = loaded.settings().unwrap_err().to_string();
    assert!(err.contains("right_column"), "got: {err}");
}

#[test]
fn too_narrow_column_span_is_rejected() {
    let yaml = BASE_YAML.replace("right_column: D", "right_column: C");
    let loaded = load_layered_yaml_from_strings(&[&yaml]).unwrap();
    let err = loaded.settings().unwrap_err().to_string();
    assert!(err.contains("need at least 4"), "got: {err}");
}

#[test]
fn bad_currency_code_is_rejected() {
    let yaml = BASE_YAML.replace("currency: usd", "currency: dollars");
    let loaded = load_layered_yaml_from_strings(&[&yaml]).unwrap();
    assert!(loaded.settings().is_err());
}

#[test]
fn literal_token_in_yaml_is_rejected() {
    let overlay = r#"
sheet:
  token_env: "ya29.a0AfH6SMBx3-this-is-a-token"
"#;
    let err = load_layered_yaml_from_strings(&[BASE_YAML, overlay])
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_SECRET_DETECTED"), "got: {err}");
    assert!(!err.contains("ya29."), "secret value must not leak into the error");
}

#[test]
fn settings_round_trip_through_json_value() {
    let s = load_layered_yaml_from_strings(&[BASE_YAML])
        .unwrap()
        .settings()
        .unwrap();
    let v = serde_json::to_value(&s).unwrap();
    let back: Settings = serde_json::from_value(v).unwrap();
    assert_eq!(s, back);
}
