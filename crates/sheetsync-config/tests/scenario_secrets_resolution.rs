//! scenario_secrets_resolution
//!
//! Failure tests use sentinel env var names that are never set anywhere, so
//! no test mutates the process environment.

use sheetsync_config::{load_layered_yaml_from_strings, resolve_secrets};

fn settings_with_token_env(token_env: Option<&str>) -> sheetsync_config::Settings {
    let mut yaml = String::from(
        r#"
sync:
  chunk_size: 10
  header_row_count: 0
  left_column: A
  right_column: D
  delete_removed: false
  update_price_for_removed: false
  crawl_period_sec: 1
rate:
  currency: USD
sheet:
  spreadsheet_id: "abc"
"#,
    );
    if let Some(name) = token_env {
        yaml.push_str(&format!("  token_env: \"{name}\"\n"));
    }
    load_layered_yaml_from_strings(&[&yaml])
        .unwrap()
        .settings()
        .unwrap()
}

#[test]
fn configured_token_env_is_required() {
    let s = settings_with_token_env(Some("SHEETSYNC_SENTINEL_TOKEN_MISSING_Q7"));
    let err = resolve_secrets(&s).unwrap_err().to_string();
    assert!(err.contains("SECRETS_MISSING"), "got: {err}");
    assert!(
        err.contains("SHEETSYNC_SENTINEL_TOKEN_MISSING_Q7"),
        "error names the env var: {err}"
    );
}

#[test]
fn configured_token_env_is_resolved_from_path_like_var() {
    // PATH is set in every test environment; only presence is asserted.
    let s = settings_with_token_env(Some("PATH"));
    let resolved = resolve_secrets(&s).unwrap();
    assert!(resolved.sheets_token.is_some());
    assert!(format!("{resolved:?}").contains("<REDACTED>"));
}
