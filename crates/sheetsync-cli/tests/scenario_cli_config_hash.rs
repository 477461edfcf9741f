use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const BASE: &str = r#"
sync:
  chunk_size: 500
  header_row_count: 1
  left_column: A
  right_column: D
  delete_removed: true
  update_price_for_removed: false
  crawl_period_sec: 60
sheet:
  spreadsheet_id: "sheet-under-test"
rate:
  currency: USD
"#;

#[test]
fn config_hash_prints_hash_and_canonical_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let base = dir.path().join("base.yaml");
    std::fs::write(&base, BASE)?;

    Command::cargo_bin("sheetsync")?
        .arg("config-hash")
        .arg(&base)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("config_hash="))
        .stdout(predicate::str::contains("\"chunk_size\":500"));

    Ok(())
}

#[test]
fn shipped_base_config_parses() -> anyhow::Result<()> {
    let base = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("base.yaml");

    Command::cargo_bin("sheetsync")?
        .arg("config-hash")
        .arg(&base)
        .assert()
        .success();

    Ok(())
}

#[test]
fn literal_secret_in_config_is_refused() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let base = dir.path().join("base.yaml");
    std::fs::write(&base, format!("{BASE}\nextra:\n  token: \"ya29.abcdef\"\n"))?;

    Command::cargo_bin("sheetsync")?
        .arg("config-hash")
        .arg(&base)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("ya29.abcdef").not());

    Ok(())
}
