//! scenario_config_hash_stable
//!
//! GREEN when:
//! - Loading the same YAML twice yields the same hash.
//! - Reordering keys does not change the hash.
//! - A changed value changes the hash.

use sheetsync_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
sync:
  chunk_size: 500
  left_column: A
  right_column: D
rate:
  currency: USD
"#;

const BASE_YAML_REORDERED: &str = r#"
rate:
  currency: USD
sync:
  right_column: D
  left_column: A
  chunk_size: 500
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex digest");
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn changed_value_changes_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let changed = BASE_YAML.replace("chunk_size: 500", "chunk_size: 501");
    let b = load_layered_yaml_from_strings(&[&changed]).unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}
