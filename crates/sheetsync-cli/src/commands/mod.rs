//! Command handler modules for the sheetsync CLI.
//!
//! Shared utilities used by multiple command paths live here.

pub mod sync;

use anyhow::Result;
use sheetsync_config::{report_unused_keys, LoadedConfig, Settings, UnusedKeyPolicy};
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse a CLI `--unused-keys` string into an [`UnusedKeyPolicy`].
pub fn parse_unused_key_policy(s: &str) -> Result<UnusedKeyPolicy> {
    match s.trim().to_ascii_lowercase().as_str() {
        "warn" => Ok(UnusedKeyPolicy::Warn),
        "fail" => Ok(UnusedKeyPolicy::Fail),
        other => anyhow::bail!("invalid --unused-keys '{}'. expected one of: warn | fail", other),
    }
}

/// Load layered YAML, check for unused keys, and build typed settings.
pub fn load_settings(paths: &[String], policy: UnusedKeyPolicy) -> Result<(LoadedConfig, Settings)> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = sheetsync_config::load_layered_yaml(&path_refs)?;

    let report = report_unused_keys(&loaded.config_json, policy)?;
    if !report.is_clean() {
        warn!(
            unused = ?report.unused_leaf_pointers,
            "config contains keys that nothing reads"
        );
    }

    let settings = loaded.settings()?;
    Ok((loaded, settings))
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn unused_key_policy_parses() {
        assert_eq!(parse_unused_key_policy("WARN").unwrap(), UnusedKeyPolicy::Warn);
        assert_eq!(parse_unused_key_policy("fail").unwrap(), UnusedKeyPolicy::Fail);
        assert!(parse_unused_key_policy("ignore").is_err());
    }
}
