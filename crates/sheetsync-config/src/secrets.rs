//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (e.g. `sheet.token_env:
//! "SHEETSYNC_SHEETS_TOKEN"`). Callers resolve once at startup and pass the
//! result into constructors. Error messages reference the NAME, never the value.

use anyhow::{bail, Result};

use crate::settings::Settings;

/// Env var consulted when `sheet.token_env` is not configured.
pub const DEFAULT_SHEETS_TOKEN_ENV: &str = "SHEETSYNC_SHEETS_TOKEN";

/// Secrets resolved from the environment. **Values are redacted in `Debug` output.**
#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    /// Bearer token for the spreadsheet API. `None` for public sheets.
    pub sheets_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "sheets_token",
                &self.sheets_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve a named environment variable.
/// Returns `None` if the variable is unset or its value is blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Resolve secrets for the given settings.
///
/// - `sheet.token_env` set: that variable is **required**.
/// - `sheet.token_env` unset: [`DEFAULT_SHEETS_TOKEN_ENV`] is used if present,
///   otherwise requests go out unauthenticated.
pub fn resolve_secrets(settings: &Settings) -> Result<ResolvedSecrets> {
    let sheets_token = match settings.sheet.token_env.as_deref() {
        Some(name) => match resolve_env(name) {
            Some(v) => Some(v),
            None => bail!(
                "SECRETS_MISSING: required env var '{}' (sheet.token_env) is not set or empty",
                name
            ),
        },
        None => resolve_env(DEFAULT_SHEETS_TOKEN_ENV),
    };

    Ok(ResolvedSecrets { sheets_token })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let s = ResolvedSecrets {
            sheets_token: Some("super-secret".to_string()),
        };
        let out = format!("{s:?}");
        assert!(out.contains("<REDACTED>"));
        assert!(!out.contains("super-secret"));
    }
}
