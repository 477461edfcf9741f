//! Typed settings built from the merged config JSON.
//!
//! All reads go through JSON pointers listed in `CONSUMED_POINTERS`; errors
//! name the dotted key so operators can find it in their YAML.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_RATE_FEED_URL: &str = "https://www.cbr.ru/scripts/XML_daily.asp";

/// Minimum number of columns a page must span: row index, order id, price, delivery date.
pub const MIN_COLUMN_SPAN: u32 = 4;

/// Which timestamp marks a stored order as "removed from the sheet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalenessAnchor {
    /// Write time stamped on the first page of the current run.
    CurrentRun,
    /// `updated_at` the first sheet row carried before the current run wrote it.
    PreviousRun,
}

impl StalenessAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StalenessAnchor::CurrentRun => "current_run",
            StalenessAnchor::PreviousRun => "previous_run",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current_run" => Ok(StalenessAnchor::CurrentRun),
            "previous_run" => Ok(StalenessAnchor::PreviousRun),
            other => Err(anyhow!(
                "invalid sync.staleness_anchor '{}'. expected one of: current_run | previous_run",
                other
            )),
        }
    }
}

/// How often the currency rate is fetched during one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateRefresh {
    /// One fetch per ingested page and per reprice batch.
    PerPage,
    /// One fetch per run, reused by every page and batch.
    PerRun,
}

impl RateRefresh {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateRefresh::PerPage => "per_page",
            RateRefresh::PerRun => "per_run",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_page" => Ok(RateRefresh::PerPage),
            "per_run" => Ok(RateRefresh::PerRun),
            other => Err(anyhow!(
                "invalid sync.rate_refresh '{}'. expected one of: per_page | per_run",
                other
            )),
        }
    }
}

/// Knobs consumed by the reconciler itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Rows requested per page; also the reprice batch size.
    pub chunk_size: u32,
    /// Rows above the data block (titles, column headers).
    pub header_row_count: u32,
    pub left_column: String,
    pub right_column: String,
    pub delete_removed: bool,
    pub update_price_for_removed: bool,
    /// Sleep between runs. Owned by the driver loop, not the reconciler.
    pub crawl_period_sec: u64,
    pub staleness_anchor: StalenessAnchor,
    pub rate_refresh: RateRefresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSettings {
    pub spreadsheet_id: String,
    pub base_url: String,
    /// Name of the env var holding the bearer token, if the sheet needs one.
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSettings {
    /// ISO 4217 code looked up in the rate feed (e.g. `USD`).
    pub currency: String,
    pub feed_url: String,
}

/// Immutable settings handed to every component at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub sync: SyncSettings,
    pub sheet: SheetSettings,
    pub rate: RateSettings,
}

impl Settings {
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let chunk_size = read_u64(cfg, "/sync/chunk_size")?;
        if chunk_size == 0 || chunk_size > u64::from(u32::MAX) {
            bail!("sync.chunk_size must be in 1..={} (got {chunk_size})", u32::MAX);
        }
        let header_row_count = read_u64(cfg, "/sync/header_row_count")?;
        let header_row_count = u32::try_from(header_row_count)
            .map_err(|_| anyhow!("sync.header_row_count too large: {header_row_count}"))?;

        let left_column = read_str(cfg, "/sync/left_column")?.to_ascii_uppercase();
        let right_column = read_str(cfg, "/sync/right_column")?.to_ascii_uppercase();
        let left_n = column_to_number(&left_column)
            .with_context(|| format!("invalid sync.left_column '{left_column}'"))?;
        let right_n = column_to_number(&right_column)
            .with_context(|| format!("invalid sync.right_column '{right_column}'"))?;
        if right_n < left_n {
            bail!("sync.right_column '{right_column}' is left of sync.left_column '{left_column}'");
        }
        if right_n - left_n + 1 < MIN_COLUMN_SPAN {
            bail!(
                "sync columns {left_column}:{right_column} span {} column(s); need at least {MIN_COLUMN_SPAN} \
                 (row index, order id, price, delivery date)",
                right_n - left_n + 1
            );
        }

        let staleness_anchor = match cfg.pointer("/sync/staleness_anchor") {
            None | Some(Value::Null) => StalenessAnchor::CurrentRun,
            Some(_) => StalenessAnchor::parse(read_str(cfg, "/sync/staleness_anchor")?)?,
        };
        let rate_refresh = match cfg.pointer("/sync/rate_refresh") {
            None | Some(Value::Null) => RateRefresh::PerPage,
            Some(_) => RateRefresh::parse(read_str(cfg, "/sync/rate_refresh")?)?,
        };

        let sync = SyncSettings {
            chunk_size: chunk_size as u32,
            header_row_count,
            left_column,
            right_column,
            delete_removed: read_bool(cfg, "/sync/delete_removed")?,
            update_price_for_removed: read_bool(cfg, "/sync/update_price_for_removed")?,
            crawl_period_sec: read_u64(cfg, "/sync/crawl_period_sec")?,
            staleness_anchor,
            rate_refresh,
        };

        let sheet = SheetSettings {
            spreadsheet_id: read_str(cfg, "/sheet/spreadsheet_id")?.to_string(),
            base_url: read_opt_str(cfg, "/sheet/base_url")
                .unwrap_or_else(|| DEFAULT_SHEETS_BASE_URL.to_string()),
            token_env: read_opt_str(cfg, "/sheet/token_env"),
        };

        let currency = read_str(cfg, "/rate/currency")?.to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            bail!("rate.currency must be a 3-letter code (got '{currency}')");
        }
        let rate = RateSettings {
            currency,
            feed_url: read_opt_str(cfg, "/rate/feed_url")
                .unwrap_or_else(|| DEFAULT_RATE_FEED_URL.to_string()),
        };

        Ok(Settings { sync, sheet, rate })
    }
}

/// Convert a spreadsheet column label to its 1-based number (`A` = 1, `AA` = 27).
pub fn column_to_number(label: &str) -> Result<u32> {
    let label = label.trim();
    if label.is_empty() || label.len() > 3 {
        bail!("column label must be 1..=3 letters");
    }
    let mut n: u32 = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            bail!("column label must contain letters only");
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        n = n * 26 + digit;
    }
    Ok(n)
}

fn pointer_to_key(pointer: &str) -> String {
    pointer.trim_start_matches('/').replace('/', ".")
}

fn read_str<'a>(cfg: &'a Value, pointer: &str) -> Result<&'a str> {
    let s = cfg
        .pointer(pointer)
        .and_then(Value::as_str)
        .with_context(|| format!("config missing {} (string)", pointer_to_key(pointer)))?;
    if s.trim().is_empty() {
        bail!("config {} must not be blank", pointer_to_key(pointer));
    }
    Ok(s.trim())
}

fn read_opt_str(cfg: &Value, pointer: &str) -> Option<String> {
    let s = cfg.pointer(pointer)?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Accepts a YAML integer or a numeric string.
fn read_u64(cfg: &Value, pointer: &str) -> Result<u64> {
    let key = pointer_to_key(pointer);
    match cfg.pointer(pointer) {
        Some(Value::Number(n)) => n
            .as_u64()
            .with_context(|| format!("config {key} must be a non-negative integer (got {n})")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .with_context(|| format!("config {key} could not be cast to integer: '{s}'")),
        Some(other) => Err(anyhow!("config {key} must be an integer (got {other})")),
        None => Err(anyhow!("config missing {key}")),
    }
}

/// Accepts a YAML bool, or `true`/`1` (case-insensitive) as a string or number.
/// Any other string is `false`.
fn read_bool(cfg: &Value, pointer: &str) -> Result<bool> {
    let key = pointer_to_key(pointer);
    match cfg.pointer(pointer) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => Ok(matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1")),
        Some(Value::Number(n)) => Ok(n.as_u64() == Some(1)),
        Some(other) => Err(anyhow!("config {key} must be a boolean (got {other})")),
        None => Err(anyhow!("config missing {key}")),
    }
}
