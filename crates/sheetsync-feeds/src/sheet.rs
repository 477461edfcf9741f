//! Spreadsheet page source.
//!
//! A source returns the raw cell text of one bounded row range. An empty page
//! means the data block is exhausted.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// One spreadsheet row as returned by the source, left to right.
pub type RawRow = Vec<String>;

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// A1-style rectangular range, both row bounds inclusive and 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    pub left_column: String,
    pub right_column: String,
    pub start_row: u64,
    pub end_row: u64,
}

impl SheetRange {
    /// Range of the page starting `offset` data rows below the header.
    ///
    /// `start = offset + header_row_count + 1`, `end = start + chunk_size - 1`.
    pub fn for_page(
        left_column: &str,
        right_column: &str,
        header_row_count: u32,
        chunk_size: u32,
        offset: u64,
    ) -> Self {
        let start_row = offset + u64::from(header_row_count) + 1;
        let end_row = start_row + u64::from(chunk_size.max(1)) - 1;
        Self {
            left_column: left_column.to_string(),
            right_column: right_column.to_string(),
            start_row,
            end_row,
        }
    }

    pub fn to_a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            self.left_column, self.start_row, self.right_column, self.end_row
        )
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SheetError {
    /// Network or transport failure.
    Transport(String),
    /// The API answered with a non-success status.
    Api { status: u16, message: String },
    /// The response body could not be decoded.
    Decode(String),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::Transport(msg) => write!(f, "sheet transport error: {msg}"),
            SheetError::Api { status, message } => {
                write!(f, "sheet api error status={status}: {message}")
            }
            SheetError::Decode(msg) => write!(f, "sheet decode error: {msg}"),
        }
    }
}

impl std::error::Error for SheetError {}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Paged access to the spreadsheet rows.
#[async_trait::async_trait]
pub trait SheetSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch every row inside `range`. Rows are returned in sheet order;
    /// blank rows may come back as empty vectors.
    async fn fetch(&self, range: &SheetRange) -> Result<Vec<RawRow>, SheetError>;
}

// ---------------------------------------------------------------------------
// Google Sheets (values API)
// ---------------------------------------------------------------------------

/// Google Sheets v4 `values.get` source.
///
/// Token acquisition is the caller's business; pass a ready bearer token or
/// `None` for a link-shared sheet. Do not log the token.
#[derive(Clone)]
pub struct GoogleSheetsSource {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    bearer_token: Option<String>,
}

impl fmt::Debug for GoogleSheetsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSheetsSource")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl GoogleSheetsSource {
    pub fn new(base_url: String, spreadsheet_id: String, bearer_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            spreadsheet_id,
            bearer_token,
        }
    }

    fn build_values_url(&self, range: &SheetRange) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url.trim_end_matches('/'),
            self.spreadsheet_id,
            range.to_a1()
        )
    }
}

#[async_trait::async_trait]
impl SheetSource for GoogleSheetsSource {
    fn name(&self) -> &'static str {
        "google_sheets"
    }

    async fn fetch(&self, range: &SheetRange) -> Result<Vec<RawRow>, SheetError> {
        let mut req = self
            .http
            .get(self.build_values_url(range))
            .query(&[("majorDimension", "ROWS")]);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SheetError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let body: ValueRangeResponse = resp
            .json()
            .await
            .map_err(|e| SheetError::Decode(e.to_string()))?;

        let rows: Vec<RawRow> = body
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();

        debug!(range = %range, rows = rows.len(), "sheet page fetched");
        Ok(rows)
    }
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    /// Absent when the range holds no data.
    values: Option<Vec<Vec<Value>>>,
}

/// Formatted values arrive as strings; unformatted ones may be numbers or bools.
fn cell_to_string(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Google error bodies look like `{"error": {"code": 403, "message": "..."}}`.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "unknown".to_string()
            } else {
                body.chars().take(200).collect()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_starts_below_header() {
        let r = SheetRange::for_page("A", "D", 1, 500, 0);
        assert_eq!(r.to_a1(), "A2:D501");
    }

    #[test]
    fn later_pages_advance_by_chunk() {
        let r = SheetRange::for_page("B", "E", 2, 100, 200);
        assert_eq!(r.start_row, 203);
        assert_eq!(r.end_row, 302);
        assert_eq!(r.to_string(), "B203:E302");
    }

    #[test]
    fn cells_are_stringified() {
        assert_eq!(cell_to_string(Value::from("10.5")), "10.5");
        assert_eq!(cell_to_string(Value::from(7)), "7");
        assert_eq!(cell_to_string(Value::Null), "");
    }

    #[test]
    fn api_error_message_prefers_structured_body() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission"}}"#;
        assert_eq!(api_error_message(body), "The caller does not have permission");
        assert_eq!(api_error_message(""), "unknown");
        assert_eq!(api_error_message("plain text"), "plain text");
    }

    #[test]
    fn debug_redacts_token() {
        let s = GoogleSheetsSource::new(
            "http://localhost".to_string(),
            "abc".to_string(),
            Some("token-value".to_string()),
        );
        let out = format!("{s:?}");
        assert!(!out.contains("token-value"));
    }
}
