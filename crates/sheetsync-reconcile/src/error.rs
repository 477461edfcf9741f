use std::fmt;

use sheetsync_db::StoreError;
use sheetsync_feeds::{RateError, SheetError};

/// Run-fatal failure. The reconciler never retries; the driver decides.
#[derive(Debug)]
pub enum SyncError {
    /// The spreadsheet could not be read.
    SourceUnavailable(SheetError),
    /// A cell could not be cast. `row` is the 1-based sheet row.
    DataFormat {
        row: u64,
        field: &'static str,
        raw: String,
    },
    RateUnavailable(RateError),
    /// Upsert, reprice or delete failed; the failing batch is rolled back.
    StoreWrite(StoreError),
    /// Lookup or stale scan failed.
    StoreRead(StoreError),
}

impl SyncError {
    /// Short stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            SyncError::DataFormat { .. } => "DATA_FORMAT",
            SyncError::RateUnavailable(_) => "RATE_UNAVAILABLE",
            SyncError::StoreWrite(_) => "STORE_WRITE",
            SyncError::StoreRead(_) => "STORE_READ",
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::SourceUnavailable(e) => write!(f, "source unavailable: {e}"),
            SyncError::DataFormat { row, field, raw } => {
                write!(f, "data format error at sheet row {row}: {field}='{raw}'")
            }
            SyncError::RateUnavailable(e) => write!(f, "rate unavailable: {e}"),
            SyncError::StoreWrite(e) => write!(f, "store write failed: {e}"),
            SyncError::StoreRead(e) => write!(f, "store read failed: {e}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::SourceUnavailable(e) => Some(e),
            SyncError::RateUnavailable(e) => Some(e),
            SyncError::StoreWrite(e) | SyncError::StoreRead(e) => Some(e),
            SyncError::DataFormat { .. } => None,
        }
    }
}
