//! sheetsync-reconcile
//!
//! Mirrors a paginated spreadsheet into the `orders` table:
//! - rows are cast strictly and enriched with the current currency rate
//! - each page is upserted as one atomic batch
//! - keys that disappeared from the sheet are deleted or repriced afterwards
//!
//! All IO goes through the `SheetSource`, `RateProvider`, `RecordStore` and
//! `Clock` traits; this crate owns no connections.

mod cast;
mod clock;
mod engine;
mod error;
mod types;

pub use cast::{cast_page, cast_row, DELIVERY_DATE_FORMAT};
pub use clock::{Clock, SystemClock};
pub use engine::Reconciler;
pub use error::SyncError;
pub use types::*;
