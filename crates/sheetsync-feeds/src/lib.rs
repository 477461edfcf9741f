//! sheetsync-feeds
//!
//! Read-side boundaries of the sync: the spreadsheet page source and the
//! currency-rate provider, plus one HTTP-backed implementation of each.
//!
//! This crate does **not** cast rows, compute prices or write to the DB;
//! the reconciler owns all of that.

pub mod rate;
pub mod sheet;

pub use rate::{parse_cbr_rate, CbrRateProvider, RateError, RateProvider};
pub use sheet::{GoogleSheetsSource, RawRow, SheetError, SheetRange, SheetSource};
