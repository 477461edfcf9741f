// Strict cell casting. A page either casts completely or not at all.

use chrono::NaiveDate;
use sheetsync_db::OrderKey;
use sheetsync_feeds::RawRow;

use crate::error::SyncError;
use crate::types::Row;

/// Day.month.year, e.g. `17.05.2024`.
pub const DELIVERY_DATE_FORMAT: &str = "%d.%m.%Y";

const ROW_INDEX: usize = 0;
const ORDER_ID: usize = 1;
const PRICE: usize = 2;
const DELIVERY_DATE: usize = 3;

/// Cast every non-blank row of a page.
///
/// `first_sheet_row` is the 1-based sheet row of `rows[0]`; error positions
/// are reported in sheet rows so operators can find the cell.
pub fn cast_page(rows: &[RawRow], first_sheet_row: u64) -> Result<Vec<Row>, SyncError> {
    let mut out = Vec::with_capacity(rows.len());
    for (i, raw) in rows.iter().enumerate() {
        if raw.is_empty() {
            continue;
        }
        out.push(cast_row(raw, first_sheet_row + i as u64)?);
    }
    Ok(out)
}

/// Cast one row. Cells past the fourth are ignored.
pub fn cast_row(raw: &RawRow, sheet_row: u64) -> Result<Row, SyncError> {
    let cell = |idx: usize, field: &'static str| -> Result<&str, SyncError> {
        raw.get(idx)
            .map(|s| s.trim())
            .ok_or_else(|| data_format(sheet_row, field, ""))
    };

    let row_index = parse_int(cell(ROW_INDEX, "row_index")?, sheet_row, "row_index")?;
    let order_id = parse_int(cell(ORDER_ID, "order_id")?, sheet_row, "order_id")?;

    let price_raw = cell(PRICE, "price")?;
    let original_price: f64 = price_raw
        .parse()
        .map_err(|_| data_format(sheet_row, "price", price_raw))?;
    if !original_price.is_finite() || original_price < 0.0 {
        return Err(data_format(sheet_row, "price", price_raw));
    }

    let date_raw = cell(DELIVERY_DATE, "delivery_date")?;
    let delivery_date = NaiveDate::parse_from_str(date_raw, DELIVERY_DATE_FORMAT)
        .map_err(|_| data_format(sheet_row, "delivery_date", date_raw))?;

    Ok(Row {
        key: OrderKey::new(row_index, order_id),
        original_price,
        delivery_date,
    })
}

fn parse_int(s: &str, sheet_row: u64, field: &'static str) -> Result<i64, SyncError> {
    s.parse::<i64>().map_err(|_| data_format(sheet_row, field, s))
}

fn data_format(row: u64, field: &'static str, raw: &str) -> SyncError {
    SyncError::DataFormat {
        row,
        field,
        raw: raw.to_string(),
    }
}
