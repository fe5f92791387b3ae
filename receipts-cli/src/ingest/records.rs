//! Typed receipt records parsed from the export table

use calamine::{Data, DataType};
use chrono::{NaiveDateTime, Timelike};

use super::table::Table;
use crate::error::{ProcessError, Result};

/// Required input columns
pub mod columns {
    pub const PRODUCT: &str = "PRODUCTO";
    pub const WORK_ORDER: &str = "OT";
    pub const QUANTITY: &str = "UNID. DISP.";
    pub const RECEIPT_TIME: &str = "FECHA RECIBO";

    pub const REQUIRED: [&str; 4] = [PRODUCT, WORK_ORDER, QUANTITY, RECEIPT_TIME];
}

/// Text format of `FECHA RECIBO`
pub const RECEIPT_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Prefix carried by some work-order ids
pub const WORK_ORDER_PREFIX: &str = "OT-";

static EMPTY: Data = Data::Empty;

/// A coerced field value; failures keep the raw text
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Valid(T),
    Invalid(String),
}

impl<T: Copy> Parsed<T> {
    pub fn valid(&self) -> Option<T> {
        match self {
            Parsed::Valid(v) => Some(*v),
            Parsed::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Parsed::Valid(_))
    }
}

/// One row of the receipt export
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    pub product: String,
    /// Work order as it appears in the export, prefix included
    pub work_order: String,
    pub quantity: Parsed<f64>,
    pub receipt_time: Parsed<NaiveDateTime>,
}

impl InputRecord {
    /// Work order with the `OT-` prefix removed
    pub fn work_order_id(&self) -> &str {
        strip_work_order_prefix(&self.work_order)
    }
}

pub fn strip_work_order_prefix(work_order: &str) -> &str {
    work_order
        .strip_prefix(WORK_ORDER_PREFIX)
        .unwrap_or(work_order)
}

/// Parse every data row of `table` into records
///
/// Fails only when a required column is absent. Unparseable quantities and
/// receipt times are kept as [`Parsed::Invalid`].
pub fn load_records(table: &Table) -> Result<Vec<InputRecord>> {
    let missing: Vec<String> = columns::REQUIRED
        .iter()
        .filter(|name| table.column(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ProcessError::Schema { missing });
    }

    // Presence checked above
    let col = |name: &str| table.column(name).unwrap_or_default();
    let product_col = col(columns::PRODUCT);
    let work_order_col = col(columns::WORK_ORDER);
    let quantity_col = col(columns::QUANTITY);
    let time_col = col(columns::RECEIPT_TIME);

    let mut records = Vec::with_capacity(table.rows.len());
    for (idx, row) in table.rows.iter().enumerate() {
        let cell = |c: usize| row.get(c).unwrap_or(&EMPTY);

        let required = [product_col, work_order_col, quantity_col, time_col];
        if required.iter().all(|&c| is_blank(cell(c))) {
            continue;
        }

        let record = InputRecord {
            product: cell_text(cell(product_col)),
            work_order: cell_text(cell(work_order_col)),
            quantity: parse_quantity(cell(quantity_col)),
            receipt_time: parse_receipt_time(cell(time_col)),
        };

        if let Parsed::Invalid(raw) = &record.quantity {
            log::debug!("Row {}: unparseable quantity '{}'", idx + 2, raw);
        }
        if let Parsed::Invalid(raw) = &record.receipt_time {
            log::debug!("Row {}: unparseable receipt time '{}'", idx + 2, raw);
        }

        records.push(record);
    }

    Ok(records)
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        other => other.to_string(),
    }
}

fn parse_quantity(cell: &Data) -> Parsed<f64> {
    match cell {
        Data::Int(i) => Parsed::Valid(*i as f64),
        Data::Float(f) if f.is_finite() => Parsed::Valid(*f),
        Data::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Parsed::Valid(v),
            _ => Parsed::Invalid(s.clone()),
        },
        other => Parsed::Invalid(cell_text(other)),
    }
}

/// Receipt times are kept at whole-second precision, the resolution of the
/// persisted cutoff.
fn parse_receipt_time(cell: &Data) -> Parsed<NaiveDateTime> {
    match cell {
        Data::String(s) => match NaiveDateTime::parse_from_str(s.trim(), RECEIPT_TIME_FORMAT) {
            Ok(ts) => Parsed::Valid(ts),
            Err(_) => Parsed::Invalid(s.clone()),
        },
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(ts) => Parsed::Valid(ts.with_nanosecond(0).unwrap_or(ts)),
            None => Parsed::Invalid(cell_text(cell)),
        },
        other => Parsed::Invalid(cell_text(other)),
    }
}
