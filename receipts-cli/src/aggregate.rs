//! Grouping of new receipts by product and work order

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::ingest::InputRecord;

/// One output group
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub product: String,
    /// Work order with the prefix stripped
    pub work_order: String,
    /// Sum of the parseable quantities; unparseable ones add zero
    pub total_quantity: f64,
    /// `None` when no record in the group has a parseable receipt time
    pub earliest_receipt_time: Option<NaiveDateTime>,
    pub record_count: usize,
    pub had_invalid_quantity: bool,
}

#[derive(Default)]
struct GroupAcc {
    quantities: Vec<f64>,
    earliest: Option<NaiveDateTime>,
    record_count: usize,
    had_invalid_quantity: bool,
}

/// Group `records` by `(product, work_order)` and emit rows in folio order
///
/// Emission order: ascending earliest receipt time (groups without one last),
/// then product, then work order. Since groups are keyed by the last two,
/// the order is total and independent of input order.
pub fn aggregate(records: &[InputRecord]) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<(String, String), GroupAcc> = BTreeMap::new();

    for record in records {
        let key = (record.product.clone(), record.work_order_id().to_string());
        let acc = groups.entry(key).or_default();

        acc.record_count += 1;
        match record.quantity.valid() {
            Some(q) => acc.quantities.push(q),
            None => acc.had_invalid_quantity = true,
        }
        if let Some(t) = record.receipt_time.valid() {
            acc.earliest = Some(acc.earliest.map_or(t, |e| e.min(t)));
        }
    }

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|((product, work_order), mut acc)| {
            // Fixed summation order keeps float totals input-order independent
            acc.quantities.sort_by(f64::total_cmp);
            AggregateRow {
                product,
                work_order,
                total_quantity: acc.quantities.iter().sum(),
                earliest_receipt_time: acc.earliest,
                record_count: acc.record_count,
                had_invalid_quantity: acc.had_invalid_quantity,
            }
        })
        .collect();

    rows.sort_by(emission_order);

    for row in rows.iter().filter(|r| r.had_invalid_quantity) {
        log::warn!(
            "Group {} / {} had unparseable quantities; counted as zero",
            row.product,
            row.work_order
        );
    }

    rows
}

fn emission_order(a: &AggregateRow, b: &AggregateRow) -> Ordering {
    let by_time = match (a.earliest_receipt_time, b.earliest_receipt_time) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_time
        .then_with(|| a.product.cmp(&b.product))
        .then_with(|| a.work_order.cmp(&b.work_order))
}
