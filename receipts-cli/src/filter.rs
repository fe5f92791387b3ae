//! Incremental selection of records newer than the stored cutoff

use chrono::NaiveDateTime;

use crate::ingest::InputRecord;

/// Records received strictly after `cutoff`
///
/// With no cutoff (first run) every record is returned unchanged. Otherwise
/// records with an unparseable receipt time are dropped since they cannot be
/// ordered against the cutoff.
pub fn filter_new(records: &[InputRecord], cutoff: Option<NaiveDateTime>) -> Vec<InputRecord> {
    match cutoff {
        None => records.to_vec(),
        Some(cutoff) => records
            .iter()
            .filter(|r| r.receipt_time.valid().is_some_and(|t| t > cutoff))
            .cloned()
            .collect(),
    }
}

/// Latest parseable receipt time in the full, unfiltered load
pub fn max_receipt_time(records: &[InputRecord]) -> Option<NaiveDateTime> {
    records.iter().filter_map(|r| r.receipt_time.valid()).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::records::{Parsed, RECEIPT_TIME_FORMAT};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, RECEIPT_TIME_FORMAT).unwrap()
    }

    fn record(product: &str, time: Option<&str>) -> InputRecord {
        InputRecord {
            product: product.to_string(),
            work_order: "OT-1".to_string(),
            quantity: Parsed::Valid(1.0),
            receipt_time: match time {
                Some(t) => Parsed::Valid(ts(t)),
                None => Parsed::Invalid("??".to_string()),
            },
        }
    }

    #[test]
    fn test_no_cutoff_returns_everything() {
        let records = vec![
            record("A", Some("01/01/2024 10:00:00")),
            record("B", None),
            record("C", Some("31/12/2023 23:59:59")),
        ];
        assert_eq!(filter_new(&records, None), records);
    }

    #[test]
    fn test_cutoff_is_strictly_greater() {
        let records = vec![
            record("before", Some("01/01/2024 10:59:59")),
            record("equal", Some("01/01/2024 11:00:00")),
            record("after", Some("01/01/2024 11:00:01")),
        ];
        let new = filter_new(&records, Some(ts("01/01/2024 11:00:00")));
        let products: Vec<_> = new.iter().map(|r| r.product.as_str()).collect();
        assert_eq!(products, vec!["after"]);
    }

    #[test]
    fn test_unparseable_time_excluded_with_cutoff() {
        let records = vec![record("bad", None), record("good", Some("02/01/2024 08:00:00"))];
        let new = filter_new(&records, Some(ts("01/01/2024 00:00:00")));
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].product, "good");
    }

    #[test]
    fn test_filter_does_not_mutate_input() {
        let records = vec![record("A", Some("01/01/2024 10:00:00"))];
        let copy = records.clone();
        let _ = filter_new(&records, Some(ts("02/01/2024 00:00:00")));
        assert_eq!(records, copy);
    }

    #[test]
    fn test_max_receipt_time_ignores_invalid() {
        let records = vec![
            record("A", Some("01/01/2024 10:00:00")),
            record("B", None),
            record("C", Some("01/01/2024 11:00:00")),
        ];
        assert_eq!(max_receipt_time(&records), Some(ts("01/01/2024 11:00:00")));
        assert_eq!(max_receipt_time(&[record("B", None)]), None);
        assert_eq!(max_receipt_time(&[]), None);
    }
}
