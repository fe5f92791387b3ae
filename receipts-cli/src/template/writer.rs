//! Fill the ERP load template with aggregate rows

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::form::{Field, TemplateForm};
use crate::aggregate::AggregateRow;
use crate::error::{ProcessError, Result};

/// First data row (row 2 in the sheet)
pub const FIRST_DATA_ROW: u32 = 1;

/// Columns B..W are cleared before writing
pub const CLEARED_COLUMNS: RangeInclusive<u16> = 1..=22;

/// Warehouse entry concept written on every row
pub const CONCEPT_CODE: u64 = 10;

/// Supplier code written on every row
pub const SUPPLIER_CODE: u64 = 77757460;

const RECEIPT_DATE_FORMAT: &str = "%d/%m/%Y";

/// A template row derived from one aggregate group
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    /// 0-based position in the batch
    pub sequence_index: usize,
    pub folio: u64,
    pub product: String,
    pub work_order: String,
    pub quantity: f64,
    pub concept_code: u64,
    pub receipt_date: Option<NaiveDate>,
    pub supplier_code: u64,
}

/// Assign folios `start_folio..` to `rows` in emission order
pub fn output_rows(rows: &[AggregateRow], start_folio: u64) -> Vec<OutputRow> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| OutputRow {
            sequence_index: idx,
            folio: start_folio + idx as u64,
            product: row.product.clone(),
            work_order: row.work_order.clone(),
            quantity: row.total_quantity,
            concept_code: CONCEPT_CODE,
            receipt_date: row.earliest_receipt_time.map(|t| t.date()),
            supplier_code: SUPPLIER_CODE,
        })
        .collect()
}

/// Clear the data region of `form` and write `rows` from row 2 down
pub fn fill_form(form: &mut TemplateForm, rows: &[OutputRow]) {
    form.clear_region(FIRST_DATA_ROW, CLEARED_COLUMNS);

    for row in rows {
        let r = FIRST_DATA_ROW + row.sequence_index as u32;
        form.set(r, Field::Sequence, (row.sequence_index + 1) as u64);
        form.set(r, Field::Folio, row.folio);
        form.set(r, Field::Product, row.product.as_str());
        form.set(r, Field::Quantity, row.quantity);
        form.set(r, Field::WorkOrder, row.work_order.as_str());
        form.set(r, Field::ConceptCode, row.concept_code);
        if let Some(date) = row.receipt_date {
            form.set(r, Field::ReceiptDate, date.format(RECEIPT_DATE_FORMAT).to_string());
        }
        form.set(r, Field::SupplierCode, row.supplier_code);
    }
}

/// `<base>_<DD>_<MM>.xlsx`
pub fn output_path(base: &Path, reference_date: NaiveDate) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("_{}.xlsx", reference_date.format("%d_%m")));
    PathBuf::from(name)
}

/// Write `rows` into a copy of the template and return the output path
///
/// The document is written to `<output>.tmp` first and renamed, so the
/// final name only ever holds a complete file.
pub fn write_template(
    template: &Path,
    rows: &[AggregateRow],
    start_folio: u64,
    output_base: &Path,
    reference_date: NaiveDate,
) -> Result<PathBuf> {
    let mut form = TemplateForm::load(template)?;
    log::debug!(
        "Clearing template sheet '{}' rows 2..={}",
        form.sheet_name(),
        form.last_row().map_or(1, |r| r + 1)
    );
    let output_rows = output_rows(rows, start_folio);
    fill_form(&mut form, &output_rows);

    let output = output_path(output_base, reference_date);
    let bytes = form
        .to_xlsx_bytes()
        .map_err(|e| ProcessError::template(&output, e))?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ProcessError::template(parent, e))?;
        }
    }

    let mut tmp_name = output.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    fs::write(&tmp, bytes).map_err(|e| ProcessError::template(&tmp, e))?;
    fs::rename(&tmp, &output).map_err(|e| ProcessError::template(&output, e))?;

    log::info!(
        "Wrote {} rows (folios {}..{}) to {}",
        output_rows.len(),
        start_folio,
        start_folio + output_rows.len() as u64,
        output.display()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::form::CellValue;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%d/%m/%Y %H:%M:%S").unwrap()
    }

    fn group(product: &str, ot: &str, qty: f64, time: Option<&str>) -> AggregateRow {
        AggregateRow {
            product: product.to_string(),
            work_order: ot.to_string(),
            total_quantity: qty,
            earliest_receipt_time: time.map(ts),
            record_count: 1,
            had_invalid_quantity: false,
        }
    }

    fn write_template_file(path: &Path) {
        let mut form = TemplateForm::new("Carga");
        for (col, title) in ["N", "FOLIO", "FECHA", "CONCEPTO"].iter().enumerate() {
            form.set_cell(0, col as u16, (*title).into());
        }
        form.set_cell(0, 23, "OBS".into());
        // Leftovers from a previous load
        form.set_cell(1, 1, CellValue::Number(1.0));
        form.set_cell(6, 20, "OLD".into());
        form.set_cell(6, 23, "note".into());
        std::fs::write(path, form.to_xlsx_bytes().unwrap()).unwrap();
    }

    #[test]
    fn test_output_rows_assign_consecutive_folios() {
        let rows = output_rows(
            &[
                group("P2", "002", 2.0, Some("01/01/2024 09:00:00")),
                group("P1", "001", 8.0, Some("01/01/2024 10:00:00")),
            ],
            1000,
        );
        assert_eq!(rows[0].folio, 1000);
        assert_eq!(rows[1].folio, 1001);
        assert_eq!(rows[1].sequence_index, 1);
        assert_eq!(rows[0].concept_code, 10);
        assert_eq!(rows[0].supplier_code, 77757460);
        assert_eq!(rows[0].receipt_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_output_path_pattern() {
        let path = output_path(
            Path::new("./Plantilla/CARGA_PT"),
            NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
        );
        assert_eq!(path, PathBuf::from("./Plantilla/CARGA_PT_07_03.xlsx"));
    }

    #[test]
    fn test_write_template_fills_fixed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("Plantilla_ERP.xlsx");
        write_template_file(&template);

        let output = write_template(
            &template,
            &[
                group("P2", "002", 2.0, Some("01/01/2024 09:00:00")),
                group("P1", "001", 8.0, Some("01/01/2024 10:00:00")),
            ],
            1000,
            &dir.path().join("out").join("CARGA_PT"),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap();

        assert_eq!(output, dir.path().join("out").join("CARGA_PT_01_01.xlsx"));
        assert!(!dir.path().join("out").join("CARGA_PT_01_01.xlsx.tmp").exists());

        let form = TemplateForm::load(&output).unwrap();
        assert_eq!(form.sheet_name(), "Carga");
        assert_eq!(form.get(0, 1), Some(&CellValue::Text("FOLIO".into())));
        assert_eq!(form.get(0, 23), Some(&CellValue::Text("OBS".into())));

        assert_eq!(form.get(1, 0), Some(&CellValue::Number(1.0)));
        assert_eq!(form.get(1, 1), Some(&CellValue::Number(1000.0)));
        assert_eq!(form.get(1, 2), Some(&CellValue::Text("01/01/2024".into())));
        assert_eq!(form.get(1, 3), Some(&CellValue::Number(10.0)));
        assert_eq!(form.get(1, 5), Some(&CellValue::Number(77757460.0)));
        assert_eq!(form.get(1, 14), Some(&CellValue::Text("002".into())));
        assert_eq!(form.get(1, 20), Some(&CellValue::Text("P2".into())));
        assert_eq!(form.get(1, 22), Some(&CellValue::Number(2.0)));

        assert_eq!(form.get(2, 1), Some(&CellValue::Number(1001.0)));
        assert_eq!(form.get(2, 20), Some(&CellValue::Text("P1".into())));
        assert_eq!(form.get(2, 22), Some(&CellValue::Number(8.0)));

        // Stale data region cleared, outside columns kept
        assert_eq!(form.get(6, 20), None);
        assert_eq!(form.get(6, 23), Some(&CellValue::Text("note".into())));
    }

    #[test]
    fn test_write_template_keeps_other_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("Plantilla_ERP.xlsx");
        let mut form = TemplateForm::new("Carga");
        form.set_cell(0, 1, "FOLIO".into());
        form.add_sheet("Conceptos", false);
        form.add_sheet("Proveedores", true);
        std::fs::write(&template, form.to_xlsx_bytes().unwrap()).unwrap();

        let output = write_template(
            &template,
            &[group("P1", "001", 8.0, Some("01/01/2024 10:00:00"))],
            1000,
            &dir.path().join("CARGA_PT"),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap();

        let written = TemplateForm::load(&output).unwrap();
        assert_eq!(written.sheet_names(), vec!["Carga", "Conceptos", "Proveedores"]);
        assert!(written.is_hidden("Proveedores"));
        assert_eq!(written.get(1, 1), Some(&CellValue::Number(1000.0)));
    }

    #[test]
    fn test_missing_receipt_date_leaves_cell_blank() {
        let mut form = TemplateForm::new("Carga");
        let rows = output_rows(&[group("P1", "1", 1.0, None)], 1000);
        fill_form(&mut form, &rows);
        assert_eq!(form.get(1, Field::ReceiptDate.column()), None);
        assert_eq!(form.get(1, Field::Product.column()), Some(&CellValue::Text("P1".into())));
    }

    #[test]
    fn test_missing_template_is_template_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_template(
            &dir.path().join("missing.xlsx"),
            &[group("P1", "1", 1.0, None)],
            1000,
            &dir.path().join("CARGA_PT"),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(matches!(result, Err(ProcessError::Template { .. })));
        assert!(!dir.path().join("CARGA_PT_01_01.xlsx").exists());
    }
}
