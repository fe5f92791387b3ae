//! Cell-addressed template form
//!
//! The ERP template is read with calamine into a sparse cell map, edited
//! through named [`Field`]s and written back out with rust_xlsxwriter.
//! Values, sheet names and order, sheet visibility and every cell outside the
//! cleared region survive the round trip; cell styling does not.

use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;
use std::path::Path;

use calamine::{Data, Range, Reader, SheetVisible, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::{ProcessError, Result};

/// Output fields and their fixed template columns (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Column A, 1-based row sequence
    Sequence,
    /// Column B
    Folio,
    /// Column C, `DD/MM/YYYY`
    ReceiptDate,
    /// Column D, warehouse entry concept
    ConceptCode,
    /// Column F
    SupplierCode,
    /// Column O, production order
    WorkOrder,
    /// Column U
    Product,
    /// Column W
    Quantity,
}

impl Field {
    pub const fn column(self) -> u16 {
        match self {
            Field::Sequence => 0,
            Field::Folio => 1,
            Field::ReceiptDate => 2,
            Field::ConceptCode => 3,
            Field::SupplierCode => 5,
            Field::WorkOrder => 14,
            Field::Product => 20,
            Field::Quantity => 22,
        }
    }
}

/// A cell value held by the form
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Spreadsheet date serial
    DateTime(f64),
}

impl CellValue {
    fn from_data(data: &Data) -> Option<Self> {
        match data {
            Data::Empty => None,
            Data::String(s) => Some(CellValue::Text(s.clone())),
            Data::Int(i) => Some(CellValue::Number(*i as f64)),
            Data::Float(f) => Some(CellValue::Number(*f)),
            Data::Bool(b) => Some(CellValue::Bool(*b)),
            Data::DateTime(dt) => Some(CellValue::DateTime(dt.as_f64())),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
            Data::Error(_) => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<u64> for CellValue {
    fn from(n: u64) -> Self {
        CellValue::Number(n as f64)
    }
}

/// One worksheet as a sparse grid, 0-based `(row, col)`
#[derive(Debug, Clone, Default)]
struct FormSheet {
    name: String,
    hidden: bool,
    cells: BTreeMap<(u32, u16), CellValue>,
}

impl FormSheet {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn from_range(name: String, range: &Range<Data>, hidden: bool) -> Self {
        let mut sheet = Self {
            name,
            hidden,
            cells: BTreeMap::new(),
        };
        // Range positions are relative to the first used cell
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
        for (row, col, data) in range.cells() {
            if let Some(value) = CellValue::from_data(data) {
                let row = row_offset + row as u32;
                let col = (col_offset + col as u32) as u16;
                sheet.cells.insert((row, col), value);
            }
        }
        sheet
    }

    fn write_to(
        &self,
        workbook: &mut Workbook,
        date_format: &Format,
    ) -> std::result::Result<(), XlsxError> {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.name)?;
        if self.hidden {
            worksheet.set_hidden(true);
        }

        for (&(row, col), value) in &self.cells {
            match value {
                CellValue::Text(s) => {
                    worksheet.write_string(row, col, s)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(row, col, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                CellValue::DateTime(serial) => {
                    worksheet.write_number_with_format(row, col, *serial, date_format)?;
                }
            }
        }
        Ok(())
    }
}

/// A template workbook; edits go to its first sheet
///
/// Every other worksheet is carried through to the output unchanged, in
/// order and with its visibility.
#[derive(Debug, Clone, Default)]
pub struct TemplateForm {
    data: FormSheet,
    others: Vec<FormSheet>,
}

impl TemplateForm {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            data: FormSheet::new(sheet_name),
            others: Vec::new(),
        }
    }

    /// Load every worksheet of the template at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|e| ProcessError::template(path, e))?;

        let hidden: HashSet<String> = workbook
            .sheets_metadata()
            .iter()
            .filter(|s| matches!(s.visible, SheetVisible::Hidden | SheetVisible::VeryHidden))
            .map(|s| s.name.clone())
            .collect();

        let mut sheets = workbook.worksheets().into_iter().map(|(name, range)| {
            let is_hidden = hidden.contains(&name);
            FormSheet::from_range(name, &range, is_hidden)
        });
        let data = sheets
            .next()
            .ok_or_else(|| ProcessError::template(path, "template has no sheets"))?;
        let form = Self {
            data,
            others: sheets.collect(),
        };

        log::debug!(
            "Loaded template sheet '{}' ({} cells, {} other sheets) from {}",
            form.data.name,
            form.data.cells.len(),
            form.others.len(),
            path.display()
        );
        Ok(form)
    }

    pub fn sheet_name(&self) -> &str {
        &self.data.name
    }

    #[cfg(test)]
    pub fn sheet_names(&self) -> Vec<&str> {
        std::iter::once(&self.data)
            .chain(&self.others)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Add a sheet after the existing ones
    #[cfg(test)]
    pub fn add_sheet(&mut self, name: &str, hidden: bool) {
        let mut sheet = FormSheet::new(name);
        sheet.hidden = hidden;
        self.others.push(sheet);
    }

    /// Cell of a sheet other than the first
    #[cfg(test)]
    pub fn get_in(&self, sheet: &str, row: u32, col: u16) -> Option<&CellValue> {
        self.others
            .iter()
            .find(|s| s.name == sheet)
            .and_then(|s| s.cells.get(&(row, col)))
    }

    #[cfg(test)]
    pub fn is_hidden(&self, sheet: &str) -> bool {
        self.others.iter().any(|s| s.name == sheet && s.hidden)
    }

    /// Last row holding any value
    pub fn last_row(&self) -> Option<u32> {
        self.data.cells.keys().map(|(row, _)| *row).max()
    }

    #[cfg(test)]
    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.data.cells.get(&(row, col))
    }

    pub fn set_cell(&mut self, row: u32, col: u16, value: CellValue) {
        self.data.cells.insert((row, col), value);
    }

    /// Write `value` into the column mapped to `field`
    pub fn set(&mut self, row: u32, field: Field, value: impl Into<CellValue>) {
        self.set_cell(row, field.column(), value.into());
    }

    /// Empty every cell in `cols` from `first_row` to the last used row
    pub fn clear_region(&mut self, first_row: u32, cols: RangeInclusive<u16>) {
        self.data
            .cells
            .retain(|(row, col), _| *row < first_row || !cols.contains(col));
    }

    /// Serialise the form as an xlsx document
    pub fn to_xlsx_bytes(&self) -> std::result::Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("dd/mm/yyyy hh:mm:ss");

        self.data.write_to(&mut workbook, &date_format)?;
        for sheet in &self.others {
            sheet.write_to(&mut workbook, &date_format)?;
        }

        workbook.save_to_buffer()
    }
}
