//! Read a spreadsheet or CSV export into a header + rows table

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::error::{ProcessError, Result};

/// Raw tabular input: one header row followed by data rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

impl Table {
    /// Build a table from text cells (empty strings become empty cells)
    #[cfg(test)]
    pub fn from_strings<S: AsRef<str>>(headers: &[S], rows: &[Vec<S>]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.as_ref().trim().to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| text_cell(c.as_ref())).collect())
                .collect(),
        }
    }

    /// Index of the column whose header matches `name`
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn text_cell(s: &str) -> Data {
    if s.is_empty() {
        Data::Empty
    } else {
        Data::String(s.to_string())
    }
}

/// Read `path`, dispatching on its extension
///
/// `sheet` selects a worksheet by name; the first sheet is used otherwise.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        _ => read_workbook(path, sheet),
    }
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ProcessError::input(path, e))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ProcessError::input(path, "workbook has no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ProcessError::input(path, format!("sheet '{}': {}", sheet_name, e)))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => header.iter().map(header_name).collect(),
        None => return Ok(Table::default()),
    };
    let rows = rows.map(|r| r.to_vec()).collect();

    log::debug!("Read sheet '{}' from {}", sheet_name, path.display());
    Ok(Table { headers, rows })
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ProcessError::input(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| ProcessError::input(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ProcessError::input(path, e))?;
        rows.push(record.iter().map(text_cell).collect());
    }

    Ok(Table { headers, rows })
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_read_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        std::fs::write(
            &path,
            "PRODUCTO, OT ,UNID. DISP.,FECHA RECIBO\nP1,OT-001,5,01/01/2024 10:00:00\nP2,,,\n",
        )
        .unwrap();

        let table = read_table(&path, None).unwrap();
        assert_eq!(table.headers, vec!["PRODUCTO", "OT", "UNID. DISP.", "FECHA RECIBO"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], Data::String("OT-001".into()));
        assert_eq!(table.rows[1][1], Data::Empty);
    }

    #[test]
    fn test_read_xlsx_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.xlsx");

        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name("Historial").unwrap();
        ws.write_string(0, 0, "PRODUCTO").unwrap();
        ws.write_string(0, 1, "OT").unwrap();
        ws.write_string(1, 0, "P1").unwrap();
        ws.write_number(1, 1, 42.0).unwrap();
        workbook.save(&path).unwrap();

        let table = read_table(&path, None).unwrap();
        assert_eq!(table.headers, vec!["PRODUCTO", "OT"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], Data::String("P1".into()));
        assert_eq!(table.rows[0][1], Data::Float(42.0));
    }

    #[test]
    fn test_unknown_sheet_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.xlsx");
        let mut workbook = Workbook::new();
        workbook.add_worksheet().write_string(0, 0, "PRODUCTO").unwrap();
        workbook.save(&path).unwrap();

        let result = read_table(&path, Some("Missing"));
        assert!(matches!(result, Err(ProcessError::Input { .. })));
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let result = read_table(Path::new("/nonexistent/export.xlsx"), None);
        assert!(matches!(result, Err(ProcessError::Input { .. })));
    }
}
