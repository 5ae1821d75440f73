//! Spreadsheet (xlsx/xls) loading via calamine.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use super::columns::{build_column, normalize_cell};
use crate::error::{DataLensError, Result};
use crate::table::Column;

/// Result of reading one sheet from a workbook.
#[derive(Debug)]
pub struct SheetData {
    /// Every sheet the workbook contains, in workbook order.
    pub sheet_names: Vec<String>,
    /// The sheet that was actually read.
    pub selected: String,
    pub columns: Vec<Column>,
}

/// Read one sheet of a workbook into typed columns. Without an explicit
/// selector the first sheet is chosen, deterministically.
pub fn load_spreadsheet(
    path: &Path,
    sheet: Option<&str>,
    max_rows: Option<usize>,
) -> Result<SheetData> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| DataLensError::Load(format!("spreadsheet open failure: {e}")))?;

    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(DataLensError::EmptyData(
            "workbook contains no sheets".to_string(),
        ));
    }

    let selected = match sheet {
        Some(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(DataLensError::Load(format!(
                    "sheet '{}' not found; available sheets: {}",
                    name,
                    sheet_names.join(", ")
                )));
            }
            name.to_string()
        }
        None => sheet_names[0].clone(),
    };

    let range = workbook
        .worksheet_range(&selected)
        .map_err(|e| DataLensError::Load(format!("sheet '{selected}' read failure: {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let name = cell_to_string(cell).unwrap_or_default();
                if name.trim().is_empty() {
                    format!("column_{}", i + 1)
                } else {
                    name
                }
            })
            .collect(),
        None => {
            return Err(DataLensError::EmptyData(format!(
                "sheet '{selected}' is empty"
            )));
        }
    };

    let mut raw_columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (row_idx, row) in rows.enumerate() {
        if let Some(max) = max_rows {
            if row_idx >= max {
                break;
            }
        }
        for (col_idx, raw) in raw_columns.iter_mut().enumerate() {
            let cell = row.get(col_idx).unwrap_or(&Data::Empty);
            raw.push(cell_to_string(cell).as_deref().and_then(normalize_cell));
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw_columns)
        .map(|(name, raw)| build_column(name, raw))
        .collect();

    Ok(SheetData {
        sheet_names,
        selected,
        columns,
    })
}

/// Render one spreadsheet cell as a raw string cell; `None` is missing.
/// Error cells (`#DIV/0!` and friends) are treated as missing, matching
/// the text-ingestion null tokens.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                Some(format!("{}", *f as i64))
            } else {
                Some(f.to_string())
            }
        }
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(|d| d.to_string()),
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell_to_string(&Data::Empty), None);
        assert_eq!(cell_to_string(&Data::Int(3)).as_deref(), Some("3"));
        // Whole floats render without the trailing fraction like integers.
        assert_eq!(cell_to_string(&Data::Float(42.0)).as_deref(), Some("42"));
        assert_eq!(cell_to_string(&Data::Float(1.5)).as_deref(), Some("1.5"));
        assert_eq!(cell_to_string(&Data::Bool(true)).as_deref(), Some("true"));
    }

    #[test]
    fn test_error_cells_are_missing() {
        assert_eq!(
            cell_to_string(&Data::Error(calamine::CellErrorType::Div0)),
            None
        );
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let result = load_spreadsheet(Path::new("/nonexistent/book.xlsx"), None, None);
        assert!(matches!(result, Err(DataLensError::Load(_))));
    }
}
