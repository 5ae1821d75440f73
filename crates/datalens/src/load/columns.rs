//! Building typed columns from raw string cells.

use crate::table::{Column, ColumnData};

/// Missing-value literals normalized to the missing state on text ingestion.
pub const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "null", "NULL", "None", "#N/A", "#DIV/0!"];

/// Whether a raw cell is one of the recognized missing-value literals.
pub fn is_null_token(value: &str) -> bool {
    NULL_TOKENS.contains(&value.trim())
}

/// Build a column from raw cells, inferring the narrowest storage that
/// holds every non-missing value: integer, then float, then boolean,
/// then text. Datetime and categorical narrowing is left to the schema
/// inferencer.
pub fn build_column(name: impl Into<String>, raw: Vec<Option<String>>) -> Column {
    let non_missing: Vec<&str> = raw.iter().flatten().map(|s| s.trim()).collect();

    let data = if non_missing.is_empty() {
        ColumnData::Text(raw)
    } else if non_missing.iter().all(|v| v.parse::<i64>().is_ok()) {
        ColumnData::Integer(
            raw.iter()
                .map(|c| c.as_deref().map(|v| v.trim().parse::<i64>().unwrap_or(0)))
                .collect(),
        )
    } else if non_missing.iter().all(|v| v.parse::<f64>().is_ok()) {
        ColumnData::Float(
            raw.iter()
                .map(|c| c.as_deref().map(|v| v.trim().parse::<f64>().unwrap_or(0.0)))
                .collect(),
        )
    } else if non_missing.iter().all(|v| parse_bool(v).is_some()) {
        ColumnData::Boolean(
            raw.iter()
                .map(|c| c.as_deref().and_then(parse_bool))
                .collect(),
        )
    } else {
        ColumnData::Text(raw)
    };

    Column::new(name, data)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Normalize a raw cell: null tokens become the missing state.
pub fn normalize_cell(value: &str) -> Option<String> {
    if is_null_token(value) {
        None
    } else {
        Some(value.to_string())
    }
}

/// Transpose row-major string records into typed columns.
pub fn columns_from_rows(headers: &[String], rows: &[Vec<String>]) -> Vec<Column> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let raw: Vec<Option<String>> = rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).and_then(normalize_cell))
                .collect();
            build_column(name.clone(), raw)
        })
        .collect()
}
