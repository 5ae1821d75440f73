//! JSON loading: an ordered list of candidate shapes, first structural
//! match wins.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{DataLensError, Result};
use crate::table::{Column, ColumnData};

/// Which structural interpretation matched the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// Top-level array of row objects.
    RowArray,
    /// Top-level object with a `data` key holding an array of row objects.
    DataKey,
    /// Top-level object whose values are all equal-length arrays.
    Columnar,
    /// Any other object, treated as a single row.
    SingleRow,
}

impl JsonShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonShape::RowArray => "array-of-objects",
            JsonShape::DataKey => "data-key",
            JsonShape::Columnar => "columnar-object",
            JsonShape::SingleRow => "single-row-object",
        }
    }
}

/// Parse JSON bytes into typed columns plus the shape that matched.
pub fn parse_json(bytes: &[u8], max_rows: Option<usize>) -> Result<(Vec<Column>, JsonShape)> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| DataLensError::Load(format!(
            "JSON parse failure: {e}"
        )))?;

    match document {
        Value::Array(rows) => Ok((columns_from_objects(&rows, max_rows)?, JsonShape::RowArray)),
        Value::Object(map) => {
            if let Some(Value::Array(rows)) = map.get("data") {
                return Ok((columns_from_objects(rows, max_rows)?, JsonShape::DataKey));
            }

            let all_arrays = !map.is_empty() && map.values().all(|v| v.is_array());
            if all_arrays {
                let lengths: Vec<usize> = map
                    .values()
                    .map(|v| v.as_array().map(|a| a.len()).unwrap_or(0))
                    .collect();
                if lengths.windows(2).all(|w| w[0] == w[1]) {
                    let columns = map
                        .iter()
                        .map(|(name, values)| {
                            let cells: Vec<Option<&Value>> = values
                                .as_array()
                                .map(|a| {
                                    let take = max_rows.unwrap_or(a.len()).min(a.len());
                                    a.iter().take(take).map(Some).collect()
                                })
                                .unwrap_or_default();
                            column_from_values(name, &cells)
                        })
                        .collect();
                    return Ok((columns, JsonShape::Columnar));
                }
            }

            // Whole object becomes one row.
            let row = Value::Object(map);
            Ok((
                columns_from_objects(std::slice::from_ref(&row), max_rows)?,
                JsonShape::SingleRow,
            ))
        }
        other => Err(DataLensError::Load(format!(
            "unsupported JSON structure: expected array or object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Build columns from an array of row objects. Keys are unioned in order
/// of first appearance; rows lacking a key get a missing cell.
fn columns_from_objects(rows: &[Value], max_rows: Option<usize>) -> Result<Vec<Column>> {
    let take = max_rows.unwrap_or(rows.len()).min(rows.len());
    let rows = &rows[..take];

    let mut keys: IndexMap<String, ()> = IndexMap::new();
    for row in rows {
        let obj = row.as_object().ok_or_else(|| {
            DataLensError::Load(format!(
                "unsupported JSON structure: expected row objects, got {}",
                json_kind(row)
            ))
        })?;
        for key in obj.keys() {
            keys.entry(key.clone()).or_insert(());
        }
    }

    Ok(keys
        .keys()
        .map(|key| {
            let cells: Vec<Option<&Value>> = rows
                .iter()
                .map(|row| row.as_object().and_then(|o| o.get(key)))
                .collect();
            column_from_values(key, &cells)
        })
        .collect())
}

/// Pick the narrowest storage holding every non-null value; mixed content
/// degrades to text with non-string values JSON-encoded.
fn column_from_values(name: &str, cells: &[Option<&Value>]) -> Column {
    let present: Vec<&Value> = cells
        .iter()
        .copied()
        .flatten()
        .filter(|v| !v.is_null())
        .collect();

    let data = if !present.is_empty() && present.iter().all(|v| v.as_i64().is_some()) {
        ColumnData::Integer(cells.iter().map(|c| c.and_then(|v| v.as_i64())).collect())
    } else if !present.is_empty() && present.iter().all(|v| v.is_number()) {
        ColumnData::Float(cells.iter().map(|c| c.and_then(|v| v.as_f64())).collect())
    } else if !present.is_empty() && present.iter().all(|v| v.is_boolean()) {
        ColumnData::Boolean(cells.iter().map(|c| c.and_then(|v| v.as_bool())).collect())
    } else {
        ColumnData::Text(
            cells
                .iter()
                .map(|c| {
                    c.and_then(|v| match v {
                        Value::Null => None,
                        Value::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    })
                })
                .collect(),
        )
    };

    Column::new(name, data)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
