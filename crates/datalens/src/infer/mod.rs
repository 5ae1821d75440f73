//! Schema inference: suggesting and applying better column types.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::table::{Column, ColumnData, ColumnType, Table};

/// Cheap prefilter before attempting a full datetime parse.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap(),
        Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}").unwrap(),
        Regex::new(r"^\d{1,2}-\d{1,2}-\d{4}").unwrap(),
        Regex::new(r"^\d{4}/\d{2}/\d{2}").unwrap(),
    ]
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y"];

/// Cardinality ratio below which a text column may be categorical.
const CATEGORICAL_RATIO: f64 = 0.5;
/// Distinct-count ceiling for categorical columns.
const CATEGORICAL_MAX_DISTINCT: usize = 50;
/// Minimum share of values that must survive a lossy coercion.
const COERCION_SUCCESS_THRESHOLD: f64 = 0.8;

/// Permissive datetime parse used by inference and optimization.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if !DATE_PATTERNS.iter().any(|p| p.is_match(trimmed)) {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Suggests and applies per-column semantic types.
#[derive(Debug, Default)]
pub struct SchemaInferencer;

impl SchemaInferencer {
    pub fn new() -> Self {
        Self
    }

    /// Suggest the best semantic type per column, in table order.
    ///
    /// For text columns the candidates are tried in a fixed order and the
    /// first one that fits every non-missing value wins: integer, float,
    /// datetime, categorical (ratio strictly below 0.5 and fewer than 50
    /// distinct values), then text. Entirely-missing columns stay text.
    pub fn suggest_types(&self, table: &Table) -> IndexMap<String, ColumnType> {
        table
            .columns()
            .iter()
            .map(|col| (col.name.clone(), self.suggest_column(col)))
            .collect()
    }

    fn suggest_column(&self, column: &Column) -> ColumnType {
        match &column.data {
            ColumnData::Float(values) => {
                // Narrow whole-valued floats to integer storage.
                let non_missing: Vec<f64> = values.iter().copied().flatten().collect();
                if !non_missing.is_empty()
                    && non_missing
                        .iter()
                        .all(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
                {
                    ColumnType::Integer
                } else {
                    ColumnType::Float
                }
            }
            ColumnData::Text(values) => {
                let non_missing: Vec<&str> = values.iter().flatten().map(|s| s.trim()).collect();
                if non_missing.is_empty() {
                    return ColumnType::Text;
                }

                if non_missing.iter().all(|v| v.parse::<i64>().is_ok()) {
                    return ColumnType::Integer;
                }
                if non_missing.iter().all(|v| v.parse::<f64>().is_ok()) {
                    return ColumnType::Float;
                }
                if non_missing.iter().all(|v| parse_datetime(v).is_some()) {
                    return ColumnType::DateTime;
                }

                let distinct = column.data.distinct_count();
                let ratio = distinct as f64 / non_missing.len() as f64;
                if ratio < CATEGORICAL_RATIO && distinct < CATEGORICAL_MAX_DISTINCT {
                    return ColumnType::Categorical;
                }

                ColumnType::Text
            }
            other => other.column_type(),
        }
    }

    /// Apply the suggested types, returning a new table.
    ///
    /// Coercions that fail for individual values turn those cells missing;
    /// a column is left unchanged when more than 20% of its originally
    /// present values would be lost. Text columns with no strict-ladder
    /// match are still coerced to float when over 80% of values parse,
    /// mirroring the lossy numeric pass of the source material.
    pub fn optimize(&self, table: &Table) -> Table {
        let columns = table
            .columns()
            .iter()
            .map(|col| {
                let data = self
                    .optimize_column(col)
                    .unwrap_or_else(|| col.data.clone());
                Column::new(col.name.clone(), data)
            })
            .collect();

        // Column lengths are preserved by every coercion path.
        Table::new(columns).unwrap_or_else(|_| table.clone())
    }

    fn optimize_column(&self, column: &Column) -> Option<ColumnData> {
        match &column.data {
            ColumnData::Float(values) => {
                if self.suggest_column(column) == ColumnType::Integer {
                    Some(ColumnData::Integer(
                        values
                            .iter()
                            .map(|c| c.map(|v| v as i64))
                            .collect(),
                    ))
                } else {
                    None
                }
            }
            ColumnData::Text(values) => {
                let present = values.iter().flatten().count();
                if present == 0 {
                    return None;
                }

                match self.suggest_column(column) {
                    ColumnType::Integer => self.coerce(values, present, |v| v.parse::<i64>().ok())
                        .map(ColumnData::Integer),
                    ColumnType::Float => self.coerce(values, present, |v| v.parse::<f64>().ok())
                        .map(ColumnData::Float),
                    ColumnType::DateTime => self
                        .coerce(values, present, |v| parse_datetime(v))
                        .map(ColumnData::DateTime),
                    ColumnType::Categorical => Some(encode_categorical(values)),
                    _ => {
                        // Lossy numeric rescue for mostly-numeric text.
                        self.coerce(values, present, |v| v.parse::<f64>().ok())
                            .map(ColumnData::Float)
                    }
                }
            }
            _ => None,
        }
    }

    /// Coerce each present value, bailing out when the survival rate drops
    /// below the 0.8 contract.
    fn coerce<T>(
        &self,
        values: &[Option<String>],
        present: usize,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<Vec<Option<T>>> {
        let coerced: Vec<Option<T>> = values
            .iter()
            .map(|c| c.as_deref().and_then(|v| parse(v.trim())))
            .collect();

        let survived = coerced.iter().filter(|c| c.is_some()).count();
        if (survived as f64) / (present as f64) > COERCION_SUCCESS_THRESHOLD || survived == present {
            Some(coerced)
        } else {
            None
        }
    }
}

/// Encode a text column against a level table, levels in first-appearance
/// order.
fn encode_categorical(values: &[Option<String>]) -> ColumnData {
    let mut levels: Vec<String> = Vec::new();
    let codes = values
        .iter()
        .map(|cell| {
            cell.as_ref().map(|value| {
                match levels.iter().position(|l| l == value) {
                    Some(idx) => idx as u32,
                    None => {
                        levels.push(value.clone());
                        (levels.len() - 1) as u32
                    }
                }
            })
        })
        .collect();
    ColumnData::Categorical { levels, codes }
}
