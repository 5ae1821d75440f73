//! Structural validation, quality scoring and memory advisories.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::table::{ColumnData, ColumnType, Table};

/// Characters that break downstream tooling when used in column names.
const PROBLEMATIC_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
/// Column names longer than this are flagged.
const MAX_NAME_LENGTH: usize = 100;

static DATE_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}[-/]\d{1,2}[-/]\d{1,4}$").unwrap());

/// Aggregate quality scores, each on a 0 to 100 scale.
#[derive(Debug, Clone, Serialize)]
pub struct QualityMetrics {
    /// Share of cells that are present.
    pub completeness_pct: f64,
    /// Share of rows with no missing cell.
    pub complete_rows_pct: f64,
    /// Share of columns with no missing cell.
    pub columns_without_nulls_pct: f64,
    /// Share of rows that duplicate an earlier row.
    pub duplicate_pct: f64,
    /// 100 minus 10 per column whose text content looks mistyped.
    pub type_consistency_score: f64,
}

/// Outcome of [`validate_table`]. `errors` makes the table unusable;
/// `warnings` are advisory.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: QualityMetrics,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a table for structural problems and score its quality.
pub fn validate_table(table: &Table) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let rows = table.row_count();
    let columns = table.column_count();
    if columns == 0 {
        errors.push("table has no columns".to_string());
    } else if rows == 0 {
        errors.push("table has no rows".to_string());
    }

    check_column_names(table, &mut warnings);
    check_nullness(table, &mut warnings);
    check_cardinality(table, &mut warnings);

    let empty_rows = count_empty_rows(table);
    if empty_rows > 0 {
        warnings.push(format!("{empty_rows} row(s) are entirely empty"));
    }

    let mistyped = check_text_content(table, &mut warnings);

    ValidationReport {
        errors,
        warnings,
        metrics: compute_metrics(table, mistyped),
    }
}

fn check_column_names(table: &Table, warnings: &mut Vec<String>) {
    let mut seen: IndexMap<&str, usize> = IndexMap::new();
    for name in table.column_names() {
        *seen.entry(name).or_insert(0) += 1;
    }
    for (name, count) in &seen {
        if *count > 1 {
            warnings.push(format!("column name '{name}' appears {count} times"));
        }
    }

    for name in table.column_names() {
        if name.contains(PROBLEMATIC_NAME_CHARS) {
            warnings.push(format!(
                "column name '{name}' contains characters that break downstream tools"
            ));
        }
        if name != name.trim() {
            warnings.push(format!(
                "column name '{name}' has leading or trailing whitespace"
            ));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            // Truncate on character boundaries; names are not always ASCII.
            let prefix: String = name.chars().take(20).collect();
            warnings.push(format!(
                "column name '{prefix}...' is longer than {MAX_NAME_LENGTH} characters"
            ));
        }
    }
}

fn check_nullness(table: &Table, warnings: &mut Vec<String>) {
    for column in table.columns() {
        let len = column.data.len();
        if len == 0 {
            continue;
        }
        let null_pct = column.data.missing_count() as f64 / len as f64 * 100.0;
        if null_pct > 80.0 {
            warnings.push(format!(
                "column '{}' is {null_pct:.1}% null and carries almost no information",
                column.name
            ));
        } else if null_pct > 50.0 {
            warnings.push(format!(
                "column '{}' is {null_pct:.1}% null",
                column.name
            ));
        }
    }
}

fn check_cardinality(table: &Table, warnings: &mut Vec<String>) {
    let rows = table.row_count();
    for column in table.columns() {
        let present = column.data.non_missing_count();
        if present == 0 {
            continue;
        }
        let distinct = column.data.distinct_count();
        if distinct == 1 {
            warnings.push(format!(
                "column '{}' has a single distinct value",
                column.name
            ));
        }
        // High-cardinality text is usually an identifier, not a feature.
        if column.column_type() == ColumnType::Text
            && rows > 0
            && distinct as f64 > rows as f64 * 0.8
        {
            warnings.push(format!(
                "text column '{}' has {distinct} distinct values over {rows} rows; it may be an identifier",
                column.name
            ));
        }
    }
}

fn count_empty_rows(table: &Table) -> usize {
    if table.column_count() == 0 {
        return 0;
    }
    (0..table.row_count())
        .filter(|&row| table.columns().iter().all(|c| c.data.is_missing(row)))
        .count()
}

/// Flag text columns whose sampled content parses as numbers or dates.
/// Returns the offender count for the type-consistency score.
fn check_text_content(table: &Table, warnings: &mut Vec<String>) -> usize {
    let mut mistyped = 0;
    for column in table.columns() {
        let ColumnData::Text(values) = &column.data else {
            continue;
        };
        let sample: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
        if sample.is_empty() {
            continue;
        }

        let numeric_sample = &sample[..sample.len().min(100)];
        let numeric_hits = numeric_sample
            .iter()
            .filter(|v| looks_numeric(v))
            .count();
        if numeric_hits as f64 > numeric_sample.len() as f64 * 0.8 {
            warnings.push(format!(
                "text column '{}' looks numeric in {numeric_hits} of {} sampled values",
                column.name,
                numeric_sample.len()
            ));
            mistyped += 1;
            continue;
        }

        let date_sample = &sample[..sample.len().min(50)];
        let date_hits = date_sample
            .iter()
            .filter(|v| DATE_LIKE.is_match(v.trim()))
            .count();
        if date_hits as f64 > date_sample.len() as f64 * 0.7 {
            warnings.push(format!(
                "text column '{}' looks like dates in {date_hits} of {} sampled values",
                column.name,
                date_sample.len()
            ));
            mistyped += 1;
        }
    }
    mistyped
}

/// Numeric test with tolerance for comma decimal separators.
fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.parse::<f64>().is_ok() || trimmed.replacen(',', ".", 1).parse::<f64>().is_ok()
}

fn compute_metrics(table: &Table, mistyped: usize) -> QualityMetrics {
    let rows = table.row_count();
    let columns = table.column_count();
    let cells = rows * columns;

    let total_missing: usize = table
        .columns()
        .iter()
        .map(|c| c.data.missing_count())
        .sum();
    let completeness_pct = if cells == 0 {
        100.0
    } else {
        (cells - total_missing) as f64 / cells as f64 * 100.0
    };

    let complete_rows = (0..rows)
        .filter(|&row| table.columns().iter().all(|c| !c.data.is_missing(row)))
        .count();
    let complete_rows_pct = if rows == 0 {
        100.0
    } else {
        complete_rows as f64 / rows as f64 * 100.0
    };

    let clean_columns = table
        .columns()
        .iter()
        .filter(|c| c.data.missing_count() == 0)
        .count();
    let columns_without_nulls_pct = if columns == 0 {
        100.0
    } else {
        clean_columns as f64 / columns as f64 * 100.0
    };

    let duplicate_pct = if rows == 0 {
        0.0
    } else {
        table.duplicate_row_count() as f64 / rows as f64 * 100.0
    };

    QualityMetrics {
        completeness_pct,
        complete_rows_pct,
        columns_without_nulls_pct,
        duplicate_pct,
        type_consistency_score: (100.0 - 10.0 * mistyped as f64).max(0.0),
    }
}

/// Operation whose memory footprint is being estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOperation {
    General,
    Correlation,
    Cleaning,
    Export,
}

impl AnalysisOperation {
    /// Working-set multiplier over the resident table size.
    fn factor(&self) -> f64 {
        match self {
            AnalysisOperation::General => 2.0,
            AnalysisOperation::Correlation => 3.0,
            AnalysisOperation::Cleaning => 2.5,
            AnalysisOperation::Export => 2.0,
        }
    }
}

/// Advisory verdict; nothing is enforced.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryAssessment {
    pub operation: AnalysisOperation,
    pub table_bytes: usize,
    pub required_bytes: usize,
    pub available_bytes: usize,
    pub fits: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// Estimate whether `operation` fits in `available_bytes`.
pub fn assess_memory(
    table: &Table,
    operation: AnalysisOperation,
    available_bytes: usize,
) -> MemoryAssessment {
    let table_bytes = table.estimated_memory_bytes();
    let required_bytes = (table_bytes as f64 * operation.factor()) as usize;
    let fits = required_bytes <= available_bytes;
    let recommendation = if fits {
        None
    } else {
        Some(format!(
            "the table needs roughly {} MB of working memory but {} MB is available; \
             consider loading fewer rows or dropping unused columns",
            required_bytes / (1024 * 1024),
            available_bytes / (1024 * 1024)
        ))
    };
    MemoryAssessment {
        operation,
        table_bytes,
        required_bytes,
        available_bytes,
        fits,
        recommendation,
    }
}
