//! Descriptive statistics and outlier detection.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{DataLensError, Result};
use crate::table::{Column, ColumnType, Table};

/// IQR multiplier for the Tukey fences.
const IQR_FENCE: f64 = 1.5;
/// Z-score magnitude beyond which a value is an outlier.
const ZSCORE_THRESHOLD: f64 = 3.0;

/// Linear-interpolation quantile over an already sorted slice.
///
/// Matches the default estimator of most dataframe libraries: the rank
/// `q * (n - 1)` is split into an integer part and a fraction, and the
/// two bracketing order statistics are blended by the fraction.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator). NaN below two values.
pub(crate) fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Population standard deviation, used by the z-score paths.
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Numeric slice of a column profile.
#[derive(Debug, Clone, Serialize)]
pub struct NumericProfile {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub q1: f64,
    pub q3: f64,
}

/// Per-column descriptive profile.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub column_type: ColumnType,
    /// Non-missing value count.
    pub count: usize,
    pub missing: usize,
    pub missing_pct: f64,
    pub distinct: usize,
    /// Most frequent value, first encountered wins ties.
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericProfile>,
}

/// Whole-table shape and missingness summary.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub column_types: IndexMap<String, ColumnType>,
    pub missing_per_column: IndexMap<String, usize>,
    pub total_missing: usize,
    pub missing_pct: f64,
    pub estimated_memory_bytes: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
}

/// Outlier detection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    Iqr,
    Zscore,
}

impl OutlierMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::Zscore => "zscore",
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = DataLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" | "z-score" | "z_score" => Ok(OutlierMethod::Zscore),
            other => Err(DataLensError::InvalidMethod(other.to_string())),
        }
    }
}

/// Result of a single-column outlier scan.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierResult {
    pub column: String,
    pub method: OutlierMethod,
    /// Tukey fences, present for the IQR method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    /// |z| cutoff, present for the z-score method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Row indices of outlying values.
    pub outlier_indices: Vec<usize>,
    /// The outlying values themselves, parallel to `outlier_indices`.
    pub outlier_values: Vec<f64>,
    pub outlier_count: usize,
    /// Share of non-missing values flagged, in percent.
    pub outlier_pct: f64,
}

/// Computes profiles, summaries and outlier scans over a [`Table`].
#[derive(Debug, Default)]
pub struct StatisticsEngine;

impl StatisticsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Profile a single column by name.
    pub fn profile_column(&self, table: &Table, name: &str) -> Result<ColumnProfile> {
        let column = table.require_column(name)?;
        Ok(self.profile(column))
    }

    /// Profile every column, in table order.
    pub fn profile_all(&self, table: &Table) -> Vec<ColumnProfile> {
        table.columns().iter().map(|c| self.profile(c)).collect()
    }

    fn profile(&self, column: &Column) -> ColumnProfile {
        let total = column.data.len();
        let missing = column.data.missing_count();
        let count = total - missing;
        let missing_pct = if total == 0 {
            0.0
        } else {
            missing as f64 / total as f64 * 100.0
        };

        let numeric = if column.column_type().is_numeric() && count > 0 {
            let values = column.numeric_values();
            let mut sorted = values.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let min = sorted[0];
            let max = sorted[sorted.len() - 1];
            Some(NumericProfile {
                mean: mean(&values),
                median: quantile(&sorted, 0.5),
                std: sample_variance(&values).sqrt(),
                variance: sample_variance(&values),
                min,
                max,
                range: max - min,
                q1: quantile(&sorted, 0.25),
                q3: quantile(&sorted, 0.75),
            })
        } else {
            None
        };

        ColumnProfile {
            name: column.name.clone(),
            column_type: column.column_type(),
            count,
            missing,
            missing_pct,
            distinct: column.data.distinct_count(),
            mode: mode_of(column),
            numeric,
        }
    }

    /// Shape, per-column types and missingness for the whole table.
    pub fn dataset_summary(&self, table: &Table) -> DatasetSummary {
        let rows = table.row_count();
        let columns = table.column_count();
        let mut column_types = IndexMap::new();
        let mut missing_per_column = IndexMap::new();
        let mut total_missing = 0;
        let mut numeric_columns = Vec::new();
        let mut categorical_columns = Vec::new();

        for column in table.columns() {
            let ty = column.column_type();
            column_types.insert(column.name.clone(), ty);
            let missing = column.data.missing_count();
            missing_per_column.insert(column.name.clone(), missing);
            total_missing += missing;
            if ty.is_numeric() {
                numeric_columns.push(column.name.clone());
            } else if matches!(ty, ColumnType::Categorical | ColumnType::Text) {
                categorical_columns.push(column.name.clone());
            }
        }

        let cells = rows * columns;
        DatasetSummary {
            rows,
            columns,
            column_types,
            missing_per_column,
            total_missing,
            missing_pct: if cells == 0 {
                0.0
            } else {
                total_missing as f64 / cells as f64 * 100.0
            },
            estimated_memory_bytes: table.estimated_memory_bytes(),
            numeric_columns,
            categorical_columns,
        }
    }

    /// Flag outlying values in a numeric column.
    ///
    /// `method` is parsed by name so callers can pass user input straight
    /// through; unknown names fail with [`DataLensError::InvalidMethod`].
    pub fn detect_outliers(
        &self,
        table: &Table,
        column_name: &str,
        method: &str,
    ) -> Result<OutlierResult> {
        let method = OutlierMethod::from_str(method)?;
        let column = table.require_column(column_name)?;
        if !column.column_type().is_numeric() {
            return Err(DataLensError::NotNumeric(column_name.to_string()));
        }

        // Pair each non-missing value with its row index so the report can
        // point back into the table.
        let indexed: Vec<(usize, f64)> = (0..column.data.len())
            .filter_map(|i| column.data.numeric_at(i).map(|v| (i, v)))
            .collect();
        if indexed.is_empty() {
            return Err(DataLensError::InsufficientData(format!(
                "column '{column_name}' has no non-missing values"
            )));
        }
        let values: Vec<f64> = indexed.iter().map(|(_, v)| *v).collect();

        let (lower_bound, upper_bound, threshold, flagged) = match method {
            OutlierMethod::Iqr => {
                let mut sorted = values.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let q1 = quantile(&sorted, 0.25);
                let q3 = quantile(&sorted, 0.75);
                let fence = IQR_FENCE * (q3 - q1);
                let (lower, upper) = (q1 - fence, q3 + fence);
                let flagged: Vec<(usize, f64)> = indexed
                    .iter()
                    .filter(|(_, v)| *v < lower || *v > upper)
                    .copied()
                    .collect();
                (Some(lower), Some(upper), None, flagged)
            }
            OutlierMethod::Zscore => {
                let m = mean(&values);
                let std = population_std(&values);
                let flagged: Vec<(usize, f64)> = if std == 0.0 || std.is_nan() {
                    Vec::new()
                } else {
                    indexed
                        .iter()
                        .filter(|(_, v)| ((*v - m) / std).abs() > ZSCORE_THRESHOLD)
                        .copied()
                        .collect()
                };
                (None, None, Some(ZSCORE_THRESHOLD), flagged)
            }
        };

        let outlier_count = flagged.len();
        let (outlier_indices, outlier_values) = flagged.into_iter().unzip();
        Ok(OutlierResult {
            column: column_name.to_string(),
            method,
            lower_bound,
            upper_bound,
            threshold,
            outlier_indices,
            outlier_values,
            outlier_count,
            outlier_pct: outlier_count as f64 / values.len() as f64 * 100.0,
        })
    }
}

/// Most frequent displayed value; ties go to the first value encountered.
fn mode_of(column: &Column) -> Option<String> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for i in 0..column.data.len() {
        if let Some(display) = column.data.display_at(i) {
            *counts.entry(display).or_insert(0) += 1;
        }
    }
    let mut best: Option<(String, usize)> = None;
    for (value, count) in counts {
        match &best {
            Some((_, top)) if *top >= count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnData};

    fn numeric_table(name: &str, values: &[Option<f64>]) -> Table {
        Table::new(vec![Column::new(
            name,
            ColumnData::Float(values.to_vec()),
        )])
        .unwrap()
    }

    #[test]
    fn test_quantile_interpolates() {
        // The canary fixture: interpolated quartiles, not nearest-rank.
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert!((quantile(&sorted, 0.25) - 2.25).abs() < 1e-9);
        assert!((quantile(&sorted, 0.75) - 4.75).abs() < 1e-9);
        assert!((quantile(&sorted, 0.5) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_profile_basic_moments() {
        let table = numeric_table("v", &[Some(1.0), Some(2.0), Some(3.0), None]);
        let profile = StatisticsEngine::new().profile_column(&table, "v").unwrap();
        assert_eq!(profile.count, 3);
        assert_eq!(profile.missing, 1);
        assert!((profile.missing_pct - 25.0).abs() < 1e-9);

        let numeric = profile.numeric.unwrap();
        assert!((numeric.mean - 2.0).abs() < 1e-9);
        assert!((numeric.median - 2.0).abs() < 1e-9);
        // Sample variance of [1, 2, 3] is 1.
        assert!((numeric.variance - 1.0).abs() < 1e-9);
        assert!((numeric.range - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_profile_missing_column() {
        let table = numeric_table("v", &[Some(1.0)]);
        let err = StatisticsEngine::new()
            .profile_column(&table, "nope")
            .unwrap_err();
        assert!(matches!(err, DataLensError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_mode_first_encountered_wins_ties() {
        let table = Table::new(vec![Column::new(
            "c",
            ColumnData::Text(vec![
                Some("b".to_string()),
                Some("a".to_string()),
                Some("b".to_string()),
                Some("a".to_string()),
            ]),
        )])
        .unwrap();
        let profile = StatisticsEngine::new().profile_column(&table, "c").unwrap();
        assert_eq!(profile.mode.as_deref(), Some("b"));
        assert!(profile.numeric.is_none());
    }

    #[test]
    fn test_iqr_outlier_fixture() {
        // {1..5, 100}: fences are [-1.5, 8.5], so only 100 is flagged.
        let table = numeric_table(
            "v",
            &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(100.0)],
        );
        let result = StatisticsEngine::new()
            .detect_outliers(&table, "v", "iqr")
            .unwrap();
        assert_eq!(result.outlier_count, 1);
        assert_eq!(result.outlier_indices, vec![5]);
        assert_eq!(result.outlier_values, vec![100.0]);
        assert!((result.outlier_pct - 100.0 / 6.0).abs() < 1e-9);
        assert!((result.lower_bound.unwrap() - (-1.5)).abs() < 1e-9);
        assert!((result.upper_bound.unwrap() - 8.5).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_values_are_not_outliers() {
        // Fences here are exactly [0, 20]; values on a fence stay inside
        // because the comparison is strict.
        let table = numeric_table("v", &[Some(0.0), Some(10.0), Some(10.0), Some(20.0)]);
        let result = StatisticsEngine::new()
            .detect_outliers(&table, "v", "iqr")
            .unwrap();
        assert_eq!(result.outlier_count, 0);
    }

    #[test]
    fn test_zscore_constant_column() {
        let table = numeric_table("v", &[Some(5.0), Some(5.0), Some(5.0)]);
        let result = StatisticsEngine::new()
            .detect_outliers(&table, "v", "zscore")
            .unwrap();
        assert_eq!(result.outlier_count, 0);
        assert_eq!(result.threshold, Some(ZSCORE_THRESHOLD));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let table = numeric_table("v", &[Some(1.0)]);
        let err = StatisticsEngine::new()
            .detect_outliers(&table, "v", "mad")
            .unwrap_err();
        assert!(matches!(err, DataLensError::InvalidMethod { .. }));
    }

    #[test]
    fn test_non_numeric_column_rejected() {
        let table = Table::new(vec![Column::new(
            "c",
            ColumnData::Text(vec![Some("a".to_string())]),
        )])
        .unwrap();
        let err = StatisticsEngine::new()
            .detect_outliers(&table, "c", "iqr")
            .unwrap_err();
        assert!(matches!(err, DataLensError::NotNumeric { .. }));
    }

    #[test]
    fn test_dataset_summary_shape() {
        let table = Table::new(vec![
            Column::new("n", ColumnData::Integer(vec![Some(1), None, Some(3)])),
            Column::new(
                "t",
                ColumnData::Text(vec![Some("a".to_string()), Some("b".to_string()), None]),
            ),
        ])
        .unwrap();
        let summary = StatisticsEngine::new().dataset_summary(&table);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.columns, 2);
        assert_eq!(summary.total_missing, 2);
        assert!((summary.missing_pct - 2.0 / 6.0 * 100.0).abs() < 1e-9);
        assert_eq!(summary.numeric_columns, vec!["n"]);
        assert_eq!(summary.categorical_columns, vec!["t"]);
        assert!(summary.estimated_memory_bytes > 0);
    }
}
