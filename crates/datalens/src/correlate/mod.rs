//! Pairwise correlation analysis over the numeric columns of a table.

use std::str::FromStr;

use serde::Serialize;

use crate::error::{DataLensError, Result};
use crate::table::{Column, Table};

/// Correlation estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
    Kendall,
}

impl CorrelationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Spearman => "spearman",
            CorrelationMethod::Kendall => "kendall",
        }
    }
}

impl FromStr for CorrelationMethod {
    type Err = DataLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            "kendall" => Ok(CorrelationMethod::Kendall),
            other => Err(DataLensError::InvalidMethod(other.to_string())),
        }
    }
}

/// Square, symmetric correlation matrix in column order.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major values; `values[i][j]` pairs `columns[i]` with
    /// `columns[j]`. NaN marks an undefined coefficient.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// One significant pair from the upper triangle of the matrix.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationPair {
    pub column_a: String,
    pub column_b: String,
    pub value: f64,
    /// Human-readable reading, e.g. "strong negative".
    pub interpretation: String,
}

/// Aggregate view of the off-diagonal coefficients.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationSummary {
    pub pair_count: usize,
    pub significant_count: usize,
    pub mean_abs: f64,
    pub max: f64,
    pub min: f64,
}

/// Matrix plus derived findings. `error` is set instead of failing so a
/// report can always be rendered.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationReport {
    pub method: CorrelationMethod,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<CorrelationMatrix>,
    pub significant: Vec<CorrelationPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CorrelationSummary>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Word for a coefficient's magnitude.
pub fn strength_label(value: f64) -> &'static str {
    let magnitude = value.abs();
    if magnitude >= 0.9 {
        "very strong"
    } else if magnitude >= 0.7 {
        "strong"
    } else if magnitude >= 0.5 {
        "moderate"
    } else if magnitude >= 0.3 {
        "weak"
    } else {
        "very weak"
    }
}

/// Combined magnitude and direction reading of a coefficient.
pub fn interpret(value: f64) -> String {
    let direction = if value >= 0.0 { "positive" } else { "negative" };
    format!("{} {}", strength_label(value), direction)
}

/// Computes correlation matrices and reports.
#[derive(Debug, Default)]
pub struct CorrelationEngine;

impl CorrelationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Full symmetric matrix over the numeric columns.
    ///
    /// Each pair is computed over its pairwise-complete rows only, so
    /// missing values in one column do not discard a row for unrelated
    /// pairs. A coefficient is NaN when fewer than two complete rows
    /// remain or when either side has zero variance.
    pub fn matrix(&self, table: &Table, method: CorrelationMethod) -> Result<CorrelationMatrix> {
        let numeric = table.numeric_columns();
        if numeric.len() < 2 {
            return Err(DataLensError::InsufficientData(format!(
                "correlation needs at least 2 numeric columns, found {}",
                numeric.len()
            )));
        }

        let n = numeric.len();
        let mut values = vec![vec![f64::NAN; n]; n];
        for i in 0..n {
            for j in i..n {
                let coefficient = pairwise(numeric[i], numeric[j], method);
                values[i][j] = coefficient;
                values[j][i] = coefficient;
            }
        }

        Ok(CorrelationMatrix {
            columns: numeric.iter().map(|c| c.name.clone()).collect(),
            values,
        })
    }

    /// Upper-triangle pairs with `|value| >= threshold`, strongest first.
    ///
    /// NaN coefficients are skipped. Ties keep matrix order, so the output
    /// is deterministic for a given table.
    pub fn significant_pairs(
        &self,
        matrix: &CorrelationMatrix,
        threshold: f64,
    ) -> Vec<CorrelationPair> {
        let mut pairs = Vec::new();
        for i in 0..matrix.columns.len() {
            for j in (i + 1)..matrix.columns.len() {
                let value = matrix.values[i][j];
                if value.is_nan() || value.abs() < threshold {
                    continue;
                }
                pairs.push(CorrelationPair {
                    column_a: matrix.columns[i].clone(),
                    column_b: matrix.columns[j].clone(),
                    value,
                    interpretation: interpret(value),
                });
            }
        }
        pairs.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
        pairs
    }

    /// Matrix, significant pairs, summary and recommendations in one pass.
    ///
    /// Never fails: when the matrix cannot be computed the report carries
    /// the error message and empty findings.
    pub fn full_report(
        &self,
        table: &Table,
        method: CorrelationMethod,
        threshold: f64,
    ) -> CorrelationReport {
        let matrix = match self.matrix(table, method) {
            Ok(matrix) => matrix,
            Err(err) => {
                return CorrelationReport {
                    method,
                    threshold,
                    matrix: None,
                    significant: Vec::new(),
                    summary: None,
                    recommendations: Vec::new(),
                    error: Some(err.to_string()),
                };
            }
        };

        let significant = self.significant_pairs(&matrix, threshold);

        let mut off_diagonal = Vec::new();
        for i in 0..matrix.columns.len() {
            for j in (i + 1)..matrix.columns.len() {
                let value = matrix.values[i][j];
                if !value.is_nan() {
                    off_diagonal.push(value);
                }
            }
        }
        let summary = if off_diagonal.is_empty() {
            None
        } else {
            let mut max = off_diagonal[0];
            let mut min = off_diagonal[0];
            for &v in &off_diagonal[1..] {
                if v > max {
                    max = v;
                }
                if v < min {
                    min = v;
                }
            }
            Some(CorrelationSummary {
                pair_count: off_diagonal.len(),
                significant_count: significant.len(),
                mean_abs: off_diagonal.iter().map(|v| v.abs()).sum::<f64>()
                    / off_diagonal.len() as f64,
                max,
                min,
            })
        };

        let recommendations = build_recommendations(&significant);

        CorrelationReport {
            method,
            threshold,
            matrix: Some(matrix),
            significant,
            summary,
            recommendations,
            error: None,
        }
    }
}

fn build_recommendations(pairs: &[CorrelationPair]) -> Vec<String> {
    let mut recommendations = Vec::new();
    for pair in pairs {
        if pair.value >= 0.9 {
            recommendations.push(format!(
                "'{}' and '{}' are nearly redundant (r = {:.2}); consider keeping only one",
                pair.column_a, pair.column_b, pair.value
            ));
        } else if pair.value <= -0.7 {
            recommendations.push(format!(
                "'{}' and '{}' move strongly in opposite directions (r = {:.2})",
                pair.column_a, pair.column_b, pair.value
            ));
        } else if pair.value >= 0.7 {
            recommendations.push(format!(
                "'{}' and '{}' show a strong direct relationship (r = {:.2})",
                pair.column_a, pair.column_b, pair.value
            ));
        }
    }
    recommendations
}

/// Coefficient for one column pair over its pairwise-complete rows.
fn pairwise(a: &Column, b: &Column, method: CorrelationMethod) -> f64 {
    let len = a.data.len();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for i in 0..len {
        if let (Some(x), Some(y)) = (a.data.numeric_at(i), b.data.numeric_at(i)) {
            xs.push(x);
            ys.push(y);
        }
    }
    if xs.len() < 2 {
        return f64::NAN;
    }

    match method {
        CorrelationMethod::Pearson => pearson(&xs, &ys),
        CorrelationMethod::Spearman => pearson(&ranks(&xs), &ranks(&ys)),
        CorrelationMethod::Kendall => kendall_tau_b(&xs, &ys),
    }
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    covariance / (var_x.sqrt() * var_y.sqrt())
}

/// Average ranks, with ties sharing the mean of their positions.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut out = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let shared = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            out[idx] = shared;
        }
        i = j + 1;
    }
    out
}

/// Tau-b, which corrects the denominator for ties on either side.
fn kendall_tau_b(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    let mut ties_x = 0i64;
    let mut ties_y = 0i64;

    for i in 0..n {
        for j in (i + 1)..n {
            let dx = xs[i] - xs[j];
            let dy = ys[i] - ys[j];
            if dx == 0.0 {
                ties_x += 1;
            }
            if dy == 0.0 {
                ties_y += 1;
            }
            if dx != 0.0 && dy != 0.0 {
                if dx * dy > 0.0 {
                    concordant += 1;
                } else {
                    discordant += 1;
                }
            }
        }
    }

    let total = (n * (n - 1) / 2) as f64;
    let denominator = ((total - ties_x as f64) * (total - ties_y as f64)).sqrt();
    if denominator == 0.0 {
        return f64::NAN;
    }
    (concordant - discordant) as f64 / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnData, Table};

    fn two_column_table(a: &[Option<f64>], b: &[Option<f64>]) -> Table {
        Table::new(vec![
            Column::new("a", ColumnData::Float(a.to_vec())),
            Column::new("b", ColumnData::Float(b.to_vec())),
        ])
        .unwrap()
    }

    #[test]
    fn test_pearson_perfect_linear() {
        let table = two_column_table(
            &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            &[Some(2.0), Some(4.0), Some(6.0), Some(8.0)],
        );
        let matrix = CorrelationEngine::new()
            .matrix(&table, CorrelationMethod::Pearson)
            .unwrap();
        assert!((matrix.get("a", "b").unwrap() - 1.0).abs() < 1e-9);
        assert!((matrix.get("a", "a").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_matrix_is_symmetric() {
        let table = two_column_table(
            &[Some(1.0), Some(3.0), Some(2.0), Some(5.0)],
            &[Some(2.0), Some(1.0), Some(4.0), Some(3.0)],
        );
        let matrix = CorrelationEngine::new()
            .matrix(&table, CorrelationMethod::Pearson)
            .unwrap();
        assert_eq!(matrix.get("a", "b"), matrix.get("b", "a"));
    }

    #[test]
    fn test_zero_variance_is_nan() {
        let table = two_column_table(
            &[Some(5.0), Some(5.0), Some(5.0)],
            &[Some(1.0), Some(2.0), Some(3.0)],
        );
        let matrix = CorrelationEngine::new()
            .matrix(&table, CorrelationMethod::Pearson)
            .unwrap();
        assert!(matrix.get("a", "b").unwrap().is_nan());
        assert!(matrix.get("a", "a").unwrap().is_nan());
        assert!((matrix.get("b", "b").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pairwise_complete_rows() {
        // Row 2 is dropped for this pair only because one side is missing.
        let table = two_column_table(
            &[Some(1.0), Some(2.0), None, Some(4.0)],
            &[Some(2.0), Some(4.0), Some(100.0), Some(8.0)],
        );
        let matrix = CorrelationEngine::new()
            .matrix(&table, CorrelationMethod::Pearson)
            .unwrap();
        assert!((matrix.get("a", "b").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_numeric_column_insufficient() {
        let table = Table::new(vec![Column::new(
            "a",
            ColumnData::Float(vec![Some(1.0), Some(2.0)]),
        )])
        .unwrap();
        let err = CorrelationEngine::new()
            .matrix(&table, CorrelationMethod::Pearson)
            .unwrap_err();
        assert!(matches!(err, DataLensError::InsufficientData(_)));
    }

    #[test]
    fn test_spearman_monotonic_nonlinear() {
        // x^3 is monotone, so Spearman is exactly 1 where Pearson is not.
        let xs: Vec<Option<f64>> = (1..=6).map(|v| Some(v as f64)).collect();
        let ys: Vec<Option<f64>> = (1..=6).map(|v| Some((v as f64).powi(3))).collect();
        let table = two_column_table(&xs, &ys);
        let engine = CorrelationEngine::new();
        let spearman = engine.matrix(&table, CorrelationMethod::Spearman).unwrap();
        assert!((spearman.get("a", "b").unwrap() - 1.0).abs() < 1e-9);
        let pearson = engine.matrix(&table, CorrelationMethod::Pearson).unwrap();
        assert!(pearson.get("a", "b").unwrap() < 1.0);
    }

    #[test]
    fn test_kendall_reversed_sequence() {
        let table = two_column_table(
            &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            &[Some(4.0), Some(3.0), Some(2.0), Some(1.0)],
        );
        let matrix = CorrelationEngine::new()
            .matrix(&table, CorrelationMethod::Kendall)
            .unwrap();
        assert!((matrix.get("a", "b").unwrap() - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_significant_pairs_sorted_by_magnitude() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".into(), "b".into(), "c".into()],
            values: vec![
                vec![1.0, 0.6, -0.8],
                vec![0.6, 1.0, 0.95],
                vec![-0.8, 0.95, 1.0],
            ],
        };
        let pairs = CorrelationEngine::new().significant_pairs(&matrix, 0.5);
        let values: Vec<f64> = pairs.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0.95, -0.8, 0.6]);
        assert_eq!(pairs[0].interpretation, "very strong positive");
        assert_eq!(pairs[1].interpretation, "strong negative");
        assert_eq!(pairs[2].interpretation, "moderate positive");
    }

    #[test]
    fn test_significant_pairs_skips_nan() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".into(), "b".into()],
            values: vec![vec![1.0, f64::NAN], vec![f64::NAN, 1.0]],
        };
        let pairs = CorrelationEngine::new().significant_pairs(&matrix, 0.0);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_full_report_degrades_on_error() {
        let table = Table::new(vec![Column::new(
            "t",
            ColumnData::Text(vec![Some("x".to_string())]),
        )])
        .unwrap();
        let report =
            CorrelationEngine::new().full_report(&table, CorrelationMethod::Pearson, 0.5);
        assert!(report.matrix.is_none());
        assert!(report.error.is_some());
        assert!(report.significant.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_full_report_recommendations() {
        let table = two_column_table(
            &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            &[Some(2.0), Some(4.0), Some(6.0), Some(8.0)],
        );
        let report =
            CorrelationEngine::new().full_report(&table, CorrelationMethod::Pearson, 0.5);
        assert!(report.error.is_none());
        assert_eq!(report.significant.len(), 1);
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("redundant"));
        let summary = report.summary.unwrap();
        assert_eq!(summary.pair_count, 1);
        assert_eq!(summary.significant_count, 1);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(
            "Spearman".parse::<CorrelationMethod>().unwrap(),
            CorrelationMethod::Spearman
        );
        assert!(matches!(
            "cosine".parse::<CorrelationMethod>(),
            Err(DataLensError::InvalidMethod(_))
        ));
    }
}
