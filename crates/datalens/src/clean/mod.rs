//! Data cleaning: problem detection and a fixed-order repair pipeline.

mod config;

pub use config::{
    CleaningConfig, DedupKeep, NormalizeMethod, NullStrategy, OutlierTreatment,
};

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{DataLensError, Result};
use crate::stats::{mean, population_std, quantile};
use crate::table::{ColumnData, Table};

/// Outliers on each side of the IQR fences for one column.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutlierCounts {
    pub below: usize,
    pub above: usize,
    pub total: usize,
}

/// Everything wrong with a table, found in one read-only pass.
#[derive(Debug, Clone, Serialize)]
pub struct DataProblems {
    pub null_counts: IndexMap<String, usize>,
    pub duplicate_rows: usize,
    pub empty_columns: Vec<String>,
    /// IQR-fence counts per numeric column.
    pub outlier_counts: IndexMap<String, OutlierCounts>,
}

/// What a pipeline run did. An empty `actions` list means the input was
/// already clean under the given configuration.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub actions: Vec<String>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
}

/// Cleaned table plus the report and the pre-cleaning problem scan.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub table: Table,
    pub report: CleaningReport,
    pub problems: DataProblems,
}

/// Scan a table for nulls, duplicates, empty columns and outliers
/// without modifying anything.
pub fn detect_problems(table: &Table) -> DataProblems {
    let mut null_counts = IndexMap::new();
    let mut empty_columns = Vec::new();
    let mut outlier_counts = IndexMap::new();

    for column in table.columns() {
        let missing = column.data.missing_count();
        null_counts.insert(column.name.clone(), missing);
        if column.data.len() > 0 && missing == column.data.len() {
            empty_columns.push(column.name.clone());
        }

        if column.is_numeric() {
            let values = column.numeric_values();
            if values.len() < 2 {
                continue;
            }
            let (lower, upper) = iqr_fences(&values);
            let below = values.iter().filter(|v| **v < lower).count();
            let above = values.iter().filter(|v| **v > upper).count();
            outlier_counts.insert(
                column.name.clone(),
                OutlierCounts {
                    below,
                    above,
                    total: below + above,
                },
            );
        }
    }

    DataProblems {
        null_counts,
        duplicate_rows: table.duplicate_row_count(),
        empty_columns,
        outlier_counts,
    }
}

/// Runs the cleaning steps in a fixed order: empty columns, duplicates,
/// nulls, outliers, normalization.
#[derive(Debug, Default)]
pub struct CleaningPipeline;

impl CleaningPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Clean `table` per `config`, returning a new table.
    ///
    /// Re-running the pipeline on its own output with the same
    /// configuration records no actions. A step failure aborts the run
    /// with the step name attached to the error.
    pub fn apply(&self, table: &Table, config: &CleaningConfig) -> Result<CleaningOutcome> {
        // Unknown targets are a configuration error, caught before any
        // step runs.
        if let Some(targets) = &config.target_columns {
            for name in targets {
                table.require_column(name)?;
            }
        }

        let problems = detect_problems(table);
        let mut actions = Vec::new();
        let rows_before = table.row_count();
        let columns_before = table.column_count();
        let mut current = table.clone();

        if config.drop_empty_columns {
            current = self.drop_empty_columns(&current, &mut actions);
        }
        if config.deduplicate {
            current = self.deduplicate(&current, config.dedup_keep, &mut actions);
        }
        current = self
            .repair_nulls(&current, config, &mut actions)
            .map_err(|e| e.in_step("nulls"))?;
        if let Some(treatment) = config.outlier_treatment {
            current = self
                .treat_outliers(&current, treatment, config, &mut actions)
                .map_err(|e| e.in_step("outliers"))?;
        }
        if let Some(method) = config.normalize {
            current = self
                .normalize(&current, method, config, &mut actions)
                .map_err(|e| e.in_step("normalize"))?;
        }

        let report = CleaningReport {
            actions,
            rows_before,
            rows_after: current.row_count(),
            columns_before,
            columns_after: current.column_count(),
        };
        Ok(CleaningOutcome {
            table: current,
            report,
            problems,
        })
    }

    fn drop_empty_columns(&self, table: &Table, actions: &mut Vec<String>) -> Table {
        let empty: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| c.data.len() > 0 && c.data.missing_count() == c.data.len())
            .map(|c| c.name.clone())
            .collect();
        if empty.is_empty() {
            return table.clone();
        }
        actions.push(format!(
            "dropped {} empty column(s): {}",
            empty.len(),
            empty.join(", ")
        ));
        table.without_columns(&empty)
    }

    fn deduplicate(&self, table: &Table, keep: DedupKeep, actions: &mut Vec<String>) -> Table {
        let rows = table.row_count();
        if rows == 0 {
            return table.clone();
        }

        let keys: Vec<u64> = (0..rows).map(|r| table.row_key(r)).collect();
        let mut indices: Vec<usize> = match keep {
            DedupKeep::First => {
                let mut seen = HashMap::new();
                (0..rows)
                    .filter(|&r| seen.insert(keys[r], ()).is_none())
                    .collect()
            }
            DedupKeep::Last => {
                let mut seen = HashMap::new();
                let mut picked: Vec<usize> = (0..rows)
                    .rev()
                    .filter(|&r| seen.insert(keys[r], ()).is_none())
                    .collect();
                picked.reverse();
                picked
            }
            DedupKeep::None => {
                let mut counts: HashMap<u64, usize> = HashMap::new();
                for &key in &keys {
                    *counts.entry(key).or_insert(0) += 1;
                }
                (0..rows).filter(|&r| counts[&keys[r]] == 1).collect()
            }
        };
        indices.sort_unstable();

        let removed = rows - indices.len();
        if removed == 0 {
            return table.clone();
        }
        actions.push(format!("removed {removed} duplicate row(s)"));
        table.take_rows(&indices)
    }

    fn repair_nulls(
        &self,
        table: &Table,
        config: &CleaningConfig,
        actions: &mut Vec<String>,
    ) -> Result<Table> {
        let targets = self.present_targets(table, config);

        match config.null_strategy {
            NullStrategy::Ignore => Ok(table.clone()),
            NullStrategy::Eliminate => {
                let keep: Vec<bool> = (0..table.row_count())
                    .map(|row| {
                        targets.iter().all(|name| {
                            table
                                .column(name)
                                .is_none_or(|c| !c.data.is_missing(row))
                        })
                    })
                    .collect();
                let removed = keep.iter().filter(|k| !**k).count();
                if removed == 0 {
                    return Ok(table.clone());
                }
                actions.push(format!("removed {removed} row(s) with missing values"));
                Ok(table.filter_rows(&keep))
            }
            NullStrategy::Mean | NullStrategy::Median => {
                let mut current = table.clone();
                for name in &targets {
                    let Some(index) = current.column_index(name) else {
                        continue;
                    };
                    let column = &current.columns()[index];
                    // Non-numeric columns are left alone under numeric
                    // fill strategies.
                    if !column.is_numeric() {
                        continue;
                    }
                    let missing = column.data.missing_count();
                    if missing == 0 || missing == column.data.len() {
                        continue;
                    }
                    let values = column.numeric_values();
                    let fill = if config.null_strategy == NullStrategy::Mean {
                        mean(&values)
                    } else {
                        let mut sorted = values;
                        sorted.sort_by(|a, b| a.total_cmp(b));
                        quantile(&sorted, 0.5)
                    };
                    let label = if config.null_strategy == NullStrategy::Mean {
                        "mean"
                    } else {
                        "median"
                    };
                    let filled = numeric_fill(&column.data, fill);
                    actions.push(format!(
                        "filled {missing} missing value(s) in '{name}' with the {label}"
                    ));
                    current = current.with_column_data(index, filled);
                }
                Ok(current)
            }
            NullStrategy::Mode => {
                let mut current = table.clone();
                for name in &targets {
                    let Some(index) = current.column_index(name) else {
                        continue;
                    };
                    let column = &current.columns()[index];
                    let missing = column.data.missing_count();
                    if missing == 0 || missing == column.data.len() {
                        continue;
                    }
                    if let Some(filled) = mode_fill(&column.data) {
                        actions.push(format!(
                            "filled {missing} missing value(s) in '{name}' with the mode"
                        ));
                        current = current.with_column_data(index, filled);
                    }
                }
                Ok(current)
            }
            NullStrategy::ForwardFill | NullStrategy::BackwardFill => {
                let backward = config.null_strategy == NullStrategy::BackwardFill;
                let mut current = table.clone();
                for name in &targets {
                    let Some(index) = current.column_index(name) else {
                        continue;
                    };
                    let column = &current.columns()[index];
                    if column.data.missing_count() == 0 {
                        continue;
                    }
                    let filled = directional_fill(&column.data, backward);
                    let repaired =
                        column.data.missing_count() - filled.missing_count();
                    if repaired == 0 {
                        continue;
                    }
                    let label = if backward { "backward" } else { "forward" };
                    actions.push(format!(
                        "{label}-filled {repaired} missing value(s) in '{name}'"
                    ));
                    current = current.with_column_data(index, filled);
                }
                Ok(current)
            }
        }
    }

    fn treat_outliers(
        &self,
        table: &Table,
        treatment: OutlierTreatment,
        config: &CleaningConfig,
        actions: &mut Vec<String>,
    ) -> Result<Table> {
        let targets = self.numeric_targets(table, config)?;

        match treatment {
            OutlierTreatment::Cap => {
                let mut current = table.clone();
                for name in &targets {
                    let Some(index) = current.column_index(name) else {
                        continue;
                    };
                    let column = &current.columns()[index];
                    let values = column.numeric_values();
                    if values.len() < 2 {
                        continue;
                    }
                    let (lower, upper) = iqr_fences(&values);
                    let capped = values.iter().filter(|v| **v < lower || **v > upper).count();
                    if capped == 0 {
                        continue;
                    }
                    let data = ColumnData::Float(
                        (0..column.data.len())
                            .map(|i| column.data.numeric_at(i).map(|v| v.clamp(lower, upper)))
                            .collect(),
                    );
                    actions.push(format!("capped {capped} outlier(s) in '{name}'"));
                    current = current.with_column_data(index, data);
                }
                Ok(current)
            }
            OutlierTreatment::RemoveIqr | OutlierTreatment::RemoveZscore => {
                let mut keep = vec![true; table.row_count()];
                for name in &targets {
                    let Some(column) = table.column(name) else {
                        continue;
                    };
                    let values = column.numeric_values();
                    if values.len() < 2 {
                        continue;
                    }
                    // Missing cells never mark a row as outlying.
                    match treatment {
                        OutlierTreatment::RemoveIqr => {
                            let (lower, upper) = iqr_fences(&values);
                            for (row, flag) in keep.iter_mut().enumerate() {
                                if let Some(v) = column.data.numeric_at(row) {
                                    if v < lower || v > upper {
                                        *flag = false;
                                    }
                                }
                            }
                        }
                        OutlierTreatment::RemoveZscore => {
                            let m = mean(&values);
                            let std = population_std(&values);
                            if std == 0.0 || std.is_nan() {
                                continue;
                            }
                            for (row, flag) in keep.iter_mut().enumerate() {
                                if let Some(v) = column.data.numeric_at(row) {
                                    if ((v - m) / std).abs() > 3.0 {
                                        *flag = false;
                                    }
                                }
                            }
                        }
                        OutlierTreatment::Cap => unreachable!(),
                    }
                }
                let removed = keep.iter().filter(|k| !**k).count();
                if removed == 0 {
                    return Ok(table.clone());
                }
                actions.push(format!("removed {removed} row(s) with outlying values"));
                Ok(table.filter_rows(&keep))
            }
        }
    }

    fn normalize(
        &self,
        table: &Table,
        method: NormalizeMethod,
        config: &CleaningConfig,
        actions: &mut Vec<String>,
    ) -> Result<Table> {
        let targets = self.numeric_targets(table, config)?;
        let mut current = table.clone();

        for name in &targets {
            let Some(index) = current.column_index(name) else {
                continue;
            };
            let column = &current.columns()[index];
            let values = column.numeric_values();
            if values.is_empty() {
                continue;
            }

            // Degenerate scales fall back to 1 so constant columns come
            // out centered instead of dividing by zero.
            let (center, scale) = match method {
                NormalizeMethod::MinMax => {
                    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    (min, non_zero(max - min))
                }
                NormalizeMethod::ZScore => {
                    (mean(&values), non_zero(population_std(&values)))
                }
                NormalizeMethod::Robust => {
                    let mut sorted = values.clone();
                    sorted.sort_by(|a, b| a.total_cmp(b));
                    let q1 = quantile(&sorted, 0.25);
                    let q3 = quantile(&sorted, 0.75);
                    (quantile(&sorted, 0.5), non_zero(q3 - q1))
                }
            };

            let data = ColumnData::Float(
                (0..column.data.len())
                    .map(|i| column.data.numeric_at(i).map(|v| (v - center) / scale))
                    .collect(),
            );
            if data == column.data {
                continue;
            }
            let label = match method {
                NormalizeMethod::MinMax => "min_max",
                NormalizeMethod::ZScore => "z_score",
                NormalizeMethod::Robust => "robust",
            };
            actions.push(format!("normalized '{name}' ({label})"));
            current = current.with_column_data(index, data);
        }
        Ok(current)
    }

    /// Targets of the null step: the configured list filtered to columns
    /// still present, or every column.
    fn present_targets(&self, table: &Table, config: &CleaningConfig) -> Vec<String> {
        match &config.target_columns {
            Some(names) => names
                .iter()
                .filter(|n| table.column(n).is_some())
                .cloned()
                .collect(),
            None => table.columns().iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Targets of the outlier and normalize steps. Explicitly naming a
    /// non-numeric column is an error; with no explicit list every
    /// numeric column is used.
    fn numeric_targets(&self, table: &Table, config: &CleaningConfig) -> Result<Vec<String>> {
        match &config.target_columns {
            Some(names) => {
                let mut out = Vec::new();
                for name in names {
                    let Some(column) = table.column(name) else {
                        continue;
                    };
                    if !column.is_numeric() {
                        return Err(DataLensError::NotNumeric(name.clone()));
                    }
                    out.push(name.clone());
                }
                Ok(out)
            }
            None => Ok(table
                .numeric_columns()
                .iter()
                .map(|c| c.name.clone())
                .collect()),
        }
    }
}

fn non_zero(scale: f64) -> f64 {
    if scale == 0.0 || scale.is_nan() {
        1.0
    } else {
        scale
    }
}

fn iqr_fences(values: &[f64]) -> (f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let fence = 1.5 * (q3 - q1);
    (q1 - fence, q3 + fence)
}

/// Replace missing cells with a numeric constant, widening to float.
fn numeric_fill(data: &ColumnData, fill: f64) -> ColumnData {
    ColumnData::Float(
        (0..data.len())
            .map(|i| Some(data.numeric_at(i).unwrap_or(fill)))
            .collect(),
    )
}

fn most_frequent<T, K, F>(values: &[Option<T>], key: F) -> Option<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut counts: IndexMap<K, (usize, T)> = IndexMap::new();
    for value in values.iter().flatten() {
        counts
            .entry(key(value))
            .and_modify(|e| e.0 += 1)
            .or_insert((1, value.clone()));
    }
    let mut best: Option<(usize, T)> = None;
    for (_, (count, value)) in counts {
        match &best {
            Some((top, _)) if *top >= count => {}
            _ => best = Some((count, value)),
        }
    }
    best.map(|(_, value)| value)
}

fn fill_constant<T: Clone>(values: &[Option<T>], fill: &T) -> Vec<Option<T>> {
    values
        .iter()
        .map(|c| c.clone().or_else(|| Some(fill.clone())))
        .collect()
}

/// Mode fill works on every column type; `None` means the column had no
/// values to take a mode from.
fn mode_fill(data: &ColumnData) -> Option<ColumnData> {
    match data {
        ColumnData::Integer(v) => {
            most_frequent(v, |x| *x).map(|m| ColumnData::Integer(fill_constant(v, &m)))
        }
        ColumnData::Float(v) => {
            most_frequent(v, |x| x.to_bits()).map(|m| ColumnData::Float(fill_constant(v, &m)))
        }
        ColumnData::Text(v) => {
            most_frequent(v, |x| x.clone()).map(|m| ColumnData::Text(fill_constant(v, &m)))
        }
        ColumnData::Categorical { levels, codes } => most_frequent(codes, |x| *x).map(|m| {
            ColumnData::Categorical {
                levels: levels.clone(),
                codes: fill_constant(codes, &m),
            }
        }),
        ColumnData::DateTime(v) => {
            most_frequent(v, |x| *x).map(|m| ColumnData::DateTime(fill_constant(v, &m)))
        }
        ColumnData::Boolean(v) => {
            most_frequent(v, |x| *x).map(|m| ColumnData::Boolean(fill_constant(v, &m)))
        }
    }
}

fn directional<T: Clone>(values: &[Option<T>], backward: bool) -> Vec<Option<T>> {
    let mut carried: Option<T> = None;
    let mut out: Vec<Option<T>> = Vec::with_capacity(values.len());
    let iter: Box<dyn Iterator<Item = &Option<T>>> = if backward {
        Box::new(values.iter().rev())
    } else {
        Box::new(values.iter())
    };
    for cell in iter {
        if cell.is_some() {
            carried = cell.clone();
        }
        out.push(cell.clone().or_else(|| carried.clone()));
    }
    if backward {
        out.reverse();
    }
    out
}

fn directional_fill(data: &ColumnData, backward: bool) -> ColumnData {
    match data {
        ColumnData::Integer(v) => ColumnData::Integer(directional(v, backward)),
        ColumnData::Float(v) => ColumnData::Float(directional(v, backward)),
        ColumnData::Text(v) => ColumnData::Text(directional(v, backward)),
        ColumnData::Categorical { levels, codes } => ColumnData::Categorical {
            levels: levels.clone(),
            codes: directional(codes, backward),
        },
        ColumnData::DateTime(v) => ColumnData::DateTime(directional(v, backward)),
        ColumnData::Boolean(v) => ColumnData::Boolean(directional(v, backward)),
    }
}
