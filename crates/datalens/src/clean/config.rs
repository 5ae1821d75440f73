//! Cleaning pipeline configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DataLensError, Result};

/// How missing values are repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullStrategy {
    /// Leave missing cells alone.
    Ignore,
    /// Drop every row with a missing cell in a target column.
    Eliminate,
    /// Fill numeric columns with their mean.
    Mean,
    /// Fill numeric columns with their median.
    Median,
    /// Fill any column with its most frequent value.
    Mode,
    /// Carry the previous non-missing value forward.
    ForwardFill,
    /// Carry the next non-missing value backward.
    BackwardFill,
}

impl FromStr for NullStrategy {
    type Err = DataLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(NullStrategy::Ignore),
            "eliminate" | "drop" => Ok(NullStrategy::Eliminate),
            "mean" => Ok(NullStrategy::Mean),
            "median" => Ok(NullStrategy::Median),
            "mode" => Ok(NullStrategy::Mode),
            "forward_fill" | "ffill" => Ok(NullStrategy::ForwardFill),
            "backward_fill" | "bfill" => Ok(NullStrategy::BackwardFill),
            other => Err(DataLensError::InvalidMethod(other.to_string())),
        }
    }
}

/// What to do with outlying values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierTreatment {
    /// Clamp values to the IQR fences.
    Cap,
    /// Drop rows outside the IQR fences.
    RemoveIqr,
    /// Drop rows with |z| above 3, population sigma.
    RemoveZscore,
}

impl FromStr for OutlierTreatment {
    type Err = DataLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cap" => Ok(OutlierTreatment::Cap),
            "remove_iqr" => Ok(OutlierTreatment::RemoveIqr),
            "remove_zscore" => Ok(OutlierTreatment::RemoveZscore),
            other => Err(DataLensError::InvalidMethod(other.to_string())),
        }
    }
}

/// Rescaling applied to numeric columns at the end of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMethod {
    /// Rescale into [0, 1].
    MinMax,
    /// Center on the mean and divide by population sigma.
    ZScore,
    /// Center on the median and divide by the IQR.
    Robust,
}

impl FromStr for NormalizeMethod {
    type Err = DataLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "min_max" | "minmax" => Ok(NormalizeMethod::MinMax),
            "z_score" | "zscore" => Ok(NormalizeMethod::ZScore),
            "robust" => Ok(NormalizeMethod::Robust),
            other => Err(DataLensError::InvalidMethod(other.to_string())),
        }
    }
}

/// Which duplicate row survives deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKeep {
    First,
    Last,
    /// Drop every row that has a duplicate, including the original.
    None,
}

/// Full configuration for one [`CleaningPipeline::apply`] run.
///
/// [`CleaningPipeline::apply`]: super::CleaningPipeline::apply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub drop_empty_columns: bool,
    pub deduplicate: bool,
    pub dedup_keep: DedupKeep,
    pub null_strategy: NullStrategy,
    pub outlier_treatment: Option<OutlierTreatment>,
    pub normalize: Option<NormalizeMethod>,
    /// Restrict null, outlier and normalize steps to these columns.
    /// `None` means every applicable column.
    pub target_columns: Option<Vec<String>>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            drop_empty_columns: true,
            deduplicate: true,
            dedup_keep: DedupKeep::First,
            null_strategy: NullStrategy::Mean,
            outlier_treatment: None,
            normalize: None,
            target_columns: None,
        }
    }
}
