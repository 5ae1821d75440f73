//! Main DataLens struct and public API.

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use crate::clean::{CleaningConfig, CleaningOutcome, CleaningPipeline};
use crate::correlate::{CorrelationEngine, CorrelationMethod, CorrelationReport};
use crate::error::Result;
use crate::infer::SchemaInferencer;
use crate::load::{LoadMetadata, LoadOptions, Loader};
use crate::stats::{ColumnProfile, DatasetSummary, StatisticsEngine};
use crate::table::{ColumnType, Table};
use crate::validate::{validate_table, ValidationReport};

/// Configuration for a full analysis run.
#[derive(Debug, Clone)]
pub struct DataLensConfig {
    /// How the file is read and decoded.
    pub load: LoadOptions,
    /// Maximum rows to analyze (None = all).
    pub max_rows: Option<usize>,
    /// Estimator for the correlation report.
    pub correlation_method: CorrelationMethod,
    /// |r| cutoff for significant correlation pairs.
    pub correlation_threshold: f64,
    /// Apply the type optimizer to the loaded table before analysis.
    pub optimize_types: bool,
}

impl Default for DataLensConfig {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            max_rows: None,
            correlation_method: CorrelationMethod::Pearson,
            correlation_threshold: 0.5,
            optimize_types: true,
        }
    }
}

/// Result of analyzing a data file.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// How the file was read.
    pub metadata: LoadMetadata,
    /// Suggested semantic type per column.
    pub suggested_types: IndexMap<String, ColumnType>,
    /// Per-column descriptive profiles.
    pub profiles: Vec<ColumnProfile>,
    /// Whole-table shape and missingness.
    pub summary: DatasetSummary,
    /// Structural problems and quality scores.
    pub validation: ValidationReport,
    /// Correlation findings; degrades to an error message inside the
    /// report when the table has too few numeric columns.
    pub correlation: CorrelationReport,
}

/// The main analysis engine, wiring the loader and the analysis passes
/// together behind one call.
pub struct DataLens {
    config: DataLensConfig,
    loader: Loader,
    inferencer: SchemaInferencer,
    statistics: StatisticsEngine,
    correlation: CorrelationEngine,
}

impl DataLens {
    /// Create a new instance with default configuration.
    pub fn new() -> Self {
        Self::with_config(DataLensConfig::default())
    }

    /// Create an instance with custom configuration.
    pub fn with_config(config: DataLensConfig) -> Self {
        Self {
            config,
            loader: Loader::new(),
            inferencer: SchemaInferencer::new(),
            statistics: StatisticsEngine::new(),
            correlation: CorrelationEngine::new(),
        }
    }

    /// Load a file without running any analysis.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(Table, LoadMetadata)> {
        match self.config.max_rows {
            Some(limit) => self
                .loader
                .preview_with(path.as_ref(), &self.config.load, limit),
            None => self.loader.load(path.as_ref(), &self.config.load),
        }
    }

    /// Load a file and run the full analysis pass over it.
    pub fn analyze(&self, path: impl AsRef<Path>) -> Result<AnalysisResult> {
        let (loaded, metadata) = self.load(path)?;

        let table = if self.config.optimize_types {
            self.inferencer.optimize(&loaded)
        } else {
            loaded
        };

        let suggested_types = self.inferencer.suggest_types(&table);
        let profiles = self.statistics.profile_all(&table);
        let summary = self.statistics.dataset_summary(&table);
        let validation = validate_table(&table);
        let correlation = self.correlation.full_report(
            &table,
            self.config.correlation_method,
            self.config.correlation_threshold,
        );

        Ok(AnalysisResult {
            metadata,
            suggested_types,
            profiles,
            summary,
            validation,
            correlation,
        })
    }

    /// Load a file, then clean it per `config`.
    pub fn load_and_clean(
        &self,
        path: impl AsRef<Path>,
        config: &CleaningConfig,
    ) -> Result<(CleaningOutcome, LoadMetadata)> {
        let (table, metadata) = self.load(path)?;
        let outcome = CleaningPipeline::new().apply(&table, config)?;
        Ok((outcome, metadata))
    }
}

impl Default for DataLens {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;
    use tempfile::NamedTempFile;

    fn create_test_file(content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_analyze_simple_csv() {
        let content = "id,score,group\n1,10.5,a\n2,20.5,b\n3,30.5,a\n";
        let file = create_test_file(content);

        let result = DataLens::new().analyze(file.path()).unwrap();

        assert_eq!(result.summary.rows, 3);
        assert_eq!(result.summary.columns, 3);
        assert_eq!(result.suggested_types["id"], ColumnType::Integer);
        assert_eq!(result.suggested_types["score"], ColumnType::Float);
        assert!(result.validation.is_valid());
        // id and score correlate perfectly on this fixture.
        assert!(result.correlation.error.is_none());
        assert_eq!(result.correlation.significant.len(), 1);
    }

    #[test]
    fn test_analyze_respects_max_rows() {
        let mut content = String::from("v\n");
        for i in 0..100 {
            content.push_str(&format!("{i}\n"));
        }
        let file = create_test_file(&content);

        let lens = DataLens::with_config(DataLensConfig {
            max_rows: Some(10),
            ..DataLensConfig::default()
        });
        let result = lens.analyze(file.path()).unwrap();
        assert_eq!(result.summary.rows, 10);
    }

    #[test]
    fn test_correlation_degrades_without_numeric_columns() {
        let content = "name,city\nana,lima\nbo,oslo\n";
        let file = create_test_file(content);

        let result = DataLens::new().analyze(file.path()).unwrap();
        assert!(result.correlation.error.is_some());
        assert!(result.correlation.matrix.is_none());
    }

    #[test]
    fn test_load_and_clean() {
        let content = "v\n1\nNA\n3\n3\n";
        let file = create_test_file(content);

        let (outcome, metadata) = DataLens::new()
            .load_and_clean(file.path(), &CleaningConfig::default())
            .unwrap();
        assert_eq!(metadata.row_count, 4);
        // One duplicate row removed, one missing value filled.
        assert_eq!(outcome.table.row_count(), 3);
        assert_eq!(outcome.table.column("v").unwrap().data.missing_count(), 0);
    }
}
