//! DataLens: exploratory analysis engine for tabular datasets.
//!
//! DataLens loads delimited text, spreadsheets, JSON and Parquet into a
//! typed column-oriented table, then profiles, correlates, validates and
//! cleans it without ever mutating the loaded data in place.
//!
//! # Core Principles
//!
//! - **Resilient loading**: encoding, delimiter and schema are detected,
//!   and every fallback taken is recorded in the load metadata
//! - **Non-destructive**: cleaning and type optimization return new
//!   tables; the original is never modified
//! - **Degrade, don't fail**: report-producing paths carry errors inside
//!   the report instead of aborting the analysis
//!
//! # Example
//!
//! ```no_run
//! use datalens::DataLens;
//!
//! let lens = DataLens::new();
//! let result = lens.analyze("sales.csv").unwrap();
//!
//! println!("Rows: {}", result.summary.rows);
//! println!("Warnings: {}", result.validation.warnings.len());
//! ```

pub mod clean;
pub mod correlate;
pub mod error;
pub mod infer;
pub mod load;
pub mod stats;
pub mod table;
pub mod validate;

mod datalens;

pub use crate::datalens::{AnalysisResult, DataLens, DataLensConfig};
pub use clean::{
    CleaningConfig, CleaningOutcome, CleaningPipeline, CleaningReport, DataProblems,
    DedupKeep, NormalizeMethod, NullStrategy, OutlierTreatment, detect_problems,
};
pub use correlate::{
    CorrelationEngine, CorrelationMatrix, CorrelationMethod, CorrelationPair,
    CorrelationReport,
};
pub use error::{DataLensError, Result};
pub use infer::SchemaInferencer;
pub use load::{LoadMetadata, LoadOptions, Loader, SourceFormat};
pub use stats::{
    ColumnProfile, DatasetSummary, OutlierMethod, OutlierResult, StatisticsEngine,
};
pub use table::{Column, ColumnData, ColumnType, Table};
pub use validate::{
    AnalysisOperation, MemoryAssessment, QualityMetrics, ValidationReport, assess_memory,
    validate_table,
};
