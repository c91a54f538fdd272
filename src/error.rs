//! Error types for parquet-lookup
//!
//! Every library operation returns [`PipelineError`], a three-way
//! discriminated result:
//! - `NotFound`: a required input path or a named table is missing
//! - `Validation`: arguments were rejected before anything was mutated
//! - `Execution`: a read, write, query or export failed mid-operation
//!
//! All three are terminal for the calling binary. The binaries convert them
//! to a diagnostic on stderr and exit code 1 in a single handler.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the pipeline tools
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input path or table missing
    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    /// Rejected arguments
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Failure while running an operation
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl PipelineError {
    /// Missing file or directory
    pub fn path_not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        PipelineError::NotFound {
            what,
            name: path.into().display().to_string(),
        }
    }

    /// Missing table in the store
    pub fn table_not_found(table: &str) -> Self {
        PipelineError::NotFound {
            what: "Table",
            name: table.to_string(),
        }
    }

    /// Short category label, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NotFound { .. } => "not_found",
            PipelineError::Validation(_) => "validation",
            PipelineError::Execution(_) => "execution",
        }
    }
}

/// Category of one error in a chain, if it is one of ours.
///
/// The binaries call this over `anyhow::Error::chain()` to tag the final log line.
pub fn error_kind(err: &(dyn std::error::Error + 'static)) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        return Some(e.kind());
    }
    if err.is::<ValidationError>() {
        return Some("validation");
    }
    None
}

/// Argument and query validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Wrong number of tables
    #[error("Expected 1 or 2 tables, got {count}")]
    TableCount { count: usize },

    /// Filter field outside the indexed subset
    #[error("'{field}' is not a searchable field. Choose from: {}", allowed.join(", "))]
    FieldNotIndexed { field: String, allowed: Vec<String> },

    /// No output columns requested
    #[error("You must specify at least one column to extract")]
    NoColumns,

    /// Output column not present in any involved table
    #[error("Invalid column '{column}'. Available columns: {}", available.join(", "))]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },

    /// Two tables but no join column
    #[error("A join column (--join-on) is required when searching two tables")]
    MissingJoinColumn,

    /// Join column missing from one of the tables
    #[error("Join column '{column}' does not exist in table '{table}'")]
    JoinColumnNotShared { column: String, table: String },

    /// Export format outside the fixed set
    #[error("Export format must be one of: csv, json, parquet (got '{0}')")]
    InvalidFormat(String),

    /// Chunk size must be positive
    #[error("Chunk size must be at least 1")]
    InvalidChunkSize,

    /// Source file has no header line
    #[error("CSV source '{0}' has no header row")]
    MissingHeader(PathBuf),

    /// Table name unusable as an identifier
    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),
}

/// Failures during streaming, loading, querying or exporting
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Arrow error (CSV/JSON codecs, casts, batch assembly)
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet reader/writer error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value does not match its column's declared type
    #[error("Column '{column}' holds a {found} value, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The external loader process failed
    #[error("Loader '{program}' failed: {reason}")]
    Loader { program: String, reason: String },
}

macro_rules! lift_into_execution {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for PipelineError {
                fn from(e: $source) -> Self {
                    PipelineError::Execution(ExecutionError::from(e))
                }
            }
        )*
    };
}

lift_into_execution!(
    arrow::error::ArrowError,
    parquet::errors::ParquetError,
    rusqlite::Error,
    std::io::Error,
);

/// Result type alias for PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
