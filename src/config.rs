//! Configuration types for parquet-lookup
//!
//! This module defines:
//! - CLI argument parsing for each binary using clap derive macros
//! - Validated runtime configuration built from those arguments
//! - The fixed export format enumeration

use crate::error::ValidationError;
use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

/// Default CSV source / generator output
pub const DEFAULT_CSV_PATH: &str = "data/sample.csv";

/// Default Parquet file shared by converter and loader
pub const DEFAULT_PARQUET_PATH: &str = "data/sample.parquet";

/// Default persistent store
pub const DEFAULT_DB_PATH: &str = "data/engine.db";

/// Default table name
pub const DEFAULT_TABLE: &str = "data";

/// Default search export stem (extension is appended)
pub const DEFAULT_OUTPUT_STEM: &str = "data/search_output";

/// Default rows per converter chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Default synthetic row count
pub const DEFAULT_GENERATE_ROWS: u64 = 1_000_000;

/// Default log directory
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Maximum number of tables in a search
pub const MAX_SEARCH_TABLES: usize = 2;

/// Parse CLI arguments, exiting with code 1 on usage errors.
///
/// Help and version requests still exit 0.
pub fn parse_args<T: Parser>() -> Result<T, ExitCode> {
    match T::try_parse() {
        Ok(args) => Ok(args),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            Err(ExitCode::SUCCESS)
        }
        Err(e) => {
            let _ = e.print();
            Err(ExitCode::FAILURE)
        }
    }
}

/// A yes/no switch, spelled out on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn enabled(self) -> bool {
        self == YesNo::Yes
    }
}

/// Export format for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Parquet,
}

impl ExportFormat {
    /// File extension (also the CLI spelling)
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Parquet => "parquet",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "parquet" => Ok(ExportFormat::Parquet),
            other => Err(ValidationError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Convert a large CSV file to Parquet in bounded chunks
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pq-convert",
    version,
    about = "Convert a large CSV file to Parquet and optionally load it into the store",
    after_help = "EXAMPLES:\n    \
        pq-convert --csv data/sample.csv --parquet data/sample.parquet\n    \
        pq-convert --chunk 250000 --load yes"
)]
pub struct ConvertArgs {
    /// Path to the input CSV file
    #[arg(long, default_value = DEFAULT_CSV_PATH, value_name = "PATH")]
    pub csv: PathBuf,

    /// Path to the output Parquet file
    #[arg(long, default_value = DEFAULT_PARQUET_PATH, value_name = "PATH")]
    pub parquet: PathBuf,

    /// Rows per streaming chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_name = "ROWS")]
    pub chunk: usize,

    /// Run the loader after a successful conversion
    #[arg(long, value_enum, default_value_t = YesNo::No)]
    pub load: YesNo,

    /// Store file handed to the loader
    #[arg(long, default_value = DEFAULT_DB_PATH, value_name = "PATH")]
    pub db: PathBuf,

    /// Table name handed to the loader
    #[arg(long, default_value = DEFAULT_TABLE, value_name = "NAME")]
    pub table: String,

    /// Directory for per-run log files
    #[arg(long, default_value = DEFAULT_LOG_DIR, value_name = "DIR")]
    pub log_dir: PathBuf,

    /// Debug-level logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated converter configuration
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub csv_path: PathBuf,
    pub parquet_path: PathBuf,
    pub chunk_size: usize,
    pub load_after: bool,
    pub db_path: PathBuf,
    pub table: String,
    pub log_dir: PathBuf,
}

impl ConvertConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: ConvertArgs) -> Result<Self, ValidationError> {
        if args.chunk == 0 {
            return Err(ValidationError::InvalidChunkSize);
        }
        validate_table_name(&args.table)?;

        Ok(Self {
            csv_path: args.csv,
            parquet_path: args.parquet,
            chunk_size: args.chunk,
            load_after: args.load.enabled(),
            db_path: args.db,
            table: args.table,
            log_dir: args.log_dir,
        })
    }
}

/// Load a Parquet file into a table of the persistent store
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pq-load",
    version,
    about = "Load a Parquet file into the store and index its lookup columns"
)]
pub struct LoadArgs {
    /// Parquet file to load
    #[arg(long, default_value = DEFAULT_PARQUET_PATH, value_name = "PATH")]
    pub parquet: PathBuf,

    /// Store file
    #[arg(long, default_value = DEFAULT_DB_PATH, value_name = "PATH")]
    pub db: PathBuf,

    /// Destination table
    #[arg(long, default_value = DEFAULT_TABLE, value_name = "NAME")]
    pub table: String,

    /// Drop and reload the table if it already exists
    #[arg(long, value_enum, default_value_t = YesNo::Yes)]
    pub recreate: YesNo,

    /// Directory for per-run log files
    #[arg(long, default_value = DEFAULT_LOG_DIR, value_name = "DIR")]
    pub log_dir: PathBuf,

    /// Suppress the progress spinner
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Debug-level logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated loader configuration
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub parquet_path: PathBuf,
    pub db_path: PathBuf,
    pub table: String,
    pub recreate: bool,
    pub show_progress: bool,
}

impl LoadConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: LoadArgs) -> Result<Self, ValidationError> {
        validate_table_name(&args.table)?;

        Ok(Self {
            parquet_path: args.parquet,
            db_path: args.db,
            table: args.table,
            recreate: args.recreate.enabled(),
            show_progress: !args.quiet,
        })
    }
}

/// Search one or two tables and export the matching rows
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pq-search",
    version,
    about = "Search and export data from the store",
    after_help = "EXAMPLES:\n    \
        pq-search --tables data --field col_1 --value 42.0 --columns col_0 col_2\n    \
        pq-search --tables orders users --join-on col_0 --field t1.col_2 \\\n              \
        --value name_123 --columns t1.col_0 t2.col_5 --format parquet"
)]
pub struct SearchArgs {
    /// Table(s) to search (at most two; the second is joined to the first)
    #[arg(long, required = true, num_args = 1.., value_name = "NAME")]
    pub tables: Vec<String>,

    /// Column shared by both tables (required with two tables)
    #[arg(long, value_name = "NAME")]
    pub join_on: Option<String>,

    /// Field to search on (must be an indexed lookup column)
    #[arg(long, value_name = "NAME")]
    pub field: String,

    /// Value to search for in the field
    #[arg(long, value_name = "VALUE", allow_hyphen_values = true)]
    pub value: String,

    /// Columns to extract
    #[arg(long, required = true, num_args = 1.., value_name = "NAME")]
    pub columns: Vec<String>,

    /// Export format: csv, json or parquet
    #[arg(long, default_value = "csv", value_name = "FORMAT")]
    pub format: String,

    /// Output file path without extension
    #[arg(long, default_value = DEFAULT_OUTPUT_STEM, value_name = "PATH")]
    pub output: PathBuf,

    /// Store file
    #[arg(long, default_value = DEFAULT_DB_PATH, value_name = "PATH")]
    pub db: PathBuf,

    /// Directory for per-run log files
    #[arg(long, default_value = DEFAULT_LOG_DIR, value_name = "DIR")]
    pub log_dir: PathBuf,

    /// Debug-level logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// A search as requested, before validation against the store.
///
/// Validation needs the probed schemas, so it happens in
/// [`crate::search::build_plan`] rather than here.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub tables: Vec<String>,
    pub join_on: Option<String>,
    pub field: String,
    pub value: String,
    pub columns: Vec<String>,
    pub format: String,
    pub output_stem: PathBuf,
}

impl SearchRequest {
    pub fn from_args(args: SearchArgs) -> Self {
        Self {
            tables: args.tables,
            join_on: args.join_on,
            field: args.field,
            value: args.value,
            columns: args.columns,
            format: args.format,
            output_stem: args.output,
        }
    }
}

/// Generate a synthetic 50-column CSV table
#[derive(Parser, Debug, Clone)]
#[command(name = "pq-generate", version, about = "Generate a synthetic 50-column CSV table")]
pub struct GenerateArgs {
    /// Output CSV file
    #[arg(short, long, default_value = DEFAULT_CSV_PATH, value_name = "PATH")]
    pub output: PathBuf,

    /// Number of data rows
    #[arg(long, default_value_t = DEFAULT_GENERATE_ROWS, value_name = "NUM")]
    pub rows: u64,

    /// Seed for reproducible output
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Directory for per-run log files
    #[arg(long, default_value = DEFAULT_LOG_DIR, value_name = "DIR")]
    pub log_dir: PathBuf,

    /// Suppress the progress spinner
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Debug-level logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Validated generator configuration
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub output_path: PathBuf,
    pub rows: u64,
    pub seed: Option<u64>,
    pub show_progress: bool,
}

impl GenerateConfig {
    pub fn from_args(args: GenerateArgs) -> Self {
        Self {
            output_path: args.output,
            rows: args.rows,
            seed: args.seed,
            show_progress: !args.quiet,
        }
    }
}

/// Table names reach SQL only as quoted identifiers, but NUL bytes and
/// empty names are never valid.
fn validate_table_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.contains('\0') {
        return Err(ValidationError::InvalidTableName(name.to_string()));
    }
    Ok(())
}
