//! parquet-lookup - CSV to Parquet to SQLite lookup pipeline
//!
//! A small set of command-line tools for turning a large CSV file into a
//! columnar Parquet file, loading it into an embedded SQLite store with
//! indexes on its lookup columns, and running validated equality searches
//! whose results are exported as CSV, JSON lines or Parquet.
//!
//! # Tools
//!
//! - **pq-generate**: writes a synthetic 50-column CSV for testing.
//! - **pq-convert**: streams the CSV into a single Snappy-compressed Parquet
//!   file, one row group per chunk, and optionally launches the loader.
//! - **pq-load**: (re)creates a table from the Parquet file and indexes the
//!   lookup columns (`col_0`, `col_1`, `col_2`).
//! - **pq-search**: probes table schemas at runtime, validates the request,
//!   runs one parameterized query (optionally joining two tables) and
//!   exports the matches.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐   chunks    ┌──────────────┐   batches   ┌──────────────┐
//!  │  sample.csv  │ ──────────► │ sample.parquet│ ──────────► │  engine.db   │
//!  └──────────────┘  (convert)  └──────────────┘   (store)   └──────┬───────┘
//!         ▲                              │                           │
//!         │ generate                     └─ loader hook (pq-load) ───┤
//!                                                                    │ probe
//!                                                                    ▼
//!                                    ┌─────────────────────────────────────┐
//!                                    │ search: validate → query → export   │
//!                                    └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! pq-generate --rows 100000
//! pq-convert --chunk 50000 --load yes
//! pq-search --tables data --field col_1 --value 42.0 --columns col_0 col_2 --format json
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod generate;
pub mod logging;
pub mod progress;
pub mod search;
pub mod store;

pub use config::{ConvertConfig, ExportFormat, GenerateConfig, LoadConfig, SearchRequest};
pub use convert::{convert_csv_to_parquet, run_loader, ConvertStats, LoaderInvocation};
pub use error::{ExecutionError, PipelineError, Result, ValidationError};
pub use generate::generate_csv;
pub use search::{run_search, SearchOutcome};
pub use store::{load_parquet, LoadOutcome};
