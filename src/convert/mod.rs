//! CSV to Parquet conversion
//!
//! # Module Structure
//!
//! - `chunked`: streaming CSV → Parquet conversion, one row group per chunk
//! - `hook`: post-conversion launch of the loader binary

pub mod chunked;
pub mod hook;

pub use chunked::{convert_csv_to_parquet, ConvertStats};
pub use hook::{run_loader, LoaderInvocation, LOADER_BIN};
