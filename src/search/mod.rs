//! Validated lookups against the store
//!
//! A search probes the live schema of its tables, validates the request
//! against it, runs a single parameterized query and exports the matches.
//!
//! ```text
//! SearchRequest ──► build_plan ──► QueryPlan ──► execute ──► ResultSet ──► export
//!                   (probe +                      (value       │
//!                    validate)                     bound)       └──► preview
//! ```

pub mod execute;
pub mod export;
pub mod plan;

pub use execute::{execute, ResultSet};
pub use export::{export, output_path, preview};
pub use plan::{build_plan, check_table_count, ProjectedColumn, QueryPlan};

use crate::config::SearchRequest;
use crate::error::Result;
use crate::progress::format_number;
use crate::store;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

/// Rows shown in the terminal preview
pub const PREVIEW_ROWS: usize = 10;

/// What a search produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Nothing matched; no file was written
    NoMatches,
    /// Matches were written to `path`
    Exported { rows: u64, path: PathBuf },
}

/// Open the store at `db_path` and run a search against it.
///
/// The table count is checked first, so a request that can never be valid
/// is reported as such even when the store is missing.
pub fn search_store(db_path: &Path, request: &SearchRequest) -> Result<SearchOutcome> {
    check_table_count(request)?;
    let conn = store::open_for_search(db_path)?;
    run_search(&conn, request)
}

/// Validate, run and export a search.
///
/// Prints the match count and a preview of the first rows before the export
/// is written. An empty result is not an error and leaves no output file.
pub fn run_search(conn: &Connection, request: &SearchRequest) -> Result<SearchOutcome> {
    let plan = build_plan(conn, request)?;
    info!(
        "Searching {} where {} = '{}'",
        request.tables.join(", "),
        plan.filter,
        plan.value
    );

    let result = execute(conn, &plan)?;
    if result.is_empty() {
        info!("No matching records found.");
        println!("No matching records found.");
        return Ok(SearchOutcome::NoMatches);
    }

    let rows = result.num_rows();
    println!("Found {} matching records.", format_number(rows));
    println!("{}", preview(&result, PREVIEW_ROWS)?);
    if rows > PREVIEW_ROWS as u64 {
        println!("... {} more rows", format_number(rows - PREVIEW_ROWS as u64));
    }

    let path = export(&result, plan.format, &request.output_stem)?;
    Ok(SearchOutcome::Exported { rows, path })
}
