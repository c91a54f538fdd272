//! Persistent SQLite store
//!
//! Holds the tables loaded from Parquet and answers the search tool's
//! lookups. Identifiers are always double-quoted and values always bound.
//!
//! # Module Structure
//!
//! - `types`: Arrow ↔ SQL column type mapping
//! - `probe`: runtime schema discovery (table → typed column list)
//! - `loader`: Parquet → table load and lookup-column indexing

pub mod loader;
pub mod probe;
pub mod types;

pub use loader::{load_parquet, LoadOutcome};
pub use probe::{probe_table, ProbedColumn, QualifiedColumn, TableSchema};
pub use types::SqlType;

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::Path;

/// Suffixes of the columns that get an index and may be searched on
pub const LOOKUP_COLUMN_SUFFIXES: &[&str] = &["col_0", "col_1", "col_2"];

/// SQLite pragmas for bulk loading
const LOAD_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -128000;     -- 128MB cache
PRAGMA temp_store = MEMORY;
"#;

/// Open (creating if needed) the store for loading.
pub fn open_for_load(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch(LOAD_PRAGMAS)?;
    Ok(conn)
}

/// Open an existing store for querying.
pub fn open_for_search(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(crate::error::PipelineError::path_not_found(
            "Database",
            db_path,
        ));
    }
    Ok(Connection::open(db_path)?)
}

/// Quote an identifier for SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// True if the column is one of the indexed lookup columns
pub fn is_lookup_column(name: &str) -> bool {
    LOOKUP_COLUMN_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

/// Check whether a table exists
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Count the rows of a table
pub fn row_count(conn: &Connection, table: &str) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as u64)
}

/// Drop a table if present
pub fn drop_table(conn: &Connection, table: &str) -> Result<()> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
    Ok(())
}
