//! Parquet to table loading
//!
//! Creates (or recreates) a table from a Parquet file's schema, inserts every
//! record inside one transaction, and indexes the lookup columns.

use crate::config::LoadConfig;
use crate::error::{PipelineError, Result};
use crate::progress::{format_number, ProgressCallback};
use crate::store::types::{to_store_array, SqlType};
use crate::store::{drop_table, is_lookup_column, quote_ident, row_count, table_exists};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{Float64Type, Int64Type, Schema};
use arrow::record_batch::RecordBatchReader;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::fs::File;
use tracing::{debug, error, info};

/// Rows per record batch read from Parquet
pub const LOAD_BATCH_ROWS: usize = 65_536;

/// Result of a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Table (re)created and filled
    Loaded { rows: u64, indexes: Vec<String> },

    /// Table existed and reloading was disabled
    Skipped { rows: u64 },
}

impl LoadOutcome {
    /// Rows in the table afterwards
    pub fn rows(&self) -> u64 {
        match self {
            LoadOutcome::Loaded { rows, .. } | LoadOutcome::Skipped { rows } => *rows,
        }
    }
}

/// Load a Parquet file into `config.table`.
pub fn load_parquet(
    conn: &mut Connection,
    config: &LoadConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<LoadOutcome> {
    let parquet_path = &config.parquet_path;
    let table = config.table.as_str();

    if !parquet_path.exists() {
        error!("Parquet file not found at: {}", parquet_path.display());
        return Err(PipelineError::path_not_found("Parquet file", parquet_path));
    }

    if table_exists(conn, table)? {
        if config.recreate {
            info!("Dropping and recreating table '{}'...", table);
            drop_table(conn, table)?;
        } else {
            info!("Table '{}' already exists. Skipping reload.", table);
            let rows = row_count(conn, table)?;
            info!("Row count: {}", format_number(rows));
            return Ok(LoadOutcome::Skipped { rows });
        }
    }

    info!("Loading data from: {}", parquet_path.display());
    let file = File::open(parquet_path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(LOAD_BATCH_ROWS)
        .build()?;
    let schema = reader.schema();
    let column_types: Vec<SqlType> = schema
        .fields()
        .iter()
        .map(|f| SqlType::from_arrow(f.data_type()))
        .collect();

    let tx = conn.transaction()?;
    tx.execute_batch(&create_table_sql(table, &schema, &column_types))?;

    let mut rows: u64 = 0;
    {
        let mut stmt = tx.prepare(&insert_sql(table, column_types.len()))?;
        for batch in reader {
            let batch = batch?;
            let columns = batch
                .columns()
                .iter()
                .zip(&column_types)
                .map(|(array, sql_type)| to_store_array(array, *sql_type))
                .collect::<Result<Vec<_>>>()?;

            for row in 0..batch.num_rows() {
                let values: Vec<ToSqlOutput<'_>> = columns
                    .iter()
                    .zip(&column_types)
                    .map(|(array, sql_type)| ToSqlOutput::Borrowed(value_at(array, *sql_type, row)))
                    .collect();
                stmt.execute(params_from_iter(values.iter()))?;
            }

            let batch_rows = batch.num_rows() as u64;
            rows += batch_rows;
            debug!("Inserted batch of {} rows ({} total)", batch_rows, rows);
            if let Some(ref cb) = progress_callback {
                cb(rows, batch_rows);
            }
        }
    }

    let indexes = create_lookup_indexes(&tx, table, &schema)?;
    tx.commit()?;

    // Refresh planner statistics for the new indexes
    conn.execute_batch("ANALYZE")?;

    info!(
        "Table '{}' created successfully with {} rows.",
        table,
        format_number(rows)
    );
    if !indexes.is_empty() {
        info!("Indexed lookup columns: {}", indexes.join(", "));
    }

    Ok(LoadOutcome::Loaded { rows, indexes })
}

fn create_table_sql(table: &str, schema: &Schema, column_types: &[SqlType]) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .zip(column_types)
        .map(|(field, sql_type)| format!("{} {}", quote_ident(field.name()), sql_type.decl()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(table), columns.join(", "))
}

fn insert_sql(table: &str, column_count: usize) -> String {
    let placeholders: Vec<String> = (1..=column_count).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(table),
        placeholders.join(", ")
    )
}

/// Index every lookup column; returns the indexed column names.
///
/// The table was just created, so an existing index with the same name
/// belongs to another table and fails the load.
fn create_lookup_indexes(conn: &Connection, table: &str, schema: &Schema) -> Result<Vec<String>> {
    let mut indexed = Vec::new();
    for field in schema.fields() {
        let column = field.name();
        if !is_lookup_column(column) {
            continue;
        }
        let index_name = index_name(table, column);
        conn.execute_batch(&format!(
            "CREATE INDEX {} ON {} ({})",
            quote_ident(&index_name),
            quote_ident(table),
            quote_ident(column)
        ))?;
        debug!("Created index {}", index_name);
        indexed.push(column.clone());
    }
    Ok(indexed)
}

/// `idx_<table length>_<table>_<column>`; the length keeps `a_b`/`col_0` and
/// `a`/`b_col_0` apart.
fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{}_{}", table.len(), table, column)
}

/// Borrow one cell of a store-typed array as an SQLite value.
fn value_at(array: &ArrayRef, sql_type: SqlType, row: usize) -> ValueRef<'_> {
    if array.is_null(row) {
        return ValueRef::Null;
    }
    match sql_type {
        SqlType::Integer => ValueRef::Integer(array.as_primitive::<Int64Type>().value(row)),
        SqlType::Real => ValueRef::Real(array.as_primitive::<Float64Type>().value(row)),
        SqlType::Boolean => ValueRef::Integer(i64::from(array.as_boolean().value(row))),
        SqlType::Text => ValueRef::Text(array.as_string::<i32>().value(row).as_bytes()),
        SqlType::Blob => ValueRef::Blob(array.as_binary::<i32>().value(row)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BinaryArray, BooleanArray, Float32Array, Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn write_parquet(dir: &Path, rows: i32) -> PathBuf {
        let schema = Arc::new(Schema::new(vec![
            Field::new("col_0", DataType::Int32, false),
            Field::new("col_1", DataType::Float32, true),
            Field::new("col_2", DataType::Utf8, true),
            Field::new("col_3", DataType::Binary, true),
            Field::new("flag", DataType::Boolean, true),
        ]));
        let ids: Vec<i32> = (0..rows).collect();
        let prices: Vec<Option<f32>> = (0..rows)
            .map(|i| if i % 2 == 0 { Some(i as f32 * 1.5) } else { None })
            .collect();
        let names: Vec<String> = (0..rows).map(|i| format!("name_{}", 100 + i)).collect();
        let blobs: Vec<&[u8]> = (0..rows).map(|_| b"\x01\xff".as_slice()).collect();
        let flags: Vec<bool> = (0..rows).map(|i| i % 3 == 0).collect();

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(ids)),
                Arc::new(Float32Array::from(prices)),
                Arc::new(StringArray::from(names)),
                Arc::new(BinaryArray::from(blobs)),
                Arc::new(BooleanArray::from(flags)),
            ],
        )
        .unwrap();

        let path = dir.join("input.parquet");
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        path
    }

    fn config(parquet_path: PathBuf, recreate: bool) -> LoadConfig {
        LoadConfig {
            parquet_path,
            db_path: PathBuf::from(":memory:"),
            table: "data".into(),
            recreate,
            show_progress: false,
        }
    }

    #[test]
    fn test_load_creates_typed_table() {
        let dir = tempdir().unwrap();
        let parquet_path = write_parquet(dir.path(), 10);
        let mut conn = Connection::open_in_memory().unwrap();

        let outcome = load_parquet(&mut conn, &config(parquet_path, true), None).unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                rows: 10,
                indexes: vec!["col_0".into(), "col_1".into(), "col_2".into()],
            }
        );

        let decls: Vec<(String, String)> = conn
            .prepare("SELECT name, type FROM pragma_table_info('data') ORDER BY cid")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        let types: Vec<&str> = decls.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(types, vec!["BIGINT", "DOUBLE", "TEXT", "BLOB", "BOOLEAN"]);

        let (price, name, blob, flag): (Option<f64>, String, Vec<u8>, i64) = conn
            .query_row(
                "SELECT col_1, col_2, col_3, flag FROM data WHERE col_0 = 4",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(price, Some(6.0));
        assert_eq!(name, "name_104");
        assert_eq!(blob, vec![0x01, 0xff]);
        assert_eq!(flag, 0);

        let null_price: Option<f64> = conn
            .query_row("SELECT col_1 FROM data WHERE col_0 = 3", [], |row| row.get(0))
            .unwrap();
        assert_eq!(null_price, None);
    }

    #[test]
    fn test_load_creates_lookup_indexes() {
        let dir = tempdir().unwrap();
        let parquet_path = write_parquet(dir.path(), 3);
        let mut conn = Connection::open_in_memory().unwrap();
        load_parquet(&mut conn, &config(parquet_path, true), None).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'data'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 3);
    }

    fn write_single_column(dir: &Path, column: &str) -> PathBuf {
        let schema = Arc::new(Schema::new(vec![Field::new(column, DataType::Int32, false)]));
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(vec![1, 2]))])
                .unwrap();
        let path = dir.join(format!("{}.parquet", column));
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        path
    }

    fn index_names(conn: &Connection, table: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1")
            .unwrap()
            .query_map([table], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_index_names_do_not_collide() {
        assert_ne!(index_name("a_b", "col_0"), index_name("a", "b_col_0"));

        let dir = tempdir().unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        let mut first = config(write_single_column(dir.path(), "col_0"), true);
        first.table = "a_b".into();
        let mut second = config(write_single_column(dir.path(), "b_col_0"), true);
        second.table = "a".into();

        let outcome = load_parquet(&mut conn, &first, None).unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { rows: 2, indexes: vec!["col_0".into()] });
        let outcome = load_parquet(&mut conn, &second, None).unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { rows: 2, indexes: vec!["b_col_0".into()] });

        assert_eq!(index_names(&conn, "a_b"), vec!["idx_3_a_b_col_0".to_string()]);
        assert_eq!(index_names(&conn, "a"), vec!["idx_1_a_b_col_0".to_string()]);
    }

    #[test]
    fn test_foreign_index_name_fails_load() {
        let dir = tempdir().unwrap();
        let parquet_path = write_parquet(dir.path(), 3);
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE other (x INTEGER);
             CREATE INDEX idx_4_data_col_1 ON other (x);",
        )
        .unwrap();

        let err = load_parquet(&mut conn, &config(parquet_path, true), None).unwrap_err();
        assert!(matches!(err, PipelineError::Execution(_)));
        assert!(!table_exists(&conn, "data").unwrap());
    }

    #[test]
    fn test_recreate_replaces_table() {
        let dir = tempdir().unwrap();
        let parquet_path = write_parquet(dir.path(), 4);
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE data (old INTEGER); INSERT INTO data VALUES (1);")
            .unwrap();

        let outcome = load_parquet(&mut conn, &config(parquet_path, true), None).unwrap();
        assert_eq!(outcome.rows(), 4);
        assert_eq!(row_count(&conn, "data").unwrap(), 4);
    }

    #[test]
    fn test_skip_when_not_recreating() {
        let dir = tempdir().unwrap();
        let parquet_path = write_parquet(dir.path(), 4);
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE data (old INTEGER); INSERT INTO data VALUES (1), (2);")
            .unwrap();

        let outcome = load_parquet(&mut conn, &config(parquet_path, false), None).unwrap();
        assert_eq!(outcome, LoadOutcome::Skipped { rows: 2 });
    }

    #[test]
    fn test_missing_parquet_is_not_found() {
        let dir = tempdir().unwrap();
        let mut conn = Connection::open_in_memory().unwrap();
        let err = load_parquet(&mut conn, &config(dir.path().join("nope.parquet"), true), None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
        assert!(!table_exists(&conn, "data").unwrap());
    }

    #[test]
    fn test_insert_sql_placeholders() {
        assert_eq!(insert_sql("data", 3), "INSERT INTO \"data\" VALUES (?1, ?2, ?3)");
    }
}
