//! Runtime schema discovery
//!
//! Column lists are read from the store on every search, never declared
//! statically or cached. The probe returns each table's typed column list
//! under its positional alias (`t1`, `t2`), and validation works only from
//! that list.

use crate::error::{PipelineError, Result};
use crate::store::quote_ident;
use crate::store::types::SqlType;
use rusqlite::Connection;
use std::fmt;
use tracing::debug;

/// A column as discovered in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedColumn {
    pub name: String,
    pub sql_type: SqlType,
}

/// A probed table under its positional alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name as stored
    pub name: String,
    /// `t1` for the first table, `t2` for the second
    pub alias: String,
    /// Columns in declaration order
    pub columns: Vec<ProbedColumn>,
}

impl TableSchema {
    /// Look up a column by unqualified name
    pub fn column(&self, name: &str) -> Option<&ProbedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// All columns, qualified by this table's alias
    pub fn qualified_columns(&self) -> impl Iterator<Item = QualifiedColumn> + '_ {
        self.columns.iter().map(move |c| QualifiedColumn {
            alias: self.alias.clone(),
            name: c.name.clone(),
            sql_type: c.sql_type,
        })
    }

    /// Table reference for a FROM/JOIN clause: `"name" AS t1`
    pub fn table_ref(&self) -> String {
        format!("{} AS {}", quote_ident(&self.name), self.alias)
    }
}

/// A column qualified by its table alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedColumn {
    pub alias: String,
    pub name: String,
    pub sql_type: SqlType,
}

impl QualifiedColumn {
    /// `t1.col_0`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.alias, self.name)
    }

    /// `t1."col_0"`, safe to place in SQL text
    pub fn sql_ref(&self) -> String {
        format!("{}.{}", self.alias, quote_ident(&self.name))
    }
}

impl fmt::Display for QualifiedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.name)
    }
}

/// Alias for the table at `position` (0-based) in the search
pub fn table_alias(position: usize) -> String {
    format!("t{}", position + 1)
}

/// Discover a table's columns. A table with no columns does not exist.
pub fn probe_table(conn: &Connection, table: &str, position: usize) -> Result<TableSchema> {
    let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| {
            let name: String = row.get(0)?;
            let decl: String = row.get(1)?;
            Ok(ProbedColumn {
                sql_type: SqlType::from_decl(&decl),
                name,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(PipelineError::table_not_found(table));
    }

    let alias = table_alias(position);
    debug!(
        table = table,
        alias = alias.as_str(),
        columns = columns.len(),
        "Probed table schema"
    );

    Ok(TableSchema {
        name: table.to_string(),
        alias,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE data (col_0 BIGINT, col_1 DOUBLE, col_2 TEXT, col_3 BLOB, flag BOOLEAN);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_probe_table_columns_in_order() {
        let conn = setup();
        let schema = probe_table(&conn, "data", 0).unwrap();

        assert_eq!(schema.alias, "t1");
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["col_0", "col_1", "col_2", "col_3", "flag"]);

        let types: Vec<SqlType> = schema.columns.iter().map(|c| c.sql_type).collect();
        assert_eq!(
            types,
            vec![
                SqlType::Integer,
                SqlType::Real,
                SqlType::Text,
                SqlType::Blob,
                SqlType::Boolean
            ]
        );
    }

    #[test]
    fn test_probe_missing_table() {
        let conn = setup();
        let err = probe_table(&conn, "nope", 0).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }

    #[test]
    fn test_probe_name_is_bound_not_interpolated() {
        let conn = setup();
        let err = probe_table(&conn, "data'); DROP TABLE data; --", 0).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
        assert!(probe_table(&conn, "data", 0).is_ok());
    }

    #[test]
    fn test_second_table_alias_and_refs() {
        let conn = setup();
        let schema = probe_table(&conn, "data", 1).unwrap();
        assert_eq!(schema.alias, "t2");
        assert_eq!(schema.table_ref(), "\"data\" AS t2");

        let first = schema.qualified_columns().next().unwrap();
        assert_eq!(first.qualified_name(), "t2.col_0");
        assert_eq!(first.sql_ref(), "t2.\"col_0\"");
        assert_eq!(first.to_string(), "t2.col_0");
    }
}
