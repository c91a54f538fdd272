//! Search validation and query construction
//!
//! `build_plan` checks a [`SearchRequest`] against the probed table schemas
//! and produces a [`QueryPlan`]. Checks run in a fixed order and the first
//! failure is returned:
//!
//! 1. one or two tables
//! 2. every table can be probed
//! 3. the filter field is an indexed lookup column
//! 4. at least one output column, all of them known
//! 5. with two tables, a join column present in both
//! 6. a supported export format
//!
//! Only names read back from the store reach the SQL text. The filter value
//! is always bound as `?1`.

use crate::config::{ExportFormat, SearchRequest, MAX_SEARCH_TABLES};
use crate::error::{Result, ValidationError};
use crate::store::{is_lookup_column, probe_table, quote_ident, QualifiedColumn, TableSchema};
use rusqlite::Connection;
use tracing::{debug, warn};

/// An output column and the header it is exported under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub column: QualifiedColumn,
    pub label: String,
}

/// A validated search, ready to execute
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Probed tables, `t1` first
    pub tables: Vec<TableSchema>,
    /// Shared column for the two-table join
    pub join_on: Option<String>,
    /// Column compared against the value
    pub filter: QualifiedColumn,
    /// Opaque filter value, bound as a parameter
    pub value: String,
    /// Output columns in request order
    pub projection: Vec<ProjectedColumn>,
    pub format: ExportFormat,
}

impl QueryPlan {
    /// Render the statement. The value is not part of it.
    pub fn to_sql(&self) -> String {
        let select: Vec<String> = self
            .projection
            .iter()
            .map(|p| format!("{} AS {}", p.column.sql_ref(), quote_ident(&p.label)))
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {}",
            select.join(", "),
            self.tables[0].table_ref()
        );

        if let (Some(second), Some(join_on)) = (self.tables.get(1), &self.join_on) {
            let join_col = quote_ident(join_on);
            sql.push_str(&format!(
                " INNER JOIN {} ON {}.{} = {}.{}",
                second.table_ref(),
                self.tables[0].alias,
                join_col,
                second.alias,
                join_col
            ));
        }

        sql.push_str(&format!(" WHERE {} = ?1", self.filter.sql_ref()));
        sql
    }
}

/// First validation step. Needs no store, so it runs before one is opened.
pub fn check_table_count(request: &SearchRequest) -> Result<()> {
    let count = request.tables.len();
    if count == 0 || count > MAX_SEARCH_TABLES {
        return Err(ValidationError::TableCount { count }.into());
    }
    Ok(())
}

/// Validate a request against the store and build its plan.
pub fn build_plan(conn: &Connection, request: &SearchRequest) -> Result<QueryPlan> {
    check_table_count(request)?;

    let tables = request
        .tables
        .iter()
        .enumerate()
        .map(|(position, table)| probe_table(conn, table, position))
        .collect::<Result<Vec<_>>>()?;

    let all_columns: Vec<QualifiedColumn> =
        tables.iter().flat_map(|t| t.qualified_columns()).collect();

    let indexed: Vec<QualifiedColumn> = all_columns
        .iter()
        .filter(|c| is_lookup_column(&c.name))
        .cloned()
        .collect();
    let filter = resolve_column(&indexed, &request.field).ok_or_else(|| {
        ValidationError::FieldNotIndexed {
            field: request.field.clone(),
            allowed: qualified_names(&indexed),
        }
    })?;

    if request.columns.is_empty() {
        return Err(ValidationError::NoColumns.into());
    }
    let resolved = request
        .columns
        .iter()
        .map(|requested| {
            resolve_column(&all_columns, requested).ok_or_else(|| ValidationError::UnknownColumn {
                column: requested.clone(),
                available: qualified_names(&all_columns),
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let projection = label_projection(resolved);

    let join_on = resolve_join(&tables, request.join_on.as_deref())?;

    let format: ExportFormat = request.format.parse()?;

    let plan = QueryPlan {
        tables,
        join_on,
        filter,
        value: request.value.clone(),
        projection,
        format,
    };
    debug!(sql = plan.to_sql().as_str(), "Built query plan");
    Ok(plan)
}

/// Match `t1.col_0` exactly, else an unqualified name in table order.
fn resolve_column(candidates: &[QualifiedColumn], requested: &str) -> Option<QualifiedColumn> {
    candidates
        .iter()
        .find(|c| c.qualified_name() == requested)
        .or_else(|| candidates.iter().find(|c| c.name == requested))
        .cloned()
}

fn qualified_names(columns: &[QualifiedColumn]) -> Vec<String> {
    columns.iter().map(QualifiedColumn::qualified_name).collect()
}

/// Label with the bare name unless two outputs share it.
fn label_projection(columns: Vec<QualifiedColumn>) -> Vec<ProjectedColumn> {
    let shared_name = |name: &str| {
        columns
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.alias.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len()
            > 1
    };

    let labels: Vec<String> = columns
        .iter()
        .map(|c| {
            if shared_name(&c.name) {
                c.qualified_name()
            } else {
                c.name.clone()
            }
        })
        .collect();

    columns
        .into_iter()
        .zip(labels)
        .map(|(column, label)| ProjectedColumn { column, label })
        .collect()
}

fn resolve_join(tables: &[TableSchema], join_on: Option<&str>) -> Result<Option<String>> {
    if tables.len() < 2 {
        if let Some(column) = join_on {
            warn!("Ignoring --join-on '{}' for a single-table search", column);
        }
        return Ok(None);
    }

    let column = join_on.ok_or(ValidationError::MissingJoinColumn)?;
    for table in tables {
        if table.column(column).is_none() {
            return Err(ValidationError::JoinColumnNotShared {
                column: column.to_string(),
                table: table.name.clone(),
            }
            .into());
        }
    }
    Ok(Some(column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::path::PathBuf;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE data (col_0 BIGINT, col_1 DOUBLE, col_2 TEXT, col_3 TEXT, col_4 BIGINT);
             CREATE TABLE users (col_0 BIGINT, col_1 TEXT, email TEXT);
             CREATE TABLE other (id BIGINT, col_2 TEXT);",
        )
        .unwrap();
        conn
    }

    fn request(tables: &[&str], field: &str, columns: &[&str]) -> SearchRequest {
        SearchRequest {
            tables: tables.iter().map(|s| s.to_string()).collect(),
            join_on: None,
            field: field.into(),
            value: "42".into(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            format: "csv".into(),
            output_stem: PathBuf::from("data/search_output"),
        }
    }

    fn validation_error(result: Result<QueryPlan>) -> ValidationError {
        match result {
            Err(PipelineError::Validation(e)) => e,
            other => panic!("expected validation error, got {:?}", other.map(|p| p.to_sql())),
        }
    }

    #[test]
    fn test_single_table_sql() {
        let conn = setup();
        let plan = build_plan(&conn, &request(&["data"], "col_1", &["col_0", "col_2"])).unwrap();

        assert_eq!(plan.filter.qualified_name(), "t1.col_1");
        assert_eq!(
            plan.to_sql(),
            "SELECT t1.\"col_0\" AS \"col_0\", t1.\"col_2\" AS \"col_2\" \
             FROM \"data\" AS t1 WHERE t1.\"col_1\" = ?1"
        );
        assert_eq!(plan.format, ExportFormat::Csv);
    }

    #[test]
    fn test_two_table_join_sql() {
        let conn = setup();
        let mut req = request(&["data", "users"], "t1.col_2", &["t1.col_0", "email"]);
        req.join_on = Some("col_0".into());
        let plan = build_plan(&conn, &req).unwrap();

        assert_eq!(
            plan.to_sql(),
            "SELECT t1.\"col_0\" AS \"col_0\", t2.\"email\" AS \"email\" \
             FROM \"data\" AS t1 INNER JOIN \"users\" AS t2 ON t1.\"col_0\" = t2.\"col_0\" \
             WHERE t1.\"col_2\" = ?1"
        );
    }

    #[test]
    fn test_value_never_in_sql() {
        let conn = setup();
        let mut req = request(&["data"], "col_2", &["col_0"]);
        req.value = "x' OR '1'='1".into();
        let plan = build_plan(&conn, &req).unwrap();
        assert!(!plan.to_sql().contains("OR"));
        assert_eq!(plan.value, "x' OR '1'='1");
    }

    #[test]
    fn test_shared_names_get_qualified_labels() {
        let conn = setup();
        let mut req = request(&["data", "users"], "col_0", &["t1.col_1", "t2.col_1", "col_3"]);
        req.join_on = Some("col_0".into());
        let plan = build_plan(&conn, &req).unwrap();

        let labels: Vec<&str> = plan.projection.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["t1.col_1", "t2.col_1", "col_3"]);
    }

    #[test]
    fn test_unqualified_prefers_first_table() {
        let conn = setup();
        let mut req = request(&["users", "data"], "col_1", &["col_4"]);
        req.join_on = Some("col_0".into());
        let plan = build_plan(&conn, &req).unwrap();
        assert_eq!(plan.filter.qualified_name(), "t1.col_1");
        assert_eq!(plan.projection[0].column.qualified_name(), "t2.col_4");
    }

    #[test]
    fn test_too_many_tables() {
        let conn = setup();
        let err = validation_error(build_plan(
            &conn,
            &request(&["data", "users", "other"], "col_0", &["col_0"]),
        ));
        assert_eq!(err, ValidationError::TableCount { count: 3 });
    }

    #[test]
    fn test_table_count_checked_without_store() {
        assert!(check_table_count(&request(&["data"], "col_0", &["col_0"])).is_ok());
        assert!(check_table_count(&request(&["data", "users"], "col_0", &["col_0"])).is_ok());

        let err = check_table_count(&request(&[], "col_0", &["col_0"])).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::TableCount { count: 0 })
        ));
    }

    #[test]
    fn test_missing_table_is_not_found() {
        let conn = setup();
        let err = build_plan(&conn, &request(&["ghost"], "col_0", &["col_0"])).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }

    #[test]
    fn test_non_indexed_field_rejected() {
        let conn = setup();
        for field in ["col_3", "col_4", "col_10", "email", "t3.col_0", "nonexistent"] {
            let err = validation_error(build_plan(&conn, &request(&["data"], field, &["col_0"])));
            match err {
                ValidationError::FieldNotIndexed { allowed, .. } => {
                    assert_eq!(allowed, vec!["t1.col_0", "t1.col_1", "t1.col_2"]);
                }
                other => panic!("unexpected error for {}: {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_field_check_precedes_column_check() {
        let conn = setup();
        let err = validation_error(build_plan(&conn, &request(&["data"], "col_9", &["bogus"])));
        assert!(matches!(err, ValidationError::FieldNotIndexed { .. }));
    }

    #[test]
    fn test_no_columns_rejected() {
        let conn = setup();
        let err = validation_error(build_plan(&conn, &request(&["data"], "col_0", &[])));
        assert_eq!(err, ValidationError::NoColumns);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let conn = setup();
        for column in ["col_49", "t2.col_0", "email"] {
            let err = validation_error(build_plan(
                &conn,
                &request(&["data"], "col_0", &["col_0", column]),
            ));
            assert!(
                matches!(err, ValidationError::UnknownColumn { column: ref c, .. } if c == column),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn test_two_tables_require_join_column() {
        let conn = setup();
        let err = validation_error(build_plan(
            &conn,
            &request(&["data", "users"], "col_0", &["col_0"]),
        ));
        assert_eq!(err, ValidationError::MissingJoinColumn);
    }

    #[test]
    fn test_join_column_must_be_shared() {
        let conn = setup();
        let mut req = request(&["data", "users"], "col_0", &["col_0"]);
        req.join_on = Some("email".into());
        let err = validation_error(build_plan(&conn, &req));
        assert_eq!(
            err,
            ValidationError::JoinColumnNotShared {
                column: "email".into(),
                table: "data".into(),
            }
        );

        let mut req = request(&["data", "other"], "col_0", &["col_0"]);
        req.join_on = Some("col_4".into());
        let err = validation_error(build_plan(&conn, &req));
        assert_eq!(
            err,
            ValidationError::JoinColumnNotShared {
                column: "col_4".into(),
                table: "other".into(),
            }
        );
    }

    #[test]
    fn test_join_ignored_for_single_table() {
        let conn = setup();
        let mut req = request(&["data"], "col_0", &["col_0"]);
        req.join_on = Some("col_0".into());
        let plan = build_plan(&conn, &req).unwrap();
        assert_eq!(plan.join_on, None);
        assert!(!plan.to_sql().contains("JOIN"));
    }

    #[test]
    fn test_format_checked_last() {
        let conn = setup();
        let mut req = request(&["data"], "col_0", &["col_0"]);
        req.format = "xlsx".into();
        let err = validation_error(build_plan(&conn, &req));
        assert_eq!(err, ValidationError::InvalidFormat("xlsx".into()));

        // An earlier failure wins over the format
        let mut req = request(&["data", "users"], "col_0", &["col_0"]);
        req.format = "xlsx".into();
        let err = validation_error(build_plan(&conn, &req));
        assert_eq!(err, ValidationError::MissingJoinColumn);
    }
}
