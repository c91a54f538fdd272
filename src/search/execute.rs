//! Query execution into Arrow record batches
//!
//! Each output column gets a builder chosen from its probed store type, so a
//! result set has the same schema whether it holds one row or a million.

use crate::error::{ExecutionError, Result};
use crate::search::plan::{ProjectedColumn, QueryPlan};
use crate::store::SqlType;
use arrow::array::{
    ArrayRef, BinaryBuilder, BooleanBuilder, Float64Builder, Int64Builder,
    StringBuilder,
};
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::debug;

/// Rows per result batch
pub const RESULT_BATCH_ROWS: usize = 8192;

/// Rows returned by a search, with their schema
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl ResultSet {
    pub fn num_rows(&self) -> u64 {
        self.batches.iter().map(|b| b.num_rows() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }
}

/// Arrow schema of the plan's output, one nullable field per projected column
pub fn output_schema(projection: &[ProjectedColumn]) -> SchemaRef {
    let fields: Vec<Field> = projection
        .iter()
        .map(|p| Field::new(p.label.as_str(), p.column.sql_type.arrow_type(), true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Run the plan with its value bound and collect every matching row.
pub fn execute(conn: &Connection, plan: &QueryPlan) -> Result<ResultSet> {
    let sql = plan.to_sql();
    debug!(sql = sql.as_str(), "Executing search");

    let schema = output_schema(&plan.projection);
    let mut builders: Vec<ColumnBuilder> = plan
        .projection
        .iter()
        .map(|p| ColumnBuilder::new(p.column.sql_type))
        .collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([plan.value.as_str()])?;
    let mut batches = Vec::new();
    let mut pending = 0usize;

    while let Some(row) = rows.next()? {
        for (idx, (builder, projected)) in builders.iter_mut().zip(&plan.projection).enumerate() {
            builder.append(row.get_ref(idx)?, &projected.label)?;
        }
        pending += 1;
        if pending == RESULT_BATCH_ROWS {
            batches.push(finish_batch(&schema, &mut builders)?);
            pending = 0;
        }
    }
    if pending > 0 {
        batches.push(finish_batch(&schema, &mut builders)?);
    }

    Ok(ResultSet { schema, batches })
}

fn finish_batch(schema: &SchemaRef, builders: &mut [ColumnBuilder]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = builders.iter_mut().map(ColumnBuilder::finish).collect();
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

enum ColumnBuilder {
    Integer(Int64Builder),
    Real(Float64Builder),
    Boolean(BooleanBuilder),
    Text(StringBuilder),
    Blob(BinaryBuilder),
}

impl ColumnBuilder {
    fn new(sql_type: SqlType) -> Self {
        match sql_type {
            SqlType::Integer => ColumnBuilder::Integer(Int64Builder::new()),
            SqlType::Real => ColumnBuilder::Real(Float64Builder::new()),
            SqlType::Boolean => ColumnBuilder::Boolean(BooleanBuilder::new()),
            SqlType::Text => ColumnBuilder::Text(StringBuilder::new()),
            SqlType::Blob => ColumnBuilder::Blob(BinaryBuilder::new()),
        }
    }

    fn sql_type(&self) -> SqlType {
        match self {
            ColumnBuilder::Integer(_) => SqlType::Integer,
            ColumnBuilder::Real(_) => SqlType::Real,
            ColumnBuilder::Boolean(_) => SqlType::Boolean,
            ColumnBuilder::Text(_) => SqlType::Text,
            ColumnBuilder::Blob(_) => SqlType::Blob,
        }
    }

    fn append_null(&mut self) {
        match self {
            ColumnBuilder::Integer(b) => b.append_null(),
            ColumnBuilder::Real(b) => b.append_null(),
            ColumnBuilder::Boolean(b) => b.append_null(),
            ColumnBuilder::Text(b) => b.append_null(),
            ColumnBuilder::Blob(b) => b.append_null(),
        }
    }

    fn append(&mut self, value: ValueRef<'_>, column: &str) -> Result<()> {
        if let ValueRef::Null = value {
            self.append_null();
            return Ok(());
        }

        let expected = self.sql_type().name();
        match (self, value) {
            (ColumnBuilder::Integer(b), ValueRef::Integer(v)) => b.append_value(v),
            (ColumnBuilder::Real(b), ValueRef::Real(v)) => b.append_value(v),
            // REAL affinity stores integral values as integers
            (ColumnBuilder::Real(b), ValueRef::Integer(v)) => b.append_value(v as f64),
            (ColumnBuilder::Boolean(b), ValueRef::Integer(v)) => b.append_value(v != 0),
            (ColumnBuilder::Text(b), ValueRef::Text(bytes)) => {
                b.append_value(String::from_utf8_lossy(bytes))
            }
            (ColumnBuilder::Text(b), ValueRef::Integer(v)) => b.append_value(v.to_string()),
            (ColumnBuilder::Text(b), ValueRef::Real(v)) => b.append_value(v.to_string()),
            (ColumnBuilder::Blob(b), ValueRef::Blob(bytes)) => b.append_value(bytes),
            (ColumnBuilder::Blob(b), ValueRef::Text(bytes)) => b.append_value(bytes),
            (_, value) => {
                return Err(ExecutionError::TypeMismatch {
                    column: column.to_string(),
                    expected,
                    found: value_kind(value),
                }
                .into())
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            ColumnBuilder::Integer(b) => Arc::new(b.finish()),
            ColumnBuilder::Real(b) => Arc::new(b.finish()),
            ColumnBuilder::Boolean(b) => Arc::new(b.finish()),
            ColumnBuilder::Text(b) => Arc::new(b.finish()),
            ColumnBuilder::Blob(b) => Arc::new(b.finish()),
        }
    }
}

fn value_kind(value: ValueRef<'_>) -> &'static str {
    match value {
        ValueRef::Null => "null",
        ValueRef::Integer(_) => "integer",
        ValueRef::Real(_) => "real",
        ValueRef::Text(_) => "text",
        ValueRef::Blob(_) => "blob",
    }
}
