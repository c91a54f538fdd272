//! Column type mapping between Arrow and the store
//!
//! The store keeps five column types. Arrow types collapse onto them when a
//! Parquet file is loaded and expand back to a fixed Arrow type when query
//! results are read.

use crate::error::Result;
use arrow::array::ArrayRef;
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::DataType;

/// Column type as stored in SQLite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Boolean,
    Text,
    Blob,
}

impl SqlType {
    /// Map an Arrow type onto a store type
    pub fn from_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => SqlType::Integer,
            DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => SqlType::Real,
            DataType::Boolean => SqlType::Boolean,
            DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => {
                SqlType::Blob
            }
            _ => SqlType::Text,
        }
    }

    /// Interpret a declared column type, following SQLite's affinity rules.
    pub fn from_decl(decl: &str) -> Self {
        let decl = decl.to_ascii_uppercase();
        if decl.contains("BOOL") {
            SqlType::Boolean
        } else if decl.contains("INT") {
            SqlType::Integer
        } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
            SqlType::Text
        } else if decl.is_empty() || decl.contains("BLOB") {
            SqlType::Blob
        } else {
            SqlType::Real
        }
    }

    /// Declared type used in CREATE TABLE
    pub fn decl(self) -> &'static str {
        match self {
            SqlType::Integer => "BIGINT",
            SqlType::Real => "DOUBLE",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
        }
    }

    /// Arrow type used for values of this column
    pub fn arrow_type(self) -> DataType {
        match self {
            SqlType::Integer => DataType::Int64,
            SqlType::Real => DataType::Float64,
            SqlType::Boolean => DataType::Boolean,
            SqlType::Text => DataType::Utf8,
            SqlType::Blob => DataType::Binary,
        }
    }

    /// Short name for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            SqlType::Integer => "integer",
            SqlType::Real => "real",
            SqlType::Boolean => "boolean",
            SqlType::Text => "text",
            SqlType::Blob => "blob",
        }
    }
}

/// Cast an array to the Arrow type of its store column.
///
/// The cast is checked: values that do not fit (an unsigned 64-bit value
/// above `i64::MAX`, say) fail instead of turning into nulls.
pub fn to_store_array(array: &ArrayRef, sql_type: SqlType) -> Result<ArrayRef> {
    let target = sql_type.arrow_type();
    if array.data_type() == &target {
        return Ok(array.clone());
    }
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(cast_with_options(array, &target, &options)?)
}
