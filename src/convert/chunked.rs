//! Chunked CSV to Parquet conversion
//!
//! Streams a CSV file in batches of at most `chunk_size` rows and appends each
//! batch to a single Snappy-compressed Parquet file as its own row group.
//! The schema comes from the first chunk and is enforced on every later chunk:
//! a value that no longer parses fails the conversion instead of being
//! silently coerced.

use crate::error::{PipelineError, Result, ValidationError};
use crate::progress::{format_number, ProgressCallback};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use std::fs::{self, File};
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Statistics from a conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertStats {
    /// Records written
    pub rows: u64,
    /// Chunks (row groups) written
    pub chunks: u64,
    /// Size of the finished Parquet file
    pub bytes_written: u64,
}

/// Convert a CSV file to a single Parquet file in chunks of `chunk_size` rows.
///
/// The source must exist; otherwise nothing is created and `NotFound` is
/// returned. Read or write failures inside the loop leave the partially
/// written destination in place.
pub fn convert_csv_to_parquet<P1, P2>(
    csv_path: P1,
    parquet_path: P2,
    chunk_size: usize,
    progress_callback: Option<ProgressCallback>,
) -> Result<ConvertStats>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let csv_path = csv_path.as_ref();
    let parquet_path = parquet_path.as_ref();

    if !csv_path.exists() {
        error!("CSV file not found: {}", csv_path.display());
        return Err(PipelineError::path_not_found("CSV file", csv_path));
    }
    if chunk_size == 0 {
        return Err(ValidationError::InvalidChunkSize.into());
    }

    info!("Reading CSV from: {}", csv_path.display());
    info!(
        "Converting to Parquet → {} in chunks of {} rows",
        parquet_path.display(),
        format_number(chunk_size as u64)
    );

    let mut file = File::open(csv_path)?;
    let schema = infer_chunk_schema(&mut file, chunk_size, csv_path)?;
    file.seek(SeekFrom::Start(0))?;
    debug!("Inferred schema with {} columns", schema.fields().len());

    if let Some(parent) = parquet_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_format(csv_format())
        .with_batch_size(chunk_size)
        .build(file)?;

    let out = File::create(parquet_path)?;
    let mut writer = ArrowWriter::try_new(out, schema, Some(writer_properties(chunk_size)))?;

    let mut stats = ConvertStats::default();
    for batch in reader {
        let batch = batch?;
        let chunk_rows = batch.num_rows() as u64;

        writer.write(&batch)?;
        // Close the row group so each chunk lands as one unit
        writer.flush()?;

        stats.chunks += 1;
        stats.rows += chunk_rows;
        info!(
            "Processed chunk {} with {} rows",
            stats.chunks,
            format_number(chunk_rows)
        );

        if let Some(ref cb) = progress_callback {
            cb(stats.rows, chunk_rows);
        }
    }

    writer.close()?;
    stats.bytes_written = fs::metadata(parquet_path)?.len();

    info!(
        "Conversion complete: {} ({} rows in {} chunks)",
        parquet_path.display(),
        format_number(stats.rows),
        stats.chunks
    );

    Ok(stats)
}

fn csv_format() -> Format {
    Format::default().with_header(true)
}

/// Infer the schema from the header and at most `chunk_size` records.
fn infer_chunk_schema(file: &mut File, chunk_size: usize, csv_path: &Path) -> Result<SchemaRef> {
    let (schema, records_read) = csv_format().infer_schema(&mut *file, Some(chunk_size))?;
    debug!("Schema inferred from {} records", records_read);

    if schema.fields().is_empty() {
        return Err(ValidationError::MissingHeader(csv_path.to_path_buf()).into());
    }

    Ok(Arc::new(text_preserving_schema(&schema)))
}

/// Read some inferred columns as text instead.
///
/// Columns with no values in the first chunk infer as `Null`, which the CSV
/// reader would fill with nulls forever after. Date, time and timestamp
/// columns would be rewritten in Arrow's canonical form (`2024-01-01T00:00:00`)
/// and stop matching the source text.
fn text_preserving_schema(schema: &Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| match f.data_type() {
            DataType::Null => Field::new(f.name(), DataType::Utf8, true),
            DataType::Date32
            | DataType::Date64
            | DataType::Time32(_)
            | DataType::Time64(_)
            | DataType::Timestamp(_, _) => Field::new(f.name(), DataType::Utf8, f.is_nullable()),
            _ => f.as_ref().clone(),
        })
        .collect();
    Schema::new(fields)
}

/// Snappy compression, chunk-level statistics, one row group per chunk.
fn writer_properties(chunk_size: usize) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_statistics_enabled(EnabledStatistics::Chunk)
        .set_max_row_group_size(chunk_size)
        .build()
}
