//! Result serialization and terminal preview

use crate::config::ExportFormat;
use crate::error::Result;
use crate::search::execute::ResultSet;
use arrow::csv::WriterBuilder as CsvWriterBuilder;
use arrow::json::writer::LineDelimited;
use arrow::json::WriterBuilder as JsonWriterBuilder;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// `<stem>.<ext>` for the chosen format
pub fn output_path(stem: &Path, format: ExportFormat) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

/// Write the result set to `<stem>.<ext>`, replacing any existing file.
pub fn export(result: &ResultSet, format: ExportFormat, stem: &Path) -> Result<PathBuf> {
    let path = output_path(stem, format);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(&path)?;
    match format {
        ExportFormat::Csv => write_csv(result, file)?,
        ExportFormat::Json => write_json(result, file)?,
        ExportFormat::Parquet => write_parquet(result, file)?,
    }

    info!(
        "Exported {} rows to {} as {}",
        result.num_rows(),
        path.display(),
        format
    );
    Ok(path)
}

fn write_csv(result: &ResultSet, file: File) -> Result<()> {
    let mut out = BufWriter::new(file);
    {
        let mut writer = CsvWriterBuilder::new().with_header(true).build(&mut out);
        for batch in &result.batches {
            writer.write(batch)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// One JSON object per line, nulls written explicitly
fn write_json(result: &ResultSet, file: File) -> Result<()> {
    let mut out = BufWriter::new(file);
    {
        let mut writer = JsonWriterBuilder::new()
            .with_explicit_nulls(true)
            .build::<_, LineDelimited>(&mut out);
        for batch in &result.batches {
            writer.write(batch)?;
        }
        writer.finish()?;
    }
    out.flush()?;
    Ok(())
}

fn write_parquet(result: &ResultSet, file: File) -> Result<()> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, result.schema.clone(), Some(props))?;
    for batch in &result.batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

/// Render the first `limit` rows as a table.
pub fn preview(result: &ResultSet, limit: usize) -> Result<String> {
    let mut remaining = limit;
    let mut head = Vec::new();
    for batch in &result.batches {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.num_rows());
        head.push(batch.slice(0, take));
        remaining -= take;
    }
    Ok(pretty_format_batches(&head)?.to_string())
}
