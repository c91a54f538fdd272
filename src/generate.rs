//! Synthetic sample data
//!
//! Writes a 50-column CSV used to exercise the rest of the pipeline:
//!
//! | column          | values                                |
//! |-----------------|---------------------------------------|
//! | `col_0`         | integer in 1..=100000                 |
//! | `col_1`         | float in 1..9999, two decimal places  |
//! | `col_2`         | `name_NNN`, NNN in 100..=999          |
//! | `col_3`         | 20 lowercase hex chars (10 bytes)     |
//! | `col_4..col_49` | integer in 0..=1000                   |

use crate::config::GenerateConfig;
use crate::error::Result;
use crate::progress::{format_number, ProgressCallback};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// Total columns in a generated row
pub const GENERATED_COLUMNS: usize = 50;

/// Rows built per Arrow batch
pub const GENERATE_BATCH_ROWS: usize = 65_536;

/// Schema of the generated file
pub fn generated_schema() -> SchemaRef {
    let fields: Vec<Field> = (0..GENERATED_COLUMNS)
        .map(|i| {
            let data_type = match i {
                1 => DataType::Float64,
                2 | 3 => DataType::Utf8,
                _ => DataType::Int64,
            };
            Field::new(format!("col_{}", i), data_type, false)
        })
        .collect();
    Arc::new(Schema::new(fields))
}

/// Write `config.rows` synthetic records (plus header) to `config.output_path`.
///
/// Returns the number of records written.
pub fn generate_csv(
    config: &GenerateConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<u64> {
    let path = &config.output_path;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut rng = match config.seed {
        Some(seed) => {
            debug!("Seeding generator with {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    info!(
        "Generating {} rows x {} columns → {}",
        format_number(config.rows),
        GENERATED_COLUMNS,
        path.display()
    );

    let schema = generated_schema();
    let mut out = BufWriter::new(File::create(path)?);
    let mut written = 0u64;
    {
        let mut writer = WriterBuilder::new().with_header(true).build(&mut out);
        if config.rows == 0 {
            // Header only
            writer.write(&RecordBatch::new_empty(schema.clone()))?;
        }
        while written < config.rows {
            let batch_rows = (config.rows - written).min(GENERATE_BATCH_ROWS as u64) as usize;
            let batch = random_batch(&schema, batch_rows, &mut rng)?;
            writer.write(&batch)?;
            written += batch_rows as u64;

            if let Some(ref cb) = progress_callback {
                cb(written, batch_rows as u64);
            }
        }
    }
    out.flush()?;

    info!("Wrote {} rows to {}", format_number(written), path.display());
    Ok(written)
}

fn random_batch(schema: &SchemaRef, rows: usize, rng: &mut StdRng) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(GENERATED_COLUMNS);

    let ids = Int64Array::from_iter_values((0..rows).map(|_| rng.gen_range(1..=100_000i64)));
    columns.push(Arc::new(ids));

    let prices = Float64Array::from_iter_values(
        (0..rows).map(|_| (rng.gen_range(1.0..9999.0f64) * 100.0).round() / 100.0),
    );
    columns.push(Arc::new(prices));

    let names: StringArray = (0..rows)
        .map(|_| Some(format!("name_{}", rng.gen_range(100..=999))))
        .collect();
    columns.push(Arc::new(names));

    let tokens: StringArray = (0..rows).map(|_| Some(random_hex(rng, 10))).collect();
    columns.push(Arc::new(tokens));

    for _ in 4..GENERATED_COLUMNS {
        let values = Int64Array::from_iter_values((0..rows).map(|_| rng.gen_range(0..=1000i64)));
        columns.push(Arc::new(values));
    }

    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

fn random_hex(rng: &mut StdRng, bytes: usize) -> String {
    let mut hex = String::with_capacity(bytes * 2);
    for _ in 0..bytes {
        let byte: u8 = rng.gen();
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}
