//! pq-convert - stream a CSV file into Parquet
//!
//! Optionally launches `pq-load` on the result.

use anyhow::{Context, Result};
use parquet_lookup::config::{parse_args, ConvertArgs, ConvertConfig};
use parquet_lookup::error::error_kind;
use parquet_lookup::convert::{convert_csv_to_parquet, run_loader, LoaderInvocation};
use parquet_lookup::logging;
use parquet_lookup::progress::{print_header, print_summary, ProgressCallback, ProgressReporter};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = match parse_args::<ConvertArgs>() {
        Ok(args) => args,
        Err(code) => return code,
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e.chain().find_map(error_kind).unwrap_or("other");
            error!(kind, "{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: ConvertArgs) -> Result<()> {
    let log_path = logging::init(env!("CARGO_CRATE_NAME"), &args.log_dir, args.verbose)
        .context("Failed to set up logging")?;

    let config = ConvertConfig::from_args(args).context("Invalid configuration")?;
    info!("Logging to {}", log_path.display());

    print_header(
        "pq-convert",
        &config.csv_path.display().to_string(),
        &config.parquet_path.display().to_string(),
    );

    let progress = Arc::new(ProgressReporter::new());
    let reporter = Arc::clone(&progress);
    let callback: ProgressCallback = Box::new(move |rows: u64, _: u64| {
        reporter.update_rows("Converted", rows);
    });

    let start = Instant::now();
    let stats = convert_csv_to_parquet(
        &config.csv_path,
        &config.parquet_path,
        config.chunk_size,
        Some(callback),
    )
    .context("Conversion failed")?;
    progress.finish_and_clear();

    info!(
        "CSV successfully converted to Parquet at {}",
        config.parquet_path.display()
    );
    print_summary(
        "Conversion Complete",
        stats.rows,
        start.elapsed(),
        &config.parquet_path.display().to_string(),
        Some(stats.bytes_written),
    );

    if config.load_after {
        let invocation = LoaderInvocation::from_config(&config);
        run_loader(&invocation).context("Failed to load/index data")?;
        info!("Data loaded and indexed into table '{}'", config.table);
    }

    Ok(())
}
