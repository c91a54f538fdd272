//! pq-load - load a Parquet file into the store

use anyhow::{Context, Result};
use parquet_lookup::config::{parse_args, LoadArgs, LoadConfig};
use parquet_lookup::error::error_kind;
use parquet_lookup::logging;
use parquet_lookup::progress::{print_header, print_summary, ProgressCallback, ProgressReporter};
use parquet_lookup::store::{self, LoadOutcome};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = match parse_args::<LoadArgs>() {
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

fn run(args: LoadArgs) -> Result<()> {
    let log_path = logging::init(env!("CARGO_CRATE_NAME"), &args.log_dir, args.verbose)
        .context("Failed to set up logging")?;

    let config = LoadConfig::from_args(args).context("Invalid configuration")?;
    info!("Logging to {}", log_path.display());

    if config.show_progress {
        print_header(
            "pq-load",
            &config.parquet_path.display().to_string(),
            &format!("{} (table '{}')", config.db_path.display(), config.table),
        );
    }

    let mut conn = store::open_for_load(&config.db_path)
        .with_context(|| format!("Failed to open store {}", config.db_path.display()))?;

    let progress = config.show_progress.then(|| Arc::new(ProgressReporter::new()));
    let callback = progress.as_ref().map(|p| {
        let reporter = Arc::clone(p);
        Box::new(move |rows: u64, _: u64| reporter.update_rows("Loaded", rows)) as ProgressCallback
    });

    let start = Instant::now();
    let outcome = store::load_parquet(&mut conn, &config, callback).context("Load failed")?;

    if let Some(ref p) = progress {
        p.finish_and_clear();
    }

    match &outcome {
        LoadOutcome::Loaded { rows, indexes } => {
            info!(
                "Table '{}' loaded with {} rows and {} indexes",
                config.table,
                rows,
                indexes.len()
            );
            if config.show_progress {
                print_summary(
                    "Load Complete",
                    *rows,
                    start.elapsed(),
                    &config.db_path.display().to_string(),
                    std::fs::metadata(&config.db_path).ok().map(|m| m.len()),
                );
            }
        }
        LoadOutcome::Skipped { rows } => {
            info!(
                "Table '{}' left unchanged ({} rows)",
                config.table, rows
            );
        }
    }

    Ok(())
}
