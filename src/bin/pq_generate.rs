//! pq-generate - write a synthetic 50-column CSV

use anyhow::{Context, Result};
use parquet_lookup::config::{parse_args, GenerateArgs, GenerateConfig};
use parquet_lookup::error::error_kind;
use parquet_lookup::generate::generate_csv;
use parquet_lookup::logging;
use parquet_lookup::progress::{print_summary, ProgressCallback, ProgressReporter};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = match parse_args::<GenerateArgs>() {
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

fn run(args: GenerateArgs) -> Result<()> {
    let log_path = logging::init(env!("CARGO_CRATE_NAME"), &args.log_dir, args.verbose)
        .context("Failed to set up logging")?;
    info!("Logging to {}", log_path.display());

    let config = GenerateConfig::from_args(args);

    let progress = config.show_progress.then(|| Arc::new(ProgressReporter::new()));
    let callback = progress.as_ref().map(|p| {
        let reporter = Arc::clone(p);
        Box::new(move |rows: u64, _: u64| reporter.update_rows("Generated", rows)) as ProgressCallback
    });

    let start = Instant::now();
    let rows = generate_csv(&config, callback).context("Generation failed")?;

    if let Some(ref p) = progress {
        p.finish_and_clear();
    }

    if config.show_progress {
        print_summary(
            "Generation Complete",
            rows,
            start.elapsed(),
            &config.output_path.display().to_string(),
            std::fs::metadata(&config.output_path).ok().map(|m| m.len()),
        );
    }

    Ok(())
}
