//! pq-search - validated lookups against the store

use anyhow::{Context, Result};
use parquet_lookup::config::{parse_args, SearchArgs, SearchRequest};
use parquet_lookup::error::error_kind;
use parquet_lookup::logging;
use parquet_lookup::search::{search_store, SearchOutcome};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = match parse_args::<SearchArgs>() {
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

fn run(args: SearchArgs) -> Result<()> {
    let log_path = logging::init(env!("CARGO_CRATE_NAME"), &args.log_dir, args.verbose)
        .context("Failed to set up logging")?;
    info!("Logging to {}", log_path.display());

    let db_path = args.db.clone();
    let request = SearchRequest::from_args(args);

    let start = Instant::now();
    let outcome = search_store(&db_path, &request)
        .with_context(|| format!("Search against {} failed", db_path.display()))?;
    match outcome {
        SearchOutcome::NoMatches => {}
        SearchOutcome::Exported { rows, path } => {
            info!(
                "Exported {} rows to {} in {:.2}s",
                rows,
                path.display(),
                start.elapsed().as_secs_f64()
            );
            println!("Results exported to {}", path.display());
        }
    }

    Ok(())
}
