//! Logging setup shared by all binaries
//!
//! Each run writes timestamped log lines to stdout and to its own log file,
//! `<log_dir>/<component>_%Y-%m-%d_%H-%M-%S.log`.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the per-run log file path for a component.
pub fn log_file_path(log_dir: &Path, component: &str, started: DateTime<Local>) -> PathBuf {
    log_dir.join(format!(
        "{}_{}.log",
        component,
        started.format("%Y-%m-%d_%H-%M-%S")
    ))
}

/// Filter directives for the library and the calling binary.
fn filter_directives(component: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!(
        "{}={level},{component}={level},warn",
        env!("CARGO_CRATE_NAME")
    )
}

/// Install the stdout + file subscriber and return the log file path.
///
/// `component` should be the calling crate's name (`env!("CARGO_CRATE_NAME")`)
/// so its own events pass the filter.
pub fn init(component: &str, log_dir: &Path, verbose: bool) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let path = log_file_path(log_dir, component, Local::now());
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let stdout_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter_directives(component, verbose)))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    Ok(path)
}
