//! Post-conversion loader launch
//!
//! The loader runs as its own process. A spawn failure or nonzero exit is
//! fatal to the converter.

use crate::config::ConvertConfig;
use crate::error::{ExecutionError, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{error, info};

/// Name of the loader binary
pub const LOADER_BIN: &str = "pq-load";

/// Arguments for one loader run
#[derive(Debug, Clone)]
pub struct LoaderInvocation {
    pub program: PathBuf,
    pub parquet_path: PathBuf,
    pub db_path: PathBuf,
    pub table: String,
    pub log_dir: PathBuf,
}

impl LoaderInvocation {
    /// Load the converter's output into the configured table
    pub fn from_config(config: &ConvertConfig) -> Self {
        Self {
            program: loader_program(),
            parquet_path: config.parquet_path.clone(),
            db_path: config.db_path.clone(),
            table: config.table.clone(),
            log_dir: config.log_dir.clone(),
        }
    }

    /// Build the process command
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--parquet")
            .arg(&self.parquet_path)
            .arg("--db")
            .arg(&self.db_path)
            .arg("--table")
            .arg(&self.table)
            .arg("--log-dir")
            .arg(&self.log_dir)
            .arg("--quiet");
        cmd
    }
}

/// Locate the loader: next to the running executable, else via `PATH`.
pub fn loader_program() -> PathBuf {
    let file_name = format!("{}{}", LOADER_BIN, env::consts::EXE_SUFFIX);

    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from(file_name))
}

/// Run the loader and wait for it.
pub fn run_loader(invocation: &LoaderInvocation) -> Result<()> {
    let program = display_program(&invocation.program);
    info!("Launching {}...", program);

    let status = invocation.command().status().map_err(|e| {
        error!("Failed to launch {}: {}", program, e);
        ExecutionError::Loader {
            program: program.clone(),
            reason: e.to_string(),
        }
    })?;

    if !status.success() {
        error!("Failed to load/index data: {}", status);
        return Err(ExecutionError::Loader {
            program,
            reason: status.to_string(),
        }
        .into());
    }

    info!("Loader finished successfully");
    Ok(())
}

fn display_program(program: &Path) -> String {
    program.display().to_string()
}
