//! Progress reporting and run summaries
//!
//! Provides a spinner for long row loops and console-styled summaries.

use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress callback type: (rows processed so far, rows in the last step)
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send>;

/// Spinner that displays row counts while a tool runs
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the row counter
    pub fn update_rows(&self, verb: &str, rows: u64) {
        self.bar
            .set_message(format!("{}: {} rows", verb, format_number(rows)));
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears a spinner that was never finished, e.g. when a run bails out with `?`
impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of a run
pub fn print_header(tool: &str, source: &str, output: &str) {
    println!();
    println!("{} {}", style(tool).cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Source:").bold(), source);
    println!("  {} {}", style("Output:").bold(), output);
    println!();
}

/// Print a summary of a finished run
pub fn print_summary(
    title: &str,
    rows: u64,
    duration: Duration,
    output_path: &str,
    output_size: Option<u64>,
) {
    let duration_secs = duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        rows as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    println!("{}", style(title).green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Rows:").bold(), format_number(rows));
    println!(
        "  {} {:.1}s ({:.0} rows/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if let Some(size) = output_size {
        println!(
            "  {} {} ({})",
            style("Output:").bold(),
            output_path,
            format_size(size, BINARY)
        );
    } else {
        println!("  {} {}", style("Output:").bold(), output_path);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }

    #[test]
    fn test_drop_clears_unfinished_spinner() {
        let reporter = ProgressReporter::new();
        reporter.update_rows("Converted", 10);
        let bar = reporter.bar.clone();
        assert!(!bar.is_finished());

        drop(reporter);
        assert!(bar.is_finished());
    }

    #[test]
    fn test_spinner_cleared_when_callback_owner_fails() {
        use std::sync::Arc;

        let failing = |callback: ProgressCallback| -> Result<(), &'static str> {
            callback(5, 5);
            Err("read failed")
        };
        let run = || -> (ProgressBar, Result<(), &'static str>) {
            let reporter = Arc::new(ProgressReporter::new());
            let bar = reporter.bar.clone();
            let cloned = Arc::clone(&reporter);
            let callback: ProgressCallback =
                Box::new(move |rows: u64, _: u64| cloned.update_rows("Loaded", rows));
            let result = failing(callback);
            (bar, result)
        };

        let (bar, result) = run();
        assert!(result.is_err());
        assert!(bar.is_finished());
    }
}
