//! Progress bar over execution units

use faceoff_core::RunObserver;
use faceoff_report::{ExecutionResult, ResultSet};
use indicatif::{ProgressBar, ProgressStyle};

/// Renders run progress on stderr
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Drop for ProgressObserver {
    // A failed run never reaches `run_finished`
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl RunObserver for ProgressObserver {
    fn run_started(&self, units: usize) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_length(units as u64);
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
    }

    fn unit_started(&self, benchmark: &str, version: &str) {
        self.bar.set_message(format!("{benchmark} [{version}]"));
    }

    fn unit_finished(&self, _result: &ExecutionResult) {
        self.bar.inc(1);
    }

    fn run_finished(&self, _results: &ResultSet) {
        self.bar.finish_and_clear();
    }
}
