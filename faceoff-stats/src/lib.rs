#![warn(missing_docs)]
//! Faceoff Statistical Engine
//!
//! Turns raw per-operation duration samples into the numbers the
//! comparative analysis consumes:
//! - Summary statistics (mean, spread, extremes, throughput)
//! - Percentiles by linear interpolation
//! - Welch's two-sample t-test for significance against a baseline

mod percentiles;
mod significance;
mod summary;

pub use percentiles::{compute_percentile, compute_percentiles, Percentiles};
pub use significance::{welch_t_test, SignificanceError, TTestResult};
pub use summary::{compute_summary, SummaryStatistics};

/// Minimum per-side sample count before a significance test is attempted
pub const DEFAULT_MIN_SAMPLES: usize = 30;

/// Default significance level
pub const DEFAULT_ALPHA: f64 = 0.05;
