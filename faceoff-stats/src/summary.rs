//! Summary Statistics
//!
//! All inputs are per-operation durations in nanoseconds, one value per
//! timed batch.

use crate::percentiles::compute_percentile;

/// Summary of one version's sample array
#[derive(Debug, Clone, Default)]
pub struct SummaryStatistics {
    /// Arithmetic mean (ns per operation)
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// Fastest observed operation
    pub min: f64,
    /// Slowest observed operation
    pub max: f64,
    /// Median
    pub p50: f64,
    /// 99th percentile
    pub p99: f64,
    /// Number of samples
    pub sample_count: usize,
}

/// Compute summary statistics over `samples`
pub fn compute_summary(samples: &[f64]) -> SummaryStatistics {
    if samples.is_empty() {
        return SummaryStatistics::default();
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;

    let std_dev = if samples.len() < 2 {
        0.0
    } else {
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    };

    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    SummaryStatistics {
        mean,
        std_dev,
        min,
        max,
        p50: compute_percentile(samples, 50.0),
        p99: compute_percentile(samples, 99.0),
        sample_count: samples.len(),
    }
}

impl SummaryStatistics {
    /// Operations per second implied by the mean duration
    pub fn ops_per_sec(&self) -> f64 {
        if self.mean > 0.0 {
            1e9 / self.mean
        } else {
            0.0
        }
    }

    /// Relative margin of error as a percentage of the mean (95%, normal approximation)
    pub fn relative_margin_of_error(&self) -> f64 {
        if self.mean == 0.0 || self.sample_count < 2 {
            return 0.0;
        }
        let sem = self.std_dev / (self.sample_count as f64).sqrt();
        1.96 * sem / self.mean * 100.0
    }

    /// Coefficient of variation (relative stddev) in percent
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            (self.std_dev / self.mean) * 100.0
        }
    }
}
