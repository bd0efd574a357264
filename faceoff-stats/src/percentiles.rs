//! Percentile Computation

/// Percentiles reported alongside a version's summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentiles {
    /// Median
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 99th percentile
    pub p99: f64,
}

/// Compute a single percentile from samples.
///
/// Uses linear interpolation between nearest ranks. Empty input yields 0.
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    match samples.len() {
        0 => return 0.0,
        1 => return samples[0],
        _ => {}
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let rank = (percentile / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(n - 1);
    let fraction = rank - lower as f64;

    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Compute the reported percentiles
pub fn compute_percentiles(samples: &[f64]) -> Percentiles {
    Percentiles {
        p50: compute_percentile(samples, 50.0),
        p90: compute_percentile(samples, 90.0),
        p99: compute_percentile(samples, 99.0),
    }
}
