//! Per-version results

use crate::tree::heading_name;
use faceoff_stats::compute_summary;
use serde::{Deserialize, Serialize};

/// Outcome of running one benchmark against one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Fully-qualified name: `path ⇒ name ⇒ version`
    pub name: String,
    /// Version label
    pub version: String,
    /// Operations per second implied by the mean per-operation duration
    pub ops_sec: f64,
    /// Number of samples collected
    pub runs_sampled: usize,
    /// Fastest per-operation duration (ns)
    pub min: f64,
    /// Slowest per-operation duration (ns)
    pub max: f64,
    /// Raw per-operation durations (ns)
    pub samples: Vec<f64>,
    /// First non-skipped version of the benchmark
    pub baseline: bool,
    /// Highest ops/sec in its group
    pub fastest: bool,
    /// Lowest ops/sec in its group
    pub slowest: bool,
    /// No significant difference could be established
    pub inconclusive: bool,
    /// p-value of the comparison against the baseline
    pub p_value: Option<f64>,
}

impl ExecutionResult {
    /// Build an unanalyzed result from raw samples.
    pub fn from_samples(
        name: impl Into<String>,
        version: impl Into<String>,
        samples: Vec<f64>,
        baseline: bool,
    ) -> Self {
        let summary = compute_summary(&samples);
        Self {
            name: name.into(),
            version: version.into(),
            ops_sec: summary.ops_per_sec(),
            runs_sampled: summary.sample_count,
            min: summary.min,
            max: summary.max,
            samples,
            baseline,
            fastest: false,
            slowest: false,
            inconclusive: false,
            p_value: None,
        }
    }

    /// Heading of the group this result belongs to
    pub fn heading(&self) -> &str {
        heading_name(&self.name)
    }

    /// Projection written to JSON output
    pub fn record(&self) -> ResultRecord {
        ResultRecord {
            name: self.version.clone(),
            ops_sec: self.ops_sec,
            runs_sampled: self.runs_sampled,
            min: self.min,
            max: self.max,
            inconclusive: self.inconclusive,
            p_value: self.p_value,
        }
    }
}

/// One entry of a heading's array in the JSON output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Version label
    pub name: String,
    pub ops_sec: f64,
    pub runs_sampled: usize,
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inconclusive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples() {
        let result = ExecutionResult::from_samples(
            "parse ⇒ small ⇒ lib@2.0",
            "lib@2.0",
            vec![40.0, 50.0, 60.0],
            true,
        );

        assert_eq!(result.heading(), "parse ⇒ small");
        assert_eq!(result.runs_sampled, 3);
        assert!((result.ops_sec - 1e9 / 50.0).abs() < 1e-6);
        assert_eq!(result.min, 40.0);
        assert_eq!(result.max, 60.0);
        assert!(result.baseline);
        assert!(!result.inconclusive);
    }

    #[test]
    fn test_record_omits_unset_flags() {
        let result = ExecutionResult::from_samples("a ⇒ v1", "v1", vec![10.0, 10.0], true);
        let json = serde_json::to_value(result.record()).unwrap();

        assert_eq!(json["name"], "v1");
        assert_eq!(json["runsSampled"], 2);
        assert!(json.get("inconclusive").is_none());
        assert!(json.get("pValue").is_none());
    }
}
