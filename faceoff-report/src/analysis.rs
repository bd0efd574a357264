//! Comparative analysis of one benchmark's versions

use crate::tree::ComparisonGroup;
use faceoff_stats::{welch_t_test, DEFAULT_ALPHA, DEFAULT_MIN_SAMPLES};

/// Policy knobs for analysis and regression classification
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Both sides need at least this many samples before a test runs
    pub min_samples: usize,
    /// Significance level
    pub alpha: f64,
    /// `fastest.ops_sec / subject.ops_sec` at or above this is a regression
    pub regression_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            alpha: DEFAULT_ALPHA,
            regression_threshold: 1.05,
        }
    }
}

/// Annotate a group with `fastest`, `slowest`, `inconclusive` and `p_value`.
///
/// Groups with fewer than two members are left untouched. Ties on ops/sec
/// go to the earlier-registered member, so the baseline wins any tie it is
/// part of.
pub fn analyze_group(group: &mut ComparisonGroup, config: &AnalysisConfig) {
    let results = &mut group.results;
    if results.len() < 2 {
        return;
    }

    for result in results.iter_mut() {
        result.fastest = false;
        result.slowest = false;
        result.inconclusive = false;
        result.p_value = None;
    }

    let mut fastest = 0;
    let mut slowest = 0;
    for (idx, result) in results.iter().enumerate().skip(1) {
        if result.ops_sec > results[fastest].ops_sec {
            fastest = idx;
        }
        if result.ops_sec < results[slowest].ops_sec {
            slowest = idx;
        }
    }
    results[fastest].fastest = true;
    results[slowest].slowest = true;

    let (baseline, candidates) = results.split_at_mut(1);
    let baseline = &mut baseline[0];
    let mut significant = 0;

    for candidate in candidates.iter_mut() {
        let enough = baseline.runs_sampled >= config.min_samples
            && candidate.runs_sampled >= config.min_samples;
        if !enough {
            candidate.inconclusive = true;
            continue;
        }

        match welch_t_test(&baseline.samples, &candidate.samples) {
            Ok(test) => {
                candidate.p_value = Some(test.p_value);
                if test.is_significant(config.alpha) {
                    significant += 1;
                } else {
                    candidate.inconclusive = true;
                }
            }
            Err(_) => candidate.inconclusive = true,
        }
    }

    if significant == 0 {
        baseline.inconclusive = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ExecutionResult;

    fn member(version: &str, mean_ns: f64, count: usize, baseline: bool) -> ExecutionResult {
        // Small deterministic jitter keeps the variance non-zero
        let samples = (0..count)
            .map(|i| mean_ns + ((i % 3) as f64 - 1.0) * mean_ns * 0.001)
            .collect();
        ExecutionResult::from_samples(format!("bench ⇒ {version}"), version, samples, baseline)
    }

    fn group(members: Vec<ExecutionResult>) -> ComparisonGroup {
        ComparisonGroup {
            heading: "bench".to_string(),
            results: members,
        }
    }

    #[test]
    fn test_single_member_untouched() {
        let mut g = group(vec![member("a", 100.0, 50, true)]);
        analyze_group(&mut g, &AnalysisConfig::default());

        let only = &g.results[0];
        assert!(!only.fastest && !only.slowest && !only.inconclusive);
        assert_eq!(only.p_value, None);
    }

    #[test]
    fn test_significant_difference() {
        let mut g = group(vec![member("a", 100.0, 50, true), member("b", 200.0, 50, false)]);
        analyze_group(&mut g, &AnalysisConfig::default());

        assert!(g.results[0].fastest);
        assert!(g.results[1].slowest);
        assert!(!g.results[1].inconclusive);
        assert!(g.results[1].p_value.unwrap() < 0.05);
        assert!(!g.results[0].inconclusive);
    }

    #[test]
    fn test_below_min_samples_is_inconclusive() {
        let mut g = group(vec![member("a", 100.0, 29, true), member("b", 1000.0, 50, false)]);
        analyze_group(&mut g, &AnalysisConfig::default());

        assert!(g.results[1].inconclusive);
        assert_eq!(g.results[1].p_value, None);
        // Zero significant candidates taints the baseline too
        assert!(g.results[0].inconclusive);
        // Ranking still happens
        assert!(g.results[0].fastest);
        assert!(g.results[1].slowest);
    }

    #[test]
    fn test_not_significant_is_inconclusive() {
        let mut g = group(vec![member("a", 100.0, 40, true), member("b", 100.0, 40, false)]);
        analyze_group(&mut g, &AnalysisConfig::default());

        assert!(g.results[1].inconclusive);
        assert!(g.results[1].p_value.unwrap() > 0.05);
        assert!(g.results[0].inconclusive);
    }

    #[test]
    fn test_ties_go_to_baseline() {
        let mut g = group(vec![
            member("a", 100.0, 40, true),
            member("b", 100.0, 40, false),
            member("c", 100.0, 40, false),
        ]);
        analyze_group(&mut g, &AnalysisConfig::default());

        assert!(g.results[0].fastest);
        assert!(g.results[0].slowest);
        assert!(!g.results[1].fastest && !g.results[2].fastest);
    }

    #[test]
    fn test_one_significant_keeps_baseline_conclusive() {
        let mut g = group(vec![
            member("a", 100.0, 40, true),
            member("b", 100.0, 40, false),
            member("c", 300.0, 40, false),
        ]);
        analyze_group(&mut g, &AnalysisConfig::default());

        assert!(g.results[1].inconclusive);
        assert!(!g.results[2].inconclusive);
        assert!(!g.results[0].inconclusive);
    }
}
