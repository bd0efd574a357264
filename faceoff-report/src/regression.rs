//! Regression classification
//!
//! The last-registered version of each benchmark is the subject under
//! test. It regressed when it is materially slower than the fastest
//! version of the same benchmark and the analysis found the difference
//! conclusive.

use crate::result::ExecutionResult;
use crate::tree::ComparisonGroup;

/// A benchmark whose newest version is materially slower
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    /// Benchmark heading
    pub heading: String,
    /// The regressed (last-registered) result
    pub subject: ExecutionResult,
    /// Version label of the fastest result
    pub fastest: String,
    /// `fastest.ops_sec / subject.ops_sec`
    pub slowdown_ratio: f64,
}

/// Outcome of classifying every group of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegressionReport {
    /// Groups classified as regressed, in registration order
    pub regressions: Vec<Regression>,
    /// Headings whose subject is inconclusive
    pub inconclusive: Vec<String>,
}

impl RegressionReport {
    /// Whether any group regressed
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}

/// Classify analyzed groups.
///
/// Regression and inconclusive flags are independent: a group may appear in
/// `inconclusive` without being regressed, never in both.
pub fn find_regressions<'a>(
    groups: impl IntoIterator<Item = &'a ComparisonGroup>,
    threshold: f64,
) -> RegressionReport {
    let mut report = RegressionReport::default();

    for group in groups {
        if group.len() < 2 {
            continue;
        }
        let Some(subject) = group.subject() else {
            continue;
        };

        if subject.inconclusive {
            report.inconclusive.push(group.heading.clone());
            continue;
        }
        if subject.fastest {
            continue;
        }
        let Some(fastest) = group.fastest() else {
            continue;
        };
        if subject.ops_sec <= 0.0 {
            continue;
        }

        let slowdown_ratio = fastest.ops_sec / subject.ops_sec;
        if slowdown_ratio >= threshold {
            report.regressions.push(Regression {
                heading: group.heading.clone(),
                subject: subject.clone(),
                fastest: fastest.version.clone(),
                slowdown_ratio,
            });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(version: &str, ops_sec: f64) -> ExecutionResult {
        ExecutionResult {
            name: format!("foo ⇒ {version}"),
            version: version.to_string(),
            ops_sec,
            runs_sampled: 40,
            min: 0.0,
            max: 0.0,
            samples: Vec::new(),
            baseline: false,
            fastest: false,
            slowest: false,
            inconclusive: false,
            p_value: None,
        }
    }

    fn group(heading: &str, mut results: Vec<ExecutionResult>) -> ComparisonGroup {
        results[0].baseline = true;
        ComparisonGroup {
            heading: heading.to_string(),
            results,
        }
    }

    #[test]
    fn test_empty_input() {
        let report = find_regressions(&Vec::<ComparisonGroup>::new(), 1.05);
        assert!(!report.has_regressions());
        assert!(report.inconclusive.is_empty());
    }

    #[test]
    fn test_slower_subject_flagged() {
        let mut a = entry("a", 1989.98);
        a.fastest = true;
        let mut b = entry("b", 1801.98);
        b.slowest = true;
        let groups = [group("foo", vec![a, b])];

        let report = find_regressions(&groups, 1.05);
        assert_eq!(report.regressions.len(), 1);
        assert_eq!(report.regressions[0].fastest, "a");
        assert!(report.regressions[0].slowdown_ratio > 1.1);
    }

    #[test]
    fn test_fastest_subject_not_flagged() {
        let mut a = entry("a", 1989.98);
        a.slowest = true;
        let mut b = entry("b", 1801.98);
        b.fastest = true;

        let report = find_regressions(&[group("foo", vec![a, b])], 1.05);
        assert!(!report.has_regressions());
    }

    #[test]
    fn test_below_threshold_not_flagged() {
        let mut a = entry("a", 20.9);
        a.fastest = true;
        let mut b = entry("b", 20.0);
        b.slowest = true;

        // 20.9 / 20.0 = 1.045
        let report = find_regressions(&[group("foo", vec![a, b])], 1.05);
        assert!(!report.has_regressions());
    }

    #[test]
    fn test_inconclusive_subject_never_flagged() {
        let mut a = entry("a", 100.0);
        a.fastest = true;
        let mut b = entry("b", 10.0);
        b.slowest = true;
        b.inconclusive = true;

        let report = find_regressions(&[group("foo", vec![a, b])], 1.05);
        assert!(!report.has_regressions());
        assert_eq!(report.inconclusive, vec!["foo".to_string()]);
    }

    #[test]
    fn test_intermediate_version_faster_than_baseline() {
        let a = entry("a", 20.0);
        let mut b = entry("b", 25.0);
        b.fastest = true;
        let mut c = entry("c", 20.0);
        c.slowest = true;

        let report = find_regressions(&[group("foo", vec![a, b, c])], 1.05);
        assert_eq!(report.regressions.len(), 1);
        assert_eq!(report.regressions[0].fastest, "b");
        assert!((report.regressions[0].slowdown_ratio - 1.25).abs() < 1e-12);
    }
}
