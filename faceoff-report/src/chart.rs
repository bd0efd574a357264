//! Terminal Chart
//!
//! Human-readable rendering of a run: the suite tree with one bar chart per
//! benchmark, followed by the regression summary.

use crate::regression::RegressionReport;
use crate::tree::{ComparisonGroup, ResultSet};

/// Width reserved for version labels
pub const DEFAULT_LABEL_WIDTH: usize = 32;

const BAR_WIDTH: usize = 40;

/// Format a run for terminal display
pub fn format_human_output(results: &ResultSet, regressions: &RegressionReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Faceoff Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    for (depth, node) in results.tree().walk() {
        let indent = "  ".repeat(depth);
        output.push_str(&format!("{}{}\n", indent, node.name));
        if let Some(group) = node.group {
            push_group(&mut output, group, &format!("{indent}  "));
            output.push('\n');
        }
    }

    if regressions.regressions.is_empty() {
        output.push_str("\nNo significant regressions found.\n");
    } else {
        output.push_str("\nPerformance Regressions:\n");
        output.push_str(&"-".repeat(24));
        output.push('\n');
        for regression in &regressions.regressions {
            output.push_str(&format!(
                "  {}\n    {} is {:.2}x slower than {} ({} vs {} ops/sec)\n",
                regression.heading,
                regression.subject.version,
                regression.slowdown_ratio,
                regression.fastest,
                format_ops(regression.subject.ops_sec),
                format_ops(regression.subject.ops_sec * regression.slowdown_ratio),
            ));
        }
    }

    if !regressions.inconclusive.is_empty() {
        output.push_str("\nInconclusive (differences not statistically significant):\n");
        for heading in &regressions.inconclusive {
            output.push_str(&format!("  {}\n", heading));
        }
    }

    output
}

fn push_group(output: &mut String, group: &ComparisonGroup, indent: &str) {
    let max_ops = group
        .results
        .iter()
        .map(|r| r.ops_sec)
        .fold(0.0_f64, f64::max);

    for result in &group.results {
        let filled = if max_ops > 0.0 {
            ((result.ops_sec / max_ops) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let bar = format!("{}{}", "█".repeat(filled), " ".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)));

        let mut notes = Vec::new();
        if result.baseline {
            notes.push("baseline".to_string());
        }
        if result.inconclusive {
            notes.push("inconclusive".to_string());
        }
        if let Some(p) = result.p_value {
            notes.push(format!("p={:.3}", p));
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };

        output.push_str(&format!(
            "{}{:<width$} | {} | {:>14} ops/sec  {:>5} samples{}\n",
            indent,
            truncate_label(&result.version, DEFAULT_LABEL_WIDTH),
            bar,
            format_ops(result.ops_sec),
            result.runs_sampled,
            notes,
            width = DEFAULT_LABEL_WIDTH
        ));
    }
}

fn truncate_label(label: &str, width: usize) -> String {
    if label.chars().count() <= width {
        return label.to_string();
    }
    let kept: String = label.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Group thousands for readability; small values keep two decimals
fn format_ops(ops: f64) -> String {
    if !ops.is_finite() {
        return "-".to_string();
    }
    if ops < 100.0 {
        return format!("{:.2}", ops);
    }

    let digits = format!("{:.0}", ops);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::find_regressions;
    use crate::result::ExecutionResult;

    #[test]
    fn test_format_ops() {
        assert_eq!(format_ops(18.5), "18.50");
        assert_eq!(format_ops(1989.98), "1,990");
        assert_eq!(format_ops(1_234_567.0), "1,234,567");
        assert_eq!(format_ops(f64::INFINITY), "-");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("lib@2.0", 32), "lib@2.0");
        assert_eq!(truncate_label("abcdef", 4), "abc…");
    }

    #[test]
    fn test_empty_run() {
        let output = format_human_output(&ResultSet::default(), &RegressionReport::default());
        assert!(output.contains("Faceoff Results"));
        assert!(output.contains("No significant regressions found."));
    }

    #[test]
    fn test_regression_section() {
        let mut fast = ExecutionResult::from_samples("s ⇒ b ⇒ v1", "v1", vec![10.0, 10.0], true);
        fast.fastest = true;
        let mut slow = ExecutionResult::from_samples("s ⇒ b ⇒ v2", "v2", vec![20.0, 20.0], false);
        slow.slowest = true;
        let set = ResultSet::from_results(vec![fast, slow]);
        let report = find_regressions(set.groups(), 1.05);

        let output = format_human_output(&set, &report);
        assert!(output.contains("Performance Regressions:"));
        assert!(output.contains("v2 is 2.00x slower than v1"));
        assert!(output.contains("(baseline)"));
        // Suite then benchmark, nested
        assert!(output.contains("s\n  b\n"));
    }
}
