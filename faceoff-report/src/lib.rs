#![warn(missing_docs)]
//! Faceoff Report - Analysis and Output
//!
//! Consumes the flat list of per-version [`ExecutionResult`]s a run produces:
//! - Groups them by heading into [`ComparisonGroup`]s ([`ResultSet`])
//! - Marks fastest/slowest/inconclusive against the baseline
//! - Flags groups whose newest version regressed
//! - Renders JSON (machine-readable) and a terminal chart (human-readable)

mod analysis;
mod chart;
mod json;
mod regression;
mod result;
mod tree;

pub use analysis::{analyze_group, AnalysisConfig};
pub use chart::{format_human_output, DEFAULT_LABEL_WIDTH};
pub use json::{generate_json_report, write_json_report, ReportError, DEFAULT_OUTPUT_PATH};
pub use regression::{find_regressions, Regression, RegressionReport};
pub use result::{ExecutionResult, ResultRecord};
pub use tree::{heading_name, ComparisonGroup, ReportNode, ResultSet, SEPARATOR};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON keyed by benchmark heading
    Json,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert!("csv".parse::<OutputFormat>().is_err());
    }
}
