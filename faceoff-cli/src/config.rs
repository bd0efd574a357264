//! Configuration loading from faceoff.toml
//!
//! A `faceoff.toml` in the project root configures sampling, analysis
//! policy and output. It is discovered by walking up from the current
//! directory.

use anyhow::{bail, Context};
use faceoff_core::{parse_duration, TuningOptions};
use faceoff_report::{AnalysisConfig, OutputFormat, DEFAULT_OUTPUT_PATH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file
pub const CONFIG_FILE: &str = "faceoff.toml";

/// Faceoff configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FaceoffConfig {
    /// Sampling and isolation
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Significance and regression policy
    #[serde(default)]
    pub analysis: AnalysisSection,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where execution units run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    /// Run in the benchmark process
    #[default]
    InProcess,
    /// Run each execution unit in a fresh worker process
    Process,
}

impl IsolationMode {
    /// Whether this mode provides process isolation
    pub fn is_isolated(self) -> bool {
        matches!(self, IsolationMode::Process)
    }
}

/// Sampler defaults, layered under every suite and benchmark option
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Warmup before measuring (e.g. "100ms")
    #[serde(default = "default_warmup")]
    pub warmup_time: String,
    /// Target duration of one timed batch
    #[serde(default = "default_min_time")]
    pub min_time: String,
    /// Measurement budget per execution unit
    #[serde(default = "default_max_time")]
    pub max_time: String,
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,
    #[serde(default)]
    pub max_samples: Option<u64>,
    /// Fixed sample count: skip warmup, exactly N one-iteration samples
    #[serde(default)]
    pub samples: Option<u64>,
    /// "in-process" or "process"
    #[serde(default)]
    pub isolation: IsolationMode,
    /// Kill an isolated worker after this long (e.g. "5m")
    #[serde(default)]
    pub worker_timeout: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            warmup_time: default_warmup(),
            min_time: default_min_time(),
            max_time: default_max_time(),
            min_samples: default_min_samples(),
            max_samples: None,
            samples: None,
            isolation: IsolationMode::default(),
            worker_timeout: None,
        }
    }
}

fn default_warmup() -> String {
    "100ms".to_string()
}
fn default_min_time() -> String {
    "5ms".to_string()
}
fn default_max_time() -> String {
    "500ms".to_string()
}
fn default_min_samples() -> u64 {
    10
}

impl RunnerConfig {
    /// Resolve into validated tuning
    pub fn tuning(&self) -> anyhow::Result<TuningOptions> {
        let duration = |key: &str, value: &str| {
            parse_duration(value)
                .map_err(|reason| anyhow::anyhow!("[runner] {key} = {value:?}: {reason}"))
        };
        let tuning = TuningOptions {
            warmup_time: duration("warmup_time", &self.warmup_time)?,
            min_time: duration("min_time", &self.min_time)?,
            max_time: duration("max_time", &self.max_time)?,
            min_samples: self.min_samples,
            max_samples: self.max_samples,
            samples: self.samples,
            isolated: self.isolation.is_isolated(),
        };
        tuning.validate().context("invalid [runner] configuration")?;
        Ok(tuning)
    }

    /// Parsed worker timeout, if one is configured
    pub fn worker_timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.worker_timeout
            .as_deref()
            .map(|value| {
                parse_duration(value)
                    .map_err(|reason| anyhow::anyhow!("[runner] worker_timeout = {value:?}: {reason}"))
            })
            .transpose()
    }
}

/// Policy constants for significance testing and regression detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSection {
    /// Samples both sides need before a significance test runs
    #[serde(default = "default_analysis_min_samples")]
    pub min_samples: usize,
    /// Significance level
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Slowdown ratio at which the newest version counts as regressed
    #[serde(default = "default_regression_threshold")]
    pub regression_threshold: f64,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            min_samples: default_analysis_min_samples(),
            alpha: default_alpha(),
            regression_threshold: default_regression_threshold(),
        }
    }
}

fn default_analysis_min_samples() -> usize {
    AnalysisConfig::default().min_samples
}
fn default_alpha() -> f64 {
    AnalysisConfig::default().alpha
}
fn default_regression_threshold() -> f64 {
    AnalysisConfig::default().regression_threshold
}

impl AnalysisSection {
    /// Validated analysis policy
    pub fn analysis_config(&self) -> anyhow::Result<AnalysisConfig> {
        if self.min_samples < 2 {
            bail!("[analysis] min_samples must be at least 2, got {}", self.min_samples);
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            bail!("[analysis] alpha must be in (0, 1), got {}", self.alpha);
        }
        if !(self.regression_threshold.is_finite() && self.regression_threshold >= 1.0) {
            bail!(
                "[analysis] regression_threshold must be >= 1.0, got {}",
                self.regression_threshold
            );
        }
        Ok(AnalysisConfig {
            min_samples: self.min_samples,
            alpha: self.alpha,
            regression_threshold: self.regression_threshold,
        })
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Console format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// JSON results file
    #[serde(default = "default_output_file")]
    pub file: String,
    /// Write the JSON results file after each run
    #[serde(default = "default_write_json")]
    pub write_json: bool,
    /// Exit with status 1 when a regression is detected
    #[serde(default)]
    pub fail_on_regression: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            file: default_output_file(),
            write_json: default_write_json(),
            fail_on_regression: false,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_file() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}
fn default_write_json() -> bool {
    true
}

impl OutputConfig {
    /// Parsed console format
    pub fn format(&self) -> anyhow::Result<OutputFormat> {
        self.format
            .parse::<OutputFormat>()
            .map_err(|e| anyhow::anyhow!("[output] format: {e}"))
    }
}

impl FaceoffConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Find the nearest `faceoff.toml` walking up from `start`
    pub fn find(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Discover and load configuration from the current directory upward.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn discover() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        match Self::find(&cwd) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check every section without running anything
    pub fn validate(&self) -> anyhow::Result<()> {
        self.runner.tuning()?;
        self.runner.worker_timeout()?;
        self.analysis.analysis_config()?;
        self.output.format()?;
        Ok(())
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Faceoff Configuration

[runner]
# Warmup before measuring each version
warmup_time = "100ms"
# Target duration of one timed batch
min_time = "5ms"
# Measurement budget per version
max_time = "500ms"
# Samples collected even when the budget runs out
min_samples = 10
# Cap on collected samples (uncomment to enable)
# max_samples = 1000
# Fixed sample count: skip warmup, run exactly N single iterations (uncomment to enable)
# samples = 50
# Isolation mode: "in-process" or "process"
isolation = "in-process"
# Kill an isolated worker that runs longer than this (uncomment to enable)
# worker_timeout = "5m"

[analysis]
# Samples both versions need before a significance test runs
min_samples = 30
# Significance level of the two-sided Welch t-test
alpha = 0.05
# fastest / newest ops/sec ratio that counts as a regression
regression_threshold = 1.05

[output]
# Console format: human or json
format = "human"
# JSON results file
file = "output/benchmark-results/benchmark.json"
# Write the JSON results file after each run
write_json = true
# Exit with status 1 when a regression is detected
fail_on_regression = false
"#
        .to_string()
    }
}
