//! Faceoff CLI Library
//!
//! Command-line driver for benchmark binaries. Register benchmarks on a
//! [`Faceoff`] and hand it to [`run`]; the same binary doubles as the
//! isolated worker when re-executed with the hidden worker flag.
//!
//! # Example
//!
//! ```ignore
//! use faceoff::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut faceoff = Faceoff::new([
//!         ("stable", VersionSource::module(parser_v1(), "/opt/parser-1")),
//!         ("next", VersionSource::module(parser_v2(), ".")),
//!     ])?;
//!     faceoff.add("parse small", |p, _| p.parse(SMALL), Options::new())?;
//!     faceoff::run(&faceoff)
//! }
//! ```

mod config;
mod planner;
mod progress;
mod supervisor;

pub use config::*;
pub use planner::{build_plan, ExecutionPlan, PlanEntry};
pub use progress::ProgressObserver;
pub use supervisor::*;

use anyhow::Context;
use clap::Parser;
use faceoff_core::{parse_duration, Faceoff, Runner, TuningOptions, WorkerMain};
use faceoff_report::{
    find_regressions, format_human_output, generate_json_report, write_json_report,
    AnalysisConfig, OutputFormat, RegressionReport, ResultSet,
};
use regex::Regex;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// Faceoff CLI arguments
#[derive(Parser, Debug)]
#[command(name = "faceoff")]
#[command(version, about = "Faceoff - compare benchmark results across versions")]
pub struct Cli {
    /// Only run benchmarks whose heading matches this regex
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Console format: human, json (default from faceoff.toml)
    #[arg(long)]
    pub format: Option<String>,

    /// Write JSON results to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not write the JSON results file
    #[arg(long)]
    pub no_json: bool,

    /// List benchmarks and versions without executing
    #[arg(long)]
    pub list: bool,

    /// Fixed sample count: skip warmup, one iteration per sample
    #[arg(long, short = 'n')]
    pub samples: Option<u64>,

    /// Run every execution unit in a fresh worker process
    #[arg(long)]
    pub isolated: bool,

    /// Kill an isolated worker after this long (e.g. "30s")
    #[arg(long)]
    pub worker_timeout: Option<String>,

    /// Exit non-zero when any comparison regressed
    #[arg(long)]
    pub fail_on_regression: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: Run as worker process (used by supervisor)
    #[arg(long = "faceoff-worker", hide = true)]
    pub faceoff_worker: bool,

    /// Internal: Absorb cargo bench's --bench flag
    #[arg(long, hide = true)]
    pub bench: bool,
}

/// Effective run settings: faceoff.toml values with CLI flags on top
#[derive(Debug, Clone)]
pub struct Settings {
    pub filter: Regex,
    pub format: OutputFormat,
    pub tuning: TuningOptions,
    pub analysis: AnalysisConfig,
    pub isolated: bool,
    pub worker_timeout: Option<Duration>,
    /// JSON results destination, `None` when disabled
    pub json_path: Option<PathBuf>,
    pub fail_on_regression: bool,
}

impl Settings {
    /// Layer CLI flags over the loaded configuration
    pub fn resolve(cli: &Cli, config: &FaceoffConfig) -> anyhow::Result<Self> {
        let filter = Regex::new(&cli.filter)
            .with_context(|| format!("invalid filter pattern '{}'", cli.filter))?;

        let format = match &cli.format {
            Some(format) => format
                .parse::<OutputFormat>()
                .map_err(|e| anyhow::anyhow!("--format: {e}"))?,
            None => config.output.format()?,
        };

        let mut tuning = config.runner.tuning()?;
        if let Some(samples) = cli.samples {
            tuning.samples = Some(samples);
        }
        tuning.validate()?;

        let worker_timeout = match &cli.worker_timeout {
            Some(value) => Some(
                parse_duration(value).map_err(|e| anyhow::anyhow!("--worker-timeout: {e}"))?,
            ),
            None => config.runner.worker_timeout()?,
        };

        let json_path = if cli.no_json {
            None
        } else if let Some(path) = &cli.output {
            Some(path.clone())
        } else if config.output.write_json {
            Some(PathBuf::from(&config.output.file))
        } else {
            None
        };

        Ok(Self {
            filter,
            format,
            tuning,
            analysis: config.analysis.analysis_config()?,
            isolated: cli.isolated || config.runner.isolation.is_isolated(),
            worker_timeout,
            json_path,
            fail_on_regression: cli.fail_on_regression || config.output.fail_on_regression,
        })
    }

    /// Runner configured from these settings
    pub fn runner(&self) -> Runner {
        let filter = self.filter.clone();
        Runner::new()
            .base_tuning(self.tuning.clone())
            .analysis(self.analysis.clone())
            .filter(move |heading| filter.is_match(heading))
            .isolation(ProcessIsolation::new(self.worker_timeout))
            .force_isolation(self.isolated)
    }
}

/// Outcome of a completed run
#[derive(Debug)]
pub struct RunSummary {
    pub results: ResultSet,
    pub regressions: RegressionReport,
    /// Console rendering in the selected format
    pub rendered: String,
}

/// Run the Faceoff CLI with the process arguments.
/// This is the main entry point for benchmark binaries.
pub fn run<M, C: Default>(faceoff: &Faceoff<M, C>) -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli, faceoff)
}

/// Run the Faceoff CLI with pre-parsed arguments.
pub fn run_with_cli<M, C: Default>(cli: Cli, faceoff: &Faceoff<M, C>) -> anyhow::Result<()> {
    // Worker mode first, before any other initialization
    if cli.faceoff_worker {
        return run_worker_mode(faceoff);
    }

    let filter = if cli.verbose { "faceoff=debug" } else { "faceoff=info" };
    // A host that already installed a subscriber keeps it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = FaceoffConfig::discover()?;
    let settings = Settings::resolve(&cli, &config)?;

    if cli.list {
        print!("{}", build_plan(faceoff, Some(&settings.filter)).render());
        return Ok(());
    }

    let summary = run_benchmarks(&settings, faceoff)?;
    println!("{}", summary.rendered);

    if settings.fail_on_regression && summary.regressions.has_regressions() {
        eprintln!(
            "{} comparison(s) regressed",
            summary.regressions.regressions.len()
        );
        std::process::exit(1);
    }

    Ok(())
}

fn run_worker_mode<M, C: Default>(faceoff: &Faceoff<M, C>) -> anyhow::Result<()> {
    let mut worker = WorkerMain::new();
    worker
        .run(faceoff)
        .map_err(|e| anyhow::anyhow!("Worker error: {}", e))
}

/// Execute the selected benchmarks, analyze, render and persist results
pub fn run_benchmarks<M, C: Default>(
    settings: &Settings,
    faceoff: &Faceoff<M, C>,
) -> anyhow::Result<RunSummary> {
    if build_plan(faceoff, Some(&settings.filter)).is_empty() {
        info!("No benchmarks match '{}'", settings.filter);
    }

    let start = Instant::now();
    let results = settings
        .runner()
        .observer(ProgressObserver::new())
        .run(faceoff)?;
    info!("Completed in {:.2}s", start.elapsed().as_secs_f64());

    let regressions = find_regressions(results.groups(), settings.analysis.regression_threshold);

    let rendered = match settings.format {
        OutputFormat::Human => format_human_output(&results, &regressions),
        OutputFormat::Json => generate_json_report(&results)?,
    };

    if let Some(path) = &settings.json_path {
        write_json_report(&results, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Results written to {}", path.display());
    }

    Ok(RunSummary {
        results,
        regressions,
        rendered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("bench").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults_come_from_config() {
        let settings = Settings::resolve(&cli(&[]), &FaceoffConfig::default()).unwrap();

        assert_eq!(settings.format, OutputFormat::Human);
        assert!(settings.filter.is_match("anything ⇒ at all"));
        assert!(!settings.isolated);
        assert_eq!(settings.analysis, AnalysisConfig::default());
        assert_eq!(
            settings.json_path.as_deref(),
            Some(std::path::Path::new(faceoff_report::DEFAULT_OUTPUT_PATH))
        );
    }

    #[test]
    fn test_cli_flags_override_config() {
        let mut config = FaceoffConfig::default();
        config.output.format = "json".to_string();
        let settings = Settings::resolve(
            &cli(&["--format", "human", "-n", "7", "--isolated", "-o", "out.json"]),
            &config,
        )
        .unwrap();

        assert_eq!(settings.format, OutputFormat::Human);
        assert_eq!(settings.tuning.samples, Some(7));
        assert!(settings.isolated);
        assert_eq!(settings.json_path, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_no_json_disables_file() {
        let settings = Settings::resolve(&cli(&["--no-json"]), &FaceoffConfig::default()).unwrap();
        assert!(settings.json_path.is_none());
    }

    #[test]
    fn test_bad_filter_is_rejected() {
        assert!(Settings::resolve(&cli(&["("]), &FaceoffConfig::default()).is_err());
    }

    #[test]
    fn test_worker_timeout_flag() {
        let settings = Settings::resolve(
            &cli(&["--worker-timeout", "30s"]),
            &FaceoffConfig::default(),
        )
        .unwrap();
        assert_eq!(settings.worker_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_hidden_flags_parse() {
        let parsed = cli(&["--bench", "--faceoff-worker"]);
        assert!(parsed.bench);
        assert!(parsed.faceoff_worker);
    }
}
