#![warn(missing_docs)]
//! # Faceoff
//!
//! Define a benchmark once and run it, unmodified, against several versions
//! of the same library. Faceoff ranks the versions of every benchmark, tests
//! each against the baseline for statistical significance and flags the
//! newest version when it is materially slower than the fastest one.
//!
//! - **Nested suites**: options are inherited through `suite` scopes
//! - **Lifecycle hooks**: `setup` builds a per-run context, `teardown` always runs
//! - **Async bodies**: awaited call by call on a current-thread runtime
//! - **Process isolation**: each version can run in a fresh worker process
//! - **Regression gating**: Welch t-test plus a configurable slowdown ratio
//!
//! ## Quick Start
//!
//! ```ignore
//! use faceoff::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut faceoff = Faceoff::new([
//!         ("1.0", VersionSource::module(Codec::v1(), "/opt/codec-1.0")),
//!         ("2.0", VersionSource::module(Codec::v2(), ".")),
//!     ])?;
//!
//!     faceoff.suite("encode", Options::new(), |s| {
//!         s.add("small", |codec, _| codec.encode(SMALL), Options::new())?;
//!         s.add("large", |codec, _| codec.encode(LARGE), Options::new().set("max_time", "2s"))
//!     })?;
//!
//!     faceoff::run(&faceoff)
//! }
//! ```
//!
//! ## Setup and Teardown
//!
//! ```ignore
//! let options = Options::new()
//!     .setup(|codec, location| Ok(Fixture::load(location.join("fixtures"))?))
//!     .teardown(|_, fixture| fixture.remove());
//! faceoff.add("decode", |codec, fixture| codec.decode(&fixture.bytes), options)?;
//! ```

// Re-export core types
pub use faceoff_core::{
    is_worker_process, Batch, BoxError, BoxFuture, CommandProvisioner, ConfigError, Faceoff,
    FaceoffError, Isolation, NoProvisioner, Options, Provisioner, RunObserver, Runner, SampleSet,
    Sampler, TimedSampler, Timer, TuningOptions, TuningOverrides, VersionSource, WORKER_FLAG,
};

// Re-export report types
pub use faceoff_report::{
    find_regressions, format_human_output, generate_json_report, heading_name,
    write_json_report, AnalysisConfig, ComparisonGroup, ExecutionResult, Regression,
    RegressionReport, ResultRecord, ResultSet, DEFAULT_OUTPUT_PATH, SEPARATOR,
};

// Re-export stats
pub use faceoff_stats::{compute_summary, welch_t_test, SummaryStatistics, TTestResult};

// Re-export the CLI driver
pub use faceoff_cli::{run_with_cli, Cli, FaceoffConfig, ProcessIsolation};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{BoxError, Faceoff, Options, Timer, VersionSource};
}

/// Run the Faceoff CLI harness.
///
/// Call this from your benchmark binary's `main()` after registering
/// benchmarks. The same binary serves as the isolated worker.
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     let faceoff = register()?;
///     faceoff::run(&faceoff)
/// }
/// ```
pub use faceoff_cli::run;
