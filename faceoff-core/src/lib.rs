//! Faceoff Core - Registration and Execution
//!
//! This crate provides everything between the user's benchmark code and the
//! comparative report:
//! - `Faceoff` registry with nested suites and scoped default options
//! - Execution wrapper guaranteeing teardown on every exit path
//! - Batch timer and wall-clock sampler
//! - Run orchestration with optional process isolation
//! - Worker entry point for isolated execution units

mod error;
mod hooks;
mod measure;
mod options;
mod provision;
mod registry;
mod runner;
mod sampler;
mod scope;
mod worker;
mod wrapper;

pub use error::{BoxError, ConfigError, FaceoffError};
pub use hooks::{Body, BoxFuture, Setup, Teardown};
pub use measure::{pin_to_cpu, BatchMeasurement, Timer};
pub use options::{parse_duration, Options, TuningOptions, TuningOverrides};
pub use provision::{
    absolute_location, resolve_versions, CommandProvisioner, NoProvisioner, Provisioner,
    ResolvedVersion, VersionSource,
};
pub use registry::{BenchmarkDefinition, Faceoff};
pub use runner::{Isolation, RunObserver, Runner};
pub use sampler::{Batch, SampleSet, Sampler, TimedSampler};
pub use scope::{ConfigStack, SuiteScope};
pub use worker::{
    failure_error, failure_kind, is_worker_process, run_job, shutdown_requested, WorkerMain,
    WORKER_FLAG,
};
pub use wrapper::execute;
