//! Run orchestration
//!
//! Resolves versions once, then executes every (benchmark, version) unit in
//! registration order, one at a time, and hands the collected results to the
//! analyzer. The first failing unit aborts the run.

use crate::error::{ConfigError, FaceoffError};
use crate::options::TuningOptions;
use crate::provision::{resolve_versions, ResolvedVersion};
use crate::registry::{BenchmarkDefinition, Faceoff};
use crate::sampler::{SampleSet, Sampler, TimedSampler};
use crate::wrapper::execute;
use faceoff_ipc::{BenchmarkJob, LocationEntry};
use faceoff_report::{AnalysisConfig, ExecutionResult, ResultSet};
use tracing::{debug, info, warn};

/// Executes one unit outside the current process
pub trait Isolation {
    fn run_job(&self, job: &BenchmarkJob) -> Result<SampleSet, FaceoffError>;
}

/// Progress callbacks; every method defaults to a no-op
pub trait RunObserver {
    fn run_started(&self, _units: usize) {}
    fn unit_started(&self, _benchmark: &str, _version: &str) {}
    fn unit_finished(&self, _result: &ExecutionResult) {}
    fn run_finished(&self, _results: &ResultSet) {}
}

type Filter = dyn Fn(&str) -> bool;

/// Configurable run driver
pub struct Runner {
    sampler: Box<dyn Sampler>,
    isolation: Option<Box<dyn Isolation>>,
    filter: Option<Box<Filter>>,
    observer: Option<Box<dyn RunObserver>>,
    analysis: AnalysisConfig,
    base_tuning: TuningOptions,
    force_isolation: bool,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            sampler: Box::new(TimedSampler),
            isolation: None,
            filter: None,
            observer: None,
            analysis: AnalysisConfig::default(),
            base_tuning: TuningOptions::default(),
            force_isolation: false,
        }
    }
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sampler
    pub fn sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    /// Backend for units whose tuning requests isolation
    pub fn isolation(mut self, isolation: impl Isolation + 'static) -> Self {
        self.isolation = Some(Box::new(isolation));
        self
    }

    /// Run every unit isolated, regardless of its own tuning
    pub fn force_isolation(mut self, force: bool) -> Self {
        self.force_isolation = force;
        self
    }

    /// Only run benchmarks whose heading passes `filter`
    pub fn filter(mut self, filter: impl Fn(&str) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn observer(mut self, observer: impl RunObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Significance and regression policy
    pub fn analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    /// Tuning that benchmark and suite options are layered over
    pub fn base_tuning(mut self, tuning: TuningOptions) -> Self {
        self.base_tuning = tuning;
        self
    }

    pub fn analysis_config(&self) -> &AnalysisConfig {
        &self.analysis
    }

    /// Whether the filter selects `heading`
    pub fn selects(&self, heading: &str) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(heading))
    }

    /// Definitions this runner would execute, each with its resolved tuning
    pub fn plan<'f, M, C>(
        &self,
        faceoff: &'f Faceoff<M, C>,
    ) -> Result<Vec<(&'f BenchmarkDefinition<M, C>, TuningOptions)>, ConfigError> {
        faceoff
            .definitions()
            .iter()
            .filter(|def| self.selects(&def.id))
            .map(|def| {
                let mut tuning = def.tuning.resolve(&self.base_tuning);
                tuning.isolated |= self.force_isolation;
                tuning.validate()?;
                Ok((def, tuning))
            })
            .collect()
    }

    /// Run `faceoff` and return the analyzed results
    pub fn run<M, C: Default>(&self, faceoff: &Faceoff<M, C>) -> Result<ResultSet, FaceoffError> {
        let plan = self.plan(faceoff)?;
        let mut results = ResultSet::new();

        if plan.is_empty() {
            info!("No benchmarks selected");
            return Ok(results);
        }

        let versions = resolve_versions(faceoff.versions(), faceoff.provisioner())?;
        let locations: Vec<LocationEntry> = versions
            .iter()
            .map(|v| LocationEntry {
                label: v.label.clone(),
                location: v.location.to_string_lossy().into_owned(),
            })
            .collect();

        let units = plan.iter().map(|(def, _)| def.versions.len()).sum();
        info!("Running {} benchmarks ({} executions)", plan.len(), units);
        if let Some(observer) = &self.observer {
            observer.run_started(units);
        }

        let mut warned_isolation = false;
        for (def, tuning) in &plan {
            for (position, label) in def.versions.iter().enumerate() {
                let fqn = def.fqn(label);
                if let Some(observer) = &self.observer {
                    observer.unit_started(&def.id, label);
                }

                let samples = match (&self.isolation, tuning.isolated) {
                    (Some(isolation), true) => {
                        debug!(benchmark = %fqn, "dispatching to isolated worker");
                        isolation.run_job(&BenchmarkJob {
                            benchmark_id: def.id.clone(),
                            version: label.clone(),
                            locations: locations.clone(),
                            tuning: tuning.to_job(),
                        })?
                    }
                    (isolation, isolated) => {
                        if isolated && isolation.is_none() && !warned_isolation {
                            warn!("Isolation requested but no isolation backend configured; running in-process");
                            warned_isolation = true;
                        }
                        let version = lookup(&versions, label)?;
                        debug!(benchmark = %fqn, "running in-process");
                        execute(def, version, tuning, self.sampler.as_ref())?
                    }
                };

                let result = ExecutionResult::from_samples(fqn, label.clone(), samples.samples, position == 0);
                debug!(
                    benchmark = %result.name,
                    ops_sec = result.ops_sec,
                    samples = result.runs_sampled,
                    "finished"
                );
                if let Some(observer) = &self.observer {
                    observer.unit_finished(&result);
                }
                results.push(result);
            }
        }

        results.analyze(&self.analysis);
        if let Some(observer) = &self.observer {
            observer.run_finished(&results);
        }
        Ok(results)
    }
}

fn lookup<'v, M>(versions: &'v [ResolvedVersion<M>], label: &str) -> Result<&'v ResolvedVersion<M>, FaceoffError> {
    versions
        .iter()
        .find(|v| v.label == label)
        .ok_or_else(|| FaceoffError::Provision {
            label: label.to_string(),
            source: "version was not resolved".into(),
        })
}
