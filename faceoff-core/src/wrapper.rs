//! Execution wrapper
//!
//! Runs one execution unit: setup, sampled batches of the body, teardown.
//! Teardown runs whenever setup produced a context, including after the
//! body failed or panicked. Panics in user code become errors.

use crate::error::{panic_message, BoxError, FaceoffError};
use crate::hooks::{AsyncDriver, Body};
use crate::measure::Timer;
use crate::options::TuningOptions;
use crate::provision::ResolvedVersion;
use crate::registry::BenchmarkDefinition;
use crate::sampler::{SampleSet, Sampler};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

fn caught<T>(f: impl FnOnce() -> Result<T, BoxError>) -> Result<T, BoxError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(format!("panicked: {}", panic_message(payload)).into()),
    }
}

/// Execute `definition` against one resolved version
pub fn execute<M, C: Default>(
    definition: &BenchmarkDefinition<M, C>,
    version: &ResolvedVersion<M>,
    tuning: &TuningOptions,
    sampler: &dyn Sampler,
) -> Result<SampleSet, FaceoffError> {
    let fqn = definition.fqn(&version.label);
    let module = version.module.as_ref();
    let mut driver = AsyncDriver::default();

    let mut context = match &definition.setup {
        Some(setup) => {
            debug!(benchmark = %fqn, "setup");
            caught(|| setup.call(&mut driver, module, &version.location)).map_err(|source| {
                FaceoffError::Setup {
                    benchmark: fqn.clone(),
                    source,
                }
            })?
        }
        None => C::default(),
    };

    debug!(benchmark = %fqn, "sampling");
    let body = &definition.body;
    let outcome = caught(|| {
        // Build the runtime before timing starts
        if matches!(body, Body::Async(_)) {
            driver.block_on(async {})?;
        }

        let mut batch = |timer: &mut Timer| -> Result<(), BoxError> {
            let iterations = timer.count;
            timer.start();
            let result = body.run_batch(&mut driver, module, &mut context, iterations);
            timer.end(iterations);
            result
        };
        sampler.sample(tuning, &mut batch)
    });

    let teardown = match &definition.teardown {
        Some(teardown) => {
            debug!(benchmark = %fqn, "teardown");
            caught(|| teardown.call(&mut driver, module, context)).err()
        }
        None => None,
    };

    match (outcome, teardown) {
        (Ok(samples), None) => Ok(samples),
        (Ok(_), Some(source)) => Err(FaceoffError::Teardown {
            benchmark: fqn,
            source,
        }),
        (Err(source), teardown) => Err(FaceoffError::Benchmark {
            benchmark: fqn,
            source,
            teardown,
        }),
    }
}
