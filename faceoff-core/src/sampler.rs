//! Sampling
//!
//! A [`Sampler`] decides how many batches to run and how large each one is.
//! The measured closure runs one batch per call and reports it through the
//! [`Timer`]; every batch becomes one per-operation duration sample.

use crate::error::BoxError;
use crate::measure::Timer;
use crate::options::TuningOptions;
use faceoff_ipc::MAX_BATCH_SIZE;
use std::time::Instant;

/// Raw output of one sampled execution unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    /// Per-operation durations in nanoseconds, one per batch
    pub samples: Vec<f64>,
    /// Iterations performed while measuring (warmup excluded)
    pub iterations: u64,
    /// Time spent in measured batches
    pub total_time_ns: u64,
}

impl SampleSet {
    fn record(&mut self, timer: &Timer) -> Result<(), BoxError> {
        let m = timer
            .measurement()
            .ok_or("benchmark batch finished without calling timer.start()/timer.end()")?;
        self.samples.push(m.per_iteration_ns());
        self.iterations += m.iterations;
        self.total_time_ns += m.elapsed.as_nanos() as u64;
        Ok(())
    }
}

/// A batch runner: executes `timer.count` iterations between `start` and `end`
pub type Batch<'a> = dyn FnMut(&mut Timer) -> Result<(), BoxError> + 'a;

/// Produces duration samples from a batch runner
pub trait Sampler {
    /// Collect samples according to `tuning`
    fn sample(&self, tuning: &TuningOptions, batch: &mut Batch<'_>) -> Result<SampleSet, BoxError>;
}

/// Wall-clock sampler driven by the tuning options
#[derive(Debug, Clone, Copy, Default)]
pub struct TimedSampler;

impl TimedSampler {
    fn run_batch(batch: &mut Batch<'_>, iterations: u64) -> Result<Timer, BoxError> {
        let mut timer = Timer::new(iterations);
        batch(&mut timer)?;
        Ok(timer)
    }
}

impl Sampler for TimedSampler {
    fn sample(&self, tuning: &TuningOptions, batch: &mut Batch<'_>) -> Result<SampleSet, BoxError> {
        let mut set = SampleSet::default();

        // Fixed-count mode: one iteration per sample, no warmup
        if let Some(count) = tuning.samples {
            set.samples.reserve(count.min(MAX_BATCH_SIZE as u64) as usize);
            for _ in 0..count {
                let timer = Self::run_batch(batch, 1)?;
                set.record(&timer)?;
            }
            return Ok(set);
        }

        // Warmup: single iterations, used to size the measured batches
        let warmup_ns = tuning.warmup_time.as_nanos();
        let warmup_start = Instant::now();
        let mut warmup_elapsed_ns = 0u128;
        let mut warmup_iterations = 0u64;
        while warmup_start.elapsed().as_nanos() < warmup_ns {
            let timer = Self::run_batch(batch, 1)?;
            if let Some(m) = timer.measurement() {
                warmup_elapsed_ns += m.elapsed.as_nanos();
                warmup_iterations += m.iterations;
            }
        }

        let iters_per_batch = if warmup_iterations > 0 {
            let estimate_ns = (warmup_elapsed_ns / warmup_iterations as u128).max(1);
            (tuning.min_time.as_nanos() / estimate_ns).clamp(1, u64::MAX as u128) as u64
        } else {
            1
        };

        let max_time_ns = tuning.max_time.as_nanos();
        let min_samples = tuning.min_samples as usize;
        let max_samples = tuning.max_samples.map(|m| m as usize).unwrap_or(usize::MAX);
        let measure_start = Instant::now();

        loop {
            let collected = set.samples.len();
            if collected >= max_samples {
                break;
            }
            if collected >= min_samples && measure_start.elapsed().as_nanos() >= max_time_ns {
                break;
            }

            let timer = Self::run_batch(batch, iters_per_batch)?;
            set.record(&timer)?;
        }

        Ok(set)
    }
}
