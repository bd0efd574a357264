//! Batch timing
//!
//! A [`Timer`] is handed to the measured closure once per batch. The closure
//! brackets the whole batch with `start`/`end`, so the cost of reading the
//! clock is paid once per batch rather than once per iteration.

use std::time::{Duration, Instant};

/// One batch measurement: total elapsed time over `iterations` calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchMeasurement {
    pub elapsed: Duration,
    pub iterations: u64,
}

impl BatchMeasurement {
    /// Mean nanoseconds per iteration
    #[inline]
    pub fn per_iteration_ns(&self) -> f64 {
        self.elapsed.as_nanos() as f64 / self.iterations.max(1) as f64
    }
}

/// Timer for one batch
#[derive(Debug)]
pub struct Timer {
    /// Iterations the sampler wants in this batch
    pub count: u64,
    started: Option<Instant>,
    measurement: Option<BatchMeasurement>,
}

impl Timer {
    /// Timer requesting `count` iterations
    pub fn new(count: u64) -> Self {
        Self {
            count: count.max(1),
            started: None,
            measurement: None,
        }
    }

    /// Start the clock
    #[inline(always)]
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stop the clock after `iterations` calls
    #[inline(always)]
    pub fn end(&mut self, iterations: u64) {
        let now = Instant::now();
        if let Some(started) = self.started.take() {
            self.measurement = Some(BatchMeasurement {
                elapsed: now.duration_since(started),
                iterations,
            });
        }
    }

    /// Recorded interval, if `start` and `end` were both called
    pub fn measurement(&self) -> Option<BatchMeasurement> {
        self.measurement
    }
}

/// Pin the current thread to a specific core
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);
        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_interval() {
        let mut timer = Timer::new(4);
        timer.start();
        std::thread::sleep(Duration::from_millis(10));
        timer.end(4);

        let m = timer.measurement().unwrap();
        assert_eq!(m.iterations, 4);
        assert!(m.elapsed >= Duration::from_millis(5));
        assert!(m.per_iteration_ns() >= 1_250_000.0);
    }

    #[test]
    fn test_end_without_start_records_nothing() {
        let mut timer = Timer::new(1);
        timer.end(1);
        assert!(timer.measurement().is_none());
    }

    #[test]
    fn test_zero_count_clamped() {
        assert_eq!(Timer::new(0).count, 1);
    }
}
