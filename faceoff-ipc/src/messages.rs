//! IPC Message Types
//!
//! All messages are serialized with rkyv and validated on read.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

/// One row of the resolved module-location table.
#[derive(Debug, Clone, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct LocationEntry {
    /// Version label, e.g. `lib@2.0`
    pub label: String,
    /// Absolute filesystem location of the resolved module
    pub location: String,
}

/// Sampler tuning carried across the process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct JobTuning {
    /// Warmup budget in nanoseconds
    pub warmup_time_ns: u64,
    /// Target duration of one timed batch in nanoseconds
    pub min_time_ns: u64,
    /// Measurement budget in nanoseconds
    pub max_time_ns: u64,
    /// Minimum number of samples to collect
    pub min_samples: u64,
    /// Hard cap on collected samples
    pub max_samples: Option<u64>,
    /// Fixed sample count (one iteration per sample, no warmup)
    pub samples: Option<u64>,
}

impl JobTuning {
    /// Validate tuning values, returning a description of the first error found.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_time_ns == 0 {
            return Err("max_time_ns must be > 0".to_string());
        }
        if self.min_samples == 0 {
            return Err("min_samples must be > 0".to_string());
        }
        if self.samples == Some(0) {
            return Err("samples must be > 0".to_string());
        }
        if let Some(max) = self.max_samples {
            if max < self.min_samples {
                return Err(format!(
                    "max_samples ({}) must be >= min_samples ({})",
                    max, self.min_samples
                ));
            }
        }
        Ok(())
    }
}

/// Everything an isolated worker needs to rehydrate one execution unit.
///
/// No closures cross the boundary: the worker runs the same registration
/// code as the caller and looks the benchmark up by `benchmark_id`.
#[derive(Debug, Clone, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct BenchmarkJob {
    /// Benchmark heading (`path ⇒ name`)
    pub benchmark_id: String,
    /// Version label to execute
    pub version: String,
    /// Resolved location of every registered version
    pub locations: Vec<LocationEntry>,
    /// Sampler tuning
    pub tuning: JobTuning,
}

impl BenchmarkJob {
    /// Location of the job's own version, if present in the table.
    pub fn location(&self) -> Option<&str> {
        self.locations
            .iter()
            .find(|entry| entry.label == self.version)
            .map(|entry| entry.location.as_str())
    }
}

/// Worker capabilities advertised during handshake
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct WorkerCapabilities {
    /// Protocol version for compatibility
    pub protocol_version: u32,
    /// Process id of the worker
    pub pid: u32,
    /// Number of logical CPUs available
    pub cpu_count: u32,
}

impl Default for WorkerCapabilities {
    fn default() -> Self {
        Self {
            protocol_version: crate::PROTOCOL_VERSION,
            pid: std::process::id(),
            cpu_count: std::thread::available_parallelism()
                .map(|p| p.get() as u32)
                .unwrap_or(1),
        }
    }
}

/// Messages sent from Worker to Supervisor
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum WorkerMessage {
    /// Initial handshake with worker capabilities
    Hello(WorkerCapabilities),

    /// Per-operation durations in nanoseconds, one entry per timed batch
    SampleBatch {
        /// The samples, in collection order
        samples: Vec<f64>,
    },

    /// Execution unit completed, teardown included
    Complete {
        /// Total number of timed iterations
        iterations: u64,
        /// Total measured time in nanoseconds
        total_time_ns: u64,
    },

    /// Execution unit failed
    Failure {
        /// Error category
        kind: FailureKind,
        /// Human-readable error message
        message: String,
    },
}

/// Categories of worker-side failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum FailureKind {
    /// `setup` failed; no teardown ran
    Setup,
    /// The benchmark body failed; teardown ran
    Benchmark,
    /// `teardown` failed
    Teardown,
    /// The version's module could not be loaded
    Provision,
    /// The job named a benchmark this binary does not register
    UnknownBenchmark,
    /// Unknown error
    Unknown,
}

/// Commands sent from Supervisor to Worker
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum SupervisorCommand {
    /// Run one execution unit
    Run(BenchmarkJob),

    /// Request graceful shutdown
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> JobTuning {
        JobTuning {
            warmup_time_ns: 0,
            min_time_ns: 1_000_000,
            max_time_ns: 1_000_000_000,
            min_samples: 10,
            max_samples: None,
            samples: None,
        }
    }

    #[test]
    fn test_tuning_validate_default() {
        assert!(tuning().validate().is_ok());
    }

    #[test]
    fn test_tuning_validate_max_lt_min() {
        let t = JobTuning {
            max_samples: Some(5),
            ..tuning()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_tuning_validate_zero_samples() {
        let t = JobTuning {
            samples: Some(0),
            ..tuning()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_job_location_lookup() {
        let job = BenchmarkJob {
            benchmark_id: "suite ⇒ bench".to_string(),
            version: "b".to_string(),
            locations: vec![
                LocationEntry {
                    label: "a".to_string(),
                    location: "/tmp/a".to_string(),
                },
                LocationEntry {
                    label: "b".to_string(),
                    location: "/tmp/b".to_string(),
                },
            ],
            tuning: tuning(),
        };
        assert_eq!(job.location(), Some("/tmp/b"));
    }

    #[test]
    fn test_worker_capabilities_default() {
        let caps = WorkerCapabilities::default();
        assert_eq!(caps.protocol_version, crate::PROTOCOL_VERSION);
        assert!(caps.cpu_count >= 1);
    }
}
