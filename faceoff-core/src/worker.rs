//! Worker process entry point
//!
//! An isolated execution unit runs in a fresh copy of the benchmark binary
//! started with [`WORKER_FLAG`]. The worker performs the same registration
//! as the parent, then serves [`BenchmarkJob`]s by looking the definition up
//! by its heading.
//!
//! On Unix the pipe pair arrives as fds named by `FACEOFF_IPC_FD`
//! (`<read>,<write>`); elsewhere the worker falls back to stdin/stdout.

use crate::error::{BoxError, FaceoffError};
use crate::measure::pin_to_cpu;
use crate::options::TuningOptions;
use crate::provision::{ResolvedVersion, VersionSource};
use crate::registry::Faceoff;
use crate::sampler::TimedSampler;
use crate::wrapper::execute;
use faceoff_ipc::{
    BenchmarkJob, FailureKind, FrameReader, FrameWriter, SupervisorCommand, WorkerCapabilities,
    WorkerMessage, IPC_FD_ENV, MAX_BATCH_SIZE,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::io::FromRawFd;

/// Command-line flag that turns a benchmark binary into a worker
pub const WORKER_FLAG: &str = "--faceoff-worker";

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Whether SIGTERM asked the worker to stop
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

/// Whether the current process was started as a worker
pub fn is_worker_process() -> bool {
    std::env::args().any(|arg| arg == WORKER_FLAG)
}

#[cfg(unix)]
fn install_sigterm_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigterm_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaction(libc::SIGTERM, &sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigterm_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn install_sigterm_handler() {}

fn parse_fd_pair(value: &str) -> Option<(i32, i32)> {
    let (read, write) = value.split_once(',')?;
    Some((read.trim().parse().ok()?, write.trim().parse().ok()?))
}

/// Worker side of the isolation protocol
pub struct WorkerMain {
    reader: FrameReader<Box<dyn std::io::Read>>,
    writer: FrameWriter<Box<dyn std::io::Write>>,
}

impl WorkerMain {
    /// Connect to the supervisor over the inherited fds, or stdio
    pub fn new() -> Self {
        #[cfg(unix)]
        if let Ok(value) = std::env::var(IPC_FD_ENV) {
            match parse_fd_pair(&value) {
                Some((read_fd, write_fd)) => {
                    // SAFETY: the supervisor passes these fds to this process exclusively
                    let (read_file, write_file) = unsafe {
                        (
                            std::fs::File::from_raw_fd(read_fd),
                            std::fs::File::from_raw_fd(write_fd),
                        )
                    };
                    return Self::from_io(Box::new(read_file), Box::new(write_file));
                }
                None => warn!("invalid {IPC_FD_ENV}={value:?} (expected <read_fd>,<write_fd>), falling back to stdio"),
            }
        }
        Self::from_io(Box::new(std::io::stdin()), Box::new(std::io::stdout()))
    }

    /// Worker over arbitrary streams
    pub fn from_io(reader: Box<dyn std::io::Read>, writer: Box<dyn std::io::Write>) -> Self {
        Self {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
        }
    }

    /// Serve jobs until the supervisor shuts the worker down
    pub fn run<M, C: Default>(&mut self, faceoff: &Faceoff<M, C>) -> Result<(), BoxError> {
        install_sigterm_handler();
        self.writer
            .write(&WorkerMessage::Hello(WorkerCapabilities::default()))?;
        let _ = pin_to_cpu(0);

        while !shutdown_requested() {
            match self.reader.read::<SupervisorCommand>()? {
                SupervisorCommand::Run(job) => self.serve(faceoff, &job)?,
                SupervisorCommand::Shutdown => break,
            }
        }
        Ok(())
    }

    fn serve<M, C: Default>(&mut self, faceoff: &Faceoff<M, C>, job: &BenchmarkJob) -> Result<(), BoxError> {
        debug!(benchmark = %job.benchmark_id, version = %job.version, "worker job");
        let message = match run_job(faceoff, job) {
            Ok(set) => {
                for chunk in set.samples.chunks(MAX_BATCH_SIZE) {
                    self.writer.write(&WorkerMessage::SampleBatch {
                        samples: chunk.to_vec(),
                    })?;
                }
                WorkerMessage::Complete {
                    iterations: set.iterations,
                    total_time_ns: set.total_time_ns,
                }
            }
            Err(err) => WorkerMessage::Failure {
                kind: failure_kind(&err),
                message: err.to_string(),
            },
        };
        self.writer.write(&message)?;
        Ok(())
    }
}

impl Default for WorkerMain {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute one job in this process
pub fn run_job<M, C: Default>(
    faceoff: &Faceoff<M, C>,
    job: &BenchmarkJob,
) -> Result<crate::sampler::SampleSet, FaceoffError> {
    let definition = faceoff
        .definition(&job.benchmark_id)
        .ok_or_else(|| FaceoffError::UnknownBenchmark(job.benchmark_id.clone()))?;

    let provision_err = |source: BoxError| FaceoffError::Provision {
        label: job.version.clone(),
        source,
    };
    let location = PathBuf::from(
        job.location()
            .ok_or_else(|| provision_err("missing from the job's location table".into()))?,
    );
    let module = match faceoff.version(&job.version) {
        Some(VersionSource::Resolved {
            module: Some(module), ..
        }) => Arc::clone(module),
        Some(_) => Arc::new(
            faceoff
                .provisioner()
                .load(&job.version, &location)
                .map_err(provision_err)?,
        ),
        None => return Err(provision_err("version is not registered in this binary".into())),
    };

    let tuning = job
        .tuning
        .validate()
        .map(|_| TuningOptions::from_job(&job.tuning))
        .map_err(|reason| FaceoffError::Isolation(format!("invalid job tuning: {reason}")))?;

    let version = ResolvedVersion {
        label: job.version.clone(),
        module,
        location,
    };
    execute(definition, &version, &tuning, &TimedSampler)
}

/// Failure category reported to the supervisor
pub fn failure_kind(err: &FaceoffError) -> FailureKind {
    match err {
        FaceoffError::Setup { .. } => FailureKind::Setup,
        FaceoffError::Benchmark { .. } => FailureKind::Benchmark,
        FaceoffError::Teardown { .. } => FailureKind::Teardown,
        FaceoffError::Provision { .. } => FailureKind::Provision,
        FaceoffError::UnknownBenchmark(_) => FailureKind::UnknownBenchmark,
        _ => FailureKind::Unknown,
    }
}

/// Rebuild a supervisor-side error from a worker failure report
pub fn failure_error(job: &BenchmarkJob, kind: FailureKind, message: String) -> FaceoffError {
    let benchmark = format!("{}{}{}", job.benchmark_id, faceoff_report::SEPARATOR, job.version);
    match kind {
        FailureKind::Setup => FaceoffError::Setup {
            benchmark,
            source: message.into(),
        },
        FailureKind::Benchmark => FaceoffError::Benchmark {
            benchmark,
            source: message.into(),
            teardown: None,
        },
        FailureKind::Teardown => FaceoffError::Teardown {
            benchmark,
            source: message.into(),
        },
        FailureKind::Provision => FaceoffError::Provision {
            label: job.version.clone(),
            source: message.into(),
        },
        FailureKind::UnknownBenchmark => FaceoffError::UnknownBenchmark(job.benchmark_id.clone()),
        FailureKind::Unknown => FaceoffError::Isolation(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use faceoff_ipc::{JobTuning, LocationEntry};
    use std::io::Cursor;

    fn job(id: &str, version: &str) -> BenchmarkJob {
        BenchmarkJob {
            benchmark_id: id.to_string(),
            version: version.to_string(),
            locations: vec![LocationEntry {
                label: "v1".to_string(),
                location: "/opt/v1".to_string(),
            }],
            tuning: JobTuning {
                warmup_time_ns: 0,
                min_time_ns: 1_000,
                max_time_ns: 1_000_000,
                min_samples: 1,
                max_samples: None,
                samples: Some(6),
            },
        }
    }

    fn faceoff() -> Faceoff<u32> {
        let mut faceoff = Faceoff::new([("v1", VersionSource::module(1, "/opt/v1"))]).unwrap();
        faceoff
            .suite("io", Options::new(), |s| {
                s.add("read", |_, _| Ok(()), Options::new())?;
                s.add("fail", |_, _| Err("disk full".into()), Options::new())
            })
            .unwrap();
        faceoff
    }

    #[test]
    fn test_parse_fd_pair() {
        assert_eq!(parse_fd_pair("3,4"), Some((3, 4)));
        assert_eq!(parse_fd_pair("3"), None);
        assert_eq!(parse_fd_pair("a,4"), None);
    }

    #[test]
    fn test_run_job_by_heading() {
        let set = run_job(&faceoff(), &job("io ⇒ read", "v1")).unwrap();
        assert_eq!(set.samples.len(), 6);
    }

    #[test]
    fn test_unknown_benchmark() {
        let err = run_job(&faceoff(), &job("io ⇒ write", "v1")).unwrap_err();
        assert_eq!(failure_kind(&err), FailureKind::UnknownBenchmark);
    }

    #[test]
    fn test_missing_location() {
        let err = run_job(&faceoff(), &job("io ⇒ read", "v2")).unwrap_err();
        assert_eq!(failure_kind(&err), FailureKind::Provision);
    }

    #[test]
    fn test_failure_round_trip() {
        let faceoff = faceoff();
        let job = job("io ⇒ fail", "v1");
        let err = run_job(&faceoff, &job).unwrap_err();
        let rebuilt = failure_error(&job, failure_kind(&err), err.to_string());

        assert!(matches!(rebuilt, FaceoffError::Benchmark { .. }));
        assert_eq!(rebuilt.benchmark(), Some("io ⇒ fail ⇒ v1"));
        assert!(rebuilt.to_string().contains("disk full"));
    }

    #[test]
    fn test_worker_serves_jobs_over_frames() {
        let mut input = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut input);
            writer.write(&SupervisorCommand::Run(job("io ⇒ read", "v1"))).unwrap();
            writer.write(&SupervisorCommand::Shutdown).unwrap();
        }
        let output = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        struct Shared(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);
        impl std::io::Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut worker = WorkerMain::from_io(
            Box::new(Cursor::new(input)),
            Box::new(Shared(std::rc::Rc::clone(&output))),
        );
        worker.run(&faceoff()).unwrap();
        drop(worker);

        let bytes = output.borrow().clone();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(reader.read::<WorkerMessage>().unwrap(), WorkerMessage::Hello(_)));
        match reader.read::<WorkerMessage>().unwrap() {
            WorkerMessage::SampleBatch { samples } => assert_eq!(samples.len(), 6),
            other => panic!("expected samples, got {other:?}"),
        }
        assert!(matches!(
            reader.read::<WorkerMessage>().unwrap(),
            WorkerMessage::Complete { iterations: 6, .. }
        ));
    }
}
