//! Supervisor Process
//!
//! Runs isolated execution units in fresh worker processes and collects
//! their samples over IPC. One worker is spawned per unit so no state
//! carries over from one version to the next.

use faceoff_core::{failure_error, FaceoffError, Isolation, SampleSet, WORKER_FLAG};
use faceoff_ipc::{
    BenchmarkJob, FailureKind, FrameError, FrameReader, FrameWriter, SupervisorCommand,
    WorkerCapabilities, WorkerMessage, IPC_FD_ENV, PROTOCOL_VERSION,
};
use std::env;
use std::os::unix::io::{FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Worker crashed: {0}")]
    WorkerCrashed(String),

    #[error("Timeout waiting for worker after {0:?}")]
    Timeout(Duration),

    #[error("Worker protocol error: expected {expected}, got {got}")]
    ProtocolError { expected: String, got: String },

    /// The worker ran the job and reported a failure
    #[error("{message}")]
    Failed { kind: FailureKind, message: String },
}

impl From<FrameError> for SupervisorError {
    fn from(e: FrameError) -> Self {
        SupervisorError::IpcError(e.to_string())
    }
}

impl SupervisorError {
    /// Convert into the run-level error for `job`
    pub fn into_faceoff_error(self, job: &BenchmarkJob) -> FaceoffError {
        match self {
            SupervisorError::Failed { kind, message } => failure_error(job, kind, message),
            other => FaceoffError::Isolation(format!(
                "{}{}{}: {other}",
                job.benchmark_id,
                faceoff_report::SEPARATOR,
                job.version
            )),
        }
    }
}

#[derive(Debug)]
enum PollResult {
    DataAvailable,
    Timeout,
    PipeClosed,
    Error(std::io::Error),
}

/// Wait for data to be available on a file descriptor with timeout
fn wait_for_data(fd: i32, timeout_ms: i32) -> PollResult {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    let result = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };

    if result < 0 {
        PollResult::Error(std::io::Error::last_os_error())
    } else if result == 0 {
        PollResult::Timeout
    } else if pollfd.revents & libc::POLLIN != 0 {
        // a closing pipe may still hold data
        PollResult::DataAvailable
    } else if pollfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
        PollResult::PipeClosed
    } else {
        PollResult::Timeout
    }
}

/// Lowest fd a supervisor pipe end may occupy; the worker's 3/4 stay free for `dup2`
const MIN_PIPE_FD: RawFd = 5;

/// Create a close-on-exec pipe pair, returning (read_fd, write_fd).
///
/// Both ends are placed at or above [`MIN_PIPE_FD`], so remapping onto fds
/// 3 and 4 in the child never overwrites another pipe end.
fn create_pipe() -> Result<(RawFd, RawFd), std::io::Error> {
    let mut fds = [0 as RawFd; 2];
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    let read_fd = match raise_fd(fds[0]) {
        Ok(fd) => fd,
        Err(e) => {
            close_fd(fds[1]);
            return Err(e);
        }
    };
    let write_fd = match raise_fd(fds[1]) {
        Ok(fd) => fd,
        Err(e) => {
            close_fd(read_fd);
            return Err(e);
        }
    };
    Ok((read_fd, write_fd))
}

/// Move `fd` to a close-on-exec descriptor at or above `MIN_PIPE_FD`
fn raise_fd(fd: RawFd) -> Result<RawFd, std::io::Error> {
    let raised = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, MIN_PIPE_FD) };
    let result = if raised == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(raised)
    };
    close_fd(fd);
    result
}

fn close_fd(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Worker process handle
pub struct WorkerHandle {
    child: Child,
    reader: FrameReader<std::fs::File>,
    writer: FrameWriter<std::fs::File>,
    capabilities: Option<WorkerCapabilities>,
    timeout: Option<Duration>,
    msg_read_fd: RawFd,
}

impl WorkerHandle {
    /// Spawn the current executable as a worker, using fd 3/4 for IPC.
    pub fn spawn(timeout: Option<Duration>) -> Result<Self, SupervisorError> {
        let binary = env::current_exe().map_err(SupervisorError::SpawnFailed)?;
        Self::spawn_binary(&binary, timeout)
    }

    /// Spawn a specific binary as a worker
    pub fn spawn_binary(binary: &Path, timeout: Option<Duration>) -> Result<Self, SupervisorError> {
        // cmd pipe: supervisor writes, worker reads on fd 3
        let (cmd_read, cmd_write) = create_pipe()?;
        // msg pipe: worker writes on fd 4, supervisor reads
        let (msg_read, msg_write) = match create_pipe() {
            Ok(fds) => fds,
            Err(e) => {
                close_fd(cmd_read);
                close_fd(cmd_write);
                return Err(SupervisorError::SpawnFailed(e));
            }
        };

        let mut command = Command::new(binary);
        command
            .arg(WORKER_FLAG)
            .env(IPC_FD_ENV, "3,4")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        // Every pipe end sits above 4, so neither dup2 clobbers a live end.
        // dup2 clears FD_CLOEXEC on the target; the originals close on exec.
        unsafe {
            command.pre_exec(move || {
                if libc::dup2(cmd_read, 3) == -1 || libc::dup2(msg_write, 4) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = match command.spawn() {
            Ok(c) => c,
            Err(e) => {
                close_fd(cmd_read);
                close_fd(cmd_write);
                close_fd(msg_read);
                close_fd(msg_write);
                return Err(SupervisorError::SpawnFailed(e));
            }
        };

        close_fd(cmd_read);
        close_fd(msg_write);

        let writer_file = unsafe { std::fs::File::from_raw_fd(cmd_write) };
        let reader_file = unsafe { std::fs::File::from_raw_fd(msg_read) };

        let mut handle = Self {
            child,
            reader: FrameReader::new(reader_file),
            writer: FrameWriter::new(writer_file),
            capabilities: None,
            timeout,
            msg_read_fd: msg_read,
        };

        handle.wait_for_hello()?;
        Ok(handle)
    }

    fn wait_for_hello(&mut self) -> Result<(), SupervisorError> {
        match self.reader.read::<WorkerMessage>()? {
            WorkerMessage::Hello(caps) => {
                if caps.protocol_version != PROTOCOL_VERSION {
                    return Err(SupervisorError::ProtocolError {
                        expected: format!("protocol version {PROTOCOL_VERSION}"),
                        got: format!("protocol version {}", caps.protocol_version),
                    });
                }
                debug!(pid = caps.pid, cpus = caps.cpu_count, "worker ready");
                self.capabilities = Some(caps);
                Ok(())
            }
            other => Err(SupervisorError::ProtocolError {
                expected: "Hello".to_string(),
                got: format!("{other:?}"),
            }),
        }
    }

    /// Worker capabilities from the handshake
    pub fn capabilities(&self) -> Option<&WorkerCapabilities> {
        self.capabilities.as_ref()
    }

    /// Run one job and collect its samples
    pub fn run_job(&mut self, job: &BenchmarkJob) -> Result<SampleSet, SupervisorError> {
        self.writer.write(&SupervisorCommand::Run(job.clone()))?;

        let mut samples = Vec::new();
        let start = Instant::now();

        loop {
            let remaining = self.timeout.map(|t| t.saturating_sub(start.elapsed()));
            if let (Some(timeout), Some(remaining)) = (self.timeout, remaining) {
                if remaining.is_zero() {
                    self.terminate();
                    return Err(SupervisorError::Timeout(timeout));
                }
            }

            // Buffered bytes may be an incomplete frame from a dead worker
            if self.reader.has_buffered_data() {
                if !self.is_alive() {
                    return Err(SupervisorError::WorkerCrashed(
                        "worker exited with a partial frame buffered".to_string(),
                    ));
                }
            } else {
                let poll = remaining.map_or(Duration::from_millis(100), |r| r.min(Duration::from_millis(100)));
                match wait_for_data(self.msg_read_fd, poll.as_millis() as i32) {
                    PollResult::DataAvailable => {}
                    PollResult::Timeout => {
                        if !self.is_alive() {
                            return Err(SupervisorError::WorkerCrashed(
                                "worker exited unexpectedly".to_string(),
                            ));
                        }
                        continue;
                    }
                    PollResult::PipeClosed => {
                        return Err(SupervisorError::WorkerCrashed(
                            "worker pipe closed unexpectedly".to_string(),
                        ));
                    }
                    PollResult::Error(e) => {
                        return Err(SupervisorError::WorkerCrashed(format!("pipe error: {e}")));
                    }
                }
            }

            let msg = match self.reader.read::<WorkerMessage>() {
                Ok(msg) => msg,
                Err(FrameError::EndOfStream) => {
                    return Err(SupervisorError::WorkerCrashed(
                        "worker closed connection unexpectedly".to_string(),
                    ));
                }
                Err(e) => {
                    if !self.is_alive() {
                        return Err(SupervisorError::WorkerCrashed(
                            "worker crashed during read".to_string(),
                        ));
                    }
                    return Err(SupervisorError::IpcError(e.to_string()));
                }
            };

            match msg {
                WorkerMessage::SampleBatch { samples: batch } => samples.extend(batch),
                WorkerMessage::Complete {
                    iterations,
                    total_time_ns,
                } => {
                    return Ok(SampleSet {
                        samples,
                        iterations,
                        total_time_ns,
                    });
                }
                WorkerMessage::Failure { kind, message } => {
                    return Err(SupervisorError::Failed { kind, message });
                }
                WorkerMessage::Hello(_) => {
                    return Err(SupervisorError::ProtocolError {
                        expected: "SampleBatch/Complete/Failure".to_string(),
                        got: "Hello".to_string(),
                    });
                }
            }
        }
    }

    /// SIGTERM, a short grace period, then SIGKILL
    fn terminate(&mut self) {
        let _ = send_sigterm(self.child.id());
        let deadline = Instant::now() + Duration::from_millis(500);
        while self.is_alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        if self.is_alive() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }

    /// Shutdown the worker gracefully
    pub fn shutdown(mut self) -> Result<(), SupervisorError> {
        self.writer.write(&SupervisorCommand::Shutdown)?;
        let _ = self.child.wait();
        Ok(())
    }

    /// Check if worker process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.is_alive() {
            let _ = send_sigterm(self.child.id());
            std::thread::sleep(Duration::from_millis(50));
            if self.is_alive() {
                let _ = self.child.kill();
            }
            let _ = self.child.wait();
        }
    }
}

/// Process isolation backend: one fresh worker per execution unit
#[derive(Debug, Clone, Default)]
pub struct ProcessIsolation {
    binary: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ProcessIsolation {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            binary: None,
            timeout,
        }
    }

    /// Use `binary` instead of the current executable
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    fn run_isolated(&self, job: &BenchmarkJob) -> Result<SampleSet, SupervisorError> {
        let mut worker = match &self.binary {
            Some(binary) => WorkerHandle::spawn_binary(binary, self.timeout)?,
            None => WorkerHandle::spawn(self.timeout)?,
        };
        let result = worker.run_job(job);
        if result.is_ok() {
            let _ = worker.shutdown();
        }
        result
    }
}

impl Isolation for ProcessIsolation {
    fn run_job(&self, job: &BenchmarkJob) -> Result<SampleSet, FaceoffError> {
        debug!(benchmark = %job.benchmark_id, version = %job.version, "spawning worker");
        self.run_isolated(job).map_err(|e| e.into_faceoff_error(job))
    }
}
