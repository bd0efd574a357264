#![warn(missing_docs)]
//! Faceoff IPC Protocol
//!
//! Messages exchanged between the orchestrating process and an isolated
//! benchmark worker. A worker receives a [`BenchmarkJob`] naming the
//! benchmark by its stable id together with the resolved location table,
//! and answers with batches of per-operation samples.

mod framing;
mod messages;

pub use framing::{read_frame, write_frame, FrameError, FrameReader, FrameWriter, MAX_FRAME_SIZE};
pub use messages::{
    BenchmarkJob, FailureKind, JobTuning, LocationEntry, SupervisorCommand, WorkerCapabilities,
    WorkerMessage,
};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum samples per batch message
pub const MAX_BATCH_SIZE: usize = 4_096;

/// Environment variable carrying the worker's IPC file descriptors
pub const IPC_FD_ENV: &str = "FACEOFF_IPC_FD";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_fits_in_frame() {
        // A full batch of f64 samples must stay far below the frame cap
        assert!(MAX_BATCH_SIZE * std::mem::size_of::<f64>() < MAX_FRAME_SIZE / 16);
    }
}
