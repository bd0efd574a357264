//! Length-Prefixed Frames
//!
//! Message boundaries over the worker's pipe pair.
//!
//! ```text
//! +----------------+------------------+
//! | length (4 LE)  | rkyv payload     |
//! +----------------+------------------+
//! ```

use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{Archive, CheckBytes, Deserialize, Infallible, Serialize};
use std::io::{BufReader, BufWriter, Read, Write};
use thiserror::Error;

/// Maximum frame size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Errors that can occur while encoding or decoding a frame
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Frame too large: {size} bytes (max {max} bytes)")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("End of stream")]
    EndOfStream,
}

/// Serialize `message` and write it as one frame, flushing afterwards.
pub fn write_frame<W, T>(writer: &mut BufWriter<W>, message: &T) -> Result<(), FrameError>
where
    W: Write,
    T: Serialize<AllocSerializer<256>>,
{
    let bytes =
        rkyv::to_bytes::<_, 256>(message).map_err(|e| FrameError::Serialization(e.to_string()))?;

    if bytes.len() > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: bytes.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame and validate it before deserializing.
pub fn read_frame<R, T>(reader: &mut BufReader<R>) -> Result<T, FrameError>
where
    R: Read,
    T: Archive,
    T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::EndOfStream);
        }
        Err(e) => return Err(FrameError::Io(e)),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    if len == 0 {
        return Err(FrameError::InvalidFrame("zero-length frame".to_string()));
    }

    // rkyv requires an aligned buffer
    let mut buf = rkyv::AlignedVec::with_capacity(len);
    buf.resize(len, 0);
    reader.read_exact(&mut buf)?;

    let archived = rkyv::check_archived_root::<T>(&buf)
        .map_err(|e| FrameError::Deserialization(e.to_string()))?;

    archived
        .deserialize(&mut Infallible)
        .map_err(|e| FrameError::Deserialization(format!("{e:?}")))
}

/// Buffered frame writer
pub struct FrameWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Create a new frame writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, writer),
        }
    }

    /// Write a message
    pub fn write<T>(&mut self, message: &T) -> Result<(), FrameError>
    where
        T: Serialize<AllocSerializer<256>>,
    {
        write_frame(&mut self.writer, message)
    }
}

/// Buffered frame reader
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Create a new frame reader
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(64 * 1024, reader),
        }
    }

    /// Read a message
    pub fn read<T>(&mut self) -> Result<T, FrameError>
    where
        T: Archive,
        T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
    {
        read_frame(&mut self.reader)
    }

    /// Whether a frame (or part of one) is already buffered
    pub fn has_buffered_data(&self) -> bool {
        !self.reader.buffer().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BenchmarkJob, FailureKind, JobTuning, LocationEntry, SupervisorCommand, WorkerMessage};
    use std::io::Cursor;

    fn job() -> BenchmarkJob {
        BenchmarkJob {
            benchmark_id: "parsing ⇒ test 🔥".to_string(),
            version: "lib@2.0".to_string(),
            locations: vec![LocationEntry {
                label: "lib@2.0".to_string(),
                location: "/tmp/faceoff-x/node".to_string(),
            }],
            tuning: JobTuning {
                warmup_time_ns: 0,
                min_time_ns: 1_000,
                max_time_ns: 1_000_000,
                min_samples: 30,
                max_samples: Some(50),
                samples: None,
            },
        }
    }

    #[test]
    fn test_command_survives_framing() {
        let mut buffer = Vec::new();
        FrameWriter::new(&mut buffer)
            .write(&SupervisorCommand::Run(job()))
            .unwrap();

        let mut reader = FrameReader::new(Cursor::new(buffer));
        match reader.read::<SupervisorCommand>().unwrap() {
            SupervisorCommand::Run(decoded) => assert_eq!(decoded, job()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_worker_message_sequence() {
        let mut buffer = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buffer);
            writer
                .write(&WorkerMessage::SampleBatch {
                    samples: vec![12.5, 13.0],
                })
                .unwrap();
            writer
                .write(&WorkerMessage::Failure {
                    kind: FailureKind::Benchmark,
                    message: "boom".to_string(),
                })
                .unwrap();
        }

        let mut reader = FrameReader::new(Cursor::new(buffer));
        assert!(matches!(
            reader.read::<WorkerMessage>().unwrap(),
            WorkerMessage::SampleBatch { samples } if samples == vec![12.5, 13.0]
        ));
        assert!(matches!(
            reader.read::<WorkerMessage>().unwrap(),
            WorkerMessage::Failure { kind: FailureKind::Benchmark, .. }
        ));
        assert!(matches!(
            reader.read::<WorkerMessage>(),
            Err(FrameError::EndOfStream)
        ));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut buffer = ((MAX_FRAME_SIZE + 1) as u32).to_le_bytes().to_vec();
        buffer.extend_from_slice(&[0u8; 8]);
        let mut reader = FrameReader::new(Cursor::new(buffer));
        assert!(matches!(
            reader.read::<WorkerMessage>(),
            Err(FrameError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut reader = FrameReader::new(Cursor::new(vec![0u8; 4]));
        assert!(matches!(
            reader.read::<WorkerMessage>(),
            Err(FrameError::InvalidFrame(_))
        ));
    }
}
