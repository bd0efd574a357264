//! Error types
//!
//! Registration problems are [`ConfigError`]s and surface from `add`/`suite`
//! immediately. Everything that can go wrong while running is a
//! [`FaceoffError`].

use faceoff_ipc::FrameError;
use thiserror::Error;

/// Error type produced by user code (benchmark bodies, hooks, provisioners)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid registration input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Benchmark name must not be empty")]
    EmptyName,

    #[error("Suite name must not be empty")]
    EmptySuiteName,

    #[error("Benchmark '{0}' is already registered")]
    DuplicateName(String),

    #[error("Invalid option `{name}` = {value:?}: {reason}")]
    InvalidOption {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid version label {label:?}: {reason}")]
    InvalidVersionLabel { label: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid_option(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidOption {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while running benchmarks
#[derive(Debug, Error)]
pub enum FaceoffError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to provision [{label}]: {source}")]
    Provision {
        label: String,
        #[source]
        source: BoxError,
    },

    #[error("Setup failed for {benchmark}: {source}")]
    Setup {
        benchmark: String,
        #[source]
        source: BoxError,
    },

    #[error(
        "{benchmark} failed: {source}{}",
        .teardown.as_ref().map(|t| format!(" (teardown also failed: {t})")).unwrap_or_default()
    )]
    Benchmark {
        benchmark: String,
        #[source]
        source: BoxError,
        /// Error raised by teardown after the body failed
        teardown: Option<BoxError>,
    },

    #[error("Teardown failed for {benchmark}: {source}")]
    Teardown {
        benchmark: String,
        #[source]
        source: BoxError,
    },

    #[error("Benchmark not found: {0}")]
    UnknownBenchmark(String),

    #[error("Isolated execution failed: {0}")]
    Isolation(String),

    #[error("IPC error: {0}")]
    Ipc(#[from] FrameError),
}

impl FaceoffError {
    /// Fully-qualified name of the execution unit the error belongs to, if any
    pub fn benchmark(&self) -> Option<&str> {
        match self {
            FaceoffError::Setup { benchmark, .. }
            | FaceoffError::Benchmark { benchmark, .. }
            | FaceoffError::Teardown { benchmark, .. } => Some(benchmark),
            _ => None,
        }
    }
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_error_mentions_teardown() {
        let err = FaceoffError::Benchmark {
            benchmark: "s ⇒ b ⇒ v1".to_string(),
            source: "body exploded".into(),
            teardown: Some("cleanup exploded".into()),
        };
        let message = err.to_string();
        assert!(message.contains("body exploded"));
        assert!(message.contains("teardown also failed: cleanup exploded"));
        assert_eq!(err.benchmark(), Some("s ⇒ b ⇒ v1"));
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42)), "Unknown panic");
    }
}
