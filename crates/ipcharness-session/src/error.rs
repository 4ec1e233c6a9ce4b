use std::path::PathBuf;

use ipcharness_frame::{FrameError, ProtocolError, StreamError};
use ipcharness_transport::TransportError;

/// The test subprocess could not be started or waited on.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Spawning failed (program not found, permission denied, bad cwd).
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// Waiting for the child's exit status failed.
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

/// Errors surfaced at the coordinator boundary.
///
/// Lower-layer errors are carried unmodified so callers can tell malformed
/// frames from protocol violations and launch failures.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Endpoint bind/accept/read failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed wire data.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The producer broke the message contract.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The subprocess could not be started.
    #[error("launch error: {0}")]
    Launch(#[from] LaunchError),

    /// A session worker thread panicked.
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

impl From<StreamError> for HarnessError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Frame(err) => Self::Frame(err),
            StreamError::Protocol(err) => Self::Protocol(err),
        }
    }
}

/// Errors from test-source line lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// No line carries the test's marker.
    #[error("test {test:?} not found on any line in {}", path.display())]
    NotFound { test: String, path: PathBuf },

    /// The test file could not be read.
    #[error("failed reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, HarnessError>;
