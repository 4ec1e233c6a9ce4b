use std::fmt;
use std::io;

use ipcharness_frame::{FrameError, ProtocolError, StreamError};
use ipcharness_session::{HarnessError, LaunchError};
use ipcharness_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NO_DATA: i32 = 66;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const LAUNCH_FAILED: i32 = 127;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn protocol_error(context: &str, err: ProtocolError) -> CliError {
    match err {
        ProtocolError::EmptyBuffer => CliError::new(NO_DATA, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn stream_error(context: &str, err: StreamError) -> CliError {
    match err {
        StreamError::Frame(err) => frame_error(context, err),
        StreamError::Protocol(err) => protocol_error(context, err),
    }
}

pub fn launch_error(context: &str, err: LaunchError) -> CliError {
    match err {
        LaunchError::Spawn { .. } => CliError::new(LAUNCH_FAILED, format!("{context}: {err}")),
        LaunchError::Wait { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn harness_error(context: &str, err: HarnessError) -> CliError {
    match err {
        HarnessError::Transport(err) => transport_error(context, err),
        HarnessError::Frame(err) => frame_error(context, err),
        HarnessError::Protocol(err) => protocol_error(context, err),
        HarnessError::Launch(err) => launch_error(context, err),
        HarnessError::ThreadPanicked(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
