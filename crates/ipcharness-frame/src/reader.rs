use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use ipcharness_transport::IpcStream;
use serde_json::Value;

use crate::codec::{decode_frame, parse_next_with_limit, FrameConfig};
use crate::error::{FrameError, Result, StreamError};
use crate::message::{finish_session, payload_from_message, Payload};
use crate::writer::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete messages.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next decoded message body (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached on a
    /// frame boundary. EOF inside a frame reports what is wrong with the
    /// leftover bytes (for example [`FrameError::TruncatedBody`]).
    pub fn read_message(&mut self) -> Result<Value> {
        loop {
            if let Some(value) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(value);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(self.eof_error());
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn eof_error(&self) -> FrameError {
        if self.buf.is_empty() {
            return FrameError::ConnectionClosed;
        }
        match parse_next_with_limit(&self.buf, self.config.max_payload_size) {
            Err(err) => err,
            Ok(_) => FrameError::ConnectionClosed,
        }
    }

    /// Read messages until EOF and close the session.
    ///
    /// Applies the same envelope and `eot` rules as
    /// [`process_all`](crate::message::process_all), but consumes the stream
    /// incrementally.
    pub fn read_session(mut self) -> std::result::Result<Vec<Payload>, StreamError> {
        let mut payloads = Vec::new();
        loop {
            match self.read_message() {
                Ok(message) => payloads.push(payload_from_message(message)?),
                Err(FrameError::ConnectionClosed) => break,
                Err(err) => return Err(err.into()),
            }
        }
        finish_session(payloads).map_err(StreamError::from)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<IpcStream> {
    /// Create a reader for `IpcStream` and apply the read timeout from config.
    ///
    /// A read that times out surfaces as [`FrameError::Io`] with
    /// `WouldBlock` or `TimedOut`.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
