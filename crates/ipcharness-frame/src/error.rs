/// Errors raised while splitting a byte stream into frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No `Content-Length` header was found before the end of the header block.
    #[error("header does not contain Content-Length")]
    MissingContentLength,

    /// The `Content-Length` value is not a decimal byte count.
    #[error("invalid Content-Length value {0:?}")]
    InvalidContentLength(String),

    /// The line after `Content-Length` does not carry `Content-Type`.
    #[error("header does not contain Content-Type")]
    MissingContentType,

    /// The header block is not terminated by an empty line.
    #[error("header is not separated from the body by an empty line")]
    MissingHeaderSeparator,

    /// The buffer ended before the declared body length was available.
    #[error("truncated body ({available} of {expected} bytes available)")]
    TruncatedBody { expected: usize, available: usize },

    /// The body could not be decoded as JSON.
    #[error("body is not valid JSON: {0}")]
    BodyNotJson(#[source] serde_json::Error),

    /// The declared body exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended with no buffered frame data.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Session-level violations of the message contract.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The session produced no bytes or no messages.
    #[error("no messages received")]
    EmptyBuffer,

    /// A decoded message is not a `{"jsonrpc", "params"}` envelope.
    #[error("invalid JSON-RPC envelope: {0}")]
    InvalidEnvelope(String),

    /// The envelope's `jsonrpc` field is not `"2.0"`.
    #[error("invalid JSON-RPC version {found:?} (expected \"2.0\")")]
    WrongJsonRpcVersion { found: String },

    /// The final payload of the session does not carry the `eot` marker.
    #[error("last payload does not contain 'eot'")]
    MissingEot,
}

/// Either failure kind of a full-session parse, preserved as raised.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
