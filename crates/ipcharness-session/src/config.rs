use std::time::Duration;

use ipcharness_frame::DEFAULT_MAX_PAYLOAD;

/// Environment variable that carries the endpoint path to the subprocess.
pub const DEFAULT_ENDPOINT_ENV: &str = "TEST_RUN_PIPE";

/// Prefix for generated endpoint names.
pub const DEFAULT_ENDPOINT_PREFIX: &str = "ipcharness";

/// Session timing and naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Variable the endpoint path is exported under.
    pub endpoint_env: String,
    /// Prefix for generated endpoint names.
    pub endpoint_prefix: String,
    /// Upper bound on waiting for the first connection while the process is
    /// still running. `None` waits until the process exits.
    pub accept_timeout: Option<Duration>,
    /// Read timeout on accepted connections. A timed-out read ends the
    /// session only once the process has exited.
    pub read_timeout: Duration,
    /// Total time the listener waits for reconnects after a peer closes
    /// early, shared across all reconnects of a session.
    pub reconnect_timeout: Duration,
    /// Slice used when waiting for connections, between completion checks.
    pub poll_interval: Duration,
    /// Size of each read from a connection.
    pub read_chunk_size: usize,
    /// Largest frame body accepted when the session is parsed.
    pub max_payload_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint_env: DEFAULT_ENDPOINT_ENV.to_string(),
            endpoint_prefix: DEFAULT_ENDPOINT_PREFIX.to_string(),
            accept_timeout: None,
            read_timeout: Duration::from_secs(1),
            reconnect_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
            read_chunk_size: 1024 * 1024,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl SessionConfig {
    pub fn with_endpoint_env(mut self, name: impl Into<String>) -> Self {
        self.endpoint_env = name.into();
        self
    }

    pub fn with_endpoint_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.endpoint_prefix = prefix.into();
        self
    }

    pub fn with_accept_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.accept_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_reconnect_timeout(mut self, timeout: Duration) -> Self {
        self.reconnect_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    pub fn with_max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size;
        self
    }
}
