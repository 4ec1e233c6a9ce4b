use std::io::{ErrorKind, Read};
use std::path::Path;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use ipcharness_transport::{IpcStream, Result, TransportError, UnixDomainSocket};
use tracing::{debug, info, warn};

use crate::completion::CompletionFlag;
use crate::config::SessionConfig;

const MIN_WAIT: Duration = Duration::from_millis(1);

/// Bytes collected over one session, with how the session ended.
#[derive(Debug, Default)]
pub struct RawSession {
    /// Everything read, concatenated across connections in arrival order.
    pub bytes: BytesMut,
    /// Number of connections accepted.
    pub connections: usize,
    /// The session ended because a bounded wait expired rather than because
    /// the producer finished cleanly.
    pub timed_out: bool,
}

impl RawSession {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Time left for reconnect attempts; shared by every reconnect in a session.
struct ReconnectBudget {
    remaining: Duration,
}

impl ReconnectBudget {
    fn charge(&mut self, since: Instant) {
        self.remaining = self.remaining.saturating_sub(since.elapsed());
    }

    /// Less than one poll slice left; `poll` cannot wait for less.
    fn is_exhausted(&self) -> bool {
        self.remaining < MIN_WAIT
    }
}

/// Owns a session endpoint and collects what the producer writes to it.
///
/// Producers may open several short-lived connections before the one that
/// carries the final message, so an EOF is only final once the process has
/// exited. Until then the listener waits for a reconnect, bounded by
/// [`SessionConfig::reconnect_timeout`].
pub struct ChannelListener {
    socket: UnixDomainSocket,
    config: SessionConfig,
}

impl ChannelListener {
    /// Bind the endpoint. The socket file is removed when the listener is
    /// dropped, which `listen` does on every exit path.
    pub fn bind(path: impl AsRef<Path>, config: SessionConfig) -> Result<Self> {
        let socket = UnixDomainSocket::bind(path)?;
        Ok(Self { socket, config })
    }

    /// Bound endpoint path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }

    /// Run one session to completion and return the accumulated bytes.
    ///
    /// Ends when a connection reaches EOF after `completion` is set (and no
    /// further connection is pending), when a bounded wait expires, or with
    /// an error if accepting or reading fails.
    pub fn listen(self, completion: &CompletionFlag) -> Result<RawSession> {
        let mut session = RawSession::default();

        let Some(mut stream) = self.wait_for_first(completion)? else {
            warn!(path = ?self.path(), "no producer connected before the session ended");
            session.timed_out = true;
            return Ok(session);
        };
        session.connections = 1;
        self.prepare(&stream)?;

        let mut budget = ReconnectBudget {
            remaining: self.config.reconnect_timeout,
        };
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];

        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    debug!(connection = session.connections, "producer closed connection");
                    let next = if completion.is_set() {
                        self.socket.accept_timeout(Duration::ZERO)?
                    } else {
                        self.reconnect(completion, &mut budget)?
                    };
                    match next {
                        Some(next) => {
                            stream = next;
                            session.connections += 1;
                            self.prepare(&stream)?;
                        }
                        None => {
                            if !completion.is_set() {
                                warn!(
                                    budget = ?self.config.reconnect_timeout,
                                    "producer did not reconnect; returning partial session"
                                );
                                session.timed_out = true;
                            }
                            break;
                        }
                    }
                }
                Ok(n) => session.bytes.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if completion.is_set() {
                        warn!("connection still open after process exit; ending session");
                        session.timed_out = true;
                        break;
                    }
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        info!(
            bytes = session.bytes.len(),
            connections = session.connections,
            timed_out = session.timed_out,
            "session closed"
        );
        Ok(session)
    }

    fn prepare(&self, stream: &IpcStream) -> Result<()> {
        debug!(peer_pid = ?stream.peer_pid(), "accepted producer connection");
        stream.set_read_timeout(Some(self.config.read_timeout.max(MIN_WAIT)))
    }

    fn poll_interval(&self) -> Duration {
        self.config.poll_interval.max(MIN_WAIT)
    }

    fn wait_for_first(&self, completion: &CompletionFlag) -> Result<Option<IpcStream>> {
        let started = Instant::now();
        loop {
            // Checked before polling so a connection made just before exit is
            // still picked up by this last poll.
            let finished = completion.is_set();
            if let Some(stream) = self.socket.accept_timeout(self.poll_interval())? {
                return Ok(Some(stream));
            }
            if finished {
                return Ok(None);
            }
            if let Some(limit) = self.config.accept_timeout {
                if started.elapsed() >= limit {
                    return Ok(None);
                }
            }
        }
    }

    fn reconnect(
        &self,
        completion: &CompletionFlag,
        budget: &mut ReconnectBudget,
    ) -> Result<Option<IpcStream>> {
        while !budget.is_exhausted() {
            let finished = completion.is_set();
            let slice = self.poll_interval().min(budget.remaining);
            let started = Instant::now();
            let accepted = self.socket.accept_timeout(slice)?;
            budget.charge(started);
            if accepted.is_some() {
                return Ok(accepted);
            }
            if finished {
                return Ok(None);
            }
        }
        Ok(None)
    }
}
