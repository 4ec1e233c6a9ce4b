use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use ipcharness_frame::{process_all_with_limit, Payload};
use ipcharness_transport::unique_socket_path;
use tracing::{info, warn};

use crate::completion::CompletionFlag;
use crate::config::SessionConfig;
use crate::error::{HarnessError, Result};
use crate::listener::ChannelListener;
use crate::supervisor::{LaunchSpec, ProcessSupervisor};

/// Outcome of one session.
#[derive(Debug)]
pub struct SessionReport {
    /// Endpoint the session listened on (already removed).
    pub endpoint: PathBuf,
    /// Exit status of the test process.
    pub exit_status: ExitStatus,
    /// Connections the producer opened.
    pub connections: usize,
    /// Raw bytes received.
    pub raw_bytes: usize,
    /// A bounded wait expired before the session ended cleanly.
    pub timed_out: bool,
    /// Parsed payloads without the `eot` sentinel; `None` if nothing arrived.
    pub payloads: Option<Vec<Payload>>,
}

/// Runs a test process against a fresh endpoint and parses what it sends.
#[derive(Debug, Clone, Default)]
pub struct Coordinator {
    config: SessionConfig,
}

impl Coordinator {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run a session and return its payloads, or `None` if no data arrived.
    pub fn run(&self, spec: LaunchSpec) -> Result<Option<Vec<Payload>>> {
        self.run_session(spec).map(|report| report.payloads)
    }

    /// Run a session on a newly generated endpoint.
    pub fn run_session(&self, spec: LaunchSpec) -> Result<SessionReport> {
        let endpoint = unique_socket_path(&self.config.endpoint_prefix);
        self.run_with_endpoint(spec, endpoint)
    }

    /// Run a session on `endpoint`.
    ///
    /// The endpoint path is exported to the child under
    /// [`SessionConfig::endpoint_env`]. Listener and supervisor run on two
    /// threads that share only the completion flag; both are joined before
    /// any parsing happens.
    pub fn run_with_endpoint(
        &self,
        spec: LaunchSpec,
        endpoint: impl AsRef<Path>,
    ) -> Result<SessionReport> {
        let endpoint = endpoint.as_ref().to_path_buf();
        let listener = ChannelListener::bind(&endpoint, self.config.clone())?;
        let supervisor =
            ProcessSupervisor::new(spec.env(&self.config.endpoint_env, endpoint.as_os_str()));
        let completion = CompletionFlag::new();

        info!(endpoint = ?endpoint, env = %self.config.endpoint_env, "starting session");

        let (listened, supervised) = std::thread::scope(|scope| {
            let listening = scope.spawn(|| listener.listen(&completion));
            let supervising = scope.spawn(|| supervisor.run(&completion));
            (listening.join(), supervising.join())
        });

        let exit_status = supervised.map_err(|_| HarnessError::ThreadPanicked("supervisor"))??;
        let raw = listened.map_err(|_| HarnessError::ThreadPanicked("listener"))??;

        let payloads = if raw.is_empty() {
            warn!(endpoint = ?endpoint, "no data received from test process");
            None
        } else {
            Some(process_all_with_limit(
                &raw.bytes,
                self.config.max_payload_size,
            )?)
        };

        Ok(SessionReport {
            endpoint,
            exit_status,
            connections: raw.connections,
            raw_bytes: raw.bytes.len(),
            timed_out: raw.timed_out,
            payloads,
        })
    }
}
