use clap::{Args, Subcommand};
use ipcharness_frame::DEFAULT_MAX_PAYLOAD;
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod run;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch a test process and collect the payloads it sends.
    Run(RunArgs),
    /// Send payloads to a session endpoint (producer side).
    Send(SendArgs),
    /// Parse a captured session stream from a file or stdin.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Working directory for the test process.
    #[arg(long, value_name = "DIR", env = "IPCHARNESS_CWD")]
    pub cwd: Option<PathBuf>,
    /// Extra environment for the test process (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
    /// Variable the endpoint path is exported under.
    #[arg(
        long,
        value_name = "NAME",
        default_value = "TEST_RUN_PIPE",
        env = "IPCHARNESS_ENDPOINT_ENV"
    )]
    pub endpoint_env: String,
    /// Read timeout on accepted connections (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s", env = "IPCHARNESS_READ_TIMEOUT")]
    pub read_timeout: String,
    /// Total time to wait for reconnects after an early close.
    #[arg(long, default_value = "1s", env = "IPCHARNESS_RECONNECT_TIMEOUT")]
    pub reconnect_timeout: String,
    /// Give up waiting for the first connection after this long.
    #[arg(long, env = "IPCHARNESS_ACCEPT_TIMEOUT")]
    pub accept_timeout: Option<String>,
    /// Largest frame body accepted, in bytes.
    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = DEFAULT_MAX_PAYLOAD,
        env = "IPCHARNESS_MAX_PAYLOAD"
    )]
    pub max_payload: usize,
    /// Test program and its arguments.
    #[arg(
        value_name = "PROGRAM",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Endpoint to connect to.
    #[arg(env = "TEST_RUN_PIPE")]
    pub path: Option<PathBuf>,
    /// JSON object payload (repeatable, sent in order).
    #[arg(long, value_name = "OBJECT")]
    pub json: Vec<String>,
    /// Finish with the end-of-transmission payload.
    #[arg(long)]
    pub eot: bool,
    /// Envelope `jsonrpc` version.
    #[arg(long, value_name = "VERSION", default_value = "2.0")]
    pub jsonrpc: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Captured stream; reads stdin when omitted or `-`.
    pub file: Option<PathBuf>,
    /// Largest frame body accepted, in bytes.
    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = DEFAULT_MAX_PAYLOAD,
        env = "IPCHARNESS_MAX_PAYLOAD"
    )]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
