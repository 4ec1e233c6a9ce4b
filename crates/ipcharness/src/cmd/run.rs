use ipcharness_session::{Coordinator, LaunchSpec, SessionConfig};
use tracing::info;

use crate::cmd::{parse_duration, RunArgs};
use crate::exit::{harness_error, CliError, CliResult, NO_DATA, SUCCESS, USAGE};
use crate::output::{print_session, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args)?;
    let spec = launch_spec(&args)?;

    let report = Coordinator::new(config)
        .run_session(spec)
        .map_err(|err| harness_error("session failed", err))?;

    info!(
        exit = ?report.exit_status,
        connections = report.connections,
        bytes = report.raw_bytes,
        "session finished"
    );
    print_session(&report, format);

    if report.payloads.is_none() {
        return Ok(NO_DATA);
    }
    Ok(SUCCESS)
}

fn session_config(args: &RunArgs) -> CliResult<SessionConfig> {
    if args.endpoint_env.is_empty() || args.endpoint_env.contains('=') {
        return Err(CliError::new(
            USAGE,
            format!("invalid endpoint variable name: {:?}", args.endpoint_env),
        ));
    }
    let accept_timeout = args
        .accept_timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?;

    Ok(SessionConfig::default()
        .with_endpoint_env(&args.endpoint_env)
        .with_read_timeout(parse_duration(&args.read_timeout)?)
        .with_reconnect_timeout(parse_duration(&args.reconnect_timeout)?)
        .with_accept_timeout(accept_timeout)
        .with_max_payload_size(args.max_payload))
}

fn launch_spec(args: &RunArgs) -> CliResult<LaunchSpec> {
    let mut spec = LaunchSpec::from_argv(&args.command)
        .ok_or_else(|| CliError::new(USAGE, "missing test program"))?;
    spec = spec.envs(
        args.env
            .iter()
            .map(|pair| parse_env_pair(pair))
            .collect::<CliResult<Vec<_>>>()?,
    );
    if let Some(cwd) = &args.cwd {
        spec = spec.cwd(cwd);
    }
    Ok(spec)
}

fn parse_env_pair(pair: &str) -> CliResult<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(CliError::new(
            USAGE,
            format!("--env expects KEY=VALUE, got {pair:?}"),
        )),
    }
}
