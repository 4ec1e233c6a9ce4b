use ipcharness_frame::{eot_payload, FrameConfig, MessageWriter, Payload};
use ipcharness_transport::UnixDomainSocket;
use serde_json::Value;
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, transport_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let path = args.path.as_ref().ok_or_else(|| {
        CliError::new(USAGE, "no endpoint given and TEST_RUN_PIPE is not set")
    })?;
    let payloads = resolve_payloads(&args)?;

    let stream = UnixDomainSocket::connect(path)
        .map_err(|err| transport_error("connect failed", err))?;
    let mut writer = MessageWriter::with_config_ipc(stream, FrameConfig::default())
        .map_err(|err| frame_error("connect failed", err))?;

    for payload in &payloads {
        writer
            .send_envelope(&args.jsonrpc, payload)
            .map_err(|err| frame_error("send failed", err))?;
    }
    debug!(path = ?path, count = payloads.len(), "payloads sent");

    Ok(SUCCESS)
}

fn resolve_payloads(args: &SendArgs) -> CliResult<Vec<Payload>> {
    let mut payloads = args
        .json
        .iter()
        .map(|raw| parse_payload(raw))
        .collect::<CliResult<Vec<_>>>()?;
    if args.eot {
        payloads.push(eot_payload());
    }
    if payloads.is_empty() {
        return Err(CliError::new(USAGE, "nothing to send: pass --json or --eot"));
    }
    Ok(payloads)
}

fn parse_payload(raw: &str) -> CliResult<Payload> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::new(USAGE, "--json must be a JSON object")),
        Err(err) => Err(CliError::new(
            USAGE,
            format!("--json is not valid JSON: {err}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(json: &[&str], eot: bool) -> SendArgs {
        SendArgs {
            path: Some("/tmp/unused.sock".into()),
            json: json.iter().map(|s| s.to_string()).collect(),
            eot,
            jsonrpc: "2.0".to_string(),
        }
    }

    #[test]
    fn payloads_keep_order_and_end_with_eot() {
        let payloads = resolve_payloads(&args(&[r#"{"a":1}"#, r#"{"b":2}"#], true)).unwrap();
        assert_eq!(payloads.len(), 3);
        assert_eq!(payloads[0]["a"], 1);
        assert_eq!(payloads[1]["b"], 2);
        assert_eq!(payloads[2], eot_payload());
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert_eq!(parse_payload("[1,2]").unwrap_err().code, USAGE);
        assert_eq!(parse_payload("{bad").unwrap_err().code, USAGE);
    }

    #[test]
    fn rejects_empty_send() {
        assert_eq!(resolve_payloads(&args(&[], false)).unwrap_err().code, USAGE);
    }

    #[test]
    fn missing_endpoint_is_usage_error() {
        let mut send_args = args(&["{}"], false);
        send_args.path = None;
        assert_eq!(run(send_args).unwrap_err().code, USAGE);
    }
}
