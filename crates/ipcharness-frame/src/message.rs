//! JSON-RPC envelopes and full-session parsing.
//!
//! A session is a run of frames whose bodies are `{"jsonrpc": "2.0",
//! "params": {...}}` envelopes. The last payload carries the `eot` marker and
//! is not part of the session's result.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::{parse_next_with_limit, DEFAULT_MAX_PAYLOAD};
use crate::error::{ProtocolError, StreamError};

/// The only accepted `jsonrpc` value.
pub const JSONRPC_VERSION: &str = "2.0";

/// Key marking the end-of-transmission payload.
pub const EOT_KEY: &str = "eot";

/// The `params` object of an envelope.
pub type Payload = Map<String, Value>;

/// Borrowed envelope used when writing messages.
#[derive(Debug, Serialize)]
pub struct EnvelopeRef<'a> {
    pub jsonrpc: &'a str,
    pub params: &'a Payload,
}

impl<'a> EnvelopeRef<'a> {
    /// Wrap a payload in a `"2.0"` envelope.
    pub fn new(params: &'a Payload) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            params,
        }
    }
}

/// Payload that terminates a session: `{"eot": true}`.
pub fn eot_payload() -> Payload {
    let mut payload = Payload::new();
    payload.insert(EOT_KEY.to_string(), Value::Bool(true));
    payload
}

/// Whether `payload` carries the end-of-transmission marker.
pub fn is_eot(payload: &Payload) -> bool {
    payload.contains_key(EOT_KEY)
}

/// Validate one decoded message and extract its payload.
pub fn payload_from_message(message: Value) -> Result<Payload, ProtocolError> {
    let Value::Object(mut envelope) = message else {
        return Err(ProtocolError::InvalidEnvelope(
            "message is not a JSON object".to_string(),
        ));
    };

    match envelope.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        Some(Value::String(version)) => {
            return Err(ProtocolError::WrongJsonRpcVersion {
                found: version.clone(),
            })
        }
        Some(other) => {
            return Err(ProtocolError::WrongJsonRpcVersion {
                found: other.to_string(),
            })
        }
        None => {
            return Err(ProtocolError::InvalidEnvelope(
                "missing `jsonrpc` field".to_string(),
            ))
        }
    }

    match envelope.remove("params") {
        Some(Value::Object(params)) => Ok(params),
        Some(_) => Err(ProtocolError::InvalidEnvelope(
            "`params` is not an object".to_string(),
        )),
        None => Err(ProtocolError::InvalidEnvelope(
            "missing `params` field".to_string(),
        )),
    }
}

/// Close a session: the last payload must carry `eot` and is dropped.
pub fn finish_session(mut payloads: Vec<Payload>) -> Result<Vec<Payload>, ProtocolError> {
    let last = payloads.pop().ok_or(ProtocolError::EmptyBuffer)?;
    if !is_eot(&last) {
        return Err(ProtocolError::MissingEot);
    }
    Ok(payloads)
}

/// Parse a complete session buffer into its payloads, in arrival order.
///
/// Fails on the first malformed frame or envelope, on an empty buffer, and
/// when the final payload lacks `eot`. Bodies over [`DEFAULT_MAX_PAYLOAD`]
/// are rejected.
pub fn process_all(buffer: &[u8]) -> Result<Vec<Payload>, StreamError> {
    process_all_with_limit(buffer, DEFAULT_MAX_PAYLOAD)
}

/// [`process_all`] with an explicit maximum body size.
pub fn process_all_with_limit(
    buffer: &[u8],
    max_payload: usize,
) -> Result<Vec<Payload>, StreamError> {
    if buffer.is_empty() {
        return Err(ProtocolError::EmptyBuffer.into());
    }

    let mut payloads = Vec::new();
    let mut remaining = buffer;
    while !remaining.is_empty() {
        let (message, rest) = parse_next_with_limit(remaining, max_payload)?;
        payloads.push(payload_from_message(message)?);
        remaining = rest;
    }

    tracing::debug!(messages = payloads.len(), bytes = buffer.len(), "parsed session buffer");
    finish_session(payloads).map_err(StreamError::from)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use serde_json::json;

    use super::*;
    use crate::codec::{encode_value, FrameConfig};
    use crate::error::FrameError;
    use crate::reader::FrameReader;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn session_wire(messages: &[Value]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for message in messages {
            encode_value(message, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn envelope(params: Value) -> Value {
        json!({"jsonrpc": "2.0", "params": params})
    }

    #[test]
    fn round_trip_drops_only_the_eot_payload() {
        let params = vec![
            json!({"command_type": "discovery", "tests": {"name": "root"}}),
            json!({"result": {"test_a": {"outcome": "success"}}}),
            json!({"nested": [1, 2, {"deep": null}]}),
        ];
        let mut messages: Vec<Value> = params.iter().cloned().map(envelope).collect();
        messages.push(envelope(json!({"command_type": "discovery", "eot": true})));

        let payloads = process_all(&session_wire(&messages)).unwrap();
        let expected: Vec<Payload> = params.into_iter().map(payload).collect();
        assert_eq!(payloads, expected);
    }

    #[test]
    fn eot_only_session_is_empty() {
        let wire = session_wire(&[envelope(json!({"eot": true}))]);
        assert!(process_all(&wire).unwrap().is_empty());
    }

    #[test]
    fn two_frames_with_eot_last_yields_first_payload() {
        let wire = session_wire(&[
            envelope(json!({"status": "ok"})),
            envelope(json!({"eot": true})),
        ]);
        let payloads = process_all(&wire).unwrap();
        assert_eq!(payloads, vec![payload(json!({"status": "ok"}))]);
    }

    #[test]
    fn empty_buffer_is_a_protocol_error() {
        let err = process_all(b"").unwrap_err();
        assert!(matches!(err, StreamError::Protocol(ProtocolError::EmptyBuffer)));
    }

    #[test]
    fn wrong_version_is_a_protocol_error() {
        let wire = session_wire(&[
            json!({"jsonrpc": "1.0", "params": {"a": 1}}),
            envelope(json!({"eot": true})),
        ]);
        let err = process_all(&wire).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Protocol(ProtocolError::WrongJsonRpcVersion { found }) if found == "1.0"
        ));
    }

    #[test]
    fn non_string_version_is_rejected() {
        let err = payload_from_message(json!({"jsonrpc": 2.0, "params": {}})).unwrap_err();
        assert!(matches!(err, ProtocolError::WrongJsonRpcVersion { .. }));
    }

    #[test]
    fn missing_eot_is_a_protocol_error() {
        let wire = session_wire(&[envelope(json!({"a": 1})), envelope(json!({"b": 2}))]);
        let err = process_all(&wire).unwrap_err();
        assert!(matches!(err, StreamError::Protocol(ProtocolError::MissingEot)));
    }

    #[test]
    fn bare_object_fails_at_envelope_validation() {
        let wire = b"content-length: 2\r\ncontent-type: application/json\r\n\r\n{}content-length: 46\r\ncontent-type: application/json\r\n\r\n{\"jsonrpc\":\"2.0\",\"params\":{\"eot\":true}}";
        let err = process_all(wire).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Protocol(ProtocolError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn params_must_be_an_object() {
        let err = payload_from_message(json!({"jsonrpc": "2.0", "params": [1]})).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidEnvelope(_)));

        let err = payload_from_message(json!("2.0")).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidEnvelope(_)));
    }

    #[test]
    fn framing_errors_propagate_unchanged() {
        let mut wire = session_wire(&[envelope(json!({"a": 1}))]);
        wire.extend_from_slice(b"content-length: 99\r\ncontent-type: application/json\r\n\r\n{}");
        let err = process_all(&wire).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Frame(FrameError::TruncatedBody { expected: 99, .. })
        ));
    }

    #[test]
    fn oversized_body_is_rejected_like_the_stream_reader() {
        let blob = "x".repeat(256);
        let wire = session_wire(&[
            envelope(json!({ "blob": blob })),
            envelope(json!({"eot": true})),
        ]);

        let err = process_all_with_limit(&wire, 128).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Frame(FrameError::PayloadTooLarge { max: 128, .. })
        ));

        let config = FrameConfig {
            max_payload_size: 128,
            ..FrameConfig::default()
        };
        let err = FrameReader::with_config(Cursor::new(wire.clone()), config)
            .read_session()
            .unwrap_err();
        assert!(matches!(
            err,
            StreamError::Frame(FrameError::PayloadTooLarge { max: 128, .. })
        ));

        assert_eq!(process_all_with_limit(&wire, 1024).unwrap().len(), 1);
    }

    #[test]
    fn eot_helpers() {
        let eot = eot_payload();
        assert!(is_eot(&eot));
        assert!(!is_eot(&payload(json!({"eot_like": true}))));
        assert_eq!(
            serde_json::to_value(EnvelopeRef::new(&eot)).unwrap(),
            json!({"jsonrpc": "2.0", "params": {"eot": true}})
        );
    }
}
