//! `tokio-util` codec for the same wire format (feature `async`).

use bytes::BytesMut;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_value, parse_next_with_limit, DEFAULT_MAX_PAYLOAD};
use crate::error::FrameError;

/// Decodes frames into JSON values and encodes JSON values into frames.
#[derive(Debug, Clone)]
pub struct JsonRpcCodec {
    max_payload_size: usize,
}

impl JsonRpcCodec {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }
}

impl Default for JsonRpcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JsonRpcCodec {
    type Item = Value;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(value) = self.decode(src)? {
            return Ok(Some(value));
        }
        if src.is_empty() {
            return Ok(None);
        }
        match parse_next_with_limit(&src[..], self.max_payload_size) {
            Err(err) => Err(err),
            Ok(_) => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Value> for JsonRpcCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_value(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::message::{finish_session, payload_from_message};

    #[tokio::test]
    async fn framed_round_trip_over_duplex() {
        let (client, server) = tokio::io::duplex(64);

        let producer = tokio::spawn(async move {
            let mut sink = FramedWrite::new(client, JsonRpcCodec::new());
            sink.send(json!({"jsonrpc": "2.0", "params": {"n": 1}}))
                .await
                .unwrap();
            sink.send(json!({"jsonrpc": "2.0", "params": {"eot": true}}))
                .await
                .unwrap();
        });

        let mut stream = FramedRead::new(server, JsonRpcCodec::new());
        let mut payloads = Vec::new();
        while let Some(message) = stream.next().await {
            payloads.push(payload_from_message(message.unwrap()).unwrap());
        }
        producer.await.unwrap();

        let payloads = finish_session(payloads).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["n"], 1);
    }

    #[tokio::test]
    async fn truncated_stream_is_an_error() {
        let wire: &[u8] = b"content-length: 10\r\ncontent-type: application/json\r\n\r\n{}";
        let mut stream = FramedRead::new(wire, JsonRpcCodec::new());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, FrameError::TruncatedBody { .. }));
    }

    #[test]
    fn decoder_rejects_oversized_frames() {
        let mut codec = JsonRpcCodec::with_max_payload(8);
        let mut buf =
            BytesMut::from(&b"content-length: 64\r\ncontent-type: application/json\r\n\r\n"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::PayloadTooLarge { size: 64, max: 8 })
        ));
    }
}
