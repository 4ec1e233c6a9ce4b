use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use ipcharness_transport::IpcStream;
use serde_json::Value;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::{eot_payload, EnvelopeRef, Payload, JSONRPC_VERSION};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes framed JSON-RPC messages to any `Write` stream.
///
/// This is the producer side of a session: the process under test (or a
/// stand-in for it) wraps its connection in a `MessageWriter`, sends payloads
/// and finishes with [`MessageWriter::send_eot`].
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> MessageWriter<T> {
    /// Create a new writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Frame and send a raw body. The body is not checked for JSON validity.
    pub fn send_body(&mut self, body: &[u8]) -> Result<()> {
        if body.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: body.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(body, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Serialize and send any JSON value as one frame.
    pub fn send_value(&mut self, value: &Value) -> Result<()> {
        let body = serde_json::to_vec(value).map_err(FrameError::BodyNotJson)?;
        self.send_body(&body)
    }

    /// Send `params` inside an envelope with an explicit `jsonrpc` version.
    pub fn send_envelope(&mut self, jsonrpc: &str, params: &Payload) -> Result<()> {
        let envelope = EnvelopeRef { jsonrpc, params };
        let body = serde_json::to_vec(&envelope).map_err(FrameError::BodyNotJson)?;
        self.send_body(&body)
    }

    /// Send one payload in a `"2.0"` envelope.
    pub fn send_payload(&mut self, params: &Payload) -> Result<()> {
        self.send_envelope(JSONRPC_VERSION, params)
    }

    /// Send the end-of-transmission payload.
    pub fn send_eot(&mut self) -> Result<()> {
        self.send_payload(&eot_payload())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl MessageWriter<IpcStream> {
    /// Create a writer for `IpcStream` and apply the write timeout from config.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }

    /// Connect to a session endpoint as its producer.
    #[cfg(unix)]
    pub fn connect(path: impl AsRef<std::path::Path>, config: FrameConfig) -> Result<Self> {
        let stream = ipcharness_transport::UnixDomainSocket::connect(path)
            .map_err(transport_to_frame_error)?;
        Self::with_config_ipc(stream, config)
    }
}

pub(crate) fn transport_to_frame_error(err: ipcharness_transport::TransportError) -> FrameError {
    match err {
        ipcharness_transport::TransportError::Io(io)
        | ipcharness_transport::TransportError::Accept(io) => FrameError::Io(io),
        ipcharness_transport::TransportError::Bind { source, .. }
        | ipcharness_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::message::process_all;

    fn object(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn writes_exact_wire_format() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_body(b"{}").unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(
            wire,
            b"content-length: 2\r\ncontent-type: application/json\r\n\r\n{}".to_vec()
        );
    }

    #[test]
    fn payloads_and_eot_form_a_session() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_payload(&object(json!({"test": "a", "outcome": "success"}))).unwrap();
        writer.send_payload(&object(json!({"test": "b", "outcome": "failure"}))).unwrap();
        writer.send_eot().unwrap();

        let wire = writer.into_inner().into_inner();
        let payloads = process_all(&wire).unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[1]["outcome"], "failure");
    }

    #[test]
    fn explicit_version_is_written_verbatim() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_envelope("1.0", &object(json!({"a": 1}))).unwrap();

        let wire = writer.into_inner().into_inner();
        let (value, _) = crate::codec::parse_next(&wire).unwrap();
        assert_eq!(value, json!({"jsonrpc": "1.0", "params": {"a": 1}}));
    }

    #[test]
    fn payload_too_large_rejected() {
        let cfg = FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = MessageWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer.send_value(&json!({"oversized": true})).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = MessageWriter::new(sink);

        writer.send_eot().unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = MessageWriter::new(writer_impl);
        writer.send_eot().unwrap();

        let inner = writer.into_inner();
        assert!(process_all(&inner.data).unwrap().is_empty());
    }

    #[test]
    fn write_timeout_surfaces_as_io_error() {
        let mut writer = MessageWriter::new(TimedOutWriter);
        let err = writer.send_eot().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = MessageWriter::new(ZeroWriter);
        let err = writer.send_eot().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    #[cfg(unix)]
    fn connect_reports_missing_endpoint() {
        let path = std::env::temp_dir().join(format!("ipch-absent-{}.sock", std::process::id()));
        let err = MessageWriter::connect(&path, FrameConfig::default())
            .err()
            .expect("connect to a missing socket should fail");
        assert!(matches!(err, FrameError::Io(_)));
    }

    #[test]
    #[cfg(unix)]
    fn sends_over_unix_socket() {
        use std::io::Read;

        let dir = std::env::temp_dir().join(format!("ipch-writer-uds-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("writer.sock");
        let listener = ipcharness_transport::UnixDomainSocket::bind(&sock_path).unwrap();

        let path_clone = sock_path.clone();
        let producer = std::thread::spawn(move || {
            let cfg = FrameConfig {
                write_timeout: Some(std::time::Duration::from_secs(1)),
                ..FrameConfig::default()
            };
            let mut writer = MessageWriter::connect(path_clone, cfg).unwrap();
            writer.send_payload(&object(json!({"n": 1}))).unwrap();
            writer.send_eot().unwrap();
        });

        let mut stream = listener.accept().unwrap();
        let mut wire = Vec::new();
        stream.read_to_end(&mut wire).unwrap();
        producer.join().unwrap();

        let payloads = process_all(&wire).unwrap();
        assert_eq!(payloads, vec![object(json!({"n": 1}))]);
        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct TimedOutWriter;

    impl Write for TimedOutWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
