//! Content-Length framed JSON-RPC message streams.
//!
//! Every message on the wire is a small text header block followed by a
//! JSON body of exactly the declared length:
//!
//! ```text
//! content-length: 39\r\n
//! content-type: application/json\r\n
//! \r\n
//! {"jsonrpc":"2.0","params":{"eot":true}}
//! ```
//!
//! Frames are concatenated back-to-back. [`parse_next`] splits a complete
//! buffer, [`decode_frame`] works on a growing one, and [`process_all`] turns a
//! whole session into its payloads.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::JsonRpcCodec;
pub use codec::{
    decode_frame, encode_frame, encode_value, parse_next, parse_next_with_limit, FrameConfig,
    DEFAULT_MAX_PAYLOAD,
};
pub use error::{FrameError, ProtocolError, Result, StreamError};
pub use message::{
    eot_payload, finish_session, is_eot, payload_from_message, process_all, process_all_with_limit,
    EnvelopeRef, Payload, EOT_KEY, JSONRPC_VERSION,
};
pub use reader::FrameReader;
pub use writer::MessageWriter;
