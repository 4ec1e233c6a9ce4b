use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;

use crate::error::{FrameError, Result};

/// Header key carrying the body length (matched case-insensitively).
pub const CONTENT_LENGTH: &[u8] = b"content-length:";

/// Header key that must follow `Content-Length` (matched case-insensitively).
pub const CONTENT_TYPE: &[u8] = b"content-type:";

/// Content type written by [`encode_frame`].
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Default maximum body size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum declared body size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout applied by [`FrameReader::with_config_ipc`](crate::FrameReader::with_config_ipc).
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Parsed header block: declared body length and the header's size on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    content_length: usize,
    header_len: usize,
}

/// Line iterator over a byte buffer. Lines keep their `\n` terminator.
///
/// With `at_eof` set, a trailing unterminated line is returned as-is and an
/// exhausted buffer keeps yielding empty lines. Without it, an unterminated
/// line means more bytes are needed.
struct Lines<'a> {
    src: &'a [u8],
    pos: usize,
    at_eof: bool,
}

impl<'a> Lines<'a> {
    fn next_line(&mut self) -> Option<&'a [u8]> {
        let rest = &self.src[self.pos..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                self.pos += end + 1;
                Some(&rest[..=end])
            }
            None if self.at_eof => {
                self.pos = self.src.len();
                Some(rest)
            }
            None => None,
        }
    }
}

fn find_ignore_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn parse_content_length(value: &[u8]) -> Result<usize> {
    let text = String::from_utf8_lossy(value);
    let trimmed = text.trim();
    trimmed
        .parse()
        .map_err(|_| FrameError::InvalidContentLength(trimmed.to_string()))
}

/// Scan the header block at the start of `src`.
///
/// Returns `Ok(None)` if more bytes are needed (only possible without
/// `at_eof`).
fn scan_header(src: &[u8], at_eof: bool) -> Result<Option<Header>> {
    let mut lines = Lines { src, pos: 0, at_eof };

    let content_length = loop {
        let Some(line) = lines.next_line() else {
            return Ok(None);
        };
        if let Some(at) = find_ignore_case(line, CONTENT_LENGTH) {
            break parse_content_length(&line[at + CONTENT_LENGTH.len()..])?;
        }
        if is_blank(line) {
            return Err(FrameError::MissingContentLength);
        }
    };

    let Some(line) = lines.next_line() else {
        return Ok(None);
    };
    if find_ignore_case(line, CONTENT_TYPE).is_none() {
        return Err(FrameError::MissingContentType);
    }

    let Some(line) = lines.next_line() else {
        return Ok(None);
    };
    if line != b"\r\n" && line != b"\n" {
        return Err(FrameError::MissingHeaderSeparator);
    }

    Ok(Some(Header {
        content_length,
        header_len: lines.pos,
    }))
}

fn decode_body(body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(FrameError::BodyNotJson)
}

fn check_payload_size(content_length: usize, max_payload: usize) -> Result<()> {
    if content_length > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: content_length,
            max: max_payload,
        });
    }
    Ok(())
}

/// Parse the next frame out of a complete buffer, with the default size limit.
///
/// The buffer is treated as final: an incomplete header or body is an error,
/// never a partial message. Returns the decoded JSON body and the bytes that
/// follow it.
pub fn parse_next(src: &[u8]) -> Result<(Value, &[u8])> {
    parse_next_with_limit(src, DEFAULT_MAX_PAYLOAD)
}

/// [`parse_next`] with an explicit maximum body size.
///
/// Applies the same limit check as [`decode_frame`], so a buffer parsed whole
/// and the same bytes read incrementally are accepted or rejected alike.
pub fn parse_next_with_limit(src: &[u8], max_payload: usize) -> Result<(Value, &[u8])> {
    let header = match scan_header(src, true)? {
        Some(header) => header,
        None => return Err(FrameError::MissingContentLength),
    };
    check_payload_size(header.content_length, max_payload)?;

    let body_start = header.header_len;
    let available = src.len() - body_start;
    if available < header.content_length {
        return Err(FrameError::TruncatedBody {
            expected: header.content_length,
            available,
        });
    }

    let body_end = body_start + header.content_length;
    let value = decode_body(&src[body_start..body_end])?;
    Ok((value, &src[body_end..]))
}

/// Decode the next frame from a growing buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. Declared lengths
/// above `max_payload` are rejected before the body is buffered.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Value>> {
    let Some(header) = scan_header(&src[..], false)? else {
        return Ok(None);
    };

    check_payload_size(header.content_length, max_payload)?;

    if src.len() < header.header_len + header.content_length {
        return Ok(None);
    }

    src.advance(header.header_len);
    let body = src.split_to(header.content_length);
    decode_body(&body).map(Some)
}

/// Encode a body into the wire format.
///
/// Wire format:
/// ```text
/// content-length: <decimal byte count>\r\n
/// content-type: application/json\r\n
/// \r\n
/// <body>
/// ```
pub fn encode_frame(body: &[u8], dst: &mut BytesMut) {
    let header = format!(
        "content-length: {}\r\ncontent-type: {JSON_CONTENT_TYPE}\r\n\r\n",
        body.len()
    );
    dst.reserve(header.len() + body.len());
    dst.put_slice(header.as_bytes());
    dst.put_slice(body);
}

/// Serialize `value` as JSON and encode it as one frame.
pub fn encode_value(value: &Value, dst: &mut BytesMut) -> Result<()> {
    let body = serde_json::to_vec(value).map_err(FrameError::BodyNotJson)?;
    encode_frame(&body, dst);
    Ok(())
}
