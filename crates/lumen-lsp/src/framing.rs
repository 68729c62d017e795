//! Incremental LSP header framing.
//!
//! LSP frames every JSON-RPC body with a header block:
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```
//!
//! [`FrameCodec`] accepts arbitrarily chunked input and yields complete
//! bodies in arrival order. It owns no I/O, so any read loop can drive it.

use thiserror::Error;
use tracing::debug;

/// Log target for framing events.
pub(crate) const FRAMING_TARGET: &str = "lumen_lsp::framing";

const HEADER_TERMINATOR: &[u8; 4] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "Content-Length";

/// Errors raised while parsing the header block.
///
/// None of these are recoverable: the stream carries no marker the codec
/// could resynchronise on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// The header block had no `Content-Length` field.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// The `Content-Length` value was not a decimal byte count.
    #[error("invalid Content-Length header: {value:?}")]
    InvalidContentLength {
        /// Raw header value as received.
        value: String,
    },

    /// The header block contained non-ASCII bytes.
    #[error("invalid header format")]
    InvalidHeader,
}

/// Stateful parser turning a byte stream into message bodies.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: Vec<u8>,
    scanned: usize,
}

impl FrameCodec {
    /// Creates a codec with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every body that is now complete.
    ///
    /// Incomplete headers and bodies stay buffered for the next call. After
    /// an error the buffer is left as it was, so later calls report the same
    /// failure rather than misreading body bytes as a header.
    ///
    /// # Errors
    ///
    /// Returns a [`FramingError`] when a complete header block lacks a usable
    /// `Content-Length`.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, FramingError> {
        self.buffer.extend_from_slice(chunk);
        let mut bodies = Vec::new();
        while let Some(body) = self.next_body()? {
            bodies.push(body);
        }
        Ok(bodies)
    }

    /// Number of bytes held back waiting for the rest of a frame.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn next_body(&mut self) -> Result<Option<String>, FramingError> {
        let Some(header_end) = self.find_terminator() else {
            return Ok(None);
        };
        let header = self.buffer.get(..header_end).unwrap_or_default();
        let content_length = parse_content_length(header)?;

        let body_start = header_end + HEADER_TERMINATOR.len();
        let frame_end = body_start.checked_add(content_length).ok_or_else(|| {
            FramingError::InvalidContentLength {
                value: content_length.to_string(),
            }
        })?;
        if self.buffer.len() < frame_end {
            return Ok(None);
        }

        let mut frame: Vec<u8> = self.buffer.drain(..frame_end).collect();
        let payload = frame.split_off(body_start);
        self.scanned = 0;

        debug!(
            target: FRAMING_TARGET,
            content_length,
            buffered = self.buffer.len(),
            "decoded frame"
        );
        // Only whole bodies reach this point, so a code point split across
        // chunks has been reassembled already.
        Ok(Some(String::from_utf8_lossy(&payload).into_owned()))
    }

    fn find_terminator(&mut self) -> Option<usize> {
        // The terminator may straddle the end of the previous scan.
        let start = self
            .scanned
            .saturating_sub(HEADER_TERMINATOR.len() - 1)
            .min(self.buffer.len());
        let found = self
            .buffer
            .get(start..)
            .unwrap_or_default()
            .windows(HEADER_TERMINATOR.len())
            .position(|window| window == HEADER_TERMINATOR)
            .map(|offset| start + offset);
        if found.is_none() {
            self.scanned = self.buffer.len();
        }
        found
    }
}

fn parse_content_length(header: &[u8]) -> Result<usize, FramingError> {
    if !header.is_ascii() {
        return Err(FramingError::InvalidHeader);
    }
    let header = std::str::from_utf8(header).map_err(|_| FramingError::InvalidHeader)?;

    for line in header.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            // Ignore other headers (e.g., Content-Type)
            continue;
        }
        let value = value.trim();
        if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(FramingError::InvalidContentLength {
                value: value.to_owned(),
            });
        }
        return value
            .parse()
            .map_err(|_| FramingError::InvalidContentLength {
                value: value.to_owned(),
            });
    }

    Err(FramingError::MissingContentLength)
}

/// Prefixes `body` with its `Content-Length` header.
///
/// The length counts encoded bytes, not characters.
#[must_use]
pub fn frame(body: &[u8]) -> Vec<u8> {
    let header = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len());
    let mut framed = Vec::with_capacity(header.len() + body.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(body);
    framed
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    const MULTIBYTE_BODY: &str = r#"{"jsonrpc":"2.0","method":"note","params":"héllo ✓ 𝄞"}"#;

    #[fixture]
    fn codec() -> FrameCodec {
        FrameCodec::new()
    }

    fn framed(body: &str) -> Vec<u8> {
        frame(body.as_bytes())
    }

    #[rstest]
    fn frames_with_byte_length() {
        let framed = frame("é".as_bytes());

        assert_eq!(framed, b"Content-Length: 2\r\n\r\n\xc3\xa9".to_vec());
    }

    #[rstest]
    fn frames_empty_body() {
        assert_eq!(frame(b""), b"Content-Length: 0\r\n\r\n".to_vec());
    }

    #[rstest]
    fn emits_single_body(mut codec: FrameCodec) {
        let bodies = codec.feed(b"Content-Length: 5\r\n\r\nhello").expect("feed failed");

        assert_eq!(bodies, vec![String::from("hello")]);
        assert_eq!(codec.buffered_len(), 0);
    }

    #[rstest]
    fn emits_empty_body(mut codec: FrameCodec) {
        let bodies = codec.feed(b"Content-Length: 0\r\n\r\n").expect("feed failed");

        assert_eq!(bodies, vec![String::new()]);
    }

    #[rstest]
    fn ignores_other_headers(mut codec: FrameCodec) {
        let input = b"Content-Type: application/vscode-jsonrpc; charset=utf-8\r\nContent-Length: 4\r\n\r\ntest";

        let bodies = codec.feed(input).expect("feed failed");

        assert_eq!(bodies, vec![String::from("test")]);
    }

    #[rstest]
    #[case("content-length: 2\r\n\r\nok")]
    #[case("CONTENT-LENGTH:2\r\n\r\nok")]
    #[case("Content-Length:   2  \r\n\r\nok")]
    fn matches_header_name_case_insensitively(mut codec: FrameCodec, #[case] input: &str) {
        let bodies = codec.feed(input.as_bytes()).expect("feed failed");

        assert_eq!(bodies, vec![String::from("ok")]);
    }

    #[rstest]
    fn splitting_at_every_boundary_yields_the_same_body() {
        let message = framed(MULTIBYTE_BODY);

        for split in 0..=message.len() {
            let (head, tail) = message.split_at(split);
            let mut codec = FrameCodec::new();

            let mut bodies = codec.feed(head).expect("first feed failed");
            bodies.extend(codec.feed(tail).expect("second feed failed"));

            assert_eq!(
                bodies,
                vec![String::from(MULTIBYTE_BODY)],
                "split at byte {split} changed the output"
            );
        }
    }

    #[rstest]
    fn byte_at_a_time_yields_the_same_body(mut codec: FrameCodec) {
        let message = framed(MULTIBYTE_BODY);
        let mut bodies = Vec::new();

        for byte in &message {
            bodies.extend(codec.feed(std::slice::from_ref(byte)).expect("feed failed"));
        }

        assert_eq!(bodies, vec![String::from(MULTIBYTE_BODY)]);
    }

    #[rstest]
    fn emits_batched_bodies_in_order(mut codec: FrameCodec) {
        let bodies = ["first", r#"{"second":"✓"}"#, "", "fourth"];
        let batch: Vec<u8> = bodies.iter().flat_map(|body| framed(body)).collect();

        let emitted = codec.feed(&batch).expect("feed failed");

        assert_eq!(emitted, bodies.map(String::from).to_vec());
        assert_eq!(codec.buffered_len(), 0);
    }

    #[rstest]
    fn holds_back_incomplete_body(mut codec: FrameCodec) {
        let first = codec
            .feed(b"Content-Length: 10\r\n\r\nhello")
            .expect("feed failed");
        assert!(first.is_empty());
        assert_eq!(codec.buffered_len(), 27);

        let second = codec.feed(b"world").expect("feed failed");
        assert_eq!(second, vec![String::from("helloworld")]);
    }

    #[rstest]
    fn keeps_trailing_partial_frame(mut codec: FrameCodec) {
        let mut input = framed("done");
        input.extend_from_slice(b"Content-Len");

        let bodies = codec.feed(&input).expect("feed failed");

        assert_eq!(bodies, vec![String::from("done")]);
        assert_eq!(codec.buffered_len(), "Content-Len".len());
    }

    #[rstest]
    fn rejects_missing_content_length(mut codec: FrameCodec) {
        let result = codec.feed(b"Content-Type: application/json\r\n\r\ntest");

        assert_eq!(result, Err(FramingError::MissingContentLength));
    }

    #[rstest]
    fn keeps_failing_after_missing_content_length(mut codec: FrameCodec) {
        let first = codec.feed(b"\r\n\r\n");
        let second = codec.feed(&framed("ignored"));

        assert_eq!(first, Err(FramingError::MissingContentLength));
        assert_eq!(second, Err(FramingError::MissingContentLength));
    }

    #[rstest]
    #[case("Content-Length: invalid\r\n\r\ntest", "invalid")]
    #[case("Content-Length: -4\r\n\r\ntest", "-4")]
    #[case("Content-Length: +4\r\n\r\ntest", "+4")]
    #[case("Content-Length:\r\n\r\ntest", "")]
    fn rejects_malformed_content_length(
        mut codec: FrameCodec,
        #[case] input: &str,
        #[case] value: &str,
    ) {
        let result = codec.feed(input.as_bytes());

        assert_eq!(
            result,
            Err(FramingError::InvalidContentLength {
                value: String::from(value)
            })
        );
    }

    #[rstest]
    fn rejects_non_ascii_header(mut codec: FrameCodec) {
        let result = codec.feed("Contént-Length: 2\r\n\r\nok".as_bytes());

        assert_eq!(result, Err(FramingError::InvalidHeader));
    }

    #[rstest]
    fn replaces_invalid_utf8_in_body(mut codec: FrameCodec) {
        let bodies = codec
            .feed(b"Content-Length: 3\r\n\r\na\xffb")
            .expect("feed failed");

        assert_eq!(bodies, vec![String::from("a\u{fffd}b")]);
    }
}
