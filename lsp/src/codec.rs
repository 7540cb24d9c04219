//! JSON-RPC framing codec for LSP communication.
//!
//! LSP uses `Content-Length: N\r\n\r\n{json}` framing over stdin/stdout.
//! [`FrameDecoder`] is a sans-IO accumulator fed with whatever chunks the pipe
//! yields; [`FrameWriter`] frames and writes outbound messages.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::SessionError;
use crate::protocol::Message;

/// Maximum frame size (64 MiB) to prevent unbounded memory allocation.
///
/// Outline responses for generated files can be large, so this is well above
/// what a single hand-written source file produces.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

const LENGTH_HEADER: &str = "Content-Length";

/// Encode a message as a complete frame (header block + body).
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    let body = message.to_value().to_string();
    let mut frame = format!("{LENGTH_HEADER}: {}\r\n\r\n", body.len()).into_bytes();
    frame.extend_from_slice(body.as_bytes());
    frame
}

/// Incremental frame decoder.
///
/// Bytes are appended with [`FrameDecoder::feed`], which returns every message
/// whose body has fully arrived. A partial frame stays buffered until the rest
/// of its bytes show up. Malformed header blocks are dropped together with the
/// rest of the buffer; decoding resumes with the next chunk.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes currently buffered (incomplete frame data).
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Message> {
        self.buf.extend_from_slice(chunk);

        let mut messages = Vec::new();
        loop {
            let Some(boundary) = find_subslice(&self.buf, HEADER_TERMINATOR) else {
                break;
            };

            let Some(content_length) = parse_content_length(&self.buf[..boundary]) else {
                tracing::warn!(
                    discarded = self.buf.len(),
                    "Dropping malformed frame header"
                );
                self.buf.clear();
                break;
            };

            if content_length > MAX_FRAME_BYTES {
                tracing::warn!(
                    "Content-Length {content_length} exceeds maximum {MAX_FRAME_BYTES}; dropping buffer"
                );
                self.buf.clear();
                break;
            }

            let body_start = boundary + HEADER_TERMINATOR.len();
            let body_end = body_start + content_length;
            if self.buf.len() < body_end {
                // Body not complete yet.
                break;
            }

            let body = &self.buf[body_start..body_end];
            match serde_json::from_slice::<serde_json::Value>(body) {
                Ok(value) => match Message::from_value(&value) {
                    Some(message) => messages.push(message),
                    None => tracing::trace!("Ignoring non JSON-RPC frame: {value}"),
                },
                Err(e) => tracing::warn!("Dropping frame with invalid JSON body: {e}"),
            }

            self.buf.drain(..body_end);
        }

        messages
    }
}

/// Scan a header block for the `Content-Length` value.
///
/// Lines without a colon (stray process output) and unknown headers are
/// ignored. Returns `None` when no valid length line is present.
fn parse_content_length(header_block: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(header_block);
    text.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        // Header names are case-insensitive.
        if key.trim().eq_ignore_ascii_case(LENGTH_HEADER) {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Writes JSON-RPC frames to an async writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one framed message and flush.
    pub async fn write_message(&mut self, message: &Message) -> Result<(), SessionError> {
        let frame = encode(message);
        self.writer
            .write_all(&frame)
            .await
            .map_err(SessionError::Io)?;
        self.writer.flush().await.map_err(SessionError::Io)?;
        Ok(())
    }
}
