use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};

use crate::assembler::{Framing, START_BYTE};
use crate::checksum;
use crate::error::{FrameError, Result};

/// Length byte carried by text responses (newline terminated).
pub const TEXT_LENGTH_BYTE: u8 = 0;

/// Terminator appended to every text response.
pub const TERMINATOR: &[u8; 2] = b"\r\n";

/// Largest binary response payload the length byte can describe.
pub const MAX_BINARY_PAYLOAD: usize = u8::MAX as usize;

/// One outgoing response, before envelope encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A line of text, optionally followed by `*` and its decimal XOR checksum.
    Text { text: Bytes, checksum: bool },
    /// A length-prefixed binary payload.
    Binary(Bytes),
}

impl Response {
    /// A text response without checksum.
    pub fn text(text: impl Into<Bytes>) -> Self {
        Self::Text {
            text: text.into(),
            checksum: false,
        }
    }

    /// A binary response.
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::Binary(payload.into())
    }

    /// Set the checksum flag on a text response. Binary responses are unchanged.
    pub fn with_checksum(self, enabled: bool) -> Self {
        match self {
            Self::Text { text, .. } => Self::Text {
                text,
                checksum: enabled,
            },
            binary => binary,
        }
    }

    /// The response body without envelope.
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Text { text, .. } => text.as_ref(),
            Self::Binary(payload) => payload.as_ref(),
        }
    }
}

/// Encode a response into the wire envelope.
///
/// ```text
/// text:   [0x01][0x00][text]["*" checksum]["\r\n"]
/// binary: [0x01][len ][payload]
/// ```
pub fn encode_response(response: &Response, dst: &mut BytesMut) -> Result<()> {
    match response {
        Response::Text { text, checksum } => {
            encode_text(text, *checksum, dst);
            Ok(())
        }
        Response::Binary(payload) => encode_binary(payload, dst),
    }
}

/// Encode a text response.
pub fn encode_text(text: &[u8], include_checksum: bool, dst: &mut BytesMut) {
    dst.reserve(2 + text.len() + 4 + TERMINATOR.len());
    dst.put_u8(START_BYTE);
    dst.put_u8(TEXT_LENGTH_BYTE);
    dst.put_slice(text);
    if include_checksum {
        let mut suffix = String::with_capacity(4);
        let _ = write!(suffix, "*{}", checksum::compute(text));
        dst.put_slice(suffix.as_bytes());
    }
    dst.put_slice(TERMINATOR);
}

/// Encode a binary response. The payload must be 1..=255 bytes long.
pub fn encode_binary(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = u8::try_from(payload.len())
        .ok()
        .filter(|&len| len > 0)
        .ok_or(FrameError::InvalidResponseLength {
            size: payload.len(),
            max: MAX_BINARY_PAYLOAD,
        })?;
    dst.reserve(2 + payload.len());
    dst.put_u8(START_BYTE);
    dst.put_u8(length);
    dst.put_slice(payload);
    Ok(())
}

/// Checksum outcome of a decoded text response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    /// Not checked.
    NotExpected,
    /// Suffix present and matching.
    Valid(u8),
    /// Suffix present and wrong.
    Mismatch { received: u8, computed: u8 },
    /// A checksum was expected but no `*N` suffix was found.
    Missing,
}

/// A response line decoded on the receiving (host) side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseFrame {
    /// Text with terminator and checksum suffix removed.
    Text { text: Bytes, checksum: ChecksumStatus },
    /// Binary payload exactly as framed.
    Binary(Bytes),
}

/// Classify a line reassembled from a response stream.
///
/// Newline-framed lines are text: the trailing `\r\n` (or bare `\n`) is stripped and,
/// when `expect_checksum` is set, the `*N` suffix is split off and verified.
pub fn decode_response(framing: Framing, line: Bytes, expect_checksum: bool) -> ResponseFrame {
    if framing == Framing::Fixed {
        return ResponseFrame::Binary(line);
    }

    let mut end = line.len();
    if line[..end].ends_with(b"\n") {
        end -= 1;
    }
    if line[..end].ends_with(b"\r") {
        end -= 1;
    }
    let body = line.slice(..end);

    if !expect_checksum {
        return ResponseFrame::Text {
            text: body,
            checksum: ChecksumStatus::NotExpected,
        };
    }

    match checksum::split_suffix(&body) {
        Some((text, received)) => {
            let computed = checksum::compute(text);
            let status = if computed == received {
                ChecksumStatus::Valid(received)
            } else {
                ChecksumStatus::Mismatch { received, computed }
            };
            ResponseFrame::Text {
                text: body.slice(..text.len()),
                checksum: status,
            }
        }
        None => ResponseFrame::Text {
            text: body,
            checksum: ChecksumStatus::Missing,
        },
    }
}
