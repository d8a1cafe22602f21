//! Resumable framing for the motorline ASCII motor-control protocol.
//!
//! Incoming bytes share two framings behind a common start byte (`0x01`):
//! - a length byte `N > 0` followed by exactly `N` payload bytes
//! - a length byte of `0` followed by a payload terminated by `\n`
//!
//! [`FrameAssembler`] rebuilds lines from arbitrarily fragmented input and
//! resynchronizes on corrupt length fields. Responses go back out through
//! [`encode_response`], optionally carrying a decimal XOR checksum.

pub mod assembler;
pub mod checksum;
#[cfg(feature = "async")]
pub mod codec;
pub mod envelope;
pub mod error;
pub mod escape;
pub mod reader;
pub mod text;
pub mod writer;

pub use assembler::{
    FrameAssembler, FrameConfig, FrameStats, Framing, FramingState, DEFAULT_MAX_LINE_LENGTH,
    MAX_LINE_LENGTH_LIMIT, START_BYTE,
};
#[cfg(feature = "async")]
pub use codec::LineCodec;
pub use envelope::{
    decode_response, encode_binary, encode_response, encode_text, ChecksumStatus, Response,
    ResponseFrame, MAX_BINARY_PAYLOAD, TERMINATOR, TEXT_LENGTH_BYTE,
};
pub use error::{FrameError, Result};
pub use escape::escape_bytes;
pub use reader::LineReader;
pub use text::{BoundedText, RESPONSE_CAPACITY};
pub use writer::ResponseWriter;
