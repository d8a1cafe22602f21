use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::escape::escape_bytes;

/// Marks the start of every frame, in both directions.
pub const START_BYTE: u8 = 0x01;

/// Default line buffer capacity in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 128;

/// Upper bound for `max_line_length`: a one-byte length field can never reach it.
pub const MAX_LINE_LENGTH_LIMIT: usize = 256;

/// Configuration for line assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Line buffer capacity. Length fields at or above this value are rejected,
    /// and newline-terminated lines may not grow past it. Default: 128.
    pub max_line_length: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Where the assembler is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingState {
    /// Discarding bytes until a start byte.
    Idle,
    /// The next byte is the payload length (0 selects newline termination).
    ReadLength,
    /// Collecting a payload of known length.
    ReadFixedPayload { remaining: usize },
    /// Collecting a payload terminated by `\n`.
    ReadUntilNewline,
}

/// How a completed line was delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Length-prefixed payload.
    Fixed,
    /// Payload terminated by (and including) `\n`.
    Newline,
}

/// Running counters kept by a [`FrameAssembler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Lines handed out.
    pub lines: u64,
    /// Frames dropped because of an out-of-range length byte.
    pub resyncs: u64,
    /// Newline-terminated lines dropped because they outgrew the buffer.
    pub overflows: u64,
}

/// Byte-at-a-time state machine that rebuilds command lines from a raw stream.
///
/// Two framings share the stream:
/// ```text
/// [0x01][N > 0][N payload bytes]          fixed length
/// [0x01][0x00][payload ... '\n']          newline terminated
/// ```
/// Bytes outside a frame are dropped. State and the partially filled line survive
/// across calls, so input may be split at any byte boundary.
#[derive(Debug)]
pub struct FrameAssembler {
    state: FramingState,
    buf: BytesMut,
    config: FrameConfig,
    stats: FrameStats,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Create an assembler with the default 128-byte line buffer.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an assembler with explicit configuration.
    ///
    /// `max_line_length` is clamped to `1..=256`.
    pub fn with_config(config: FrameConfig) -> Self {
        let config = FrameConfig {
            max_line_length: config.max_line_length.clamp(1, MAX_LINE_LENGTH_LIMIT),
        };
        Self {
            state: FramingState::Idle,
            buf: BytesMut::with_capacity(config.max_line_length),
            config,
            stats: FrameStats::default(),
        }
    }

    /// Advance the state machine by one byte.
    ///
    /// Returns the completed line when this byte finishes one. Framing errors have
    /// already reset the assembler to [`FramingState::Idle`] when they are returned.
    pub fn push(&mut self, byte: u8) -> Result<Option<Bytes>> {
        Ok(self.push_framed(byte)?.map(|(_, line)| line))
    }

    /// Like [`push`](Self::push), also reporting how the line was delimited.
    pub fn push_framed(&mut self, byte: u8) -> Result<Option<(Framing, Bytes)>> {
        let max = self.config.max_line_length;
        match self.state {
            FramingState::Idle => {
                if byte == START_BYTE {
                    self.state = FramingState::ReadLength;
                }
                Ok(None)
            }
            FramingState::ReadLength => {
                let length = usize::from(byte);
                if length >= max {
                    self.state = FramingState::Idle;
                    self.stats.resyncs += 1;
                    return Err(FrameError::LengthOutOfRange { length, max });
                }
                self.state = if length == 0 {
                    FramingState::ReadUntilNewline
                } else {
                    FramingState::ReadFixedPayload { remaining: length }
                };
                Ok(None)
            }
            FramingState::ReadFixedPayload { remaining } => {
                self.buf.put_u8(byte);
                if remaining <= 1 {
                    return Ok(Some((Framing::Fixed, self.complete())));
                }
                self.state = FramingState::ReadFixedPayload {
                    remaining: remaining - 1,
                };
                Ok(None)
            }
            FramingState::ReadUntilNewline => {
                if self.buf.len() >= max {
                    self.reset();
                    self.stats.overflows += 1;
                    return Err(FrameError::LineOverflow { max });
                }
                self.buf.put_u8(byte);
                if byte == b'\n' {
                    return Ok(Some((Framing::Newline, self.complete())));
                }
                Ok(None)
            }
        }
    }

    /// Feed a chunk and collect every line it completes, in order.
    ///
    /// Framing errors are logged and otherwise ignored; the assembler has already
    /// resynchronized when they occur.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Bytes> {
        self.feed_framed(bytes)
            .into_iter()
            .map(|(_, line)| line)
            .collect()
    }

    /// Like [`feed`](Self::feed), also reporting how each line was delimited.
    pub fn feed_framed(&mut self, bytes: &[u8]) -> Vec<(Framing, Bytes)> {
        let mut lines = Vec::new();
        for &byte in bytes {
            match self.push_framed(byte) {
                Ok(Some((framing, line))) => {
                    tracing::trace!(len = line.len(), line = %escape_bytes(&line), "line assembled");
                    lines.push((framing, line));
                }
                Ok(None) => {}
                Err(err @ FrameError::LineOverflow { .. }) => {
                    tracing::warn!(error = %err, "dropping oversized line");
                }
                Err(err) => {
                    tracing::debug!(error = %err, "resynchronizing on start byte");
                }
            }
        }
        lines
    }

    /// Drop any partial line and return to [`FramingState::Idle`].
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = FramingState::Idle;
    }

    /// Current state machine position.
    pub fn state(&self) -> FramingState {
        self.state
    }

    /// Bytes buffered for the line in progress.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Counters since construction.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Effective configuration (after clamping).
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn complete(&mut self) -> Bytes {
        let line = Bytes::copy_from_slice(&self.buf);
        self.buf.clear();
        self.state = FramingState::Idle;
        self.stats.lines += 1;
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(payload: &[u8]) -> Vec<u8> {
        let mut wire = vec![START_BYTE, payload.len() as u8];
        wire.extend_from_slice(payload);
        wire
    }

    fn text(line: &str) -> Vec<u8> {
        let mut wire = vec![START_BYTE, 0];
        wire.extend_from_slice(line.as_bytes());
        wire
    }

    #[test]
    fn assembles_fixed_length_frame() {
        let mut asm = FrameAssembler::new();
        let lines = asm.feed(&fixed(b"hello"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref(), b"hello");
        assert_eq!(asm.state(), FramingState::Idle);
        assert_eq!(asm.buffered(), 0);
    }

    #[test]
    fn assembles_newline_frame_including_terminator() {
        let mut asm = FrameAssembler::new();
        let lines = asm.feed(&text("p 0 1.5\n"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref(), b"p 0 1.5\n");
    }

    #[test]
    fn survives_byte_at_a_time_delivery() {
        let mut wire = fixed(b"S0123456789abc");
        wire.extend(text("f 1\n"));

        let mut asm = FrameAssembler::new();
        let mut lines = Vec::new();
        for byte in wire {
            lines.extend(asm.feed(&[byte]));
        }

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].as_ref(), b"S0123456789abc");
        assert_eq!(lines[1].as_ref(), b"f 1\n");
    }

    #[test]
    fn survives_arbitrary_chunk_splits() {
        let mut wire = text("v 0 2.0\n");
        wire.extend(fixed(b"abc"));
        wire.extend(text("h\n"));

        for split in 0..=wire.len() {
            let mut asm = FrameAssembler::new();
            let mut lines = asm.feed(&wire[..split]);
            lines.extend(asm.feed(&wire[split..]));
            let got: Vec<&[u8]> = lines.iter().map(|l| l.as_ref()).collect();
            assert_eq!(
                got,
                vec![&b"v 0 2.0\n"[..], &b"abc"[..], &b"h\n"[..]],
                "split at {split}"
            );
        }
    }

    #[test]
    fn parses_back_to_back_frames_in_one_chunk() {
        let mut wire = Vec::new();
        for i in 0..5u8 {
            wire.extend(fixed(&[b'x', b'0' + i]));
        }
        let lines = FrameAssembler::new().feed(&wire);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4].as_ref(), b"x4");
    }

    #[test]
    fn discards_bytes_between_frames() {
        let mut wire = b"garbage\n\xff".to_vec();
        wire.extend(text("i\n"));
        wire.extend_from_slice(b"more noise");
        let lines = FrameAssembler::new().feed(&wire);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref(), b"i\n");
    }

    #[test]
    fn rejects_length_at_or_above_max() {
        for length in [128u8, 129, 200, 255] {
            let mut asm = FrameAssembler::new();
            asm.push(START_BYTE).unwrap();
            let err = asm.push(length).unwrap_err();
            assert!(matches!(err, FrameError::LengthOutOfRange { .. }));
            assert!(err.is_framing());
            assert_eq!(asm.state(), FramingState::Idle);
            assert_eq!(asm.stats().resyncs, 1);
        }
    }

    #[test]
    fn resynchronizes_after_bad_length() {
        let mut wire = vec![START_BYTE, 200, b'j', b'u', b'n', b'k'];
        wire.extend(fixed(b"ok"));
        let mut asm = FrameAssembler::new();
        let lines = asm.feed(&wire);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref(), b"ok");
        assert_eq!(asm.stats().resyncs, 1);
    }

    #[test]
    fn largest_accepted_fixed_length_is_max_minus_one() {
        let payload = vec![b'a'; DEFAULT_MAX_LINE_LENGTH - 1];
        let lines = FrameAssembler::new().feed(&fixed(&payload));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), DEFAULT_MAX_LINE_LENGTH - 1);
    }

    #[test]
    fn newline_line_overflow_resets_to_idle() {
        let mut asm = FrameAssembler::new();
        let mut wire = vec![START_BYTE, 0];
        wire.extend(std::iter::repeat(b'a').take(DEFAULT_MAX_LINE_LENGTH));
        assert!(asm.feed(&wire).is_empty());
        assert_eq!(asm.buffered(), DEFAULT_MAX_LINE_LENGTH);

        let err = asm.push(b'a').unwrap_err();
        assert!(matches!(err, FrameError::LineOverflow { max: 128 }));
        assert_eq!(asm.state(), FramingState::Idle);
        assert_eq!(asm.buffered(), 0);
        assert_eq!(asm.stats().overflows, 1);

        // The rest of the runaway line is ignored until the next start byte.
        let mut rest = b"aaaa\n".to_vec();
        rest.extend(text("u 0\n"));
        let lines = asm.feed(&rest);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref(), b"u 0\n");
    }

    #[test]
    fn newline_line_may_fill_buffer_exactly() {
        let mut line = vec![b'r'; DEFAULT_MAX_LINE_LENGTH - 1];
        line.push(b'\n');
        let mut wire = vec![START_BYTE, 0];
        wire.extend_from_slice(&line);
        let lines = FrameAssembler::new().feed(&wire);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), DEFAULT_MAX_LINE_LENGTH);
    }

    #[test]
    fn start_byte_inside_payload_is_data() {
        let lines = FrameAssembler::new().feed(&fixed(&[START_BYTE, 0, START_BYTE]));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref(), &[START_BYTE, 0, START_BYTE]);
    }

    #[test]
    fn config_is_clamped() {
        let asm = FrameAssembler::with_config(FrameConfig {
            max_line_length: 4096,
        });
        assert_eq!(asm.config().max_line_length, MAX_LINE_LENGTH_LIMIT);

        let asm = FrameAssembler::with_config(FrameConfig { max_line_length: 0 });
        assert_eq!(asm.config().max_line_length, 1);
    }

    #[test]
    fn reset_drops_partial_line() {
        let mut asm = FrameAssembler::new();
        asm.feed(&[START_BYTE, 0, b'p', b' ']);
        assert_eq!(asm.state(), FramingState::ReadUntilNewline);
        asm.reset();
        assert_eq!(asm.state(), FramingState::Idle);
        assert!(asm.feed(b"0 1\n").is_empty());
    }

    #[test]
    fn reports_framing_of_each_line() {
        let mut wire = text("h\n");
        wire.extend(fixed(b"P\n"));
        let lines = FrameAssembler::new().feed_framed(&wire);
        assert_eq!(lines[0].0, Framing::Newline);
        assert_eq!(lines[1].0, Framing::Fixed);
        assert_eq!(lines[1].1.as_ref(), b"P\n");
    }

    #[test]
    fn counts_lines() {
        let mut asm = FrameAssembler::new();
        asm.feed(&text("h\n"));
        asm.feed(&fixed(b"x"));
        assert_eq!(asm.stats().lines, 2);
    }
}
