use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use bytes::Bytes;

use crate::assembler::{FrameAssembler, FrameConfig, FrameStats, Framing};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 256;

/// Reads complete lines from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete lines. Bytes read
/// past the end of a line are kept for the next call.
pub struct LineReader<T> {
    inner: T,
    assembler: FrameAssembler,
    pending: VecDeque<(Framing, Bytes)>,
}

impl<T: Read> LineReader<T> {
    /// Reader with a 128-byte line buffer.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            assembler: FrameAssembler::with_config(config),
            pending: VecDeque::new(),
        }
    }

    /// Block until the next line is complete.
    ///
    /// EOF, including EOF in the middle of a line, is `FrameError::ConnectionClosed`.
    pub fn read_line(&mut self) -> Result<Bytes> {
        self.read_framed().map(|(_, line)| line)
    }

    /// Like [`read_line`](Self::read_line), also reporting how the line was framed.
    pub fn read_framed(&mut self) -> Result<(Framing, Bytes)> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(line);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.pending
                .extend(self.assembler.feed_framed(&chunk[..read]));
        }
    }

    /// Counters of the underlying assembler.
    pub fn stats(&self) -> FrameStats {
        self.assembler.stats()
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unread bytes past the last complete line are lost.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
