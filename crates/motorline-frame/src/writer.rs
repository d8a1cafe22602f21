use std::io::{self, ErrorKind, Write};

use bytes::BytesMut;

use crate::envelope::{encode_response, Response};
use crate::error::{FrameError, Result};

/// Holds the largest text reply plus its checksum suffix and CRLF.
const SCRATCH_CAPACITY: usize = 128;

/// Writes enveloped responses to a serial port, pipe, or any other `Write`.
///
/// Every response is flushed before the next one is encoded, so a host polling
/// the port sees replies as soon as the command completes.
pub struct ResponseWriter<T> {
    inner: T,
    scratch: BytesMut,
}

impl<T: Write> ResponseWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            scratch: BytesMut::with_capacity(SCRATCH_CAPACITY),
        }
    }

    /// Encode `response` and push it out in full.
    ///
    /// A response that cannot be enveloped is rejected before any byte reaches
    /// the sink.
    pub fn write_response(&mut self, response: &Response) -> Result<()> {
        self.scratch.clear();
        encode_response(response, &mut self.scratch)?;

        let mut rest = &self.scratch[..];
        while !rest.is_empty() {
            let inner = &mut self.inner;
            match retry_interrupted(|| inner.write(rest))? {
                0 => return Err(FrameError::ConnectionClosed),
                n => rest = &rest[n..],
            }
        }
        self.flush()
    }

    /// Write the replies to one command, in order.
    pub fn write_all(&mut self, responses: &[Response]) -> Result<()> {
        responses
            .iter()
            .try_for_each(|response| self.write_response(response))
    }

    pub fn flush(&mut self) -> Result<()> {
        let inner = &mut self.inner;
        retry_interrupted(|| inner.flush())
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn retry_interrupted<R>(mut op: impl FnMut() -> io::Result<R>) -> Result<R> {
    loop {
        match op() {
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            other => return other.map_err(FrameError::Io),
        }
    }
}
