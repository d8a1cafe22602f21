use std::fmt;

use bytes::Bytes;

/// Default response text capacity in bytes.
pub const RESPONSE_CAPACITY: usize = 64;

/// Fixed-capacity response text that truncates instead of growing.
///
/// Implements [`fmt::Write`], so `write!` can render into it; anything past the
/// capacity is dropped and [`is_truncated`](Self::is_truncated) turns true.
#[derive(Clone, PartialEq, Eq)]
pub struct BoundedText {
    buf: Vec<u8>,
    capacity: usize,
    truncated: bool,
}

impl Default for BoundedText {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundedText {
    /// Empty text with the default 64-byte capacity.
    pub fn new() -> Self {
        Self::with_capacity(RESPONSE_CAPACITY)
    }

    /// Empty text holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            truncated: false,
        }
    }

    /// Text initialized from `bytes`, truncated to `capacity`.
    pub fn from_bytes(bytes: &[u8], capacity: usize) -> Self {
        let mut text = Self::with_capacity(capacity);
        text.push_bytes(bytes);
        text
    }

    /// Append as much of `bytes` as fits. Returns false if anything was dropped.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> bool {
        let room = self.capacity - self.buf.len();
        let take = bytes.len().min(room);
        self.buf.extend_from_slice(&bytes[..take]);
        if take < bytes.len() {
            self.truncated = true;
        }
        !self.truncated
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once any write has been cut short.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.buf)
    }
}

impl fmt::Write for BoundedText {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes());
        Ok(())
    }
}

impl fmt::Debug for BoundedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedText")
            .field("text", &String::from_utf8_lossy(&self.buf))
            .field("capacity", &self.capacity)
            .field("truncated", &self.truncated)
            .finish()
    }
}
