/// Errors that can occur while assembling lines or writing responses.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The length byte of a frame is not below the maximum line length.
    #[error("frame length out of range ({length} bytes, max {max})")]
    LengthOutOfRange { length: usize, max: usize },

    /// A newline-terminated line did not fit in the line buffer.
    #[error("line exceeds {max} bytes before newline")]
    LineOverflow { max: usize },

    /// A binary response payload length cannot be expressed in the length byte.
    #[error("binary response length {size} outside 1..={max}")]
    InvalidResponseLength { size: usize, max: usize },

    /// An I/O error occurred while reading lines or writing responses.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed (EOF) before another complete line arrived.
    #[error("connection closed (incomplete line)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for errors the assembler recovers from by resynchronizing.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            FrameError::LengthOutOfRange { .. } | FrameError::LineOverflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
