//! Human-readable command protocol for embedded motor controllers.
//!
//! A single serial stream carries newline-terminated text commands and
//! length-prefixed binary sub-messages. This crate bundles the pieces:
//!
//! - [`frame`]: resumable line assembly, checksums, and response envelopes
//! - [`command`]: command parsing, binary sub-messages, and dispatch to a device
//!
//! ```
//! use motorline::frame::FrameAssembler;
//!
//! let mut assembler = FrameAssembler::new();
//! let lines = assembler.feed(b"\x01\x00f 0\n\x01\x03u 1");
//! assert_eq!(lines.len(), 2);
//! assert_eq!(lines[1].as_ref(), b"u 1");
//! ```

/// Re-export frame types.
pub mod frame {
    pub use motorline_frame::*;
}

/// Re-export command types.
pub mod command {
    pub use motorline_command::*;
}
