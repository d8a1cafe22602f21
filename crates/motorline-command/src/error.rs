use std::fmt;

/// Failures decoding a fixed-width binary sub-message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BinaryError {
    /// The message is not exactly the expected size.
    #[error("expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The trailing XOR checksum does not match the message.
    #[error("checksum mismatch (received {received:#04x}, computed {computed:#04x})")]
    ChecksumMismatch { received: u8, computed: u8 },
}

/// The binary sub-message a [`CommandError::Binary`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    /// `C`: per-axis current setpoints.
    DualCurrent,
    /// `P`: coupled theta/gamma setpoints.
    CoupledPosition,
    /// `S`: coupled setpoints with gains.
    CoupledGains,
}

impl BinaryKind {
    /// First line of the two-line failure response.
    pub fn failure_label(self) -> &'static str {
        match self {
            BinaryKind::DualCurrent | BinaryKind::CoupledPosition => {
                "Failed on parse or checksum: "
            }
            BinaryKind::CoupledGains => "Failed to parse coupled command: ",
        }
    }
}

impl fmt::Display for BinaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryKind::DualCurrent => "dual current",
            BinaryKind::CoupledPosition => "coupled position",
            BinaryKind::CoupledGains => "coupled gains",
        };
        f.write_str(name)
    }
}

/// Reasons a line produces an error response instead of an action.
///
/// The `Display` text of every variant except [`CommandError::Binary`] is exactly
/// the response sent back on the wire.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// Too few numeric tokens, or a required token is malformed.
    #[error("invalid command format")]
    Format,

    /// The axis index is outside the device's axes.
    #[error("invalid motor {0}")]
    InvalidAxis(u32),

    /// A binary sub-message failed to decode.
    #[error("failed to parse {kind} command: {source}")]
    Binary {
        kind: BinaryKind,
        #[source]
        source: BinaryError,
    },

    /// No property with that name.
    #[error("invalid property")]
    InvalidProperty,

    /// The property or operation exists but cannot be carried out.
    #[error("not implemented")]
    Unsupported,

    /// The first byte names no command.
    #[error("unknown command")]
    UnknownCommand,
}

/// Failures reported by a property endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// The endpoint cannot be read or written as text.
    #[error("string access not supported")]
    Unsupported,

    /// The text could not be converted to the property's type.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Failures reported by device-side collaborators.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Persisting the configuration failed.
    #[error("configuration persistence failed: {0}")]
    Persistence(String),

    /// An I/O error occurred in the collaborator.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_texts() {
        assert_eq!(CommandError::Format.to_string(), "invalid command format");
        assert_eq!(CommandError::InvalidAxis(9).to_string(), "invalid motor 9");
        assert_eq!(CommandError::InvalidProperty.to_string(), "invalid property");
        assert_eq!(CommandError::Unsupported.to_string(), "not implemented");
        assert_eq!(CommandError::UnknownCommand.to_string(), "unknown command");
    }

    #[test]
    fn binary_error_display() {
        let err = CommandError::Binary {
            kind: BinaryKind::CoupledGains,
            source: BinaryError::LengthMismatch {
                expected: 14,
                actual: 3,
            },
        };
        assert_eq!(
            err.to_string(),
            "failed to parse coupled gains command: expected 14 bytes, got 3"
        );
    }
}
