//! Error types for the TMI protocol library.
//!
//! Parsing chat lines never fails: malformed input degrades to defaults or is
//! skipped. The errors here cover framing (the line codec) and the local
//! control-channel frame format.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 bytes in a received line.
    #[error("invalid UTF-8 in line at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
        /// Detailed error message from the UTF-8 decoder.
        details: String,
    },

    /// Line exceeded the maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// A control-channel frame could not be decoded.
    #[error("invalid control frame: {0}")]
    InvalidControl(#[from] ControlParseError),
}

/// Errors encountered when decoding a control-channel frame.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControlParseError {
    /// Frame was empty or whitespace only.
    #[error("empty frame")]
    Empty,

    /// Frame carried a client id but no command.
    #[error("missing command")]
    MissingCommand,

    /// The parameter payload was not valid JSON.
    #[error("invalid params: {0}")]
    InvalidParams(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_too_long_display() {
        let err = ProtocolError::LineTooLong {
            actual: 9000,
            limit: 4096,
        };
        assert_eq!(err.to_string(), "line too long: 9000 bytes (limit: 4096)");
    }

    #[test]
    fn test_control_error_wraps() {
        let err: ProtocolError = ControlParseError::MissingCommand.into();
        assert!(matches!(
            err,
            ProtocolError::InvalidControl(ControlParseError::MissingCommand)
        ));
    }
}
