//! Error handling for wavefile
//!
//! Every hard error surfaces at the call that caused it. None of them are
//! retried internally: they come from usage mistakes or from format
//! combinations the engine cannot handle, never from transient I/O.

use thiserror::Error;

use crate::format::FormatCode;

/// Result type alias for wavefile operations
pub type Result<T> = std::result::Result<T, WavefileError>;

/// Main error type for wavefile operations
#[derive(Error, Debug)]
pub enum WavefileError {
    // Session Errors
    #[error("Error opening '{path}': {reason}")]
    Open { path: String, reason: String },

    #[error("Cannot {operation} '{path}': the stream is closed")]
    InvalidState {
        operation: &'static str,
        path: String,
    },

    #[error("Error closing '{path}': {reason}")]
    Close { path: String, reason: String },

    // Buffer Errors
    #[error("Buffer has room for {buffer} channels, wave file has {file} channels")]
    ChannelMismatch { buffer: usize, file: usize },

    #[error("Buffer storage be column-major order. Consider using buffer(size)")]
    BufferLayout,

    #[error("{len} samples do not split into {channels} channels")]
    BufferShape { len: usize, channels: usize },

    // Metadata Errors
    #[error("{0}")]
    UnknownTag(String),

    #[error("Tag '{tag}' rejected: {reason}")]
    TagRejected { tag: &'static str, reason: String },

    // Format Errors
    #[error("{}", .0.value())]
    UnknownFormatCode(FormatCode),

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WavefileError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            WavefileError::Open { .. } => "OPEN_ERROR",
            WavefileError::InvalidState { .. } => "INVALID_STATE",
            WavefileError::Close { .. } => "CLOSE_ERROR",
            WavefileError::ChannelMismatch { .. } => "CHANNEL_MISMATCH",
            WavefileError::BufferLayout => "BUFFER_LAYOUT",
            WavefileError::BufferShape { .. } => "BUFFER_SHAPE",
            WavefileError::UnknownTag(_) => "UNKNOWN_TAG",
            WavefileError::TagRejected { .. } => "TAG_REJECTED",
            WavefileError::UnknownFormatCode(_) => "UNKNOWN_FORMAT_CODE",
            WavefileError::Io(_) => "IO_ERROR",
            WavefileError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the caller can fix this by changing the arguments it passes.
    pub fn is_caller_fixable(&self) -> bool {
        matches!(
            self,
            WavefileError::ChannelMismatch { .. }
                | WavefileError::BufferLayout
                | WavefileError::BufferShape { .. }
                | WavefileError::UnknownTag(_)
                | WavefileError::InvalidState { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = WavefileError::Open {
            path: "test.wav".to_string(),
            reason: "System error.".to_string(),
        };
        assert_eq!(err.error_code(), "OPEN_ERROR");
        assert!(!err.is_caller_fixable());
    }

    #[test]
    fn test_open_message() {
        let err = WavefileError::Open {
            path: "notexisting.wav".to_string(),
            reason: "System error.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error opening 'notexisting.wav': System error."
        );
    }

    #[test]
    fn test_buffer_messages() {
        let err = WavefileError::ChannelMismatch { buffer: 2, file: 4 };
        assert_eq!(
            err.to_string(),
            "Buffer has room for 2 channels, wave file has 4 channels"
        );
        assert!(err.is_caller_fixable());
        assert_eq!(
            WavefileError::BufferLayout.to_string(),
            "Buffer storage be column-major order. Consider using buffer(size)"
        );
    }

    #[test]
    fn test_unknown_format_code_message_is_decimal() {
        let err = WavefileError::UnknownFormatCode(FormatCode::new(0x29));
        assert_eq!(err.to_string(), "41");
    }

    #[test]
    fn test_unknown_tag_carries_name() {
        let err = WavefileError::UnknownTag("illegalAttribute".to_string());
        assert_eq!(err.to_string(), "illegalAttribute");
        assert_eq!(err.error_code(), "UNKNOWN_TAG");
    }
}
