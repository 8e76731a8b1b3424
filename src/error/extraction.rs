// Extraction error types and constants

use crate::error::ErrorCode;
use std::path::PathBuf;
use tracing::error;

/// Extraction error code constants
///
/// Single source of truth for the numeric codes reported by
/// [`ExtractionError::code`].
///
/// Error code range: 1001-1005
pub struct ExtractionErrorCodes {}

impl ExtractionErrorCodes {
    /// Audio source file does not exist
    pub const SOURCE_MISSING: i32 = 1001;

    /// Audio file could not be decoded
    pub const DECODE_FAILED: i32 = 1002;

    /// File extension is not a supported audio format
    pub const UNSUPPORTED_FORMAT: i32 = 1003;

    /// Resampler construction or processing failed
    pub const RESAMPLE_FAILED: i32 = 1004;

    /// Decoded audio contained no samples
    pub const EMPTY_SIGNAL: i32 = 1005;
}

/// Log an extraction error with structured context
///
/// Fields: error code, component, message and the caller-supplied context.
pub fn log_extraction_error(err: &ExtractionError, context: &str) {
    error!(
        "Extraction error in {}: code={}, component=FeatureExtractor, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio loading and feature extraction errors
///
/// Error code range: 1001-1005
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    /// Audio source file does not exist
    #[error("Audio file not found: {}", .path.display())]
    SourceMissing { path: PathBuf },

    /// Decoder rejected the file contents
    #[error("Failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    /// Extension is not one of the supported audio formats
    #[error("Unsupported audio format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Resampling to the configured rate failed
    #[error("Failed to resample {}: {reason}", .path.display())]
    Resample { path: PathBuf, reason: String },

    /// File decoded to zero samples
    #[error("Audio file contains no samples: {}", .path.display())]
    EmptySignal { path: PathBuf },
}

impl ExtractionError {
    /// Path of the audio file that failed
    pub fn path(&self) -> &PathBuf {
        match self {
            ExtractionError::SourceMissing { path }
            | ExtractionError::Decode { path, .. }
            | ExtractionError::UnsupportedFormat { path }
            | ExtractionError::Resample { path, .. }
            | ExtractionError::EmptySignal { path } => path,
        }
    }
}

impl ErrorCode for ExtractionError {
    fn code(&self) -> i32 {
        match self {
            ExtractionError::SourceMissing { .. } => ExtractionErrorCodes::SOURCE_MISSING,
            ExtractionError::Decode { .. } => ExtractionErrorCodes::DECODE_FAILED,
            ExtractionError::UnsupportedFormat { .. } => ExtractionErrorCodes::UNSUPPORTED_FORMAT,
            ExtractionError::Resample { .. } => ExtractionErrorCodes::RESAMPLE_FAILED,
            ExtractionError::EmptySignal { .. } => ExtractionErrorCodes::EMPTY_SIGNAL,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_codes() {
        let path = PathBuf::from("a.wav");
        assert_eq!(
            ExtractionError::SourceMissing { path: path.clone() }.code(),
            1001
        );
        assert_eq!(
            ExtractionError::Decode {
                path: path.clone(),
                reason: "bad header".to_string()
            }
            .code(),
            1002
        );
        assert_eq!(
            ExtractionError::UnsupportedFormat { path: path.clone() }.code(),
            1003
        );
        assert_eq!(
            ExtractionError::Resample {
                path: path.clone(),
                reason: "ratio".to_string()
            }
            .code(),
            1004
        );
        assert_eq!(ExtractionError::EmptySignal { path }.code(), 1005);
    }

    #[test]
    fn test_extraction_error_display() {
        let err = ExtractionError::Decode {
            path: PathBuf::from("voice.wav"),
            reason: "bad header".to_string(),
        };
        let text = err.message();
        assert!(text.contains("voice.wav"), "message should name the file: {}", text);
        assert!(text.contains("bad header"));
        assert_eq!(err.path(), &PathBuf::from("voice.wav"));
    }
}
