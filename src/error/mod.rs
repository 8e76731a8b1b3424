// Error types for the voice gender pipeline
//
// This module defines custom error types for audio extraction and the
// training/inference/feedback pipeline, providing structured error handling
// with numeric codes suitable for a boundary layer (HTTP, CLI).

mod extraction;
mod pipeline;

pub use extraction::{log_extraction_error, ExtractionError, ExtractionErrorCodes};
pub use pipeline::{log_pipeline_error, ErrorKind, PipelineError, PipelineErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Convenience alias used throughout the pipeline
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
