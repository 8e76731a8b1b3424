// Pipeline error types and constants

use crate::error::{ErrorCode, ExtractionError};
use std::path::{Path, PathBuf};
use tracing::error;

/// Pipeline error code constants
///
/// Error code range: 2001-2008
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// Model, scaler, config, data directory or audio source is missing
    pub const NOT_FOUND: i32 = 2001;

    /// Training data is empty, single-class or otherwise unusable
    pub const INVALID_INPUT: i32 = 2002;

    /// Audio could not be turned into a feature vector
    pub const EXTRACTION_FAILED: i32 = 2003;

    /// Filesystem read/write/copy failed
    pub const IO_FAILED: i32 = 2004;

    /// JSON encoding or decoding failed
    pub const SERIALIZATION_FAILED: i32 = 2005;

    /// Classifier and scaler on disk come from different training runs
    pub const ARTIFACT_MISMATCH: i32 = 2006;

    /// Label id is not a key of the label map
    pub const UNKNOWN_LABEL: i32 = 2007;

    /// Configuration values violate their invariants
    pub const INVALID_CONFIG: i32 = 2008;
}

/// Coarse error taxonomy for boundary layers
///
/// A caller that only needs to pick a response class (not found, bad
/// request, server failure) matches on this instead of the full enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    ExtractionFailure,
    IoFailure,
}

/// Log a pipeline error with structured context
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, kind={:?}, message={}",
        context,
        err.code(),
        err.kind(),
        err.message()
    );
}

/// Training, inference, persistence and feedback errors
///
/// Error code range: 2001-2008
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// A required file or directory does not exist
    #[error("{what} not found at {}", .path.display())]
    NotFound { what: String, path: PathBuf },

    /// Input data cannot be used for the requested operation
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Feature extraction failed for a single file
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Filesystem operation failed
    #[error("I/O failure while {context}: {reason}")]
    Io { context: String, reason: String },

    /// JSON encoding/decoding failed
    #[error("Serialization failure while {context}: {reason}")]
    Serialization { context: String, reason: String },

    /// Classifier and scaler were saved by different training runs
    #[error("Model bundle {model_bundle} does not match scaler bundle {scaler_bundle}")]
    ArtifactMismatch {
        model_bundle: String,
        scaler_bundle: String,
    },

    /// Label id has no entry in the label map
    #[error("Unknown label id {label}")]
    UnknownLabel { label: u32 },

    /// Configuration invariant violated
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl PipelineError {
    pub fn not_found(what: impl Into<String>, path: impl AsRef<Path>) -> Self {
        PipelineError::NotFound {
            what: what.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        PipelineError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, err: std::io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            reason: err.to_string(),
        }
    }

    pub fn serialization(context: impl Into<String>, err: serde_json::Error) -> Self {
        PipelineError::Serialization {
            context: context.into(),
            reason: err.to_string(),
        }
    }

    /// Collapse into the four-way taxonomy used by boundary layers
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::NotFound { .. } => ErrorKind::NotFound,
            PipelineError::Extraction(ExtractionError::SourceMissing { .. }) => {
                ErrorKind::NotFound
            }
            PipelineError::Extraction(_) => ErrorKind::ExtractionFailure,
            PipelineError::InvalidInput { .. }
            | PipelineError::UnknownLabel { .. }
            | PipelineError::InvalidConfig { .. } => ErrorKind::InvalidInput,
            PipelineError::Io { .. }
            | PipelineError::Serialization { .. }
            | PipelineError::ArtifactMismatch { .. } => ErrorKind::IoFailure,
        }
    }
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::NotFound { .. } => PipelineErrorCodes::NOT_FOUND,
            PipelineError::InvalidInput { .. } => PipelineErrorCodes::INVALID_INPUT,
            PipelineError::Extraction(_) => PipelineErrorCodes::EXTRACTION_FAILED,
            PipelineError::Io { .. } => PipelineErrorCodes::IO_FAILED,
            PipelineError::Serialization { .. } => PipelineErrorCodes::SERIALIZATION_FAILED,
            PipelineError::ArtifactMismatch { .. } => PipelineErrorCodes::ARTIFACT_MISMATCH,
            PipelineError::UnknownLabel { .. } => PipelineErrorCodes::UNKNOWN_LABEL,
            PipelineError::InvalidConfig { .. } => PipelineErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}
