// Domain errors - Error types for the domain layer

use thiserror::Error;

/// Domain-specific error types
///
/// Every variant is local to a single source file: the batch interactors
/// record the error against that source and move on to the next one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// Source is present but cannot be decoded
    #[error("Unreadable source {path}: {reason}")]
    UnreadableSource { path: String, reason: String },

    /// A segment failed to encode or to be written
    #[error("Failed to encode segment {index} of {path}: {reason}")]
    EncodeFailure {
        path: String,
        index: usize,
        reason: String,
    },

    /// All segments were written but the original could not be removed
    #[error("Failed to delete original {path}: {reason}")]
    DeleteFailure { path: String, reason: String },

    /// A planned output name is already held by another source or an unrelated file
    #[error("Output {output} for {path} is taken: {reason}")]
    OutputConflict {
        path: String,
        output: String,
        reason: String,
    },

    /// Filesystem operation failed
    #[error("Filesystem error: {0}")]
    FsFail(String),

    /// Configuration could not be loaded or validated
    #[error("Configuration error: {0}")]
    ConfigFail(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Short machine-readable name, used in run reports
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::BadArgs(_) => "bad_args",
            DomainError::UnreadableSource { .. } => "unreadable_source",
            DomainError::EncodeFailure { .. } => "encode_failure",
            DomainError::DeleteFailure { .. } => "delete_failure",
            DomainError::OutputConflict { .. } => "output_conflict",
            DomainError::FsFail(_) => "fs_fail",
            DomainError::ConfigFail(_) => "config_fail",
            DomainError::InternalError(_) => "internal_error",
        }
    }

    /// Whether another attempt of the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::EncodeFailure { .. } | DomainError::DeleteFailure { .. }
        )
    }
}
