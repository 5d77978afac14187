//! Error handling module for the segmenter library

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Top-level error type for library entry points
#[derive(Error, Debug)]
pub enum SegmenterError {
    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInitError { message: String },

    /// Segmentation, probing or configuration error
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Result type alias for segmenter operations
pub type SegmenterResult<T> = std::result::Result<T, SegmenterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_is_transparent() {
        let err: SegmenterError = DomainError::BadArgs("window".to_string()).into();
        assert_eq!(err.to_string(), DomainError::BadArgs("window".to_string()).to_string());
    }
}
