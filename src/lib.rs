//! Segmenter library
//!
//! Splits every video in a directory that is longer than a fixed window into
//! consecutive re-encoded clips, and removes each original once all of its
//! clips are safely on disk.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{RunReport, Segment, SegmentPlan, SourceOutcome, WindowPolicy, WorkList};
pub use error::{SegmenterError, SegmenterResult};

/// Initialize the segmenter library
pub fn init() -> SegmenterResult<()> {
    ffmpeg_next::init().map_err(|e| SegmenterError::FFmpegInitError {
        message: e.to_string(),
    })?;

    Ok(())
}
