// Probe LibAV adapter - Media file analysis using libav

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use std::path::PathBuf;

/// Container metadata key holding a segment's provenance tag
pub const SEGMENT_TAG_KEY: &str = "comment";

/// LibAV-based media probing adapter
pub struct ProbeLibavAdapter;

impl ProbeLibavAdapter {
    /// Create new LibAV probing adapter
    pub fn new() -> Result<Self, DomainError> {
        ffmpeg::init().map_err(|e| {
            DomainError::InternalError(format!("FFmpeg initialization failed: {}", e))
        })?;
        Ok(Self)
    }

    /// Open the file, check its video stream is decodable, and summarise it.
    ///
    /// The input context is dropped before returning.
    fn read_summary(file_path: &str) -> Result<MediaSummary, DomainError> {
        let unreadable = |reason: String| DomainError::UnreadableSource {
            path: file_path.to_string(),
            reason,
        };

        let ictx = ffmpeg::format::input(file_path)
            .map_err(|e| unreadable(format!("failed to open: {}", e)))?;

        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| unreadable("no video stream".to_string()))?;

        let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| unreadable(format!("no usable video decoder: {}", e)))?;

        let container_duration = ictx.duration();
        let duration = if container_duration > 0 {
            container_duration as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
        } else if stream.duration() > 0 {
            stream.duration() as f64 * f64::from(stream.time_base())
        } else {
            return Err(unreadable("duration is unknown".to_string()));
        };

        let rate = stream.avg_frame_rate();
        let frame_rate = if rate.denominator() != 0 && rate.numerator() > 0 {
            f64::from(rate)
        } else {
            0.0
        };

        Ok(MediaSummary {
            path: PathBuf::from(file_path),
            format: ictx.format().name().to_string(),
            duration,
            video_codec: stream.parameters().id().name().to_string(),
            width: decoder.width(),
            height: decoder.height(),
            frame_rate,
            has_audio: ictx.streams().best(ffmpeg::media::Type::Audio).is_some(),
            segment_tag: Self::tag_of(&ictx),
        })
    }

    fn tag_of(ictx: &ffmpeg::format::context::Input) -> Option<String> {
        ictx.metadata()
            .get(SEGMENT_TAG_KEY)
            .filter(|tag| SegmentTag::parse(tag).is_some())
            .map(str::to_string)
    }

    fn read_tag(file_path: &str) -> Result<Option<String>, DomainError> {
        let ictx = ffmpeg::format::input(file_path).map_err(|e| DomainError::UnreadableSource {
            path: file_path.to_string(),
            reason: format!("failed to open: {}", e),
        })?;
        Ok(Self::tag_of(&ictx))
    }

    async fn summary_blocking(file_path: &str) -> Result<MediaSummary, DomainError> {
        let path = file_path.to_string();
        tokio::task::spawn_blocking(move || Self::read_summary(&path))
            .await
            .map_err(|e| DomainError::InternalError(format!("Probe task failed: {}", e)))?
    }
}

#[async_trait]
impl ProbePort for ProbeLibavAdapter {
    async fn probe_duration(&self, file_path: &str) -> Result<f64, DomainError> {
        Ok(Self::summary_blocking(file_path).await?.duration)
    }

    async fn probe_summary(&self, file_path: &str) -> Result<MediaSummary, DomainError> {
        Self::summary_blocking(file_path).await
    }

    async fn read_segment_tag(&self, file_path: &str) -> Result<Option<String>, DomainError> {
        let path = file_path.to_string();
        tokio::task::spawn_blocking(move || Self::read_tag(&path))
            .await
            .map_err(|e| DomainError::InternalError(format!("Probe task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_garbage_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"definitely not a video").unwrap();

        let adapter = ProbeLibavAdapter::new().unwrap();
        let result = adapter.probe_duration(path.to_str().unwrap()).await;

        assert!(matches!(result, Err(DomainError::UnreadableSource { .. })));
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.mp4");

        let adapter = ProbeLibavAdapter::new().unwrap();
        let result = adapter.probe_summary(path.to_str().unwrap()).await;

        assert!(matches!(result, Err(DomainError::UnreadableSource { .. })));
    }

    #[tokio::test]
    async fn test_garbage_file_has_no_readable_tag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip_part_0.mp4");
        std::fs::write(&path, b"segmenter;source=clip.mp4;start_ms=0;end_ms=1").unwrap();

        let adapter = ProbeLibavAdapter::new().unwrap();
        let result = adapter.read_segment_tag(path.to_str().unwrap()).await;

        assert!(!matches!(result, Ok(Some(_))));
    }
}
