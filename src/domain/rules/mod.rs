// Domain rules - Business logic and policies

use std::path::{Path, PathBuf};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Video containers considered when no extension list is configured
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm", "m4v"];

/// Business rules for cutting a timeline into fixed windows
pub struct SegmentPlanner;

impl SegmentPlanner {
    /// Compute the ordered segments of a source of `total_duration` seconds.
    ///
    /// Sources that fit in a single window produce a `Skip` plan with no
    /// segments. Otherwise window `i` covers
    /// `[i * window, min((i + 1) * window, total_duration))`; boundaries are
    /// derived from the index rather than accumulated, so consecutive
    /// segments share the exact same boundary value.
    pub fn plan(
        source: &SourceVideo,
        total_duration: f64,
        policy: &WindowPolicy,
    ) -> Result<SegmentPlan, DomainError> {
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(DomainError::UnreadableSource {
                path: source.path_str(),
                reason: format!("invalid duration {}", total_duration),
            });
        }

        let window = policy.seconds();
        if total_duration <= window {
            return Ok(SegmentPlan {
                source: source.path.clone(),
                total_duration,
                window_seconds: window,
                decision: PlanDecision::Skip,
                segments: Vec::new(),
            });
        }

        let base_name = source.base_name()?;
        let directory = source.directory();

        let mut segments = Vec::new();
        let mut index = 0usize;
        while (index as f64) * window < total_duration {
            let start = index as f64 * window;
            let end = ((index + 1) as f64 * window).min(total_duration);
            segments.push(Segment {
                source: source.path.clone(),
                index,
                start,
                end,
                output_path: Self::output_path(&directory, &base_name, index),
            });
            index += 1;
        }

        Ok(SegmentPlan {
            source: source.path.clone(),
            total_duration,
            window_seconds: window,
            decision: PlanDecision::Split,
            segments,
        })
    }

    /// `{directory}/{base_name}_part_{index}.mp4`
    pub fn output_path(directory: &Path, base_name: &str, index: usize) -> PathBuf {
        directory.join(Self::output_name(base_name, index))
    }

    pub fn output_name(base_name: &str, index: usize) -> String {
        format!(
            "{}{}{}.{}",
            base_name, SEGMENT_MARKER, index, SEGMENT_EXTENSION
        )
    }

    /// Relate a file found at `segment.output_path` to the segment, given the
    /// provenance tag read from that file.
    pub fn classify_existing(segment: &Segment, found_tag: Option<&str>) -> ExistingOutput {
        let Some(found) = found_tag.and_then(SegmentTag::parse) else {
            return ExistingOutput::Foreign;
        };
        let expected = segment.tag();
        if found == expected {
            ExistingOutput::Current
        } else if found.source == expected.source {
            ExistingOutput::Stale
        } else {
            ExistingOutput::Foreign
        }
    }
}

/// Rules for the short preview clip
pub struct PreviewPlanner;

impl PreviewPlanner {
    /// Preview of the first `min(PREVIEW_SECONDS, total_duration)` seconds,
    /// written next to the source as `{base_name}_compressed.mp4`
    pub fn plan(source: &SourceVideo, total_duration: f64) -> Result<PreviewRequest, DomainError> {
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(DomainError::UnreadableSource {
                path: source.path_str(),
                reason: format!("invalid duration {}", total_duration),
            });
        }

        Ok(PreviewRequest {
            source: source.path.clone(),
            length: total_duration.min(PREVIEW_SECONDS),
            width: PREVIEW_WIDTH,
            output_path: Self::output_path(source)?,
        })
    }

    pub fn output_path(source: &SourceVideo) -> Result<PathBuf, DomainError> {
        Ok(source
            .directory()
            .join(Self::output_name(&source.base_name()?)))
    }

    pub fn output_name(base_name: &str) -> String {
        format!("{}{}.{}", base_name, PREVIEW_MARKER, SEGMENT_EXTENSION)
    }
}

/// Why a file with a video extension is not a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Named like `{base}_part_{N}`
    SegmentOutput,
    /// Named like `{base}_compressed`
    PreviewOutput,
}

/// Rules deciding which directory entries are segmentation candidates
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFilter {
    extensions: Vec<String>,
    exclude_previews: bool,
}

impl SourceFilter {
    /// Create a filter for the given extensions (case-insensitive, no dot)
    pub fn new<I, S>(extensions: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        if extensions.is_empty() {
            return Err(DomainError::BadArgs(
                "At least one video extension must be configured".to_string(),
            ));
        }

        Ok(Self {
            extensions,
            exclude_previews: false,
        })
    }

    /// Also reject files named like previews
    pub fn excluding_previews(mut self) -> Self {
        self.exclude_previews = true;
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether a file should be considered as a source.
    ///
    /// Hidden files (staging files included) and files that already carry a
    /// generated output name are never candidates.
    pub fn accepts(&self, path: &Path) -> bool {
        self.has_video_extension(path) && self.exclusion(path).is_none()
    }

    /// Visible file with one of the configured extensions
    pub fn has_video_extension(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };
        if file_name.starts_with('.') {
            return false;
        }

        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Generated-output name that keeps a file out of discovery
    pub fn exclusion(&self, path: &Path) -> Option<Exclusion> {
        if Self::is_segment_output(path) {
            Some(Exclusion::SegmentOutput)
        } else if self.exclude_previews && Self::is_preview_output(path) {
            Some(Exclusion::PreviewOutput)
        } else {
            None
        }
    }

    /// Whether the file name matches `{base}_part_{digits}.{ext}`
    pub fn is_segment_output(path: &Path) -> bool {
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            return false;
        };
        match stem.rfind(SEGMENT_MARKER) {
            Some(pos) if pos > 0 => {
                let digits = &stem[pos + SEGMENT_MARKER.len()..];
                !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
            }
            _ => false,
        }
    }

    /// Whether the file name matches `{base}_compressed.{ext}`
    pub fn is_preview_output(path: &Path) -> bool {
        path.file_stem()
            .map(|s| s.to_string_lossy())
            .and_then(|stem| stem.strip_suffix(PREVIEW_MARKER).map(|base| !base.is_empty()))
            .unwrap_or(false)
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            exclude_previews: false,
        }
    }
}
