// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::errors::DomainError;

/// Default window length, in seconds
pub const DEFAULT_WINDOW_SECONDS: f64 = 30.0;

/// Container extension of every written segment
pub const SEGMENT_EXTENSION: &str = "mp4";

/// Marker placed between the source base name and the segment index
pub const SEGMENT_MARKER: &str = "_part_";

/// Suffix of the preview written next to a source
pub const PREVIEW_MARKER: &str = "_compressed";

/// Longest preview, in seconds
pub const PREVIEW_SECONDS: f64 = 3.0;

/// Preview frame width; height follows the source aspect ratio
pub const PREVIEW_WIDTH: u32 = 640;

/// Leading field of every segment provenance tag
const SEGMENT_TAG_PREFIX: &str = "segmenter;source=";

/// Fixed segment duration applied uniformly to every source in a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowPolicy {
    window_seconds: f64,
}

impl WindowPolicy {
    /// Create a window policy, rejecting non-positive or non-finite windows
    pub fn new(window_seconds: f64) -> Result<Self, DomainError> {
        if !window_seconds.is_finite() || window_seconds <= 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Window must be a positive number of seconds, got {}",
                window_seconds
            )));
        }
        Ok(Self { window_seconds })
    }

    pub fn seconds(&self) -> f64 {
        self.window_seconds
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
        }
    }
}

impl fmt::Display for WindowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.window_seconds)
    }
}

/// An original, pre-segmentation video file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceVideo {
    pub path: PathBuf,
}

impl SourceVideo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File name without its extension
    pub fn base_name(&self) -> Result<String, DomainError> {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| DomainError::BadArgs(format!("Source has no file name: {}", self)))
    }

    /// Directory that receives the segments
    pub fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// File name used in progress and error messages
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

impl fmt::Display for SourceVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// One output clip covering `[start, end)` of a source's timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub source: PathBuf,
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub output_path: PathBuf,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn output_str(&self) -> String {
        self.output_path.to_string_lossy().to_string()
    }

    /// Provenance written into the segment's container metadata
    pub fn tag(&self) -> SegmentTag {
        let source = self
            .source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.to_string_lossy().to_string());
        SegmentTag {
            source,
            start_ms: to_millis(self.start),
            end_ms: to_millis(self.end),
        }
    }
}

fn to_millis(seconds: f64) -> u64 {
    (seconds * 1000.0).round().max(0.0) as u64
}

/// Which source and range produced a segment file.
///
/// Rendered as `segmenter;source={file name};start_ms={n};end_ms={n}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTag {
    /// Source file name, extension included
    pub source: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl SegmentTag {
    /// Parse a rendered tag. Fields are split from the right so source names
    /// may contain separators.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.trim().strip_prefix(SEGMENT_TAG_PREFIX)?;
        let (rest, end) = rest.rsplit_once(";end_ms=")?;
        let (source, start) = rest.rsplit_once(";start_ms=")?;
        if source.is_empty() {
            return None;
        }
        Some(Self {
            source: source.to_string(),
            start_ms: start.parse().ok()?,
            end_ms: end.parse().ok()?,
        })
    }
}

impl fmt::Display for SegmentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{};start_ms={};end_ms={}",
            SEGMENT_TAG_PREFIX, self.source, self.start_ms, self.end_ms
        )
    }
}

/// How a file already holding a planned segment name relates to that segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingOutput {
    /// Written earlier for this very segment
    Current,
    /// Written for the same source with a different window
    Stale,
    /// Untagged, or written for another source
    Foreign,
}

/// What a plan decided for its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanDecision {
    /// Source fits in one window and is left untouched
    Skip,
    /// Source is split and then removed
    Split,
}

/// Ordered segments for one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPlan {
    pub source: PathBuf,
    pub total_duration: f64,
    pub window_seconds: f64,
    pub decision: PlanDecision,
    pub segments: Vec<Segment>,
}

impl SegmentPlan {
    pub fn is_skip(&self) -> bool {
        self.decision == PlanDecision::Skip
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// Explicit hand-off between discovery and segmentation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkList {
    sources: Vec<SourceVideo>,
}

impl WorkList {
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceVideo> {
        self.sources.iter()
    }
}

impl FromIterator<SourceVideo> for WorkList {
    fn from_iter<I: IntoIterator<Item = SourceVideo>>(iter: I) -> Self {
        Self {
            sources: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for WorkList {
    type Item = SourceVideo;
    type IntoIter = std::vec::IntoIter<SourceVideo>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.into_iter()
    }
}

/// Encoder configuration shared by every segment of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeSettings {
    /// Encoder name, looked up in libav (falls back to the H.264 default)
    pub video_codec: String,
    /// Constant Rate Factor (0-51)
    pub crf: u8,
    /// Encoder speed preset
    pub preset: String,
    /// Encoder thread count, 0 lets libav decide
    pub threads: usize,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 23,
            preset: "medium".to_string(),
            threads: 0,
        }
    }
}

/// Result of encoding one segment
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSegment {
    pub frames: u64,
    pub bytes: u64,
}

/// Summary of a single media file, as shown by `inspect`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaSummary {
    pub path: PathBuf,
    pub format: String,
    pub duration: f64,
    pub video_codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub has_audio: bool,
    /// Provenance tag, present on files this tool wrote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_tag: Option<String>,
}

/// A short, downscaled clip taken from the start of a source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRequest {
    pub source: PathBuf,
    /// Clip length, `min(PREVIEW_SECONDS, source duration)`
    pub length: f64,
    pub width: u32,
    pub output_path: PathBuf,
}

impl PreviewRequest {
    pub fn output_str(&self) -> String {
        self.output_path.to_string_lossy().to_string()
    }
}

/// Per-source outcome of a preview run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreviewOutcome {
    Created { output: PathBuf },
    /// A preview with the target name was already present
    Existing { output: PathBuf },
    Failed { kind: String, message: String },
}

impl PreviewOutcome {
    pub fn failed(error: &DomainError) -> Self {
        PreviewOutcome::Failed {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Report line for one preview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: PreviewOutcome,
}

/// Per-source outcome of a segmentation run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// Duration fits in one window; file untouched
    Skipped,
    /// Every segment is on disk
    Segmented {
        segments: Vec<PathBuf>,
        /// Segments found already complete and not encoded again
        reused: usize,
        original_removed: bool,
        /// Set when removing the original failed
        delete_error: Option<String>,
    },
    /// Source left in place
    Failed { kind: String, message: String },
}

impl SourceOutcome {
    pub fn failed(error: &DomainError) -> Self {
        SourceOutcome::Failed {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Report line for one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub path: PathBuf,
    pub duration: Option<f64>,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

/// Summary of a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub window_seconds: f64,
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn start(policy: &WindowPolicy) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            window_seconds: policy.seconds(),
            sources: Vec::new(),
        }
    }

    pub fn record(&mut self, path: &Path, duration: Option<f64>, outcome: SourceOutcome) {
        self.sources.push(SourceReport {
            path: path.to_path_buf(),
            duration,
            outcome,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn segmented_count(&self) -> usize {
        self.count(|o| matches!(o, SourceOutcome::Segmented { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, SourceOutcome::Skipped))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, SourceOutcome::Failed { .. }))
    }

    /// Sources whose segments were written but whose original is still present
    pub fn delete_failure_count(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                SourceOutcome::Segmented {
                    original_removed: false,
                    ..
                }
            )
        })
    }

    pub fn segments_written(&self) -> usize {
        self.sources
            .iter()
            .map(|s| match &s.outcome {
                SourceOutcome::Segmented { segments, .. } => segments.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn outcome_for(&self, path: &Path) -> Option<&SourceOutcome> {
        self.sources
            .iter()
            .find(|s| s.path == path)
            .map(|s| &s.outcome)
    }

    fn count(&self, predicate: impl Fn(&SourceOutcome) -> bool) -> usize {
        self.sources.iter().filter(|s| predicate(&s.outcome)).count()
    }
}
