// Ports - Interface definitions (contracts)

use crate::domain::errors::*;
use crate::domain::model::*;
use async_trait::async_trait;

/// Port for media file probing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Total duration of a media file, in seconds
    async fn probe_duration(&self, file_path: &str) -> Result<f64, DomainError>;

    /// Container and primary stream summary
    async fn probe_summary(&self, file_path: &str) -> Result<MediaSummary, DomainError>;

    /// Provenance tag stored in the container metadata, if any
    async fn read_segment_tag(&self, file_path: &str) -> Result<Option<String>, DomainError>;
}

/// Port for segment encoding
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EncodePort: Send + Sync {
    /// Re-encode `segment` of its source into `output_path`.
    ///
    /// The source is opened and closed within the call; no handle on it
    /// outlives the returned future.
    async fn encode_segment(
        &self,
        segment: &Segment,
        output_path: &str,
        settings: &EncodeSettings,
    ) -> Result<EncodedSegment, DomainError>;

    /// Encode the preview described by `request` into `output_path`
    async fn encode_preview(
        &self,
        request: &PreviewRequest,
        output_path: &str,
        settings: &EncodeSettings,
    ) -> Result<EncodedSegment, DomainError>;
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// Check if file exists
    async fn file_exists(&self, file_path: &str) -> Result<bool, DomainError>;

    /// Check if directory exists
    async fn directory_exists(&self, dir_path: &str) -> Result<bool, DomainError>;

    /// Regular files directly inside a directory, sorted by file name
    async fn list_files(&self, dir_path: &str) -> Result<Vec<String>, DomainError>;

    /// Reserve a hidden staging file inside a directory and return its path
    async fn create_staging_file(&self, dir_path: &str) -> Result<String, DomainError>;

    /// Flush a staged file to disk and rename it to its final path
    async fn commit_file(&self, staged: &str, target: &str) -> Result<(), DomainError>;

    /// Delete file
    async fn delete_file(&self, file_path: &str) -> Result<(), DomainError>;

    /// Write a text file, replacing any previous content
    async fn write_text(&self, file_path: &str, content: &str) -> Result<(), DomainError>;
}

/// Port for configuration management
#[async_trait]
pub trait ConfigPort: Send + Sync {
    /// Get configuration value
    async fn get_config(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Set configuration value
    async fn set_config(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Load configuration from file
    async fn load_config(&self, file_path: &str) -> Result<(), DomainError>;

    /// Validate configuration
    async fn validate_config(&self) -> Result<(), DomainError>;

    /// Snapshot of the typed settings
    async fn settings(&self) -> Result<SegmenterSettings, DomainError>;

    /// Get configuration file path
    async fn get_config_file_path(&self) -> Result<Option<String>, DomainError>;
}

/// Typed configuration for a segmentation run
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SegmenterSettings {
    pub window_seconds: f64,
    pub extensions: Vec<String>,
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub threads: usize,
    pub encode_retries: u32,
    pub delete_retries: u32,
    pub retry_delay_ms: u64,
    pub skip_existing: bool,
    pub log_level: String,
    pub log_format: String,
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        let encode = EncodeSettings::default();
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            extensions: crate::domain::rules::DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            video_codec: encode.video_codec,
            crf: encode.crf,
            preset: encode.preset,
            threads: encode.threads,
            encode_retries: 2,
            delete_retries: 3,
            retry_delay_ms: 500,
            skip_existing: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl SegmenterSettings {
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            video_codec: self.video_codec.clone(),
            crf: self.crf,
            preset: self.preset.clone(),
            threads: self.threads,
        }
    }

    pub fn window(&self) -> Result<WindowPolicy, DomainError> {
        WindowPolicy::new(self.window_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            encode_retries: self.encode_retries,
            delete_retries: self.delete_retries,
            delay: std::time::Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Bounded retry budget for transient failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub encode_retries: u32,
    pub delete_retries: u32,
    pub delay: std::time::Duration,
}

/// Port for logging and observability
#[async_trait]
pub trait LogPort: Send + Sync {
    /// Log info message
    async fn info(&self, message: &str);

    /// Log warning message
    async fn warn(&self, message: &str);

    /// Log error message
    async fn error(&self, message: &str);

    /// Log debug message
    async fn debug(&self, message: &str);

    /// Log structured event
    async fn log_event(&self, event: &LogEvent);
}

/// Log event with structured data
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: std::time::SystemTime,
    pub context: std::collections::BTreeMap<String, String>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: std::time::SystemTime::now(),
            context: std::collections::BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
