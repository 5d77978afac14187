// TOML config adapter - Configuration management using TOML files

use crate::domain::errors::*;
use crate::domain::rules::SourceFilter;
use crate::ports::*;
use crate::utils::logging::LogFormat;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Table holding the segmenter keys in a config file
pub const CONFIG_SECTION: &str = "segmenter";

/// TOML configuration adapter
pub struct TomlConfigAdapter {
    settings: RwLock<SegmenterSettings>,
    config_file_path: RwLock<Option<PathBuf>>,
}

impl TomlConfigAdapter {
    /// Create new TOML config adapter holding the defaults
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self::with_settings(SegmenterSettings::default()))
    }

    pub fn with_settings(settings: SegmenterSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            config_file_path: RwLock::new(None),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SegmenterSettings>, DomainError> {
        self.settings
            .read()
            .map_err(|_| DomainError::InternalError("configuration lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SegmenterSettings>, DomainError> {
        self.settings
            .write()
            .map_err(|_| DomainError::InternalError("configuration lock poisoned".to_string()))
    }

    /// Overlay the `[segmenter]` table of a TOML document on the current settings
    fn merge_toml(&self, toml_content: &str) -> Result<(), DomainError> {
        let parsed: toml::Value = toml::from_str(toml_content)
            .map_err(|e| DomainError::ConfigFail(format!("Failed to parse TOML config: {}", e)))?;

        let Some(section) = parsed.get(CONFIG_SECTION) else {
            return Ok(());
        };
        let overlay = section.as_table().ok_or_else(|| {
            DomainError::ConfigFail(format!("[{}] must be a table", CONFIG_SECTION))
        })?;

        let mut settings = self.write()?;
        let mut merged = toml::Value::try_from(&*settings)
            .map_err(|e| DomainError::InternalError(format!("Failed to encode settings: {}", e)))?;
        if let Some(base) = merged.as_table_mut() {
            for (key, value) in overlay {
                if !base.contains_key(key) {
                    return Err(DomainError::ConfigFail(format!(
                        "Unknown configuration key: {}",
                        key
                    )));
                }
                base.insert(key.clone(), value.clone());
            }
        }

        *settings = merged
            .try_into()
            .map_err(|e| DomainError::ConfigFail(format!("Invalid configuration: {}", e)))?;
        Ok(())
    }

    fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DomainError>
    where
        T::Err: std::fmt::Display,
    {
        value.trim().parse::<T>().map_err(|e| {
            DomainError::ConfigFail(format!("Invalid value for {}: {} ({})", key, value, e))
        })
    }

    fn render(value: &toml::Value) -> String {
        match value {
            toml::Value::String(s) => s.clone(),
            toml::Value::Array(items) => items
                .iter()
                .map(Self::render)
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl ConfigPort for TomlConfigAdapter {
    async fn get_config(&self, key: &str) -> Result<Option<String>, DomainError> {
        let settings = self.read()?;
        let value = toml::Value::try_from(&*settings)
            .map_err(|e| DomainError::InternalError(format!("Failed to encode settings: {}", e)))?;
        Ok(value.get(key).map(Self::render))
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut settings = self.write()?;
        match key {
            "window_seconds" => settings.window_seconds = Self::parse(key, value)?,
            "extensions" => {
                settings.extensions = value
                    .split(',')
                    .map(|ext| ext.trim().to_string())
                    .filter(|ext| !ext.is_empty())
                    .collect()
            }
            "video_codec" => settings.video_codec = value.trim().to_string(),
            "crf" => settings.crf = Self::parse(key, value)?,
            "preset" => settings.preset = value.trim().to_string(),
            "threads" => settings.threads = Self::parse(key, value)?,
            "encode_retries" => settings.encode_retries = Self::parse(key, value)?,
            "delete_retries" => settings.delete_retries = Self::parse(key, value)?,
            "retry_delay_ms" => settings.retry_delay_ms = Self::parse(key, value)?,
            "skip_existing" => settings.skip_existing = Self::parse(key, value)?,
            "log_level" => settings.log_level = value.trim().to_lowercase(),
            "log_format" => settings.log_format = value.trim().to_lowercase(),
            _ => {
                return Err(DomainError::ConfigFail(format!(
                    "Unknown configuration key: {}",
                    key
                )))
            }
        }
        tracing::debug!("Set config {} = {}", key, value);
        Ok(())
    }

    async fn load_config(&self, file_path: &str) -> Result<(), DomainError> {
        let path = PathBuf::from(file_path);
        if !path.is_file() {
            return Err(DomainError::ConfigFail(format!(
                "Config file does not exist: {}",
                file_path
            )));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| DomainError::ConfigFail(format!("Failed to read config file: {}", e)))?;
        self.merge_toml(&content)?;

        let mut config_path = self
            .config_file_path
            .write()
            .map_err(|_| DomainError::InternalError("configuration lock poisoned".to_string()))?;
        *config_path = Some(path);
        Ok(())
    }

    async fn validate_config(&self) -> Result<(), DomainError> {
        let settings = self.read()?;

        settings.window()?;
        SourceFilter::new(&settings.extensions)?;
        LogLevel::parse(&settings.log_level)?;
        LogFormat::parse(&settings.log_format)?;

        if settings.crf > 51 {
            return Err(DomainError::BadArgs(format!(
                "CRF value {} is invalid (must be 0-51)",
                settings.crf
            )));
        }
        if settings.video_codec.trim().is_empty() {
            return Err(DomainError::BadArgs("Video codec cannot be empty".to_string()));
        }

        Ok(())
    }

    async fn settings(&self) -> Result<SegmenterSettings, DomainError> {
        Ok(self.read()?.clone())
    }

    async fn get_config_file_path(&self) -> Result<Option<String>, DomainError> {
        let config_path = self
            .config_file_path
            .read()
            .map_err(|_| DomainError::InternalError("configuration lock poisoned".to_string()))?;
        Ok(config_path
            .as_ref()
            .map(|path| path.to_string_lossy().to_string()))
    }
}
