// Local filesystem adapter - File system operations for the segmenter

use crate::domain::errors::*;
use crate::ports::*;
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Prefix of staging files; hidden so directory discovery never picks them up
pub const STAGING_PREFIX: &str = ".segmenter-";

/// Local filesystem adapter
pub struct FsLocalAdapter;

impl FsLocalAdapter {
    /// Create new local filesystem adapter
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self)
    }

    /// Persist the directory entry of a rename
    #[cfg(unix)]
    fn sync_directory(dir: &Path) -> Result<(), DomainError> {
        fs::File::open(dir)
            .and_then(|handle| handle.sync_all())
            .map_err(|e| {
                DomainError::FsFail(format!("Failed to sync directory {}: {}", dir.display(), e))
            })
    }

    #[cfg(not(unix))]
    fn sync_directory(_dir: &Path) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
impl FsPort for FsLocalAdapter {
    async fn file_exists(&self, file_path: &str) -> Result<bool, DomainError> {
        Ok(Path::new(file_path).is_file())
    }

    async fn directory_exists(&self, dir_path: &str) -> Result<bool, DomainError> {
        Ok(Path::new(dir_path).is_dir())
    }

    async fn list_files(&self, dir_path: &str) -> Result<Vec<String>, DomainError> {
        if !Path::new(dir_path).is_dir() {
            return Err(DomainError::FsFail(format!(
                "Directory does not exist: {}",
                dir_path
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                DomainError::FsFail(format!("Failed to list directory {}: {}", dir_path, e))
            })?;
            if entry.file_type().is_file() {
                files.push(entry.path().to_string_lossy().to_string());
            }
        }

        Ok(files)
    }

    async fn create_staging_file(&self, dir_path: &str) -> Result<String, DomainError> {
        let staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".partial")
            .tempfile_in(dir_path)
            .map_err(|e| DomainError::FsFail(format!("Failed to create staging file: {}", e)))?
            .into_temp_path()
            .keep()
            .map_err(|e| DomainError::FsFail(format!("Failed to keep staging file: {}", e)))?;

        Ok(staged.to_string_lossy().to_string())
    }

    async fn commit_file(&self, staged: &str, target: &str) -> Result<(), DomainError> {
        fs::File::open(staged)
            .and_then(|handle| handle.sync_all())
            .map_err(|e| DomainError::FsFail(format!("Failed to flush {}: {}", staged, e)))?;

        fs::rename(staged, target).map_err(|e| {
            DomainError::FsFail(format!(
                "Failed to move file from {} to {}: {}",
                staged, target, e
            ))
        })?;

        match Path::new(target).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Self::sync_directory(parent),
            _ => Ok(()),
        }
    }

    async fn delete_file(&self, file_path: &str) -> Result<(), DomainError> {
        fs::remove_file(file_path)
            .map_err(|e| DomainError::FsFail(format!("Failed to delete file {}: {}", file_path, e)))
    }

    async fn write_text(&self, file_path: &str, content: &str) -> Result<(), DomainError> {
        if let Some(parent) = Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    DomainError::FsFail(format!("Failed to create directory: {}", e))
                })?;
            }
        }
        fs::write(file_path, content)
            .map_err(|e| DomainError::FsFail(format!("Failed to write {}: {}", file_path, e)))
    }
}
