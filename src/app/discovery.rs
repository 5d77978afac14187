// Source discovery - Builds the work list from a directory listing

use std::path::Path;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::{Exclusion, SourceFilter};
use crate::ports::{FsPort, LogPort};

/// Video files directly inside `directory`, in file-name order.
///
/// Video files skipped for carrying a generated-output name are logged at
/// info level.
pub async fn discover_sources(
    fs_port: &dyn FsPort,
    log_port: &dyn LogPort,
    filter: &SourceFilter,
    directory: &str,
) -> Result<WorkList, DomainError> {
    if !fs_port.directory_exists(directory).await? {
        return Err(DomainError::FsFail(format!(
            "Directory does not exist: {}",
            directory
        )));
    }

    let mut sources = Vec::new();
    for path in fs_port.list_files(directory).await? {
        let candidate = Path::new(&path);
        if !filter.has_video_extension(candidate) {
            continue;
        }
        match filter.exclusion(candidate) {
            None => sources.push(SourceVideo::new(path)),
            Some(exclusion) => {
                let kind = match exclusion {
                    Exclusion::SegmentOutput => "segment",
                    Exclusion::PreviewOutput => "preview",
                };
                log_port
                    .info(&format!(
                        "Not treating {} as a source: its name marks it as a {} output",
                        path, kind
                    ))
                    .await;
            }
        }
    }

    let work_list: WorkList = sources.into_iter().collect();
    log_port
        .debug(&format!(
            "Discovered {} candidate source(s) in {}",
            work_list.len(),
            directory
        ))
        .await;
    Ok(work_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FsLocalAdapter, TracingLogAdapter};
    use crate::ports::LogEvent;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Log port that keeps info lines
    #[derive(Default)]
    struct RecordingLog {
        info: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LogPort for RecordingLog {
        async fn info(&self, message: &str) {
            self.info.lock().unwrap().push(message.to_string());
        }

        async fn warn(&self, _message: &str) {}

        async fn error(&self, _message: &str) {}

        async fn debug(&self, _message: &str) {}

        async fn log_event(&self, _event: &LogEvent) {}
    }

    fn quiet() -> TracingLogAdapter {
        TracingLogAdapter::with_level(crate::ports::LogLevel::Error)
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in [
            "b.mp4",
            "a.MOV",
            "notes.txt",
            "a_part_0.mp4",
            ".segmenter-x.partial",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let fs = FsLocalAdapter::new().unwrap();
        let work_list = discover_sources(
            &fs,
            &quiet(),
            &SourceFilter::default(),
            dir.path().to_str().unwrap(),
        )
        .await
        .unwrap();

        let names: Vec<String> = work_list.iter().map(|s| s.display_name()).collect();
        assert_eq!(names, vec!["a.MOV", "b.mp4"]);
    }

    #[tokio::test]
    async fn test_discover_logs_excluded_segment_names() {
        let dir = TempDir::new().unwrap();
        for name in ["trip_part_1.mp4", "trip.mp4", "notes_part_1.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let fs = FsLocalAdapter::new().unwrap();
        let log = RecordingLog::default();
        let work_list = discover_sources(
            &fs,
            &log,
            &SourceFilter::default(),
            dir.path().to_str().unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(work_list.len(), 1);
        let info = log.info.lock().unwrap();
        assert_eq!(info.len(), 1);
        assert!(info[0].contains("trip_part_1.mp4"));
        assert!(info[0].contains("segment output"));
    }

    #[tokio::test]
    async fn test_discover_can_exclude_previews() {
        let dir = TempDir::new().unwrap();
        for name in ["clip.mp4", "clip_compressed.mp4"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let fs = FsLocalAdapter::new().unwrap();
        let log = RecordingLog::default();
        let directory = dir.path().to_str().unwrap();

        let all = discover_sources(&fs, &log, &SourceFilter::default(), directory)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let filter = SourceFilter::default().excluding_previews();
        let sources = discover_sources(&fs, &log, &filter, directory).await.unwrap();
        let names: Vec<String> = sources.iter().map(|s| s.display_name()).collect();
        assert_eq!(names, vec!["clip.mp4"]);
        assert!(log.info.lock().unwrap()[0].contains("preview output"));
    }

    #[tokio::test]
    async fn test_discover_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("videos");
        let fs = FsLocalAdapter::new().unwrap();
        let result = discover_sources(
            &fs,
            &quiet(),
            &SourceFilter::default(),
            missing.to_str().unwrap(),
        )
        .await;
        assert!(matches!(result, Err(DomainError::FsFail(_))));
    }
}
