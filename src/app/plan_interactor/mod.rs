// Plan interactor - Read-only planning and inspection use cases

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::app::discovery::discover_sources;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Planned work for one discovered source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedSource {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<SegmentPlan>,
    /// Set when the source could not be probed or planned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlannedSource {
    pub fn segment_count(&self) -> usize {
        self.plan.as_ref().map_or(0, SegmentPlan::segment_count)
    }
}

/// Interactor for dry-run planning and media inspection
pub struct PlanInteractor {
    probe_port: Arc<dyn ProbePort>,
    fs_port: Arc<dyn FsPort>,
    config_port: Arc<dyn ConfigPort>,
    log_port: Arc<dyn LogPort>,
}

impl PlanInteractor {
    /// Create new plan interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        fs_port: Arc<dyn FsPort>,
        config_port: Arc<dyn ConfigPort>,
        log_port: Arc<dyn LogPort>,
    ) -> Self {
        Self {
            probe_port,
            fs_port,
            config_port,
            log_port,
        }
    }

    /// Plan every candidate of a directory without writing or deleting anything
    pub async fn plan_all(
        &self,
        directory: &str,
        policy: &WindowPolicy,
    ) -> Result<Vec<PlannedSource>, DomainError> {
        let settings = self.config_port.settings().await?;
        let filter = SourceFilter::new(&settings.extensions)?;
        let work_list = discover_sources(
            self.fs_port.as_ref(),
            self.log_port.as_ref(),
            &filter,
            directory,
        )
        .await?;

        let mut planned = Vec::with_capacity(work_list.len());
        for source in work_list {
            let result = match self.probe_port.probe_duration(&source.path_str()).await {
                Ok(duration) => SegmentPlanner::plan(&source, duration, policy),
                Err(e) => Err(e),
            };

            let entry = match result {
                Ok(plan) => PlannedSource {
                    path: source.path,
                    plan: Some(plan),
                    error: None,
                },
                Err(e) => {
                    self.log_port
                        .warn(&format!("Cannot plan {}: {}", source.display_name(), e))
                        .await;
                    PlannedSource {
                        path: source.path,
                        plan: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            planned.push(entry);
        }

        self.log_port
            .debug(&format!("Planned {} source(s) in {}", planned.len(), directory))
            .await;
        Ok(planned)
    }

    /// Media summary of one file
    pub async fn inspect(&self, file_path: &str) -> Result<MediaSummary, DomainError> {
        if !self.fs_port.file_exists(file_path).await? {
            return Err(DomainError::FsFail(format!(
                "Input file does not exist: {}",
                file_path
            )));
        }

        self.log_port
            .info(&format!("Inspecting media file: {}", file_path))
            .await;
        self.probe_port.probe_summary(file_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FsLocalAdapter, TomlConfigAdapter, TracingLogAdapter};
    use tempfile::TempDir;

    fn interactor(probe: MockProbePort) -> PlanInteractor {
        PlanInteractor::new(
            Arc::new(probe),
            Arc::new(FsLocalAdapter::new().unwrap()),
            Arc::new(TomlConfigAdapter::new().unwrap()),
            Arc::new(TracingLogAdapter::with_level(LogLevel::Error)),
        )
    }

    #[tokio::test]
    async fn test_plan_all_writes_nothing() {
        let dir = TempDir::new().unwrap();
        for name in ["long.mp4", "short.mp4", "broken.mp4", "readme.md"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let mut probe = MockProbePort::new();
        probe.expect_probe_duration().returning(|path| {
            if path.ends_with("long.mp4") {
                Ok(75.0)
            } else if path.ends_with("short.mp4") {
                Ok(12.0)
            } else {
                Err(DomainError::UnreadableSource {
                    path: path.to_string(),
                    reason: "moov atom not found".to_string(),
                })
            }
        });

        let planned = interactor(probe)
            .plan_all(dir.path().to_str().unwrap(), &WindowPolicy::default())
            .await
            .unwrap();

        let summary: Vec<(String, usize, bool)> = planned
            .iter()
            .map(|p| {
                (
                    p.path.file_name().unwrap().to_string_lossy().to_string(),
                    p.segment_count(),
                    p.error.is_some(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("broken.mp4".to_string(), 0, true),
                ("long.mp4".to_string(), 3, false),
                ("short.mp4".to_string(), 0, false),
            ]
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 4);
    }

    #[tokio::test]
    async fn test_planned_source_json_omits_empty_fields() {
        let planned = PlannedSource {
            path: PathBuf::from("broken.mp4"),
            plan: None,
            error: Some("unreadable".to_string()),
        };
        let json = serde_json::to_value(&planned).unwrap();
        assert!(json.get("plan").is_none());
        assert_eq!(json["error"], "unreadable");
    }

    #[tokio::test]
    async fn test_inspect_returns_summary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();

        let mut probe = MockProbePort::new();
        probe.expect_probe_summary().returning(|path| {
            Ok(MediaSummary {
                path: PathBuf::from(path),
                format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                duration: 75.0,
                video_codec: "h264".to_string(),
                width: 1280,
                height: 720,
                frame_rate: 30.0,
                has_audio: true,
                segment_tag: None,
            })
        });

        let summary = interactor(probe)
            .inspect(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(summary.width, 1280);
        assert_eq!(summary.duration, 75.0);
    }

    #[tokio::test]
    async fn test_inspect_missing_file() {
        let result = interactor(MockProbePort::new())
            .inspect("/nonexistent/clip.mp4")
            .await;
        assert!(matches!(result, Err(DomainError::FsFail(_))));
    }
}
