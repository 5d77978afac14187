// Segment interactor - Orchestrates fixed-window segmentation of sources

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::discovery::discover_sources;
use crate::app::staging::write_staged;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Interactor for the segmentation use case
pub struct SegmentInteractor {
    probe_port: Arc<dyn ProbePort>,
    encode_port: Arc<dyn EncodePort>,
    fs_port: Arc<dyn FsPort>,
    config_port: Arc<dyn ConfigPort>,
    log_port: Arc<dyn LogPort>,
}

impl SegmentInteractor {
    /// Create new segment interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        encode_port: Arc<dyn EncodePort>,
        fs_port: Arc<dyn FsPort>,
        config_port: Arc<dyn ConfigPort>,
        log_port: Arc<dyn LogPort>,
    ) -> Self {
        Self {
            probe_port,
            encode_port,
            fs_port,
            config_port,
            log_port,
        }
    }

    /// List the segmentation candidates of a directory
    pub async fn discover(&self, directory: &str) -> Result<WorkList, DomainError> {
        let settings = self.config_port.settings().await?;
        let filter = SourceFilter::new(&settings.extensions)?;
        discover_sources(
            self.fs_port.as_ref(),
            self.log_port.as_ref(),
            &filter,
            directory,
        )
        .await
    }

    /// Segment every video in `directory` that is longer than the window.
    ///
    /// Only a missing or unlistable directory fails the call; per-source
    /// failures are recorded in the report.
    pub async fn segment_all(
        &self,
        directory: &str,
        policy: &WindowPolicy,
    ) -> Result<RunReport, DomainError> {
        self.log_port
            .info(&format!("Segmenting videos in {} with window {}", directory, policy))
            .await;

        let work_list = self.discover(directory).await?;
        self.segment_sources(work_list, policy).await
    }

    /// Segment the sources of a work list, strictly in list order
    pub async fn segment_sources(
        &self,
        work_list: WorkList,
        policy: &WindowPolicy,
    ) -> Result<RunReport, DomainError> {
        let settings = self.config_port.settings().await?;
        let mut report = RunReport::start(policy);
        let mut claimed = HashSet::new();

        for source in work_list {
            let (duration, outcome) = self
                .process_source(&source, policy, &settings, &mut claimed)
                .await;
            report.record(&source.path, duration, outcome);
        }

        report.finish();
        self.log_port
            .info(&format!(
                "Run complete: {} segmented, {} skipped, {} failed, {} segment(s) on disk",
                report.segmented_count(),
                report.skipped_count(),
                report.failed_count(),
                report.segments_written()
            ))
            .await;

        Ok(report)
    }

    /// Segment one explicit source
    pub async fn segment_file(
        &self,
        file_path: &str,
        policy: &WindowPolicy,
    ) -> Result<SourceReport, DomainError> {
        if !self.fs_port.file_exists(file_path).await? {
            return Err(DomainError::FsFail(format!(
                "Input file does not exist: {}",
                file_path
            )));
        }

        let settings = self.config_port.settings().await?;
        let source = SourceVideo::new(file_path);
        let (duration, outcome) = self
            .process_source(&source, policy, &settings, &mut HashSet::new())
            .await;

        Ok(SourceReport {
            path: source.path,
            duration,
            outcome,
        })
    }

    /// Write a run report as pretty JSON
    pub async fn write_report(&self, report: &RunReport, file_path: &str) -> Result<(), DomainError> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| DomainError::InternalError(format!("Failed to serialize run report: {}", e)))?;
        self.fs_port.write_text(file_path, &json).await?;
        self.log_port
            .info(&format!("Run report written to {}", file_path))
            .await;
        Ok(())
    }

    /// Probe, plan, write and commit one source; never fails the batch.
    ///
    /// `claimed` holds the output paths planned by earlier sources of the run.
    async fn process_source(
        &self,
        source: &SourceVideo,
        policy: &WindowPolicy,
        settings: &SegmenterSettings,
        claimed: &mut HashSet<PathBuf>,
    ) -> (Option<f64>, SourceOutcome) {
        let duration = match self.probe_port.probe_duration(&source.path_str()).await {
            Ok(duration) => duration,
            Err(e) => {
                self.log_port
                    .warn(&format!("Skipping {}: {}", source.display_name(), e))
                    .await;
                return (None, SourceOutcome::failed(&e));
            }
        };

        let plan = match SegmentPlanner::plan(source, duration, policy) {
            Ok(plan) => plan,
            Err(e) => {
                self.log_port
                    .warn(&format!("Skipping {}: {}", source.display_name(), e))
                    .await;
                return (Some(duration), SourceOutcome::failed(&e));
            }
        };

        if plan.is_skip() {
            self.log_port
                .debug(&format!(
                    "{} is {:.3}s, within the {} window; left untouched",
                    source.display_name(),
                    duration,
                    policy
                ))
                .await;
            return (Some(duration), SourceOutcome::Skipped);
        }

        if let Some(taken) = plan
            .segments
            .iter()
            .find(|segment| claimed.contains(&segment.output_path))
        {
            let e = DomainError::OutputConflict {
                path: source.path_str(),
                output: taken.output_str(),
                reason: "already planned for another source in this run".to_string(),
            };
            self.log_port
                .error(&format!("Keeping original {}: {}", source.display_name(), e))
                .await;
            return (Some(duration), SourceOutcome::failed(&e));
        }
        claimed.extend(plan.segments.iter().map(|segment| segment.output_path.clone()));

        self.log_port
            .info(&format!(
                "Splitting {} ({:.3}s) into {} segment(s)",
                source.display_name(),
                duration,
                plan.segment_count()
            ))
            .await;

        let (segments, reused) = match self.write_segments(source, &plan, settings).await {
            Ok(written) => written,
            Err(e) => {
                self.log_port
                    .error(&format!(
                        "Keeping original {}: {}",
                        source.display_name(),
                        e
                    ))
                    .await;
                return (Some(duration), SourceOutcome::failed(&e));
            }
        };

        self.remove_stale_tail(source, &plan).await;

        let outcome = match self.remove_original(source, &settings.retry_policy()).await {
            Ok(()) => SourceOutcome::Segmented {
                segments,
                reused,
                original_removed: true,
                delete_error: None,
            },
            Err(e) => {
                self.log_port.error(&e.to_string()).await;
                SourceOutcome::Segmented {
                    segments,
                    reused,
                    original_removed: false,
                    delete_error: Some(e.to_string()),
                }
            }
        };

        (Some(duration), outcome)
    }

    /// Write every segment of a plan in temporal order, stopping at the first failure
    async fn write_segments(
        &self,
        source: &SourceVideo,
        plan: &SegmentPlan,
        settings: &SegmenterSettings,
    ) -> Result<(Vec<PathBuf>, usize), DomainError> {
        let encode_settings = settings.encode_settings();
        let retry = settings.retry_policy();
        let directory = source.directory().to_string_lossy().to_string();

        let mut written = Vec::with_capacity(plan.segment_count());
        let mut reused = 0;

        for segment in &plan.segments {
            let output = segment.output_str();

            if self.fs_port.file_exists(&output).await? {
                let found = self.read_tag(&output).await;
                match SegmentPlanner::classify_existing(segment, found.as_deref()) {
                    ExistingOutput::Current if settings.skip_existing => {
                        self.log_port
                            .log_event(
                                &LogEvent::new(LogLevel::Info, "segment already present")
                                    .with("source", source.display_name())
                                    .with("index", segment.index)
                                    .with("output", &output),
                            )
                            .await;
                        reused += 1;
                        written.push(segment.output_path.clone());
                        continue;
                    }
                    ExistingOutput::Current => {}
                    ExistingOutput::Stale => {
                        self.log_port
                            .info(&format!(
                                "Replacing {}: written with a different window",
                                output
                            ))
                            .await;
                    }
                    ExistingOutput::Foreign => {
                        return Err(DomainError::OutputConflict {
                            path: source.path_str(),
                            output,
                            reason: match found.as_deref().and_then(SegmentTag::parse) {
                                Some(tag) => format!("holds a segment of {}", tag.source),
                                None => "holds a file this tool did not write".to_string(),
                            },
                        });
                    }
                }
            }

            let encoded = self
                .encode_with_retry(segment, &directory, &encode_settings, &retry)
                .await?;

            self.log_port
                .log_event(
                    &LogEvent::new(LogLevel::Info, "segment written")
                        .with("source", source.display_name())
                        .with("index", segment.index)
                        .with("start", format!("{:.3}", segment.start))
                        .with("end", format!("{:.3}", segment.end))
                        .with("frames", encoded.frames)
                        .with("output", &output),
                )
                .await;
            written.push(segment.output_path.clone());
        }

        Ok((written, reused))
    }

    /// Provenance tag of an existing file; unreadable files have none
    async fn read_tag(&self, file_path: &str) -> Option<String> {
        match self.probe_port.read_segment_tag(file_path).await {
            Ok(tag) => tag,
            Err(e) => {
                self.log_port
                    .debug(&format!("No segment tag in {}: {}", file_path, e))
                    .await;
                None
            }
        }
    }

    /// Remove higher-numbered parts a longer plan of the same source left behind
    async fn remove_stale_tail(&self, source: &SourceVideo, plan: &SegmentPlan) {
        let Ok(base_name) = source.base_name() else {
            return;
        };
        let directory = source.directory();
        let own_name = source.display_name();

        for index in plan.segment_count().. {
            let output = SegmentPlanner::output_path(&directory, &base_name, index)
                .to_string_lossy()
                .to_string();
            if !self.fs_port.file_exists(&output).await.unwrap_or(false) {
                break;
            }
            let owned = self
                .read_tag(&output)
                .await
                .and_then(|raw| SegmentTag::parse(&raw))
                .is_some_and(|tag| tag.source == own_name);
            if !owned {
                break;
            }
            match self.fs_port.delete_file(&output).await {
                Ok(()) => {
                    self.log_port
                        .info(&format!("Removed stale segment {}", output))
                        .await;
                }
                Err(e) => {
                    self.log_port
                        .warn(&format!("Could not remove stale segment {}: {}", output, e))
                        .await;
                    break;
                }
            }
        }
    }

    async fn encode_with_retry(
        &self,
        segment: &Segment,
        directory: &str,
        settings: &EncodeSettings,
        retry: &RetryPolicy,
    ) -> Result<EncodedSegment, DomainError> {
        let mut attempt = 0;
        loop {
            match self.encode_staged(segment, directory, settings).await {
                Ok(encoded) => return Ok(encoded),
                Err(e) if e.is_retryable() && attempt < retry.encode_retries => {
                    attempt += 1;
                    self.log_port
                        .warn(&format!(
                            "{} (attempt {} of {})",
                            e,
                            attempt,
                            retry.encode_retries + 1
                        ))
                        .await;
                    tokio::time::sleep(retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Encode into a hidden staging file, then rename it to the segment name
    async fn encode_staged(
        &self,
        segment: &Segment,
        directory: &str,
        settings: &EncodeSettings,
    ) -> Result<EncodedSegment, DomainError> {
        let write_failure = |reason: String| DomainError::EncodeFailure {
            path: segment.source.to_string_lossy().to_string(),
            index: segment.index,
            reason,
        };

        write_staged(
            self.fs_port.as_ref(),
            self.log_port.as_ref(),
            directory,
            &segment.output_str(),
            write_failure,
            |staged| async move {
                self.encode_port
                    .encode_segment(segment, &staged, settings)
                    .await
            },
        )
        .await
    }

    async fn remove_original(
        &self,
        source: &SourceVideo,
        retry: &RetryPolicy,
    ) -> Result<(), DomainError> {
        let path = source.path_str();
        let mut attempt = 0;
        loop {
            match self.fs_port.delete_file(&path).await {
                Ok(()) => {
                    self.log_port
                        .info(&format!("Removed original {}", source.display_name()))
                        .await;
                    return Ok(());
                }
                Err(e) if attempt < retry.delete_retries => {
                    attempt += 1;
                    self.log_port
                        .warn(&format!(
                            "Delete of {} failed (attempt {} of {}): {}",
                            path,
                            attempt,
                            retry.delete_retries + 1,
                            e
                        ))
                        .await;
                    tokio::time::sleep(retry.delay).await;
                }
                Err(e) => {
                    return Err(DomainError::DeleteFailure {
                        path,
                        reason: e.to_string(),
                    })
                }
            }
        }
    }
}
