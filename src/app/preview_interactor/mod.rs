// Preview interactor - Short downscaled clips from the start of each source

use std::sync::Arc;

use crate::app::discovery::discover_sources;
use crate::app::staging::write_staged;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Interactor for the preview use case
pub struct PreviewInteractor {
    probe_port: Arc<dyn ProbePort>,
    encode_port: Arc<dyn EncodePort>,
    fs_port: Arc<dyn FsPort>,
    config_port: Arc<dyn ConfigPort>,
    log_port: Arc<dyn LogPort>,
}

impl PreviewInteractor {
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

    /// Preview every source of a directory. Existing previews and segment
    /// outputs are not sources.
    pub async fn preview_all(&self, directory: &str) -> Result<Vec<PreviewReport>, DomainError> {
        let settings = self.config_port.settings().await?;
        let filter = SourceFilter::new(&settings.extensions)?.excluding_previews();
        let work_list = discover_sources(
            self.fs_port.as_ref(),
            self.log_port.as_ref(),
            &filter,
            directory,
        )
        .await?;

        let mut reports = Vec::with_capacity(work_list.len());
        for source in work_list {
            let outcome = self.process_source(&source, &settings).await;
            reports.push(PreviewReport {
                path: source.path,
                outcome,
            });
        }
        Ok(reports)
    }

    /// Preview one explicit source
    pub async fn preview_file(&self, file_path: &str) -> Result<PreviewReport, DomainError> {
        if !self.fs_port.file_exists(file_path).await? {
            return Err(DomainError::FsFail(format!(
                "Input file does not exist: {}",
                file_path
            )));
        }

        let settings = self.config_port.settings().await?;
        let source = SourceVideo::new(file_path);
        let outcome = self.process_source(&source, &settings).await;
        Ok(PreviewReport {
            path: source.path,
            outcome,
        })
    }

    async fn process_source(
        &self,
        source: &SourceVideo,
        settings: &SegmenterSettings,
    ) -> PreviewOutcome {
        match self.write_preview(source, settings).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.log_port
                    .warn(&format!("No preview for {}: {}", source.display_name(), e))
                    .await;
                PreviewOutcome::failed(&e)
            }
        }
    }

    async fn write_preview(
        &self,
        source: &SourceVideo,
        settings: &SegmenterSettings,
    ) -> Result<PreviewOutcome, DomainError> {
        let output = PreviewPlanner::output_path(source)?;
        if self
            .fs_port
            .file_exists(&output.to_string_lossy())
            .await?
        {
            self.log_port
                .info(&format!("Preview already exists: {}", output.display()))
                .await;
            return Ok(PreviewOutcome::Existing { output });
        }

        let duration = self.probe_port.probe_duration(&source.path_str()).await?;
        let request = PreviewPlanner::plan(source, duration)?;
        let encoded = self.encode_with_retry(source, &request, settings).await?;

        self.log_port
            .log_event(
                &LogEvent::new(LogLevel::Info, "preview written")
                    .with("source", source.display_name())
                    .with("length", format!("{:.3}", request.length))
                    .with("frames", encoded.frames)
                    .with("output", request.output_str()),
            )
            .await;
        Ok(PreviewOutcome::Created {
            output: request.output_path,
        })
    }

    async fn encode_with_retry(
        &self,
        source: &SourceVideo,
        request: &PreviewRequest,
        settings: &SegmenterSettings,
    ) -> Result<EncodedSegment, DomainError> {
        let retry = settings.retry_policy();
        let encode_settings = &settings.encode_settings();
        let directory = source.directory().to_string_lossy().to_string();
        let target = request.output_str();
        let write_failure = |reason: String| DomainError::EncodeFailure {
            path: source.path_str(),
            index: 0,
            reason: format!("preview: {}", reason),
        };

        let mut attempt = 0;
        loop {
            let result = write_staged(
                self.fs_port.as_ref(),
                self.log_port.as_ref(),
                &directory,
                &target,
                write_failure,
                |staged| async move {
                    self.encode_port
                        .encode_preview(request, &staged, encode_settings)
                        .await
                },
            )
            .await;

            match result {
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
                other => return other,
            }
        }
    }
}
