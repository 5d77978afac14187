//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::app::container::AppContainer;
use crate::app::plan_interactor::PlannedSource;
use crate::cli::args::{FileArgs, InspectArgs, PlanArgs, PreviewArgs, SplitArgs};
use crate::domain::model::{
    MediaSummary, PreviewOutcome, PreviewReport, RunReport, SourceOutcome, SourceReport,
    WindowPolicy,
};
use crate::utils::Utils;

async fn window_policy(container: &dyn AppContainer) -> Result<WindowPolicy> {
    let settings = container
        .config()
        .settings()
        .await
        .context("Failed to read configuration")?;
    Ok(settings.window()?)
}

/// Execute the split command
pub async fn split(container: &dyn AppContainer, args: SplitArgs) -> Result<()> {
    let policy = window_policy(container).await?;
    info!("Starting split of {} with window {}", args.dir, policy);

    let report = container
        .segment_interactor()
        .segment_all(&args.dir, &policy)
        .await
        .with_context(|| format!("Failed to segment videos in {}", args.dir))?;

    display_run_report(&report);

    if let Some(report_path) = &args.report {
        container
            .segment_interactor()
            .write_report(&report, report_path)
            .await
            .with_context(|| format!("Failed to write run report to {}", report_path))?;
    }

    if report.failed_count() > 0 || report.delete_failure_count() > 0 {
        warn!(
            "{} source(s) failed and {} original(s) could not be removed",
            report.failed_count(),
            report.delete_failure_count()
        );
    }
    Ok(())
}

/// Execute the file command
pub async fn file(container: &dyn AppContainer, args: FileArgs) -> Result<()> {
    let policy = window_policy(container).await?;
    info!("Segmenting {} with window {}", args.input, policy);

    let source_report = container
        .segment_interactor()
        .segment_file(&args.input, &policy)
        .await
        .with_context(|| format!("Failed to segment {}", args.input))?;

    display_source_report(&source_report);

    match &source_report.outcome {
        SourceOutcome::Failed { message, .. } => {
            Err(anyhow::anyhow!("Segmentation of {} failed: {}", args.input, message))
        }
        _ => Ok(()),
    }
}

/// Execute the plan command
pub async fn plan(container: &dyn AppContainer, args: PlanArgs) -> Result<()> {
    let policy = window_policy(container).await?;

    let planned = container
        .plan_interactor()
        .plan_all(&args.dir, &policy)
        .await
        .with_context(|| format!("Failed to plan videos in {}", args.dir))?;

    if args.json {
        let json = serde_json::to_string_pretty(&planned)
            .context("Failed to serialize plan to JSON")?;
        println!("{}", json);
    } else {
        display_plan(&planned, &policy);
    }
    Ok(())
}

/// Execute the inspect command
pub async fn inspect(container: &dyn AppContainer, args: InspectArgs) -> Result<()> {
    let summary = container
        .plan_interactor()
        .inspect(&args.input)
        .await
        .with_context(|| format!("Failed to inspect {}", args.input))?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .context("Failed to serialize media info to JSON")?;
        println!("{}", json);
    } else {
        display_media_summary(&summary);
    }
    Ok(())
}

/// Execute the preview command
pub async fn preview(container: &dyn AppContainer, args: PreviewArgs) -> Result<()> {
    let interactor = container.preview_interactor();
    let reports = match &args.input {
        Some(input) => vec![interactor
            .preview_file(input)
            .await
            .with_context(|| format!("Failed to preview {}", input))?],
        None => interactor
            .preview_all(&args.dir)
            .await
            .with_context(|| format!("Failed to preview videos in {}", args.dir))?,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&reports)
            .context("Failed to serialize previews to JSON")?;
        println!("{}", json);
    } else {
        display_previews(&reports);
    }

    match (&args.input, reports.first().map(|r| &r.outcome)) {
        (Some(input), Some(PreviewOutcome::Failed { message, .. })) => {
            Err(anyhow::anyhow!("Preview of {} failed: {}", input, message))
        }
        _ => Ok(()),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn display_duration(duration: Option<f64>) -> String {
    duration
        .map(Utils::format_seconds)
        .unwrap_or_else(|| "unknown".to_string())
}

fn display_source_report(source: &SourceReport) {
    let name = file_name(&source.path);
    let duration = display_duration(source.duration);
    match &source.outcome {
        SourceOutcome::Skipped => println!("  - {} [{}] kept, within window", name, duration),
        SourceOutcome::Segmented {
            segments,
            reused,
            original_removed,
            delete_error,
        } => {
            let reused_note = if *reused > 0 {
                format!(", {} reused", reused)
            } else {
                String::new()
            };
            println!(
                "  ✓ {} [{}] -> {} segment(s){}",
                name,
                duration,
                segments.len(),
                reused_note
            );
            if !original_removed {
                println!(
                    "    ! original kept: {}",
                    delete_error.as_deref().unwrap_or("delete failed")
                );
            }
        }
        SourceOutcome::Failed { message, .. } => {
            println!("  ✗ {} [{}] {}", name, duration, message)
        }
    }
}

fn display_run_report(report: &RunReport) {
    println!("Segmentation Results");
    println!("====================");
    println!("Window: {}s", report.window_seconds);
    if let Some(finished_at) = report.finished_at {
        let elapsed = (finished_at - report.started_at)
            .to_std()
            .unwrap_or_default();
        println!("Elapsed: {}", Utils::format_duration(elapsed));
    }
    println!();

    if report.sources.is_empty() {
        println!("No video files found.");
        return;
    }

    for source in &report.sources {
        display_source_report(source);
    }
    println!();
    println!(
        "Segmented: {}  Skipped: {}  Failed: {}  Segments: {}",
        report.segmented_count(),
        report.skipped_count(),
        report.failed_count(),
        report.segments_written()
    );
}

fn display_plan(planned: &[PlannedSource], policy: &WindowPolicy) {
    println!("Segmentation Plan (window {})", policy);
    println!("=================");
    if planned.is_empty() {
        println!("No video files found.");
        return;
    }

    for entry in planned {
        let name = file_name(&entry.path);
        match (&entry.plan, &entry.error) {
            (Some(plan), _) if plan.is_skip() => println!(
                "  - {} [{}] keep",
                name,
                Utils::format_seconds(plan.total_duration)
            ),
            (Some(plan), _) => {
                println!(
                    "  > {} [{}] split into {}",
                    name,
                    Utils::format_seconds(plan.total_duration),
                    plan.segment_count()
                );
                for segment in &plan.segments {
                    println!(
                        "      {} .. {}  {}",
                        Utils::format_seconds(segment.start),
                        Utils::format_seconds(segment.end),
                        file_name(&segment.output_path)
                    );
                }
            }
            (None, error) => println!(
                "  ✗ {} {}",
                name,
                error.as_deref().unwrap_or("cannot be planned")
            ),
        }
    }
}

fn display_previews(reports: &[PreviewReport]) {
    println!("Previews");
    println!("========");
    if reports.is_empty() {
        println!("No video files found.");
        return;
    }

    for report in reports {
        let name = file_name(&report.path);
        match &report.outcome {
            PreviewOutcome::Created { output } => {
                println!("  ✓ {} -> {}", name, file_name(output))
            }
            PreviewOutcome::Existing { output } => {
                println!("  - {} {} already present", name, file_name(output))
            }
            PreviewOutcome::Failed { message, .. } => println!("  ✗ {} {}", name, message),
        }
    }
}

fn display_media_summary(summary: &MediaSummary) {
    let size = std::fs::metadata(&summary.path)
        .map(|meta| Utils::format_file_size(meta.len()))
        .unwrap_or_else(|_| "unknown".to_string());

    println!("Media Information");
    println!("=================");
    println!("File: {}", summary.path.display());
    println!("Format: {}", summary.format);
    println!("Duration: {:.3}s ({})", summary.duration, Utils::format_seconds(summary.duration));
    println!("File Size: {}", size);
    println!(
        "Video: {} {}x{} @ {:.2} fps",
        summary.video_codec, summary.width, summary.height, summary.frame_rate
    );
    println!("Audio: {}", if summary.has_audio { "yes" } else { "no" });
    if let Some(tag) = &summary.segment_tag {
        println!("Segment of: {}", tag);
    }
}
