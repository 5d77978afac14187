use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use segmenter_cli::adapters::{EncodeLibavAdapter, ProbeLibavAdapter};
use segmenter_cli::domain::model::{EncodeSettings, SourceVideo, WindowPolicy, PREVIEW_WIDTH};
use segmenter_cli::domain::rules::SegmentPlanner;
use segmenter_cli::ports::{EncodePort, ProbePort};

/// Test utilities for video processing
mod test_utils {
    use super::*;

    pub fn ffmpeg_available() -> bool {
        StdCommand::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Create a small test video with audio using the FFmpeg CLI
    pub fn create_test_video(output_path: &Path, duration: f64) -> bool {
        create_test_video_with_audio(output_path, duration, duration)
    }

    /// Test video whose audio track may run longer than its video track
    pub fn create_test_video_with_audio(
        output_path: &Path,
        video_duration: f64,
        audio_duration: f64,
    ) -> bool {
        let video = format!("testsrc=duration={}:size=160x120:rate=10", video_duration);
        let audio = format!("sine=frequency=440:duration={}", audio_duration);
        StdCommand::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "lavfi",
                "-i",
                &video,
                "-f",
                "lavfi",
                "-i",
                &audio,
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-y",
            ])
            .arg(output_path)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    pub fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

fn segmenter(cwd: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("segmenter").unwrap();
    cmd.current_dir(cwd.path());
    for (name, _) in std::env::vars() {
        if name.starts_with("SEGMENTER_") {
            cmd.env_remove(name);
        }
    }
    cmd
}

#[test]
fn test_help_lists_commands() {
    let cwd = TempDir::new().unwrap();
    segmenter(&cwd)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("split"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("preview"));
}

#[test]
fn test_invalid_window_is_rejected() {
    let cwd = TempDir::new().unwrap();
    segmenter(&cwd)
        .args(["split", "--window", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("positive"));
}

#[test]
fn test_invalid_crf_is_rejected() {
    let cwd = TempDir::new().unwrap();
    segmenter(&cwd)
        .args(["split", "--crf", "60"])
        .assert()
        .failure();
}

#[test]
fn test_missing_directory_fails() {
    let cwd = TempDir::new().unwrap();
    segmenter(&cwd)
        .args(["split", "--dir"])
        .arg(cwd.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Directory does not exist"));
}

#[test]
fn test_default_directory_is_videos() {
    let cwd = TempDir::new().unwrap();
    std::fs::create_dir(cwd.path().join("videos")).unwrap();
    segmenter(&cwd)
        .arg("split")
        .assert()
        .success()
        .stdout(predicate::str::contains("No video files found"));
}

#[test]
fn test_split_leaves_non_video_files_alone() {
    let cwd = TempDir::new().unwrap();
    let videos = cwd.path().join("videos");
    std::fs::create_dir(&videos).unwrap();
    std::fs::write(videos.join("links.txt"), "https://example.com/reel/1\n").unwrap();

    segmenter(&cwd)
        .args(["split", "--dir"])
        .arg(&videos)
        .assert()
        .success();

    assert_eq!(test_utils::names(&videos), vec!["links.txt"]);
}

#[test]
fn test_split_writes_report() {
    let cwd = TempDir::new().unwrap();
    let report = cwd.path().join("out").join("report.json");

    segmenter(&cwd)
        .args(["split", "--window", "12", "--dir"])
        .arg(cwd.path())
        .arg("--report")
        .arg(&report)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["window_seconds"], 12.0);
    assert_eq!(json["sources"], serde_json::json!([]));
    assert!(json["finished_at"].is_string());
}

#[test]
fn test_plan_json_on_empty_directory() {
    let cwd = TempDir::new().unwrap();
    segmenter(&cwd)
        .args(["plan", "--json", "--dir"])
        .arg(cwd.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[]"));
}

#[test]
fn test_inspect_missing_file_fails() {
    let cwd = TempDir::new().unwrap();
    segmenter(&cwd)
        .args(["inspect", "--input", "nothing.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let cwd = TempDir::new().unwrap();
    std::fs::write(
        cwd.path().join("segmenter.toml"),
        "[segmenter]\nwindow_seconds = 0.0\n",
    )
    .unwrap();

    segmenter(&cwd)
        .args(["plan", "--dir", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_environment_overrides_config_file() {
    let cwd = TempDir::new().unwrap();
    std::fs::write(
        cwd.path().join("segmenter.toml"),
        "[segmenter]\nwindow_seconds = 0.0\n",
    )
    .unwrap();

    segmenter(&cwd)
        .env("SEGMENTER_WINDOW_SECONDS", "15")
        .args(["plan", "--dir", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("window 15s"));
}

// ============================================================================
// END-TO-END TESTS (require the ffmpeg CLI to synthesise inputs)
// ============================================================================

#[test]
fn test_end_to_end_split() {
    if !test_utils::ffmpeg_available() {
        println!("Skipping end-to-end test - ffmpeg not found");
        return;
    }

    let cwd = TempDir::new().unwrap();
    let videos = cwd.path().join("videos");
    std::fs::create_dir(&videos).unwrap();
    if !test_utils::create_test_video(&videos.join("name.mp4"), 75.0)
        || !test_utils::create_test_video(&videos.join("short.mp4"), 20.0)
    {
        println!("Skipping end-to-end test - could not create test videos");
        return;
    }
    std::fs::write(videos.join("links.txt"), "x").unwrap();

    segmenter(&cwd)
        .args(["split", "--window", "30", "--preset", "ultrafast", "--report"])
        .arg(cwd.path().join("report.json"))
        .assert()
        .success();

    assert_eq!(
        test_utils::names(&videos),
        vec![
            "links.txt",
            "name_part_0.mp4",
            "name_part_1.mp4",
            "name_part_2.mp4",
            "short.mp4",
        ]
    );

    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(cwd.path().join("report.json")).unwrap(),
    )
    .unwrap();
    let statuses: Vec<&str> = json["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["segmented", "skipped"]);
}

#[tokio::test]
async fn test_libav_adapters_on_real_video() {
    if !test_utils::ffmpeg_available() {
        println!("Skipping libav adapter test - ffmpeg not found");
        return;
    }

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    if !test_utils::create_test_video(&input, 12.0) {
        println!("Skipping libav adapter test - could not create test video");
        return;
    }
    let input_str = input.to_str().unwrap();

    let probe = ProbeLibavAdapter::new().unwrap();
    let duration = probe.probe_duration(input_str).await.unwrap();
    assert!(duration > 11.5 && duration < 12.5, "duration {}", duration);

    let summary = probe.probe_summary(input_str).await.unwrap();
    assert_eq!((summary.width, summary.height), (160, 120));
    assert!(summary.has_audio);

    let source = SourceVideo::new(&input);
    let plan = SegmentPlanner::plan(&source, duration, &WindowPolicy::new(5.0).unwrap()).unwrap();
    assert_eq!(plan.segment_count(), 3);

    let encoder = EncodeLibavAdapter::new().unwrap();
    let settings = EncodeSettings {
        preset: "ultrafast".to_string(),
        ..EncodeSettings::default()
    };
    let segment = &plan.segments[1];
    let output = dir.path().join("middle.mp4");
    let encoded = encoder
        .encode_segment(segment, output.to_str().unwrap(), &settings)
        .await
        .unwrap();
    assert!(encoded.frames > 0);

    let segment_duration = probe.probe_duration(output.to_str().unwrap()).await.unwrap();
    assert!(
        segment_duration > 4.0 && segment_duration < 6.0,
        "segment duration {}",
        segment_duration
    );

    // Final, shorter window
    let tail = &plan.segments[2];
    assert!(tail.duration() < 5.0);
    let tail_output = dir.path().join("tail.mp4");
    let tail_encoded = encoder
        .encode_segment(tail, tail_output.to_str().unwrap(), &settings)
        .await
        .unwrap();
    assert!(tail_encoded.frames > 0);

    let tail_summary = probe.probe_summary(tail_output.to_str().unwrap()).await.unwrap();
    assert!(
        tail_summary.duration > 1.5 && tail_summary.duration < 3.0,
        "tail duration {}",
        tail_summary.duration
    );
    assert!(tail_summary.has_audio);
    assert_eq!(tail_summary.segment_tag, Some(tail.tag().to_string()));
    assert_eq!(
        probe
            .read_segment_tag(tail_output.to_str().unwrap())
            .await
            .unwrap(),
        Some(tail.tag().to_string())
    );
    assert_eq!(probe.read_segment_tag(input_str).await.unwrap(), None);
}

#[test]
fn test_tail_window_past_last_video_frame() {
    if !test_utils::ffmpeg_available() {
        println!("Skipping end-to-end test - ffmpeg not found");
        return;
    }

    let cwd = TempDir::new().unwrap();
    let videos = cwd.path().join("videos");
    std::fs::create_dir(&videos).unwrap();
    if !test_utils::create_test_video_with_audio(&videos.join("long_audio.mp4"), 30.0, 30.5) {
        println!("Skipping end-to-end test - could not create test video");
        return;
    }

    segmenter(&cwd)
        .args(["split", "--window", "30", "--preset", "ultrafast"])
        .assert()
        .success();

    assert_eq!(
        test_utils::names(&videos),
        vec!["long_audio_part_0.mp4", "long_audio_part_1.mp4"]
    );
}

#[test]
fn test_same_base_name_sources_end_to_end() {
    if !test_utils::ffmpeg_available() {
        println!("Skipping end-to-end test - ffmpeg not found");
        return;
    }

    let cwd = TempDir::new().unwrap();
    let videos = cwd.path().join("videos");
    std::fs::create_dir(&videos).unwrap();
    if !test_utils::create_test_video(&videos.join("clip.mov"), 40.0)
        || !test_utils::create_test_video(&videos.join("clip.mp4"), 40.0)
    {
        println!("Skipping end-to-end test - could not create test videos");
        return;
    }

    let expected = vec!["clip.mp4", "clip_part_0.mp4", "clip_part_1.mp4"];
    for run in 0..2 {
        let report = cwd.path().join(format!("report-{}.json", run));
        segmenter(&cwd)
            .args(["split", "--window", "30", "--preset", "ultrafast", "--report"])
            .arg(&report)
            .assert()
            .success();

        assert_eq!(test_utils::names(&videos), expected);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        let clip_mp4 = json["sources"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["path"].as_str().unwrap().ends_with("clip.mp4"))
            .unwrap();
        assert_eq!(clip_mp4["status"], "failed");
        assert_eq!(clip_mp4["kind"], "output_conflict");
    }
}

#[tokio::test]
async fn test_preview_end_to_end() {
    if !test_utils::ffmpeg_available() {
        println!("Skipping end-to-end test - ffmpeg not found");
        return;
    }

    let cwd = TempDir::new().unwrap();
    let videos = cwd.path().join("videos");
    std::fs::create_dir(&videos).unwrap();
    if !test_utils::create_test_video(&videos.join("clip.mp4"), 12.0) {
        println!("Skipping end-to-end test - could not create test video");
        return;
    }

    segmenter(&cwd)
        .args(["preview", "--preset", "ultrafast"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clip_compressed.mp4"));

    assert_eq!(
        test_utils::names(&videos),
        vec!["clip.mp4", "clip_compressed.mp4"]
    );

    let probe = ProbeLibavAdapter::new().unwrap();
    let preview = probe
        .probe_summary(videos.join("clip_compressed.mp4").to_str().unwrap())
        .await
        .unwrap();
    assert_eq!((preview.width, preview.height), (PREVIEW_WIDTH, 480));
    assert!(
        preview.duration > 2.5 && preview.duration < 3.5,
        "preview duration {}",
        preview.duration
    );

    segmenter(&cwd)
        .args(["preview", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"existing\""));
}
