//! Command-line argument definitions

use clap::Args;
use clap_num::number_range;

/// Directory scanned when none is given
pub const DEFAULT_VIDEO_DIR: &str = "./videos/";

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Directory containing the videos
    #[arg(short, long, default_value = DEFAULT_VIDEO_DIR)]
    pub dir: String,

    /// Segment length in seconds (default: 30)
    #[arg(short, long, value_parser = parse_window)]
    pub window: Option<f64>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<String>,

    /// Re-encode segments that already exist instead of reusing them
    #[arg(long)]
    pub no_skip_existing: bool,
}

/// Arguments for the file command
#[derive(Args, Debug)]
pub struct FileArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: String,

    /// Segment length in seconds (default: 30)
    #[arg(short, long, value_parser = parse_window)]
    pub window: Option<f64>,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Directory containing the videos
    #[arg(short, long, default_value = DEFAULT_VIDEO_DIR)]
    pub dir: String,

    /// Segment length in seconds (default: 30)
    #[arg(short, long, value_parser = parse_window)]
    pub window: Option<f64>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Single input video; takes precedence over --dir
    #[arg(short, long)]
    pub input: Option<String>,

    /// Directory containing the videos
    #[arg(short, long, default_value = DEFAULT_VIDEO_DIR)]
    pub dir: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// CRF must lie in 0..=51
pub fn parse_crf(s: &str) -> Result<u8, String> {
    number_range(s, 0, 51)
}

/// Window must be a positive, finite number of seconds
pub fn parse_window(s: &str) -> Result<f64, String> {
    let seconds: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number of seconds", s))?;
    crate::domain::model::WindowPolicy::new(seconds)
        .map(|policy| policy.seconds())
        .map_err(|e| e.to_string())
}
