//! CLI module for the segmenter
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// Video segmenter
///
/// Splits every video longer than a fixed window into consecutive clips and
/// removes the original once all clips are on disk.
#[derive(Parser, Debug)]
#[command(name = "segmenter")]
#[command(about = "Split long videos into fixed-length clips")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Configuration file (default: segmenter.toml or config/segmenter.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Constant Rate Factor for re-encoded segments (0-51)
    #[arg(long, global = true, value_parser = args::parse_crf)]
    pub crf: Option<u8>,

    /// Encoder speed preset
    #[arg(long, global = true)]
    pub preset: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Segment every long video in a directory
    Split(args::SplitArgs),
    /// Segment a single video file
    File(args::FileArgs),
    /// Show what `split` would do without touching any file
    Plan(args::PlanArgs),
    /// Inspect video file information
    Inspect(args::InspectArgs),
    /// Write a short, downscaled preview next to each video
    Preview(args::PreviewArgs),
}

impl Commands {
    /// Window given on the command line, if any
    pub fn window(&self) -> Option<f64> {
        match self {
            Commands::Split(args) => args.window,
            Commands::File(args) => args.window,
            Commands::Plan(args) => args.window,
            Commands::Inspect(_) | Commands::Preview(_) => None,
        }
    }
}
