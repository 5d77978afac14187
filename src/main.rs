//! Segmenter CLI
//!
//! Splits long videos into fixed-length clips.
//!
//! # Usage
//!
//! ```bash
//! segmenter split --dir ./videos/ --window 30
//! segmenter file --input long.mp4 --window 15
//! segmenter plan --dir ./videos/ --json
//! segmenter inspect --input clip.mp4
//! segmenter preview --dir ./videos/
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use segmenter_cli::adapters::TomlConfigAdapter;
use segmenter_cli::app::container::DefaultAppContainer;
use segmenter_cli::cli::{commands, Cli, Commands};
use segmenter_cli::config_initialization::initialize_configuration_hierarchy;
use segmenter_cli::ports::ConfigPort;
use segmenter_cli::utils::logging::{init_logging, LoggingConfig};

/// Main entry point for the segmenter CLI
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config: Arc<dyn ConfigPort> = Arc::new(TomlConfigAdapter::new()?);
    let loaded = initialize_configuration_hierarchy(config.as_ref(), &cli).await?;

    let settings = config.settings().await?;
    init_logging(&LoggingConfig::new(&settings.log_level, &settings.log_format)?);
    if let Some(path) = loaded {
        info!("Loaded configuration from {}", path);
    }

    segmenter_cli::init().context("Failed to initialize FFmpeg")?;
    let container = DefaultAppContainer::with_config(config)?;

    match cli.command {
        Commands::Split(args) => commands::split(&container, args).await?,
        Commands::File(args) => commands::file(&container, args).await?,
        Commands::Plan(args) => commands::plan(&container, args).await?,
        Commands::Inspect(args) => commands::inspect(&container, args).await?,
        Commands::Preview(args) => commands::preview(&container, args).await?,
    }

    Ok(())
}
