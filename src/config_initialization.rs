//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::ports::ConfigPort;

/// Files tried, in order, when no `--config` is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["segmenter.toml", "config/segmenter.toml"];

/// Environment variables and the configuration keys they override
pub const ENV_MAPPINGS: &[(&str, &str)] = &[
    ("SEGMENTER_WINDOW_SECONDS", "window_seconds"),
    ("SEGMENTER_EXTENSIONS", "extensions"),
    ("SEGMENTER_VIDEO_CODEC", "video_codec"),
    ("SEGMENTER_CRF", "crf"),
    ("SEGMENTER_PRESET", "preset"),
    ("SEGMENTER_THREADS", "threads"),
    ("SEGMENTER_ENCODE_RETRIES", "encode_retries"),
    ("SEGMENTER_DELETE_RETRIES", "delete_retries"),
    ("SEGMENTER_RETRY_DELAY_MS", "retry_delay_ms"),
    ("SEGMENTER_SKIP_EXISTING", "skip_existing"),
    ("SEGMENTER_LOG_LEVEL", "log_level"),
    ("SEGMENTER_LOG_FORMAT", "log_format"),
];

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults.
///
/// Returns the path of the configuration file that was loaded, if any.
pub async fn initialize_configuration_hierarchy(
    config: &dyn ConfigPort,
    cli: &Cli,
) -> Result<Option<String>> {
    // Defaults are already in place when the adapter is created
    let loaded = load_config_file(config, cli.config.as_deref()).await?;

    load_environment_variables(config, std::env::vars()).await?;

    apply_cli_configuration_overrides(config, cli).await?;

    config
        .validate_config()
        .await
        .context("Invalid configuration")?;

    Ok(loaded)
}

/// Load configuration from the explicit file, or the first default file that exists
pub async fn load_config_file(
    config: &dyn ConfigPort,
    explicit: Option<&str>,
) -> Result<Option<String>> {
    if let Some(path) = explicit {
        config
            .load_config(path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", path))?;
        return Ok(Some(path.to_string()));
    }

    for path in DEFAULT_CONFIG_PATHS {
        if std::path::Path::new(path).is_file() {
            config
                .load_config(path)
                .await
                .with_context(|| format!("Failed to load configuration from {}", path))?;
            return Ok(Some(path.to_string()));
        }
    }

    Ok(None)
}

/// Apply `SEGMENTER_*` variables found in `vars`
pub async fn load_environment_variables<I>(config: &dyn ConfigPort, vars: I) -> Result<usize>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env_overrides = 0;
    for (name, value) in vars {
        let Some((_, key)) = ENV_MAPPINGS.iter().find(|(env_var, _)| *env_var == name) else {
            continue;
        };
        config
            .set_config(key, &value)
            .await
            .with_context(|| format!("Invalid value in {}", name))?;
        debug!("Environment override: {} = {}", key, value);
        env_overrides += 1;
    }

    Ok(env_overrides)
}

/// Apply CLI argument overrides to configuration
pub async fn apply_cli_configuration_overrides(config: &dyn ConfigPort, cli: &Cli) -> Result<usize> {
    let mut overrides: Vec<(&str, String)> = Vec::new();

    if let Some(level) = &cli.log_level {
        overrides.push(("log_level", level.clone()));
    }
    if let Some(format) = &cli.log_format {
        overrides.push(("log_format", format.clone()));
    }
    if let Some(crf) = cli.crf {
        overrides.push(("crf", crf.to_string()));
    }
    if let Some(preset) = &cli.preset {
        overrides.push(("preset", preset.clone()));
    }
    if let Some(window) = cli.command.window() {
        overrides.push(("window_seconds", window.to_string()));
    }
    if let Commands::Split(args) = &cli.command {
        if args.no_skip_existing {
            overrides.push(("skip_existing", "false".to_string()));
        }
    }

    for (key, value) in &overrides {
        config
            .set_config(key, value)
            .await
            .with_context(|| format!("Invalid command-line value for {}", key))?;
        debug!("CLI override: {} = {}", key, value);
    }

    Ok(overrides.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TomlConfigAdapter;
    use clap::Parser;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_precedence_file_env_cli() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("segmenter.toml");
        std::fs::write(
            &path,
            "[segmenter]\nwindow_seconds = 20.0\ncrf = 30\npreset = \"slow\"\n",
        )
        .unwrap();

        let config = TomlConfigAdapter::new().unwrap();
        let loaded = load_config_file(&config, path.to_str()).await.unwrap();
        assert!(loaded.is_some());

        let applied = load_environment_variables(
            &config,
            vars(&[
                ("SEGMENTER_WINDOW_SECONDS", "40"),
                ("SEGMENTER_CRF", "26"),
                ("HOME", "/root"),
            ]),
        )
        .await
        .unwrap();
        assert_eq!(applied, 2);

        let cli = Cli::try_parse_from(["segmenter", "split", "--window", "50"]).unwrap();
        apply_cli_configuration_overrides(&config, &cli).await.unwrap();

        let settings = config.settings().await.unwrap();
        assert_eq!(settings.window_seconds, 50.0);
        assert_eq!(settings.crf, 26);
        assert_eq!(settings.preset, "slow");
    }

    #[tokio::test]
    async fn test_invalid_environment_value_is_an_error() {
        let config = TomlConfigAdapter::new().unwrap();
        let result =
            load_environment_variables(&config, vars(&[("SEGMENTER_SKIP_EXISTING", "maybe")]))
                .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_explicit_missing_config_is_an_error() {
        let config = TomlConfigAdapter::new().unwrap();
        assert!(load_config_file(&config, Some("/nonexistent/segmenter.toml"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_no_skip_existing_flag() {
        let config = TomlConfigAdapter::new().unwrap();
        let cli = Cli::try_parse_from(["segmenter", "split", "--no-skip-existing"]).unwrap();
        apply_cli_configuration_overrides(&config, &cli).await.unwrap();
        assert!(!config.settings().await.unwrap().skip_existing);
    }
}
