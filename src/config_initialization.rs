//! Configuration initialization and hierarchy management

use std::path::PathBuf;

use crate::adapters::toml_config::AppConfig;
use crate::cli::{Cli, Commands};
use crate::error::ShortclipResult;

/// Where the effective configuration came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSources {
    pub file: Option<PathBuf>,
    pub env_overrides: usize,
    pub cli_overrides: usize,
}

/// Build the configuration following precedence: CLI > Env > File > Defaults
pub fn load_configuration(cli: &Cli) -> ShortclipResult<(AppConfig, ConfigSources)> {
    let (mut config, file) = AppConfig::discover(cli.config.as_deref())?;
    let env_overrides = config.apply_env_overrides(|key| std::env::var(key).ok())?;
    let cli_overrides = apply_cli_overrides(&mut config, cli);
    config.validate()?;

    Ok((
        config,
        ConfigSources {
            file,
            env_overrides,
            cli_overrides,
        },
    ))
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) -> usize {
    let mut applied = 0;

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
        applied += 1;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
        applied += 1;
    }

    if let Commands::Serve(args) = &cli.command {
        if let Some(host) = &args.host {
            config.server.host = host.clone();
            applied += 1;
        }
        if let Some(port) = args.port {
            config.server.port = port;
            applied += 1;
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::toml_config::LogFormat;
    use clap::Parser;

    #[test]
    fn test_cli_overrides_win() {
        let mut config = AppConfig::default();
        config.server.port = 9000;
        let cli = Cli::try_parse_from([
            "shortclip",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "serve",
            "--port",
            "8080",
        ])
        .unwrap();

        assert_eq!(apply_cli_overrides(&mut config, &cli), 3);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[server]\nport = 8123\n").unwrap();

        let cli = Cli::try_parse_from([
            "shortclip",
            "--config",
            path.to_str().unwrap(),
            "check",
        ])
        .unwrap();
        let (config, sources) = load_configuration(&cli).unwrap();
        if std::env::var("SHORTCLIP_PORT").is_err() {
            assert_eq!(config.server.port, 8123);
        }
        assert_eq!(sources.file.as_deref(), Some(path.as_path()));
    }
}
