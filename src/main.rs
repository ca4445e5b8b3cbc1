//! shortclip
//!
//! Random vertical short-clip generator: an HTTP service plus local tooling.
//!
//! # Usage
//!
//! ```bash
//! shortclip serve --port 7243
//! shortclip clip --input talk.mp4 --min 30 --max 60
//! shortclip plan --duration 100 --seed 7
//! shortclip fetch --url https://www.youtube.com/watch?v=... --output-dir videos
//! shortclip check
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use shortclip::adapters::init_logging;
use shortclip::cli::{commands, Cli, Commands};
use shortclip::config_initialization::load_configuration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, sources) = load_configuration(&cli)?;
    init_logging(&config.logging.level, config.logging.format)?;

    debug!(
        config_file = ?sources.file,
        env_overrides = sources.env_overrides,
        cli_overrides = sources.cli_overrides,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Serve(_) => commands::serve(config).await?,
        Commands::Clip(args) => commands::clip(config, args).await?,
        Commands::Plan(args) => commands::plan(&config, args)?,
        Commands::Fetch(args) => commands::fetch(config, args).await?,
        Commands::Check(args) => commands::check(config, &sources, args).await?,
    }

    info!("shortclip finished");
    Ok(())
}
