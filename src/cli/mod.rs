//! CLI module for shortclip
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::toml_config::LogFormat;

pub mod args;
pub mod commands;

/// shortclip random vertical clip service
///
/// Picks a random 30-60 second window of a source video, crops it to 9:16 and
/// hands it to optional transcription and render steps.
#[derive(Parser, Debug)]
#[command(name = "shortclip")]
#[command(about = "Random vertical short-clip generator")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: first of config/production.toml,
    /// config/development.toml, shortclip.toml)
    #[arg(long, global = true, env = "SHORTCLIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level (overrides logging.level)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format: text or json
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve(args::ServeArgs),
    /// Cut one random vertical clip from a local file
    Clip(args::ClipArgs),
    /// Print a clip selection for a given source duration without running tools
    Plan(args::PlanArgs),
    /// Download a video with yt-dlp
    Fetch(args::FetchArgs),
    /// Report tool availability and the effective configuration
    Check(args::CheckArgs),
}
