//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

use crate::domain::model::ShortSourcePolicy;

/// Longest clip bound accepted on the command line, in seconds
pub const MAX_DURATION_ARG: u32 = 3600;

fn duration_bound(s: &str) -> Result<u32, String> {
    number_range(s, 1, MAX_DURATION_ARG)
}

fn positive_seconds(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err("duration must be a positive number of seconds".to_string());
    }
    Ok(value)
}

/// Arguments for the serve command
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Interface to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the clip command
#[derive(Args, Debug)]
pub struct ClipArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path (default: <input>_short.mp4 next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Minimum clip length in seconds
    #[arg(long, value_parser = duration_bound)]
    pub min: Option<u32>,

    /// Maximum clip length in seconds
    #[arg(long, value_parser = duration_bound)]
    pub max: Option<u32>,

    /// What to do when the source is shorter than the sampled length
    #[arg(long)]
    pub policy: Option<ShortSourcePolicy>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Total source duration in seconds
    #[arg(short, long, value_parser = positive_seconds)]
    pub duration: f64,

    /// Minimum clip length in seconds
    #[arg(long, value_parser = duration_bound)]
    pub min: Option<u32>,

    /// Maximum clip length in seconds
    #[arg(long, value_parser = duration_bound)]
    pub max: Option<u32>,

    /// What to do when the source is shorter than the sampled length
    #[arg(long)]
    pub policy: Option<ShortSourcePolicy>,

    /// Seed for a reproducible selection
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Video page URL understood by yt-dlp
    #[arg(short, long)]
    pub url: String,

    /// Directory for the download, named after the video title
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Save as the configured source video (source.path) instead
    #[arg(long, conflicts_with = "output_dir")]
    pub as_source: bool,
}

/// Arguments for the check command
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Print the effective configuration as TOML
    #[arg(long)]
    pub show_config: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
