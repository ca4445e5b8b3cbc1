//! Command implementations

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing::{info, warn};

use crate::adapters::toml_config::AppConfig;
use crate::adapters::ytdlp_source::{YtDlp, YtDlpSourceAdapter, TITLE_TEMPLATE};
use crate::app::{AppContainer, DefaultAppContainer};
use crate::cli::args::{CheckArgs, ClipArgs, FetchArgs, PlanArgs};
use crate::config_initialization::ConfigSources;
use crate::domain::rules::ClipSelector;
use crate::http::{self, AppState};
use crate::ports::SourcePort;
use crate::utils::time::format_seconds;

/// Execute the serve command
pub async fn serve(config: AppConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    if config.source.url.is_none() && !config.source.path.exists() {
        warn!(
            path = %config.source.path.display(),
            "No source URL configured and the source file is missing; generation will fail"
        );
    }

    let container = DefaultAppContainer::new(config).context("Failed to build services")?;
    info!(
        max_concurrent_jobs = container.config().runtime.max_concurrent_jobs,
        "Starting shortclip service"
    );
    http::serve(AppState::new(Arc::new(container)), addr).await?;
    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    input.with_file_name(format!("{}_short.mp4", stem))
}

/// Execute the clip command
pub async fn clip(config: AppConfig, args: ClipArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(anyhow::anyhow!(
            "Input file does not exist: {}",
            args.input.display()
        ));
    }
    let range = config
        .clip
        .duration_range()?
        .with_overrides(args.min, args.max)?;
    let policy = args.policy.unwrap_or(config.clip.short_source_policy);
    let output = args.output.unwrap_or_else(|| default_output(&args.input));

    let container = DefaultAppContainer::new(config).context("Failed to build services")?;
    let (source, plan) = container
        .clip_interactor()
        .clip_file(&args.input, &output, range, policy)
        .await
        .context("Clip extraction failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "input": source.path,
                "video_duration": source.duration_secs,
                "output": output,
                "plan": plan,
            }))?
        );
    } else {
        println!("Source:   {} ({})", source.path.display(), format_seconds(source.duration_secs));
        println!(
            "Clip:     {} -> {} ({:.2}s){}",
            format_seconds(plan.start_secs),
            format_seconds(plan.end_secs()),
            plan.duration_secs,
            if plan.fallback { " [whole source]" } else { "" }
        );
        println!("Output:   {}", output.display());
    }
    Ok(())
}

/// Execute the plan command
pub fn plan(config: &AppConfig, args: PlanArgs) -> Result<()> {
    let range = config
        .clip
        .duration_range()?
        .with_overrides(args.min, args.max)?;
    let policy = args.policy.unwrap_or(config.clip.short_source_policy);

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let plan = ClipSelector::select_clip(&mut rng, args.duration, range, policy)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "video_duration": args.duration,
            "range": range,
            "policy": policy,
            "plan": plan,
        }))?
    );
    Ok(())
}

/// Execute the fetch command
pub async fn fetch(config: AppConfig, args: FetchArgs) -> Result<()> {
    let ytdlp = YtDlp::new(&config.tools.ytdlp, config.tools.timeout());

    let path = if args.as_source {
        YtDlpSourceAdapter::new(ytdlp, Some(args.url.clone()), config.source.path.clone(), true)
            .ensure_local()
            .await
    } else {
        tokio::fs::create_dir_all(&args.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
        ytdlp
            .download(&args.url, &args.output_dir.join(TITLE_TEMPLATE))
            .await
    }
    .with_context(|| format!("Failed to fetch {}", args.url))?;

    info!(url = %args.url, path = %path.display(), "Video fetched");
    println!("{}", path.display());
    Ok(())
}

/// Execute the check command; fails when probing or extraction cannot run
pub async fn check(config: AppConfig, sources: &ConfigSources, args: CheckArgs) -> Result<()> {
    let show_config = args.show_config.then(|| config.to_toml_string()).transpose()?;
    let container = DefaultAppContainer::new(config).context("Failed to build services")?;
    let tools = container.clip_interactor().tool_status().await;
    let ready = tools.iter().all(|t| t.available);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "ready": ready,
                "config_file": sources.file,
                "env_overrides": sources.env_overrides,
                "cli_overrides": sources.cli_overrides,
                "tools": tools,
            }))?
        );
    } else {
        match &sources.file {
            Some(path) => println!("Config file: {}", path.display()),
            None => println!("Config file: (defaults)"),
        }
        println!(
            "Overrides:   {} from environment, {} from command line",
            sources.env_overrides, sources.cli_overrides
        );
        for tool in &tools {
            println!(
                "{:<8} {:<20} {}",
                tool.name,
                tool.program,
                if tool.available { "ok" } else { "MISSING" }
            );
        }
    }
    if let Some(toml) = show_config {
        println!("\n{}", toml);
    }

    if !ready {
        return Err(anyhow::anyhow!("Required tools are missing"));
    }
    Ok(())
}
