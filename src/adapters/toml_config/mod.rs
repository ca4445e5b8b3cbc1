// TOML config adapter - Typed configuration loaded from TOML files and environment

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::model::*;
use crate::error::{ShortclipError, ShortclipResult};

/// Config files probed, in order, when no explicit path is given
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/production.toml",
    "config/development.toml",
    "shortclip.toml",
];

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub clip: ClipConfig,
    pub tools: ToolsConfig,
    pub transcribe: CommandConfig,
    pub render: CommandConfig,
    pub storage: StorageConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            source: SourceConfig::default(),
            clip: ClipConfig::default(),
            tools: ToolsConfig::default(),
            transcribe: CommandConfig::transcribe_defaults(),
            render: CommandConfig::render_defaults(),
            storage: StorageConfig::default(),
            runtime: RuntimeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7243,
        }
    }
}

/// How the source URL is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    /// Plain HTTP GET of a direct media URL
    #[default]
    Http,
    /// Video page URL resolved and merged to mp4 by yt-dlp
    Ytdlp,
}

impl FromStr for SourceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(SourceBackend::Http),
            "ytdlp" | "yt-dlp" => Ok(SourceBackend::Ytdlp),
            other => Err(format!("Invalid source backend: {}. Valid backends: http, ytdlp", other)),
        }
    }
}

/// Where the source video comes from and where it is cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub backend: SourceBackend,
    pub path: PathBuf,
    /// Download again on every request instead of reusing the local copy
    pub refresh: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            backend: SourceBackend::default(),
            path: PathBuf::from("./clip/video.mp4"),
            refresh: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    pub min_duration_secs: u32,
    pub max_duration_secs: u32,
    pub short_source_policy: ShortSourcePolicy,
    pub aspect_ratio: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
}

impl Default for ClipConfig {
    fn default() -> Self {
        let encode = EncodeSettings::default();
        Self {
            min_duration_secs: DEFAULT_MIN_DURATION_SECS,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            short_source_policy: ShortSourcePolicy::default(),
            aspect_ratio: AspectRatio::VERTICAL.to_string(),
            video_codec: encode.video_codec,
            audio_codec: encode.audio_codec,
            preset: encode.preset,
        }
    }
}

impl ClipConfig {
    pub fn duration_range(&self) -> Result<DurationRange, crate::domain::errors::DomainError> {
        DurationRange::new(self.min_duration_secs, self.max_duration_secs)
    }

    pub fn aspect(&self) -> Result<AspectRatio, crate::domain::errors::DomainError> {
        AspectRatio::parse(&self.aspect_ratio)
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            preset: self.preset.clone(),
        }
    }
}

/// Which backend answers duration probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    #[default]
    Ffprobe,
    /// In-process probe, needs the `libav` feature
    Libav,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffprobe: String,
    pub ffmpeg: String,
    pub ytdlp: String,
    pub probe_backend: ProbeBackend,
    /// Kill any external tool still running after this many seconds
    pub timeout_secs: Option<u64>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ytdlp: "yt-dlp".to_string(),
            probe_backend: ProbeBackend::default(),
            timeout_secs: None,
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// An external command described by a program and an argument template.
///
/// Arguments may contain `{input}`, `{output}` and `{session}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// File name of the artifact the command produces inside the session
    pub output_name: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self::transcribe_defaults()
    }
}

impl CommandConfig {
    pub fn transcribe_defaults() -> Self {
        Self {
            enabled: true,
            program: "node".to_string(),
            args: vec!["./sub.mjs".to_string(), "{input}".to_string()],
            working_dir: PathBuf::from("."),
            output_name: "clip.json".to_string(),
        }
    }

    pub fn render_defaults() -> Self {
        Self {
            enabled: true,
            program: "npx".to_string(),
            args: vec![
                "remotion".to_string(),
                "render".to_string(),
                "CaptionedVideo".to_string(),
                "{output}".to_string(),
            ],
            working_dir: PathBuf::from("."),
            output_name: "CaptionedVideo.mp4".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Scratch space; one directory per session, removed when the session ends
    pub work_dir: PathBuf,
    /// Published clips and transcripts, one directory per session
    pub public_dir: PathBuf,
    /// Rendered videos, one directory per session
    pub out_dir: PathBuf,
    pub clip_name: String,
    /// Delete a session's outputs this long after its last use
    pub retention_secs: Option<u64>,
    /// Directories exposed under `/static/<name>/`
    pub static_roots: BTreeMap<String, PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut static_roots = BTreeMap::new();
        static_roots.insert("public".to_string(), PathBuf::from("./public"));
        static_roots.insert("out".to_string(), PathBuf::from("./out"));
        Self {
            work_dir: PathBuf::from("./clip/sessions"),
            public_dir: PathBuf::from("./public"),
            out_dir: PathBuf::from("./out"),
            clip_name: "clip.mp4".to_string(),
            retention_secs: None,
            static_roots,
        }
    }
}

impl StorageConfig {
    pub fn retention(&self) -> Option<Duration> {
        self.retention_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub max_concurrent_jobs: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: num_cpus::get().max(1),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Invalid log format: {}. Valid formats: text, json", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML content; `origin` only labels errors
    pub fn from_toml_str(content: &str, origin: &str) -> ShortclipResult<Self> {
        // Render has different defaults from transcribe, so seed them before merging
        let mut value: toml::Value =
            toml::from_str(content).map_err(|e| ShortclipError::ConfigParse {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        if let Some(table) = value.as_table_mut() {
            let defaults = toml::Value::try_from(CommandConfig::render_defaults()).map_err(|e| {
                ShortclipError::ConfigParse {
                    path: origin.to_string(),
                    message: e.to_string(),
                }
            })?;
            let render = table
                .entry("render")
                .or_insert(toml::Value::Table(toml::map::Map::new()));
            if let (Some(render), Some(defaults)) = (render.as_table_mut(), defaults.as_table()) {
                for (key, default) in defaults {
                    render.entry(key.clone()).or_insert(default.clone());
                }
            }
        }

        value.try_into().map_err(|e: toml::de::Error| ShortclipError::ConfigParse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Load configuration from file
    pub fn load_file(path: &Path) -> ShortclipResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ShortclipError::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Load the explicit file, or the first default file that exists, or defaults
    pub fn discover(explicit: Option<&Path>) -> ShortclipResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load_file(path)?, Some(path.to_path_buf())));
        }
        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Ok((Self::load_file(path)?, Some(path.to_path_buf())));
            }
        }
        Ok((Self::new(), None))
    }

    /// Apply `SHORTCLIP_*` overrides; returns how many were applied
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ShortclipResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        let mut take = |var: &str| {
            let value = lookup(var);
            if value.is_some() {
                tracing::debug!(var, "Found environment override");
                applied += 1;
            }
            value
        };

        if let Some(v) = take("SHORTCLIP_HOST") {
            self.server.host = v;
        }
        if let Some(v) = take("SHORTCLIP_PORT") {
            self.server.port = parse_env("SHORTCLIP_PORT", &v)?;
        }
        if let Some(v) = take("SHORTCLIP_SOURCE_URL") {
            self.source.url = Some(v).filter(|url| !url.is_empty());
        }
        if let Some(v) = take("SHORTCLIP_SOURCE_BACKEND") {
            self.source.backend = parse_env("SHORTCLIP_SOURCE_BACKEND", &v)?;
        }
        if let Some(v) = take("SHORTCLIP_SOURCE_PATH") {
            self.source.path = PathBuf::from(v);
        }
        if let Some(v) = take("SHORTCLIP_MIN_DURATION") {
            self.clip.min_duration_secs = parse_env("SHORTCLIP_MIN_DURATION", &v)?;
        }
        if let Some(v) = take("SHORTCLIP_MAX_DURATION") {
            self.clip.max_duration_secs = parse_env("SHORTCLIP_MAX_DURATION", &v)?;
        }
        if let Some(v) = take("SHORTCLIP_SHORT_SOURCE_POLICY") {
            self.clip.short_source_policy =
                ShortSourcePolicy::parse(&v).map_err(|_| ShortclipError::InvalidEnv {
                    var: "SHORTCLIP_SHORT_SOURCE_POLICY".to_string(),
                    value: v.clone(),
                })?;
        }
        if let Some(v) = take("SHORTCLIP_FFPROBE") {
            self.tools.ffprobe = v;
        }
        if let Some(v) = take("SHORTCLIP_FFMPEG") {
            self.tools.ffmpeg = v;
        }
        if let Some(v) = take("SHORTCLIP_YTDLP") {
            self.tools.ytdlp = v;
        }
        if let Some(v) = take("SHORTCLIP_TOOL_TIMEOUT") {
            self.tools.timeout_secs = Some(parse_env("SHORTCLIP_TOOL_TIMEOUT", &v)?);
        }
        if let Some(v) = take("SHORTCLIP_TRANSCRIBE_ENABLED") {
            self.transcribe.enabled = parse_env("SHORTCLIP_TRANSCRIBE_ENABLED", &v)?;
        }
        if let Some(v) = take("SHORTCLIP_RENDER_ENABLED") {
            self.render.enabled = parse_env("SHORTCLIP_RENDER_ENABLED", &v)?;
        }
        if let Some(v) = take("SHORTCLIP_RETENTION_SECS") {
            self.storage.retention_secs = Some(parse_env("SHORTCLIP_RETENTION_SECS", &v)?);
        }
        if let Some(v) = take("SHORTCLIP_MAX_CONCURRENT_JOBS") {
            self.runtime.max_concurrent_jobs = parse_env("SHORTCLIP_MAX_CONCURRENT_JOBS", &v)?;
        }
        if let Some(v) = take("SHORTCLIP_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = take("SHORTCLIP_LOG_FORMAT") {
            self.logging.format = parse_env("SHORTCLIP_LOG_FORMAT", &v)?;
        }

        Ok(applied)
    }

    /// Validate configuration
    pub fn validate(&self) -> ShortclipResult<()> {
        let invalid = |message: String| Err(ShortclipError::InvalidConfig { message });

        if let Err(e) = self.clip.duration_range() {
            return invalid(e.to_string());
        }
        if let Err(e) = self.clip.aspect() {
            return invalid(e.to_string());
        }
        if [&self.tools.ffmpeg, &self.tools.ffprobe, &self.tools.ytdlp]
            .iter()
            .any(|program| program.trim().is_empty())
        {
            return invalid("Tool program names cannot be empty".to_string());
        }
        if self.tools.timeout_secs == Some(0) {
            return invalid("tools.timeout_secs must be positive".to_string());
        }
        for (name, command) in [("transcribe", &self.transcribe), ("render", &self.render)] {
            if command.enabled && command.program.trim().is_empty() {
                return invalid(format!("{}.program cannot be empty", name));
            }
        }
        if self.runtime.max_concurrent_jobs == 0 {
            return invalid("runtime.max_concurrent_jobs must be at least 1".to_string());
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return invalid(format!(
                "Invalid log level: {}. Valid levels: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        for name in self.storage.static_roots.keys() {
            let safe = !name.is_empty()
                && !name.starts_with('.')
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !safe {
                return invalid(format!("Invalid static root name: {}", name));
            }
        }
        if self.storage.clip_name.contains(['/', '\\']) {
            return invalid("storage.clip_name must be a bare file name".to_string());
        }
        if cfg!(not(feature = "libav")) && self.tools.probe_backend == ProbeBackend::Libav {
            return invalid("probe_backend = \"libav\" requires the libav feature".to_string());
        }
        Ok(())
    }

    /// Serialize the effective configuration
    pub fn to_toml_string(&self) -> ShortclipResult<String> {
        toml::to_string_pretty(self).map_err(|e| ShortclipError::InvalidConfig {
            message: e.to_string(),
        })
    }
}

fn parse_env<T: FromStr>(var: &str, value: &str) -> ShortclipResult<T> {
    value.trim().parse().map_err(|_| ShortclipError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}
