// Adapters - External system implementations

pub mod command_tool;
pub mod exec_ffmpeg;
pub mod http_source;
pub mod probe_ffprobe;
#[cfg(feature = "libav")]
pub mod probe_libav;
pub mod process;
pub mod toml_config;
pub mod tracing_log;
pub mod ytdlp_source;

// Re-export adapters
pub use command_tool::{PipelineRenderer, ScriptTranscriber};
pub use exec_ffmpeg::FFmpegAdapter;
pub use http_source::HttpSourceAdapter;
pub use probe_ffprobe::FFprobeAdapter;
#[cfg(feature = "libav")]
pub use probe_libav::ProbeLibavAdapter;
pub use toml_config::AppConfig;
pub use tracing_log::init_logging;
pub use ytdlp_source::{YtDlp, YtDlpSourceAdapter};
