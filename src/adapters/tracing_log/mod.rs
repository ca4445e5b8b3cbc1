// Tracing log adapter - Subscriber setup for structured logging

use tracing_subscriber::EnvFilter;

use crate::adapters::toml_config::LogFormat;
use crate::error::{ShortclipError, ShortclipResult};

/// Build the filter; `RUST_LOG` wins over the configured level when set
pub fn build_filter(level: &str) -> ShortclipResult<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(format!("{},tower_http=info", level.to_lowercase())),
    }
    .map_err(|e| ShortclipError::LoggingInit {
        message: e.to_string(),
    })
}

/// Install the global subscriber.
///
/// Calling this twice is harmless; the second call reports the existing
/// subscriber as an error which callers may ignore.
pub fn init_logging(level: &str, format: LogFormat) -> ShortclipResult<()> {
    let filter = build_filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };

    result.map_err(|e| ShortclipError::LoggingInit {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_levels() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return;
        }
        for level in ["trace", "DEBUG", "info", "warn", "error"] {
            assert!(build_filter(level).is_ok(), "{level}");
        }
    }

    #[test]
    fn test_second_init_reports_error() {
        let _ = init_logging("info", LogFormat::Text);
        assert!(matches!(
            init_logging("info", LogFormat::Json),
            Err(ShortclipError::LoggingInit { .. })
        ));
    }
}
