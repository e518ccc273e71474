//! # Observability
//!
//! Tracing subscriber setup shared by the message dispatcher binaries.
//!
//! Services call [`init_with_config`] once at startup and use the standard
//! `tracing` macros everywhere else. Output goes to stderr, either as compact
//! human-readable text or as one JSON object per line, and optionally also to
//! an append-only JSONL file.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "message-dispatcher".into(),
//!     default_level: "debug".into(),
//!     format: observability::LogFormat::Json,
//!     ..Default::default()
//! })?;
//! ```
//!
//! `RUST_LOG` always takes precedence over `default_level`.

mod file_writer;
mod json_layer;

pub use file_writer::FileLogWriter;
pub use json_layer::{JsonLayer, LogEntry};

use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Stderr output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "compact" => Ok(Self::Text),
            "json" | "jsonl" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Included in every JSON line for filtering.
    pub service_name: String,

    /// Default filter (e.g. "debug", "info,dispatch_core=debug").
    /// Overridden by `RUST_LOG`.
    pub default_level: String,

    pub format: LogFormat,

    /// Also append JSONL to this file.
    pub log_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            format: LogFormat::Text,
            log_path: None,
        }
    }
}

/// Install the global subscriber.
///
/// Fails only if the log file cannot be opened. A second call in the same
/// process leaves the first subscriber in place.
pub fn init_with_config(config: LogConfig) -> std::io::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let text_layer = (config.format == LogFormat::Text).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(std::io::stderr)
    });

    let json_layer = (config.format == LogFormat::Json)
        .then(|| JsonLayer::new(config.service_name.clone(), std::io::stderr));

    let file_layer = match &config.log_path {
        Some(path) => Some(JsonLayer::new(
            config.service_name.clone(),
            FileLogWriter::new(path)?,
        )),
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            service = %config.service_name,
            format = ?config.format,
            log_path = ?config.log_path,
            "observability initialized"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.log_path.is_none());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            service_name: "test".into(),
            log_path: Some(dir.path().join("logs").join("test.jsonl")),
            ..Default::default()
        };

        assert!(init_with_config(config.clone()).is_ok());
        assert!(init_with_config(config).is_ok());
    }
}
