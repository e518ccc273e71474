//! Logging initialization for the dispatcher.
//!
//! Thin wrapper over the observability package so every binary sets up
//! tracing the same way.

pub use observability::LogFormat;

use crate::CoreResult;
use std::path::PathBuf;

/// Service name written into every JSON log line.
const SERVICE_NAME: &str = "message-dispatcher";

/// Initialize the logging system.
///
/// `RUST_LOG` overrides `level`. With `log_file` set, JSONL is also appended
/// there.
///
/// ```ignore
/// init_logging("info", LogFormat::Text, None)?;
/// tracing::info!("Dispatcher started");
/// ```
pub fn init_logging(level: &str, format: LogFormat, log_file: Option<PathBuf>) -> CoreResult<()> {
    observability::init_with_config(observability::LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.into(),
        format,
        log_path: log_file,
    })?;
    Ok(())
}
