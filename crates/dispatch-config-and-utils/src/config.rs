//! Configuration management for the dispatcher.
//!
//! Layering, lowest precedence first: built-in defaults, the optional JSON
//! config file, environment variables. The binary applies CLI flags on top.

use crate::{CoreError, CoreResult, LogFormat, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default Redis URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Longest accepted dispatch interval (one week).
pub const MAX_DISPATCH_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// An environment override that failed to parse and was skipped.
///
/// Collected rather than logged on the spot: configuration is loaded before
/// the subscriber exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredEnvVar {
    pub variable: &'static str,
    pub value: String,
    pub reason: String,
}

impl IgnoredEnvVar {
    pub fn log(&self) {
        warn!(
            variable = self.variable,
            value = %self.value,
            error = %self.reason,
            "Ignoring invalid environment value"
        );
    }
}

/// Main dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Stderr log format: "text" or "json".
    pub log_format: String,
    /// SQLite file; `None` means [`Paths::database_file`].
    pub database_path: Option<PathBuf>,
    pub redis_url: String,
    /// Delivery webhook URL. Required to serve or dispatch.
    pub webhook_url: String,
    /// Sent as `x-ins-auth-key` when non-empty.
    pub webhook_auth_key: Option<String>,
    pub webhook_timeout_secs: u64,
    /// Seconds between dispatch cycles.
    pub dispatch_interval_secs: u64,
    /// Pending messages fetched per cycle.
    pub dispatch_batch_size: usize,
    /// HTTP control surface listen address.
    pub bind_addr: String,
    /// Start the scheduler together with the server.
    pub autostart: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: "text".to_string(),
            database_path: None,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            webhook_url: String::new(),
            webhook_auth_key: None,
            webhook_timeout_secs: 10,
            dispatch_interval_secs: 120,
            dispatch_batch_size: 2,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            autostart: true,
        }
    }
}

impl Config {
    /// Load the config file if present, then apply environment overrides.
    ///
    /// Overrides that failed to parse are returned for the caller to log.
    pub fn load(paths: &Paths) -> CoreResult<(Self, Vec<IgnoredEnvVar>)> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        let ignored = config.apply_env(|name| std::env::var(name).ok());
        Ok((config, ignored))
    }

    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    ///
    /// Unparseable numbers and booleans keep the current value and are
    /// reported in the returned list.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<IgnoredEnvVar>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut ignored = Vec::new();

        if let Some(level) = get("DISPATCH_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(format) = get("DISPATCH_LOG_FORMAT") {
            self.log_format = format;
        }
        if let Some(path) = get("DISPATCH_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(url) = get("REDIS_URL") {
            self.redis_url = url;
        }
        if let Some(url) = get("WEBHOOK_URL") {
            self.webhook_url = url;
        }
        // An explicitly empty key disables the header.
        if let Some(key) = lookup("WEBHOOK_AUTH_KEY") {
            self.webhook_auth_key = Some(key).filter(|k| !k.is_empty());
        }

        parse_env(&get, &mut ignored, "WEBHOOK_TIMEOUT_SECS", &mut self.webhook_timeout_secs);
        parse_env(&get, &mut ignored, "DISPATCH_INTERVAL_SECS", &mut self.dispatch_interval_secs);
        parse_env(&get, &mut ignored, "DISPATCH_BATCH_SIZE", &mut self.dispatch_batch_size);
        parse_env(&get, &mut ignored, "DISPATCH_AUTOSTART", &mut self.autostart);

        if let Some(addr) = get("DISPATCH_BIND_ADDR") {
            self.bind_addr = addr;
        } else if let Some(port) = get("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.bind_addr = format!("0.0.0.0:{port}"),
                Err(e) => ignored.push(IgnoredEnvVar {
                    variable: "PORT",
                    value: port,
                    reason: e.to_string(),
                }),
            }
        }

        ignored
    }

    /// Reject values the dispatcher cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.dispatch_interval_secs == 0 {
            return Err(CoreError::Config(
                "dispatch interval must be at least one second".to_string(),
            ));
        }
        if self.dispatch_interval_secs > MAX_DISPATCH_INTERVAL_SECS {
            return Err(CoreError::Config(format!(
                "dispatch interval must be at most {MAX_DISPATCH_INTERVAL_SECS} seconds"
            )));
        }
        if self.dispatch_batch_size == 0 {
            return Err(CoreError::Config(
                "dispatch batch size must be at least one".to_string(),
            ));
        }
        if self.webhook_timeout_secs == 0 {
            return Err(CoreError::Config(
                "webhook timeout must be at least one second".to_string(),
            ));
        }
        self.log_format()?;
        Ok(())
    }

    /// Parsed webhook URL; an empty URL is a configuration error.
    pub fn webhook_url(&self) -> CoreResult<Url> {
        if self.webhook_url.trim().is_empty() {
            return Err(CoreError::Config("WEBHOOK_URL is not set".to_string()));
        }
        Url::parse(&self.webhook_url).map_err(CoreError::from)
    }

    pub fn log_format(&self) -> CoreResult<LogFormat> {
        LogFormat::from_str(&self.log_format).map_err(CoreError::Config)
    }

    pub fn database_path(&self, paths: &Paths) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| paths.database_file())
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_secs)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }
}

fn parse_env<T, G>(get: &G, ignored: &mut Vec<IgnoredEnvVar>, name: &'static str, target: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(name) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(e) => ignored.push(IgnoredEnvVar {
                variable: name,
                value: raw,
                reason: e.to_string(),
            }),
        }
    }
}
