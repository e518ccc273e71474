//! Configuration, file system paths and logging bootstrap for the message
//! dispatcher.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, IgnoredEnvVar, DEFAULT_BIND_ADDR, DEFAULT_LOG_LEVEL, DEFAULT_REDIS_URL,
    MAX_DISPATCH_INTERVAL_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, LogFormat};
pub use paths::Paths;
