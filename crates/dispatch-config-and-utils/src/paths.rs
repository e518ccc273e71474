//! File system paths for the dispatcher.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name under the home directory.
const BASE_DIR_NAME: &str = ".message-dispatcher";

/// Manages file system paths for the dispatcher.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.message-dispatcher)
    base_dir: PathBuf,
}

impl Paths {
    /// Paths rooted at `~/.message-dispatcher`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Optional JSON config file (~/.message-dispatcher/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Default SQLite database (~/.message-dispatcher/messages.db).
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("messages.db")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// JSONL log file (~/.message-dispatcher/logs/dispatcher.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("dispatcher.jsonl")
    }

    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
