//! Coordinator configuration.

use outline_tree::BuilderArgs;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors while reading or writing a config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where builds run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// On a background task of the current tokio runtime.
    #[default]
    Async,
    /// Inline on the caller of `request_build`.
    Sync,
}

/// Configuration for the build coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub mode: BuildMode,
    /// Delay between checks while waiting for a superseded build to unwind.
    pub poll_interval_ms: u64,
    /// Item categories to build.
    pub builder: BuilderArgs,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            mode: BuildMode::Async,
            poll_interval_ms: 20,
            builder: BuilderArgs::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Reads a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
