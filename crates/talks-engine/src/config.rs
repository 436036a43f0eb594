//! Configuration types for the talks client.
//!
//! The configuration lives in `.talks/config.json`. Every field has a
//! default, so a partial (or missing) file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scheduler::DEFAULT_MAX_TURNS;
use crate::scroll::DEFAULT_SCROLL_THRESHOLD;

/// Directory holding config and logs, relative to the working directory.
pub const CONFIG_DIR: &str = ".talks";

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the conversation server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Turns per run before the run completes.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Wait between turns, in milliseconds.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// Rows from the bottom still treated as "following" the conversation.
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: usize,

    /// Timeout for a single request to the server, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where exported snapshots are written.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Model override for the first participant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_a: Option<String>,

    /// Model override for the second participant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_b: Option<String>,
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".into()
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

fn default_pacing_delay_ms() -> u64 {
    1500
}

fn default_scroll_threshold() -> usize {
    DEFAULT_SCROLL_THRESHOLD
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            max_turns: default_max_turns(),
            pacing_delay_ms: default_pacing_delay_ms(),
            scroll_threshold: default_scroll_threshold(),
            request_timeout_secs: default_request_timeout_secs(),
            export_dir: default_export_dir(),
            model_a: None,
            model_b: None,
        }
    }
}

impl Config {
    /// Default location of the config file under `root`.
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join("config.json")
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading or writing config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing config JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Error serializing config to JSON.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
}
