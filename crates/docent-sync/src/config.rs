//! Runtime configuration

use docent_core::ExhibitKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Request queue depth between router and synchronizer
    pub command_buffer_size: usize,
    /// Volume level reported when a tour starts loading
    pub default_volume_level: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 32,
            default_volume_level: 1.0,
        }
    }
}

/// Per-exhibit runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Exhibit this instance drives
    pub exhibit: ExhibitKind,
    /// Synchronizer settings
    pub sync: SyncConfig,
    /// Rehydrate from the retained state topic on mount
    pub recover_on_mount: bool,
    /// How long recovery waits for a retained state message
    pub recovery_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            exhibit: ExhibitKind::Basecamp,
            sync: SyncConfig::default(),
            recover_on_mount: true,
            recovery_timeout_ms: 2000,
        }
    }
}

impl RuntimeConfig {
    /// Default configuration for an exhibit
    pub fn for_exhibit(exhibit: ExhibitKind) -> Self {
        Self {
            exhibit,
            ..Default::default()
        }
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }

    /// Load from a JSON file; absent fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
