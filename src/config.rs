//! Interpreter configuration
//!
//! Which channels a program may use and where their backing files live.
//! The configuration is an explicit value handed to every `Environment`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::security::SecurityLabel;

/// Where channel backing files are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Shared files directly under the channel directory
    #[default]
    Dev,
    /// One file per channel and session under `temp/`
    Prod,
}

/// Top-level interpreter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecLangConfig {
    /// Channel names a program may open. Each must be the long name of a
    /// security class.
    #[serde(default = "default_supported_channels")]
    pub supported_channels: Vec<String>,

    /// Backing file layout.
    #[serde(default)]
    pub mode: RunMode,

    /// Root directory for channel backing files.
    #[serde(default = "default_channel_dir")]
    pub channel_dir: PathBuf,
}

fn default_supported_channels() -> Vec<String> {
    SecurityLabel::ALL.iter().map(|label| label.name().to_string()).collect()
}

fn default_channel_dir() -> PathBuf {
    PathBuf::from("resources/channels")
}

impl Default for SecLangConfig {
    fn default() -> Self {
        Self {
            supported_channels: default_supported_channels(),
            mode: RunMode::default(),
            channel_dir: default_channel_dir(),
        }
    }
}

impl SecLangConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SecLangConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check that every supported channel names a security class, once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supported_channels.is_empty() {
            return Err(ConfigError::Validation(
                "supported_channels must name at least one channel".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.supported_channels {
            if SecurityLabel::of_channel(name).is_none() {
                return Err(ConfigError::Validation(format!(
                    "channel '{}' does not name a security class",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "channel '{}' is listed more than once",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn supports(&self, channel: &str) -> bool {
        self.supported_channels.iter().any(|name| name == channel)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Semantically invalid configuration.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A production layout needs a session to namespace files.
    #[error("prod mode requires a session identifier")]
    MissingSession,
}
