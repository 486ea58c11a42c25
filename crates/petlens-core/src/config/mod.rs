//! Configuration management for PetLens.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default` with the values the
//! worker has always been deployed with.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `broker.uri`.
pub const BROKER_URI_ENV: &str = "PETLENS_BROKER_URI";

/// Root configuration structure for PetLens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker settings
    pub broker: BrokerConfig,

    /// Output variant settings
    pub variant: VariantConfig,

    /// Classification model settings
    pub model: ModelConfig,

    /// Image fetch settings
    pub fetch: FetchConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_or_default(&Self::default_path())
    }

    /// Load configuration from `path`, falling back to defaults (plus
    /// environment overrides) when the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let mut config = Self::default();
            config.apply_env();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.petlens.petlens/config.toml
    /// - Linux: ~/.config/petlens/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\petlens\config\config.toml
    ///
    /// Falls back to ~/.petlens/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "petlens", "petlens")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".petlens").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.model.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Full path of the ONNX model file.
    pub fn model_path(&self) -> PathBuf {
        self.model_dir().join(&self.model.model_file)
    }

    /// Full path of the class label file.
    pub fn labels_path(&self) -> PathBuf {
        self.model_dir().join(&self.model.labels_file)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(uri) = std::env::var(BROKER_URI_ENV) {
            if !uri.is_empty() {
                self.broker.uri = uri;
            }
        }
    }
}
