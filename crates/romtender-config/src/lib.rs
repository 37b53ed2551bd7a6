//! Configuration for romtender
//!
//! A single TOML file with `[paths]`, `[art]` and `[archive]` sections.
//! Every section and field has a default, so an empty file is valid.

mod art;
mod paths;

pub use art::{ArtCategory, ArtConfig};
pub use paths::PathsConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration locations
pub const CONFIG_DIR: &str = "/etc/romtender";
pub const USER_CONFIG_FILE: &str = "romtender.toml";

/// Archive settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Archive used when none is named
    #[serde(default = "default_archive_name")]
    pub default_name: String,
}

fn default_archive_name() -> String {
    ".Archive".to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            default_name: default_archive_name(),
        }
    }
}

/// Main romtender configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub art: ArtConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl ManagerConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let user_config = PathBuf::from(USER_CONFIG_FILE);
        if user_config.exists() {
            return Self::load(&user_config);
        }

        let system_config = Path::new(CONFIG_DIR).join("config.toml");
        if system_config.exists() {
            return Self::load(&system_config);
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject configurations the library cannot work with
    ///
    /// An out-of-range art threshold is only warned about; matching falls
    /// back to the default threshold on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.rom_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("paths.rom_root is empty".to_string()));
        }
        if self.archive.default_name.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Invalid(
                "archive.default_name is empty".to_string(),
            ));
        }
        if !(0.50..=0.85).contains(&self.art.threshold) {
            tracing::warn!(
                "art.threshold {} is outside 0.50-0.85; the default will be used",
                self.art.threshold
            );
        }
        Ok(())
    }
}
