//! Global Configuration (~/.stitch/config.toml)
//!
//! Handles user-level defaults shared by every project.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.stitch/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Platform targets used when a project declares none
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,

    /// Java executable used when a project declares none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java: Option<String>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })
    }

    /// Path of the global configuration file
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".stitch").join("config.toml"))
    }

    /// Default platform targets, if any
    pub fn default_platforms(&self) -> &[String] {
        self.defaults
            .as_ref()
            .map(|d| d.platforms.as_slice())
            .unwrap_or(&[])
    }

    /// Default java executable, if any
    pub fn default_java(&self) -> Option<&str> {
        self.defaults.as_ref().and_then(|d| d.java.as_deref())
    }
}
