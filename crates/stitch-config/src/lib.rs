//! Stitch Configuration System
//!
//! Provides configuration management for Stitch pipelines including:
//! - Project configuration (stitch.toml)
//! - Global user configuration (~/.stitch/config.toml)
//! - Environment overrides (CI, STITCH_*)
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.stitch/config.toml)
//! 2. Project config (./stitch.toml)
//! 3. Environment variables (CI, STITCH_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use stitch_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("building {}", config.project.project.name);
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No stitch.toml found in {0} or any parent directory")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Name of the project configuration file
pub const PROJECT_FILE: &str = "stitch.toml";

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::{
    ArchiveMode, EntryPointConfig, LauncherConfig, PlatformsConfig, ProjectConfig,
    ProjectSection, SubprojectConfig, TestSuiteConfig, TestsConfig,
};
