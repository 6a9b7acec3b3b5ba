//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult, PROJECT_FILE};
use std::env;
use std::path::{Path, PathBuf};

/// Default build directory, relative to the project root
pub const DEFAULT_BUILD_DIR: &str = "build";
/// Default lockfile, relative to the project root
pub const DEFAULT_LOCKFILE: &str = "stitch.lock";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.stitch/config.toml) - lowest priority
/// 2. Project config (./stitch.toml) - overrides global
/// 3. Environment variables - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
    /// Skip the global config entirely
    skip_global: bool,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where stitch.toml was found)
    pub project_root: PathBuf,

    /// Continuous-integration signal (the `CI` variable is set)
    pub ci: bool,

    /// Platform ids from STITCH_PLATFORMS
    pub platform_override: Option<Vec<String>>,

    /// Build directory from STITCH_BUILD_DIR
    pub build_dir_override: Option<PathBuf>,

    /// Java executable from STITCH_JAVA
    pub java_override: Option<String>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
            skip_global: false,
        }
    }

    /// Read the global config from `path` instead of the home directory
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Ignore the global config
    pub fn without_global_config(mut self) -> Self {
        self.skip_global = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find stitch.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        self.finish(project_root, project_config)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project_root = config_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        self.finish(project_root, project_config)
    }

    fn finish(&mut self, project_root: PathBuf, project: ProjectConfig) -> ConfigResult<Config> {
        let global = if self.skip_global {
            GlobalConfig::default()
        } else {
            self.load_global_config()?
        };

        let mut config = Config {
            project,
            global,
            project_root,
            ci: false,
            platform_override: None,
            build_dir_override: None,
            java_override: None,
        };
        apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(&self, start_dir: &Path) -> ConfigResult<(PathBuf, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((current, project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Err(ConfigError::NotFound(start_dir.to_path_buf())),
            }
        }
    }

    /// Load global configuration; a missing file means defaults
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match GlobalConfig::global_config_path() {
                Ok(path) => {
                    self.global_config_path = Some(path.clone());
                    path
                }
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply environment variable overrides
///
/// - `CI`: presence (any value) turns on the continuous-integration signal
/// - `STITCH_PLATFORMS`: comma-separated platform ids
/// - `STITCH_BUILD_DIR`: build directory
/// - `STITCH_JAVA`: java executable
fn apply_env_overrides(config: &mut Config) {
    config.ci = env::var_os("CI").is_some();

    if let Ok(platforms) = env::var("STITCH_PLATFORMS") {
        let ids: Vec<String> = platforms
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if !ids.is_empty() {
            config.platform_override = Some(ids);
        }
    }

    if let Some(dir) = env::var_os("STITCH_BUILD_DIR") {
        config.build_dir_override = Some(PathBuf::from(dir));
    }

    if let Ok(java) = env::var("STITCH_JAVA") {
        config.java_override = Some(java);
    }
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Effective build directory (env > project > default), absolute
    pub fn build_dir(&self) -> PathBuf {
        let dir = self
            .build_dir_override
            .clone()
            .or_else(|| self.project.project.build_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR));
        self.resolve_path(&dir)
    }

    /// Effective lockfile path, absolute
    pub fn lockfile_path(&self) -> PathBuf {
        let file = self
            .project
            .project
            .lockfile
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCKFILE));
        self.resolve_path(&file)
    }

    /// Effective platform ids (env > project > global)
    pub fn platforms(&self) -> Vec<String> {
        if let Some(ids) = &self.platform_override {
            return ids.clone();
        }
        if !self.project.platforms.targets.is_empty() {
            return self.project.platforms.targets.clone();
        }
        self.global.default_platforms().to_vec()
    }

    /// Effective java executable (env > project > global > "java")
    pub fn java(&self) -> &str {
        self.java_override
            .as_deref()
            .or(self.project.launcher.java.as_deref())
            .or_else(|| self.global.default_java())
            .unwrap_or("java")
    }

    /// Resolve a project-relative path against the project root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
