//! Project Configuration (stitch.toml)
//!
//! Declares the subproject graph, the platform targets, the entry points to
//! package and the test suites.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Project configuration from stitch.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project metadata
    pub project: ProjectSection,

    /// Platform targets whose natives are pulled in
    #[serde(default)]
    pub platforms: PlatformsConfig,

    /// Subprojects, each with its compiled output and prerequisites
    #[serde(default, rename = "subproject")]
    pub subprojects: Vec<SubprojectConfig>,

    /// Entry points packaged from the root subproject
    #[serde(default, rename = "entry-point")]
    pub entry_points: Vec<EntryPointConfig>,

    /// Verification suites
    #[serde(default)]
    pub tests: TestsConfig,

    /// Tool launcher settings
    #[serde(default)]
    pub launcher: LauncherConfig,
}

/// `[project]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProjectSection {
    /// Project name
    pub name: String,

    /// Subproject that owns the entry points
    pub root: String,

    /// Output directory (default: "build")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,

    /// Dependency lockfile (default: "stitch.lock")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockfile: Option<PathBuf>,
}

/// `[platforms]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PlatformsConfig {
    /// Platform ids such as "linux-amd64"
    #[serde(default)]
    pub targets: Vec<String>,
}

/// `[[subproject]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SubprojectConfig {
    /// Subproject name
    pub name: String,

    /// Compiled output directory
    pub classes: PathBuf,

    /// Subprojects that must be built first
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Packaging mode of an entry point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    /// Own output only, dependencies listed in the manifest Class-Path
    Thin,
    /// Self-contained, dependencies embedded
    #[default]
    Fat,
}

/// `[[entry-point]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct EntryPointConfig {
    /// Entry point name, used on the command line
    pub name: String,

    /// Fully qualified main class
    pub main_class: String,

    /// Output archive file name (default: "<name>.jar")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Packaging mode (default: fat)
    #[serde(default)]
    pub mode: ArchiveMode,

    /// Extra files placed at the archive root
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<PathBuf>,
}

impl EntryPointConfig {
    /// Output archive file name
    pub fn output_name(&self) -> String {
        self.output
            .clone()
            .unwrap_or_else(|| format!("{}.jar", self.name))
    }
}

/// `[tests]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TestsConfig {
    /// Fast suite run by `stitch test`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<TestSuiteConfig>,

    /// Broader suite run by `stitch test --extended`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended: Option<TestSuiteConfig>,
}

/// A verification suite
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct TestSuiteConfig {
    /// Program and arguments
    pub command: Vec<String>,

    /// Compiled test classes
    pub classes: PathBuf,

    /// Extra lockfile dependencies (usually test-scoped) on this suite's classpath
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// `[launcher]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    /// Java executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java: Option<String>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.project.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "project.name".to_string(),
                reason: "name cannot be empty".to_string(),
            });
        }

        let mut names = HashSet::new();
        for sub in &self.subprojects {
            if sub.name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "subproject.name".to_string(),
                    reason: "name cannot be empty".to_string(),
                });
            }
            if !names.insert(sub.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate subproject '{}'",
                    sub.name
                )));
            }
        }

        // Prerequisite existence and cycles are checked by the build graph,
        // which reports the cycle path.
        if !names.contains(self.project.root.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "project.root".to_string(),
                reason: format!("'{}' is not a declared subproject", self.project.root),
            });
        }

        let mut entry_names = HashSet::new();
        let mut outputs = HashSet::new();
        let mut thin = 0;
        for entry in &self.entry_points {
            if entry.main_class.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("entry-point '{}'.main-class", entry.name),
                    reason: "main class cannot be empty".to_string(),
                });
            }
            if !entry_names.insert(entry.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate entry point '{}'",
                    entry.name
                )));
            }
            if !outputs.insert(entry.output_name()) {
                return Err(ConfigError::ValidationError(format!(
                    "Entry point '{}' writes to '{}', which another entry point already uses",
                    entry.name,
                    entry.output_name()
                )));
            }
            if entry.mode == ArchiveMode::Thin {
                thin += 1;
            }
        }
        if thin > 1 {
            return Err(ConfigError::ValidationError(
                "At most one entry point may use thin packaging".to_string(),
            ));
        }

        for (label, suite) in [
            ("tests.default", &self.tests.default),
            ("tests.extended", &self.tests.extended),
        ] {
            if let Some(suite) = suite {
                if suite.command.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{}.command", label),
                        reason: "command cannot be empty".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
