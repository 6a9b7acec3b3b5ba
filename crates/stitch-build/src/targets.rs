/// Entry points and packaging modes
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stitch_config::{ArchiveMode, EntryPointConfig};

/// How an entry point's archive is packaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingMode {
    /// Own output only; dependencies referenced through the manifest `Class-Path`
    Thin,
    /// Self-contained; every classpath entry embedded
    Fat,
}

impl PackagingMode {
    pub fn embeds_classpath(&self) -> bool {
        matches!(self, Self::Fat)
    }
}

impl From<ArchiveMode> for PackagingMode {
    fn from(mode: ArchiveMode) -> Self {
        match mode {
            ArchiveMode::Thin => Self::Thin,
            ArchiveMode::Fat => Self::Fat,
        }
    }
}

impl std::fmt::Display for PackagingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thin => write!(f, "thin"),
            Self::Fat => write!(f, "fat"),
        }
    }
}

/// A runnable archive built from the root subproject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Name used to select the entry point
    pub name: String,
    /// Fully qualified main class
    pub main_class: String,
    /// Archive file name
    pub output_name: String,
    /// Files placed at the archive root
    pub extra_files: Vec<PathBuf>,
    pub mode: PackagingMode,
}

impl EntryPoint {
    /// Create a fat entry point writing `<name>.jar`
    pub fn new(name: impl Into<String>, main_class: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            output_name: format!("{}.jar", name),
            name,
            main_class: main_class.into(),
            extra_files: Vec::new(),
            mode: PackagingMode::Fat,
        }
    }

    pub fn with_mode(mut self, mode: PackagingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_output_name(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = output_name.into();
        self
    }

    pub fn with_extra_files(mut self, files: Vec<PathBuf>) -> Self {
        self.extra_files = files;
        self
    }

    /// Build from configuration, resolving extra files against `root`
    pub fn from_config(config: &EntryPointConfig, root: &Path) -> Self {
        Self::new(&config.name, &config.main_class)
            .with_mode(config.mode.into())
            .with_output_name(config.output_name())
            .with_extra_files(config.include.iter().map(|p| root.join(p)).collect())
    }

    pub fn is_thin(&self) -> bool {
        self.mode == PackagingMode::Thin
    }
}
