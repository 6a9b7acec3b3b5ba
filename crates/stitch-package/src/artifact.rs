//! Artifacts: files that flow through the pipeline

use crate::platform::PlatformTarget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What an artifact is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactRole {
    /// Packaged output of a subproject or entry point
    PrimaryOutput,
    /// Platform-specific native binary archive
    NativeBinary,
    /// Platform-independent runtime dependency archive
    RuntimeLibrary,
}

/// A file with a name, a location and a role.
///
/// Names are not unique: two artifacts from different locations may share a
/// file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    /// File name (last path component)
    pub name: String,
    /// Source location
    pub path: PathBuf,
    /// Role tag
    pub role: ArtifactRole,
    /// Platforms served by a native binary; empty for everything else
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<PlatformTarget>,
}

impl Artifact {
    /// Create an artifact, taking its name from the path's file name
    pub fn new(path: impl Into<PathBuf>, role: ArtifactRole) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path,
            role,
            platforms: Vec::new(),
        }
    }

    pub fn primary(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ArtifactRole::PrimaryOutput)
    }

    pub fn library(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ArtifactRole::RuntimeLibrary)
    }

    pub fn native(path: impl Into<PathBuf>, platforms: Vec<PlatformTarget>) -> Self {
        let mut artifact = Self::new(path, ArtifactRole::NativeBinary);
        artifact.platforms = platforms;
        artifact
    }

    pub fn is_native(&self) -> bool {
        self.role == ArtifactRole::NativeBinary
    }

    /// Whether this artifact serves the given platform
    pub fn serves(&self, platform: PlatformTarget) -> bool {
        self.platforms.contains(&platform)
    }

    /// Directory holding this artifact
    pub fn directory(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// File name of the non-native archive this native archive pairs with.
    ///
    /// `gluegen-rt-2.5.0-natives-linux-amd64.jar` pairs with
    /// `gluegen-rt-2.5.0.jar`. Returns `None` for non-native artifacts and
    /// for names without a `-natives-` qualifier.
    pub fn paired_primary_name(&self) -> Option<String> {
        if !self.is_native() {
            return None;
        }
        let idx = self.name.find("-natives-")?;
        let base = &self.name[..idx];
        let extension = Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned());
        Some(match extension {
            Some(ext) => format!("{}.{}", base, ext),
            None => base.to_string(),
        })
    }
}
