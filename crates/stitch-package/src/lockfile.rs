//! Dependency lockfile (stitch.lock) for reproducible assembly
//!
//! The lockfile pins every logical dependency to concrete files on disk,
//! including one file per native variant.

use crate::artifact::Artifact;
use crate::platform::PlatformTarget;
use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Lockfile structure (stitch.lock)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lockfile {
    /// Lockfile format version
    pub version: u32,
    /// Locked dependencies, in declaration order
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<LockedDependency>,
    /// Metadata
    #[serde(default)]
    pub metadata: LockfileMetadata,
}

impl Lockfile {
    /// Current lockfile format version
    pub const VERSION: u32 = 1;

    /// Create new empty lockfile
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            dependencies: Vec::new(),
            metadata: LockfileMetadata::default(),
        }
    }

    /// Parse lockfile from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let lockfile: Self = toml::from_str(content)?;
        lockfile.verify()?;
        Ok(lockfile)
    }

    /// Load lockfile from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
        Self::from_str(&content)
    }

    /// Serialize to TOML string
    pub fn to_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write lockfile to file.
    ///
    /// The content goes to a temporary file in the same directory, which then
    /// replaces `path`; an interrupted write leaves the old lockfile intact.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = self.to_string()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PackageError::io(dir, e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| PackageError::io(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| PackageError::io(path, e.error))?;
        Ok(())
    }

    /// Get locked dependency by name
    pub fn get_dependency(&self, name: &str) -> Option<&LockedDependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    /// Dependencies visible on the runtime classpath, in declaration order
    pub fn runtime_dependencies(&self) -> impl Iterator<Item = &LockedDependency> {
        self.dependencies.iter().filter(|d| d.scope.is_runtime())
    }

    /// Verify lockfile integrity
    pub fn verify(&self) -> Result<()> {
        if self.version > Self::VERSION {
            return Err(PackageError::InvalidLockfile(format!(
                "Lockfile version {} is newer than supported version {}",
                self.version,
                Self::VERSION
            )));
        }

        let mut seen = HashSet::new();
        for dep in &self.dependencies {
            if dep.name.is_empty() {
                return Err(PackageError::InvalidLockfile(
                    "Dependency name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(&dep.name) {
                return Err(PackageError::InvalidLockfile(format!(
                    "Duplicate dependency in lockfile: {}",
                    dep.name
                )));
            }

            let mut served = HashSet::new();
            for native in &dep.natives {
                if native.platforms.is_empty() {
                    return Err(PackageError::InvalidLockfile(format!(
                        "Native variant {} of '{}' serves no platform",
                        native.file.display(),
                        dep.name
                    )));
                }
                for platform in &native.platforms {
                    if !served.insert(*platform) {
                        return Err(PackageError::InvalidLockfile(format!(
                            "Dependency '{}' declares more than one native variant for {}",
                            dep.name, platform
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Recompute checksums for every locked file present under `root` and
    /// stamp the generation time
    pub fn refresh_checksums(&mut self, root: &Path) -> Result<usize> {
        let mut updated = 0;
        for dep in &mut self.dependencies {
            let path = root.join(&dep.file);
            if path.is_file() {
                dep.checksum = Some(sha256_file(&path)?);
                updated += 1;
            } else {
                tracing::warn!(dependency = %dep.name, path = %path.display(), "locked file missing, checksum not refreshed");
            }
            for native in &mut dep.natives {
                let path = root.join(&native.file);
                if path.is_file() {
                    native.checksum = Some(sha256_file(&path)?);
                    updated += 1;
                } else {
                    tracing::warn!(dependency = %dep.name, path = %path.display(), "native file missing, checksum not refreshed");
                }
            }
        }

        self.metadata.stitch_version = Some(env!("CARGO_PKG_VERSION").to_string());
        self.metadata.generated_at =
            Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true));

        Ok(updated)
    }
}

impl Default for Lockfile {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a dependency is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyScope {
    /// Compile and runtime classpath
    #[default]
    Implementation,
    /// Runtime classpath only
    Runtime,
    /// Test classpaths only
    Test,
}

impl DependencyScope {
    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::Implementation | Self::Runtime)
    }
}

/// Locked dependency entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockedDependency {
    /// Dependency name
    pub name: String,
    /// Resolved version
    pub version: String,
    /// Visibility
    #[serde(default)]
    pub scope: DependencyScope,
    /// Platform-independent archive, relative to the project root
    pub file: PathBuf,
    /// sha256 of `file`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Native variants
    #[serde(default, rename = "native", skip_serializing_if = "Vec::is_empty")]
    pub natives: Vec<LockedNative>,
}

impl LockedDependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            scope: DependencyScope::Implementation,
            file: file.into(),
            checksum: None,
            natives: Vec::new(),
        }
    }

    pub fn with_native(mut self, native: LockedNative) -> Self {
        self.natives.push(native);
        self
    }

    /// Whether this dependency ships native binaries at all
    pub fn has_natives(&self) -> bool {
        !self.natives.is_empty()
    }

    /// The platform-independent artifact, located under `root`
    pub fn library_artifact(&self, root: &Path) -> Artifact {
        Artifact::library(root.join(&self.file))
    }
}

/// Native variant of a locked dependency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockedNative {
    /// Platforms this file serves; more than one makes it a universal variant
    pub platforms: Vec<PlatformTarget>,
    /// Native archive, relative to the project root
    pub file: PathBuf,
    /// sha256 of `file`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl LockedNative {
    pub fn new(platforms: Vec<PlatformTarget>, file: impl Into<PathBuf>) -> Self {
        Self {
            platforms,
            file: file.into(),
            checksum: None,
        }
    }

    /// The native artifact, located under `root`
    pub fn artifact(&self, root: &Path) -> Artifact {
        Artifact::native(root.join(&self.file), self.platforms.clone())
    }
}

/// Lockfile metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LockfileMetadata {
    /// When checksums were last refreshed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    /// Stitch version used to refresh the lockfile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stitch_version: Option<String>,
}

/// Compute the sha256 of a file as lowercase hex
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| PackageError::io(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| PackageError::io(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Check a file against an expected sha256, if one is recorded
pub fn verify_checksum(path: &Path, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(PackageError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
version = 1

[[dependency]]
name = "jna"
version = "5.14.0"
file = "libs/jna-5.14.0.jar"

[[dependency]]
name = "jogl-all"
version = "2.5.0"
file = "libs/jogl-all-2.5.0.jar"

[[dependency.native]]
platforms = ["linux-amd64"]
file = "libs/jogl-all-2.5.0-natives-linux-amd64.jar"

[[dependency.native]]
platforms = ["macos-universal"]
file = "libs/jogl-all-2.5.0-natives-macosx-universal.jar"

[[dependency]]
name = "junit"
version = "4.13.2"
scope = "test"
file = "libs/junit-4.13.2.jar"
"#;

    #[test]
    fn test_create_empty_lockfile() {
        let lockfile = Lockfile::new();
        assert_eq!(lockfile.version, Lockfile::VERSION);
        assert!(lockfile.dependencies.is_empty());
    }

    #[test]
    fn test_parse_lockfile() {
        let lockfile = Lockfile::from_str(SAMPLE).unwrap();
        assert_eq!(lockfile.dependencies.len(), 3);

        let jogl = lockfile.get_dependency("jogl-all").unwrap();
        assert_eq!(jogl.natives.len(), 2);
        assert_eq!(jogl.natives[0].platforms, vec![PlatformTarget::LINUX_AMD64]);
        assert!(jogl.has_natives());

        let junit = lockfile.get_dependency("junit").unwrap();
        assert_eq!(junit.scope, DependencyScope::Test);
    }

    #[test]
    fn test_runtime_dependencies_skip_test_scope() {
        let lockfile = Lockfile::from_str(SAMPLE).unwrap();
        let names: Vec<_> = lockfile.runtime_dependencies().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["jna", "jogl-all"]);
    }

    #[test]
    fn test_unknown_platform_in_lockfile() {
        let toml = r#"
version = 1

[[dependency]]
name = "giac"
version = "1.0"
file = "giac.jar"

[[dependency.native]]
platforms = ["amiga-m68k"]
file = "giac-natives.jar"
"#;
        assert!(Lockfile::from_str(toml).is_err());
    }

    #[test]
    fn test_verify_duplicate_dependencies() {
        let mut lockfile = Lockfile::new();
        lockfile
            .dependencies
            .push(LockedDependency::new("foo", "1.0", "foo-1.0.jar"));
        lockfile
            .dependencies
            .push(LockedDependency::new("foo", "2.0", "foo-2.0.jar"));

        let err = lockfile.verify().unwrap_err();
        assert!(err.to_string().contains("Duplicate dependency"));
    }

    #[test]
    fn test_verify_overlapping_variants() {
        let mut lockfile = Lockfile::new();
        lockfile.dependencies.push(
            LockedDependency::new("gluegen-rt", "2.5.0", "gluegen-rt-2.5.0.jar")
                .with_native(LockedNative::new(
                    vec![PlatformTarget::LINUX_AMD64, PlatformTarget::WINDOWS_AMD64],
                    "gluegen-rt-2.5.0-natives-all.jar",
                ))
                .with_native(LockedNative::new(
                    vec![PlatformTarget::LINUX_AMD64],
                    "gluegen-rt-2.5.0-natives-linux-amd64.jar",
                )),
        );

        let err = lockfile.verify().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_verify_newer_version() {
        let mut lockfile = Lockfile::new();
        lockfile.version = Lockfile::VERSION + 1;
        assert!(lockfile.verify().is_err());
    }

    #[test]
    fn test_serialize_round_trip_keeps_natives() {
        let lockfile = Lockfile::from_str(SAMPLE).unwrap();
        let toml = lockfile.to_string().unwrap();
        assert!(toml.contains("natives-linux-amd64.jar"));
        assert_eq!(Lockfile::from_str(&toml).unwrap(), lockfile);
    }

    #[test]
    fn test_write_to_file_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stitch.lock");
        std::fs::write(&path, "stale").unwrap();

        let lockfile = Lockfile::from_str(SAMPLE).unwrap();
        lockfile.write_to_file(&path).unwrap();

        assert_eq!(Lockfile::from_file(&path).unwrap(), lockfile);
        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("stitch.lock")]);
    }

    #[test]
    fn test_write_to_missing_directory_keeps_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/stitch.lock");

        let err = Lockfile::new().write_to_file(&path).unwrap_err();
        assert!(matches!(err, PackageError::IoError { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_refresh_checksums() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("libs")).unwrap();
        std::fs::write(dir.path().join("libs/jna-5.14.0.jar"), b"jna").unwrap();

        let mut lockfile = Lockfile::from_str(SAMPLE).unwrap();
        let updated = lockfile.refresh_checksums(dir.path()).unwrap();

        assert_eq!(updated, 1);
        let jna = lockfile.get_dependency("jna").unwrap();
        let expected = sha256_file(&dir.path().join("libs/jna-5.14.0.jar")).unwrap();
        assert_eq!(jna.checksum.as_deref(), Some(expected.as_str()));
        assert!(lockfile.metadata.generated_at.is_some());
        assert!(lockfile.get_dependency("jogl-all").unwrap().checksum.is_none());
    }

    #[test]
    fn test_verify_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jar");
        std::fs::write(&path, b"abc").unwrap();

        let sum = sha256_file(&path).unwrap();
        assert_eq!(
            sum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(verify_checksum(&path, Some(&sum)).is_ok());
        assert!(verify_checksum(&path, None).is_ok());
        assert!(matches!(
            verify_checksum(&path, Some("00")),
            Err(PackageError::ChecksumMismatch { .. })
        ));
    }
}
