//! Runtime classpath assembly
use crate::error::BuildResult;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use stitch_package::lockfile::verify_checksum;
use stitch_package::{Artifact, LockedDependency, PlatformTarget, VariantResolver};
use tracing::debug;

/// Ordered runtime classpath.
///
/// Entries are unique by path; the first occurrence keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeClasspath {
    entries: Vec<Artifact>,
    seen: HashSet<PathBuf>,
}

impl RuntimeClasspath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upstream subproject archives in build order, followed by every
    /// dependency resolved for `platforms` in declaration order.
    ///
    /// Files that exist and carry a recorded checksum are verified.
    pub fn resolve<'a>(
        upstream: impl IntoIterator<Item = PathBuf>,
        dependencies: impl IntoIterator<Item = &'a LockedDependency>,
        resolver: &VariantResolver,
        platforms: &[PlatformTarget],
    ) -> BuildResult<Self> {
        let mut classpath = Self::new();
        for archive in upstream {
            classpath.push(Artifact::primary(archive));
        }
        for dependency in dependencies {
            classpath.push_dependency(dependency, resolver, platforms)?;
        }
        Ok(classpath)
    }

    /// Resolve one dependency and append its artifacts
    pub fn push_dependency(
        &mut self,
        dependency: &LockedDependency,
        resolver: &VariantResolver,
        platforms: &[PlatformTarget],
    ) -> BuildResult<()> {
        for artifact in resolver.resolve_all(dependency, platforms)? {
            if artifact.path.is_file() {
                let expected = expected_checksum(dependency, resolver.root(), &artifact);
                verify_checksum(&artifact.path, expected)?;
            }
            self.push(artifact);
        }
        Ok(())
    }

    /// Append an artifact; returns false if its path is already present
    pub fn push(&mut self, artifact: Artifact) -> bool {
        if !self.seen.insert(artifact.path.clone()) {
            debug!(path = %artifact.path.display(), "classpath entry already present");
            return false;
        }
        self.entries.push(artifact);
        true
    }

    pub fn entries(&self) -> &[Artifact] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    /// Native binary entries, in classpath order
    pub fn natives(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.iter().filter(|a| a.is_native())
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|a| a.path.as_path())
    }

    /// Value for the manifest `Class-Path` attribute: file names, space separated
    pub fn class_path_attribute(&self) -> String {
        self.entries
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<'a> IntoIterator for &'a RuntimeClasspath {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn expected_checksum<'d>(
    dependency: &'d LockedDependency,
    root: &Path,
    artifact: &Artifact,
) -> Option<&'d str> {
    if root.join(&dependency.file) == artifact.path {
        return dependency.checksum.as_deref();
    }
    dependency
        .natives
        .iter()
        .find(|n| root.join(&n.file) == artifact.path)
        .and_then(|n| n.checksum.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use pretty_assertions::assert_eq;
    use stitch_package::{ArtifactRole, LockedNative, PackageError};
    use tempfile::tempdir;

    fn gluegen() -> LockedDependency {
        LockedDependency::new("gluegen-rt", "2.5.0", "libs/gluegen-rt-2.5.0.jar")
            .with_native(LockedNative::new(
                vec![PlatformTarget::LINUX_AMD64],
                "libs/gluegen-rt-2.5.0-natives-linux-amd64.jar",
            ))
            .with_native(LockedNative::new(
                vec![PlatformTarget::WINDOWS_AMD64],
                "libs/gluegen-rt-2.5.0-natives-windows-amd64.jar",
            ))
    }

    #[test]
    fn test_resolve_orders_upstream_then_dependencies() {
        let resolver = VariantResolver::new("/project");
        let deps = vec![
            gluegen(),
            LockedDependency::new("jna", "5.14.0", "libs/jna-5.14.0.jar"),
        ];

        let classpath = RuntimeClasspath::resolve(
            vec![PathBuf::from("/project/build/subprojects/common.jar")],
            &deps,
            &resolver,
            &[PlatformTarget::LINUX_AMD64],
        )
        .unwrap();

        let names: Vec<_> = classpath.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "common.jar",
                "gluegen-rt-2.5.0.jar",
                "gluegen-rt-2.5.0-natives-linux-amd64.jar",
                "jna-5.14.0.jar",
            ]
        );
        assert_eq!(classpath.entries()[0].role, ArtifactRole::PrimaryOutput);
        assert_eq!(classpath.natives().count(), 1);
    }

    #[test]
    fn test_push_deduplicates_by_path() {
        let mut classpath = RuntimeClasspath::new();
        assert!(classpath.push(Artifact::library("/a/x.jar")));
        assert!(!classpath.push(Artifact::library("/a/x.jar")));
        assert!(classpath.push(Artifact::library("/b/x.jar")));
        assert_eq!(classpath.len(), 2);
        assert_eq!(classpath.class_path_attribute(), "x.jar x.jar");
    }

    #[test]
    fn test_checksum_mismatch_is_reported() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("libs")).unwrap();
        std::fs::write(dir.path().join("libs/jna.jar"), b"jar bytes").unwrap();

        let mut dep = LockedDependency::new("jna", "5.14.0", "libs/jna.jar");
        dep.checksum = Some("00".repeat(32));

        let resolver = VariantResolver::new(dir.path());
        let err = RuntimeClasspath::resolve(Vec::new(), [&dep], &resolver, &[]).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Package(PackageError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_absent_files_are_not_verified() {
        let mut dep = LockedDependency::new("jna", "5.14.0", "libs/jna.jar");
        dep.checksum = Some("00".repeat(32));

        let resolver = VariantResolver::new("/nonexistent-root");
        let classpath = RuntimeClasspath::resolve(Vec::new(), [&dep], &resolver, &[]).unwrap();
        assert_eq!(classpath.len(), 1);
    }
}
