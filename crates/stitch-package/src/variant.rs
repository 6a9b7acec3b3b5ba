//! Native variant resolution
//!
//! Maps a logical dependency and a platform target to the concrete files that
//! must be on the runtime classpath for that platform.

use crate::artifact::Artifact;
use crate::lockfile::LockedDependency;
use crate::platform::PlatformTarget;
use crate::{PackageError, Result};
use std::path::{Path, PathBuf};

/// Resolves dependencies against a project root.
///
/// Resolution only looks at the lockfile entry it is handed, so the same
/// entry and platform always produce the same artifacts in the same order.
#[derive(Debug, Clone)]
pub struct VariantResolver {
    root: PathBuf,
}

impl VariantResolver {
    /// Create a resolver whose relative lockfile paths resolve under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve one dependency for one platform.
    ///
    /// Returns the platform-independent archive followed by the native
    /// variant serving `platform`, if the dependency ships natives. A
    /// dependency that ships natives but has no variant for `platform` is a
    /// configuration error.
    pub fn resolve(
        &self,
        dependency: &LockedDependency,
        platform: PlatformTarget,
    ) -> Result<Vec<Artifact>> {
        let mut artifacts = vec![dependency.library_artifact(&self.root)];
        if let Some(native) = self.native_for(dependency, platform)? {
            artifacts.push(native);
        }
        Ok(artifacts)
    }

    /// Resolve one dependency for several platforms.
    ///
    /// The platform-independent archive appears once, followed by natives in
    /// `platforms` order. A universal variant serving several of the
    /// requested platforms appears once.
    pub fn resolve_all(
        &self,
        dependency: &LockedDependency,
        platforms: &[PlatformTarget],
    ) -> Result<Vec<Artifact>> {
        let mut artifacts = vec![dependency.library_artifact(&self.root)];
        for platform in platforms {
            if let Some(native) = self.native_for(dependency, *platform)? {
                if !artifacts.iter().any(|a| a.path == native.path) {
                    artifacts.push(native);
                }
            }
        }
        Ok(artifacts)
    }

    /// Native artifact serving `platform`, if the dependency has natives
    pub fn native_for(
        &self,
        dependency: &LockedDependency,
        platform: PlatformTarget,
    ) -> Result<Option<Artifact>> {
        if !dependency.has_natives() {
            return Ok(None);
        }

        dependency
            .natives
            .iter()
            .find(|n| n.platforms.contains(&platform))
            .map(|n| Some(n.artifact(&self.root)))
            .ok_or_else(|| PackageError::MissingVariant {
                dependency: dependency.name.clone(),
                platform,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactRole;
    use crate::lockfile::LockedNative;
    use pretty_assertions::assert_eq;

    fn jogl() -> LockedDependency {
        LockedDependency::new("jogl-all", "2.5.0", "libs/jogl-all-2.5.0.jar")
            .with_native(LockedNative::new(
                vec![PlatformTarget::LINUX_AMD64],
                "libs/jogl-all-2.5.0-natives-linux-amd64.jar",
            ))
            .with_native(LockedNative::new(
                vec![PlatformTarget::WINDOWS_AMD64],
                "libs/jogl-all-2.5.0-natives-windows-amd64.jar",
            ))
            .with_native(LockedNative::new(
                vec![PlatformTarget::MACOS_UNIVERSAL],
                "libs/jogl-all-2.5.0-natives-macosx-universal.jar",
            ))
    }

    fn names(artifacts: &[Artifact]) -> Vec<&str> {
        artifacts.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_platform_independent_dependency() {
        let resolver = VariantResolver::new("/proj");
        let jna = LockedDependency::new("jna", "5.14.0", "libs/jna-5.14.0.jar");

        let artifacts = resolver.resolve(&jna, PlatformTarget::LINUX_AMD64).unwrap();
        assert_eq!(names(&artifacts), vec!["jna-5.14.0.jar"]);
        assert_eq!(artifacts[0].role, ArtifactRole::RuntimeLibrary);
        assert_eq!(artifacts[0].path, PathBuf::from("/proj/libs/jna-5.14.0.jar"));
    }

    #[test]
    fn test_selects_only_requested_platform() {
        let resolver = VariantResolver::new("/proj");
        let artifacts = resolver.resolve(&jogl(), PlatformTarget::LINUX_AMD64).unwrap();

        assert_eq!(
            names(&artifacts),
            vec![
                "jogl-all-2.5.0.jar",
                "jogl-all-2.5.0-natives-linux-amd64.jar"
            ]
        );
        let natives: Vec<_> = artifacts.iter().filter(|a| a.is_native()).collect();
        assert_eq!(natives.len(), 1);
        assert!(natives[0].serves(PlatformTarget::LINUX_AMD64));
    }

    #[test]
    fn test_missing_variant_is_configuration_error() {
        let resolver = VariantResolver::new("/proj");
        let err = resolver
            .resolve(&jogl(), PlatformTarget::LINUX_AARCH64)
            .unwrap_err();
        assert!(matches!(err, PackageError::MissingVariant { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_universal_variant_serves_multiple_platforms() {
        let resolver = VariantResolver::new("/proj");
        let giac = LockedDependency::new("giac-java", "1.0", "libs/giac-java.jar").with_native(
            LockedNative::new(
                vec![PlatformTarget::LINUX_AMD64, PlatformTarget::WINDOWS_AMD64],
                "libs/giac-java-natives-universal.jar",
            ),
        );

        for platform in [PlatformTarget::LINUX_AMD64, PlatformTarget::WINDOWS_AMD64] {
            let artifacts = resolver.resolve(&giac, platform).unwrap();
            assert_eq!(
                names(&artifacts),
                vec!["giac-java.jar", "giac-java-natives-universal.jar"]
            );
        }

        let all = resolver
            .resolve_all(
                &giac,
                &[PlatformTarget::LINUX_AMD64, PlatformTarget::WINDOWS_AMD64],
            )
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_resolve_all_keeps_platform_order() {
        let resolver = VariantResolver::new("/proj");
        let artifacts = resolver
            .resolve_all(
                &jogl(),
                &[PlatformTarget::MACOS_UNIVERSAL, PlatformTarget::LINUX_AMD64],
            )
            .unwrap();
        assert_eq!(
            names(&artifacts),
            vec![
                "jogl-all-2.5.0.jar",
                "jogl-all-2.5.0-natives-macosx-universal.jar",
                "jogl-all-2.5.0-natives-linux-amd64.jar"
            ]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = VariantResolver::new("/proj");
        let first = resolver.resolve(&jogl(), PlatformTarget::WINDOWS_AMD64).unwrap();
        let second = resolver.resolve(&jogl(), PlatformTarget::WINDOWS_AMD64).unwrap();
        assert_eq!(first, second);
    }
}
