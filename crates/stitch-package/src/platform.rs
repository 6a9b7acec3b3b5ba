//! Platform targets used to select native binaries

use crate::{PackageError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Operating system half of a platform target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    Linux,
    Windows,
    MacOs,
}

impl Os {
    /// Canonical identifier used in platform ids
    pub fn id(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::MacOs => "macos",
        }
    }

    /// Identifier used inside native archive classifiers
    fn classifier_id(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::MacOs => "macosx",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "linux" => Some(Self::Linux),
            "windows" | "win" => Some(Self::Windows),
            "macos" | "macosx" | "darwin" | "osx" => Some(Self::MacOs),
            _ => None,
        }
    }
}

/// Architecture half of a platform target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    Amd64,
    Aarch64,
    /// Multi-architecture binary (macOS fat binaries)
    Universal,
}

impl Arch {
    /// Canonical identifier used in platform ids
    pub fn id(&self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Aarch64 => "aarch64",
            Self::Universal => "universal",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "amd64" | "x86_64" | "x64" => Some(Self::Amd64),
            "aarch64" | "arm64" => Some(Self::Aarch64),
            "universal" => Some(Self::Universal),
            _ => None,
        }
    }
}

/// An operating-system/architecture pair.
///
/// The set of valid pairs is closed: see [`PlatformTarget::ALL`]. Values can
/// only be obtained through the constants or by parsing, so holding a
/// `PlatformTarget` means holding a known target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlatformTarget {
    os: Os,
    arch: Arch,
}

impl PlatformTarget {
    pub const LINUX_AMD64: Self = Self::new(Os::Linux, Arch::Amd64);
    pub const LINUX_AARCH64: Self = Self::new(Os::Linux, Arch::Aarch64);
    pub const WINDOWS_AMD64: Self = Self::new(Os::Windows, Arch::Amd64);
    pub const MACOS_UNIVERSAL: Self = Self::new(Os::MacOs, Arch::Universal);

    /// Every known platform target, in canonical order
    pub const ALL: [Self; 4] = [
        Self::LINUX_AMD64,
        Self::LINUX_AARCH64,
        Self::WINDOWS_AMD64,
        Self::MACOS_UNIVERSAL,
    ];

    const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Canonical id, e.g. `linux-amd64`
    pub fn id(&self) -> String {
        format!("{}-{}", self.os.id(), self.arch.id())
    }

    /// Classifier carried by native archive names, e.g. `natives-macosx-universal`
    pub fn native_classifier(&self) -> String {
        format!("natives-{}-{}", self.os.classifier_id(), self.arch.id())
    }

    /// The target matching the machine we are running on, if it is a known one
    pub fn host() -> Option<Self> {
        match (std::env::consts::OS, std::env::consts::ARCH) {
            ("linux", "x86_64") => Some(Self::LINUX_AMD64),
            ("linux", "aarch64") => Some(Self::LINUX_AARCH64),
            ("windows", "x86_64") => Some(Self::WINDOWS_AMD64),
            ("macos", _) => Some(Self::MACOS_UNIVERSAL),
            _ => None,
        }
    }

    /// Parse a list of platform ids, failing on the first unknown one
    pub fn parse_list<S: AsRef<str>>(ids: &[S]) -> Result<Vec<Self>> {
        let mut targets = Vec::with_capacity(ids.len());
        for id in ids {
            let target: Self = id.as_ref().parse()?;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        Ok(targets)
    }
}

impl FromStr for PlatformTarget {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (os, arch) = lower
            .split_once('-')
            .ok_or_else(|| PackageError::UnknownPlatform(s.to_string()))?;

        let candidate = match (Os::parse(os), Arch::parse(arch)) {
            (Some(os), Some(arch)) => Self::new(os, arch),
            _ => return Err(PackageError::UnknownPlatform(s.to_string())),
        };

        if Self::ALL.contains(&candidate) {
            Ok(candidate)
        } else {
            Err(PackageError::UnknownPlatform(s.to_string()))
        }
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.id(), self.arch.id())
    }
}

impl Serialize for PlatformTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id())
    }
}

impl<'de> Deserialize<'de> for PlatformTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        id.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_ids() {
        for target in PlatformTarget::ALL {
            assert_eq!(target.id().parse::<PlatformTarget>().unwrap(), target);
        }
    }

    #[test]
    fn test_host_is_known() {
        if let Some(host) = PlatformTarget::host() {
            assert!(PlatformTarget::ALL.contains(&host));
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(
            "linux-x86_64".parse::<PlatformTarget>().unwrap(),
            PlatformTarget::LINUX_AMD64
        );
        assert_eq!(
            "Windows-x64".parse::<PlatformTarget>().unwrap(),
            PlatformTarget::WINDOWS_AMD64
        );
        assert_eq!(
            "macosx-universal".parse::<PlatformTarget>().unwrap(),
            PlatformTarget::MACOS_UNIVERSAL
        );
        assert_eq!(
            "linux-arm64".parse::<PlatformTarget>().unwrap(),
            PlatformTarget::LINUX_AARCH64
        );
    }

    #[test]
    fn test_unknown_platform_rejected() {
        for id in ["solaris-sparc", "linux", "", "windows-universal", "macos-amd64"] {
            let err = id.parse::<PlatformTarget>().unwrap_err();
            assert!(matches!(err, PackageError::UnknownPlatform(_)), "{id}");
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_native_classifier() {
        assert_eq!(
            PlatformTarget::LINUX_AMD64.native_classifier(),
            "natives-linux-amd64"
        );
        assert_eq!(
            PlatformTarget::MACOS_UNIVERSAL.native_classifier(),
            "natives-macosx-universal"
        );
    }

    #[test]
    fn test_parse_list_dedups_and_keeps_order() {
        let targets =
            PlatformTarget::parse_list(&["windows-amd64", "linux-amd64", "windows-x64"]).unwrap();
        assert_eq!(
            targets,
            vec![PlatformTarget::WINDOWS_AMD64, PlatformTarget::LINUX_AMD64]
        );
    }

    #[test]
    fn test_parse_list_fails_on_unknown() {
        assert!(PlatformTarget::parse_list(&["linux-amd64", "beos-ppc"]).is_err());
    }
}
