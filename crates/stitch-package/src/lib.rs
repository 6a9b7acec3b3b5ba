//! Stitch dependency model
//!
//! Platform targets, artifacts, the `stitch.lock` dependency lockfile and
//! resolution of platform-specific native variants.

pub mod artifact;
pub mod lockfile;
pub mod platform;
pub mod variant;

pub use artifact::{Artifact, ArtifactRole};
pub use lockfile::{
    DependencyScope, LockedDependency, LockedNative, Lockfile, LockfileMetadata,
};
pub use platform::{Arch, Os, PlatformTarget};
pub use variant::VariantResolver;

use std::path::PathBuf;

/// Package management errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Failed to parse lockfile: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize lockfile: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("IO error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Unknown platform target '{0}' (known: linux-amd64, linux-aarch64, windows-amd64, macos-universal)")]
    UnknownPlatform(String),

    #[error("Dependency '{dependency}' ships natives but has no variant for platform {platform}")]
    MissingVariant {
        dependency: String,
        platform: PlatformTarget,
    },

    #[error("Invalid lockfile: {0}")]
    InvalidLockfile(String),

    #[error("Checksum mismatch for {path}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl PackageError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Whether this error is a configuration problem (fatal, never retried)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownPlatform(_) | Self::MissingVariant { .. } | Self::InvalidLockfile(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;
