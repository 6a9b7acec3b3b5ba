/// Build system error types
use std::path::PathBuf;
use stitch_package::PackageError;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

/// Broad category of a build error, used for reporting and exit handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fatal, never retried: bad platform, missing artifact, cycle, bad config
    Configuration,
    /// Fatal: an input that must exist at assembly time is absent or corrupt
    Resolution,
    /// Governed by the test gate
    Test,
    /// Filesystem or archive failure
    Io,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Subproject not found: {subproject}")]
    SubprojectNotFound { subproject: String },

    #[error("Unknown entry point '{name}' (declared: {declared})")]
    UnknownEntryPoint { name: String, declared: String },

    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Required input for {stage} does not exist: {path}")]
    MissingInput { stage: String, path: PathBuf },

    #[error("Subproject '{subproject}' failed: {error}")]
    SubprojectFailed { subproject: String, error: String },

    #[error("Subproject '{subproject}' skipped because '{failed}' failed")]
    Skipped { subproject: String, failed: String },

    #[error("{suite} tests failed{}", .exit_code.map(|c| format!(" (exit code {})", c)).unwrap_or_default())]
    TestFailure {
        suite: String,
        exit_code: Option<i32>,
    },

    #[error("{} of {total} entry points failed: {}", .failed.len(), .failed.join(", "))]
    EntryPointsFailed {
        failed: Vec<String>,
        total: usize,
        /// Error of the first failed entry point
        #[source]
        first: Box<BuildError>,
    },

    #[error("Archive error in {path}: {error}")]
    Archive {
        path: PathBuf,
        error: zip::result::ZipError,
    },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Config(#[from] stitch_config::ConfigError),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create an archive error with path context
    pub fn archive(path: impl Into<PathBuf>, error: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            error,
        }
    }

    /// Create a missing required input error
    pub fn missing_input(stage: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingInput {
            stage: stage.into(),
            path: path.into(),
        }
    }

    /// Create a subproject not found error
    pub fn subproject_not_found(subproject: impl Into<String>) -> Self {
        Self::SubprojectNotFound {
            subproject: subproject.into(),
        }
    }

    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CircularDependency(_)
            | Self::SubprojectNotFound { .. }
            | Self::UnknownEntryPoint { .. }
            | Self::MissingArtifact(_)
            | Self::InvalidConfiguration(_)
            | Self::Config(_) => ErrorCategory::Configuration,
            Self::Package(e) if e.is_configuration() => ErrorCategory::Configuration,
            Self::Package(PackageError::IoError { .. }) => ErrorCategory::Io,
            Self::Package(_) => ErrorCategory::Resolution,
            Self::MissingInput { .. } | Self::SubprojectFailed { .. } | Self::Skipped { .. } => {
                ErrorCategory::Resolution
            }
            Self::TestFailure { .. } => ErrorCategory::Test,
            Self::EntryPointsFailed { first, .. } => first.category(),
            Self::Archive { .. } | Self::IoError { .. } => ErrorCategory::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_package::PlatformTarget;

    #[test]
    fn test_categories() {
        assert_eq!(
            BuildError::CircularDependency("a -> a".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            BuildError::from(PackageError::UnknownPlatform("x".into())).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            BuildError::from(PackageError::MissingVariant {
                dependency: "jogl".into(),
                platform: PlatformTarget::LINUX_AMD64,
            })
            .category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            BuildError::missing_input("assemble", "classes").category(),
            ErrorCategory::Resolution
        );
        assert_eq!(
            BuildError::TestFailure {
                suite: "default".into(),
                exit_code: Some(1)
            }
            .category(),
            ErrorCategory::Test
        );
    }

    #[test]
    fn test_entry_point_failures_take_first_category() {
        let err = BuildError::EntryPointsFailed {
            failed: vec!["ggb2gpad".into(), "gpad2ggb".into()],
            total: 3,
            first: Box::new(BuildError::missing_input("assemble", "LICENSE.txt")),
        };
        assert_eq!(err.category(), ErrorCategory::Resolution);
        assert_eq!(err.to_string(), "2 of 3 entry points failed: ggb2gpad, gpad2ggb");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_failure_message() {
        let err = BuildError::TestFailure {
            suite: "extended".into(),
            exit_code: Some(3),
        };
        assert_eq!(err.to_string(), "extended tests failed (exit code 3)");

        let err = BuildError::TestFailure {
            suite: "default".into(),
            exit_code: None,
        };
        assert_eq!(err.to_string(), "default tests failed");
    }
}
