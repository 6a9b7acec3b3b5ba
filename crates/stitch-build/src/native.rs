//! Native binary placement
//!
//! The native loader only searches the directory that holds the archive it
//! was loaded from. Each native archive is therefore copied into the
//! directory of the classpath entry it pairs with by name.

use crate::classpath::RuntimeClasspath;
use crate::error::{BuildError, BuildResult};
use crate::staging::copy_atomic;
use serde::Serialize;
use std::path::{Path, PathBuf};
use stitch_package::Artifact;
use tracing::{debug, info};

/// Where a native archive ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedNative {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// False when the native already lived next to its pair
    pub copied: bool,
}

/// Copies native archives next to their paired archives
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePlacement;

impl NativePlacement {
    pub fn new() -> Self {
        Self
    }

    /// Place every native archive on `classpath`.
    ///
    /// Safe to repeat: each copy goes through a temporary file and an atomic
    /// rename, so repeated or concurrent runs leave the same files behind.
    pub fn place(&self, classpath: &RuntimeClasspath) -> BuildResult<Vec<PlacedNative>> {
        let mut placed = Vec::new();
        for native in classpath.natives() {
            let pair = Self::paired_entry(native, classpath)?;
            placed.push(self.place_one(native, pair)?);
        }
        info!(count = placed.len(), "native archives placed");
        Ok(placed)
    }

    /// The non-native classpath entry `native` pairs with
    fn paired_entry<'a>(
        native: &Artifact,
        classpath: &'a RuntimeClasspath,
    ) -> BuildResult<&'a Artifact> {
        // a single-platform native must carry that platform's classifier
        if let [platform] = native.platforms.as_slice() {
            let classifier = platform.native_classifier();
            if !native.name.contains(&format!("-{}", classifier)) {
                return Err(BuildError::InvalidConfiguration(format!(
                    "native '{}' is declared for {} but its name lacks the '{}' classifier",
                    native.name, platform, classifier
                )));
            }
        }

        let primary_name = native.paired_primary_name().ok_or_else(|| {
            BuildError::MissingArtifact(format!(
                "cannot derive the paired archive name for native '{}'",
                native.name
            ))
        })?;

        classpath
            .iter()
            .find(|a| !a.is_native() && a.name == primary_name)
            .ok_or_else(|| {
                BuildError::MissingArtifact(format!(
                    "native '{}' pairs with '{}', which is not on the classpath",
                    native.name, primary_name
                ))
            })
    }

    fn place_one(&self, native: &Artifact, pair: &Artifact) -> BuildResult<PlacedNative> {
        let target_dir = pair.directory().unwrap_or_else(|| Path::new("."));

        if native.directory() == Some(target_dir) {
            debug!(native = %native.name, "already next to its pair");
            return Ok(PlacedNative {
                source: native.path.clone(),
                destination: native.path.clone(),
                copied: false,
            });
        }

        if !native.path.is_file() {
            return Err(BuildError::missing_input("native placement", &native.path));
        }

        let destination = target_dir.join(&native.name);
        copy_atomic(&native.path, &destination)?;
        debug!(
            native = %native.name,
            destination = %destination.display(),
            "native copied"
        );

        Ok(PlacedNative {
            source: native.path.clone(),
            destination,
            copied: true,
        })
    }
}
