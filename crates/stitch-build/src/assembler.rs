//! Archive assembly
//!
//! Merges a subproject's compiled output, the entry point's extra files and
//! (for fat archives) every runtime classpath entry into a single archive.
//!
//! Entries are written in a fixed order:
//!
//! 1. `META-INF/` and the generated `META-INF/MANIFEST.MF`
//! 2. the subproject's own output, unfiltered
//! 3. the entry point's extra files, at the archive root
//! 4. fat archives only: classpath entries in classpath order
//!
//! The first writer of a path wins. Later entries with the same path are
//! dropped and counted, which also drops the manifests of merged archives.
//! Signature files directly under `META-INF/` are never copied from
//! classpath entries.

use crate::classpath::RuntimeClasspath;
use crate::error::{BuildError, BuildResult};
use crate::manifest::{JarManifest, MANIFEST_PATH};
use crate::staging::write_atomic;
use crate::targets::{EntryPoint, PackagingMode};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Signature file extensions stripped from merged archives (case-sensitive)
const SIGNATURE_EXTENSIONS: [&str; 3] = [".SF", ".RSA", ".DSA"];

/// Whether `name` is a signature file directly under `META-INF/`
pub fn is_signature_file(name: &str) -> bool {
    match name.strip_prefix("META-INF/") {
        Some(rest) if !rest.contains('/') => {
            SIGNATURE_EXTENSIONS.iter().any(|ext| rest.ends_with(ext))
        }
        _ => false,
    }
}

/// Counters collected while writing an archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// File entries written, manifest included
    pub files_written: usize,
    /// Directory entries written
    pub directories_written: usize,
    /// File entries dropped because their path was already written
    pub duplicates_skipped: usize,
    /// Signature files dropped
    pub signatures_stripped: usize,
    /// Optional inputs that did not exist
    pub missing_inputs: Vec<PathBuf>,
}

/// Result of assembling one entry point
#[derive(Debug, Clone, Serialize)]
pub struct AssembledArchive {
    pub entry_point: String,
    pub path: PathBuf,
    pub mode: PackagingMode,
    #[serde(skip)]
    pub manifest: JarManifest,
    pub report: AssemblyReport,
}

/// Writes entry-point archives into one output directory
#[derive(Debug, Clone)]
pub struct Assembler {
    output_dir: PathBuf,
}

impl Assembler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Archive path for an entry point
    pub fn output_path(&self, entry: &EntryPoint) -> PathBuf {
        self.output_dir.join(&entry.output_name)
    }

    /// Manifest for an entry point: `Main-Class`, plus `Class-Path` when thin
    pub fn manifest_for(entry: &EntryPoint, classpath: &RuntimeClasspath) -> JarManifest {
        let mut manifest = JarManifest::new().with("Main-Class", entry.main_class.clone());
        if entry.mode == PackagingMode::Thin && !classpath.is_empty() {
            manifest.set("Class-Path", classpath.class_path_attribute());
        }
        manifest
    }

    /// Assemble the archive for `entry`.
    ///
    /// `own_output` is the root subproject's compiled output directory and
    /// must exist. The archive is only replaced once it has been written
    /// completely.
    pub fn assemble(
        &self,
        entry: &EntryPoint,
        own_output: &Path,
        classpath: &RuntimeClasspath,
    ) -> BuildResult<AssembledArchive> {
        let stage = format!("assembling '{}'", entry.name);
        if !own_output.is_dir() {
            return Err(BuildError::missing_input(stage, own_output));
        }
        for extra in &entry.extra_files {
            if !extra.is_file() {
                return Err(BuildError::missing_input(stage, extra));
            }
        }

        let dest = self.output_path(entry);
        let manifest = Self::manifest_for(entry, classpath);
        info!(
            entry_point = %entry.name,
            mode = %entry.mode,
            path = %dest.display(),
            "assembling archive"
        );

        let report = write_atomic(&dest, |file| {
            let mut writer = ArchiveWriter::new(file, &dest);
            writer.write_manifest(&manifest)?;
            writer.add_tree(own_output, false)?;
            for extra in &entry.extra_files {
                writer.add_extra_file(extra)?;
            }
            if entry.mode.embeds_classpath() {
                for artifact in classpath {
                    writer.add_classpath_entry(&artifact.path)?;
                }
            }
            writer.finish()
        })?;

        debug!(
            entry_point = %entry.name,
            files = report.files_written,
            duplicates = report.duplicates_skipped,
            signatures = report.signatures_stripped,
            "archive written"
        );

        Ok(AssembledArchive {
            entry_point: entry.name.clone(),
            path: dest,
            mode: entry.mode,
            manifest,
            report,
        })
    }
}

/// Package a directory into an archive with the given manifest
pub fn package_directory(
    dir: &Path,
    dest: &Path,
    manifest: &JarManifest,
) -> BuildResult<AssemblyReport> {
    write_atomic(dest, |file| {
        let mut writer = ArchiveWriter::new(file, dest);
        writer.write_manifest(manifest)?;
        writer.add_tree(dir, false)?;
        writer.finish()
    })
}

/// Zip every file directly inside `dir` (sorted by name) into `dest`
pub fn zip_files(dir: &Path, dest: &Path) -> BuildResult<AssemblyReport> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| BuildError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    write_atomic(dest, |file| {
        let mut writer = ArchiveWriter::new(file, dest);
        for path in &files {
            writer.add_extra_file(path)?;
        }
        writer.finish()
    })
}

/// Zip writer that enforces first-writer-wins and deterministic metadata
struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    dest: PathBuf,
    written: HashSet<String>,
    report: AssemblyReport,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    fn new(inner: W, dest: &Path) -> Self {
        Self {
            zip: ZipWriter::new(inner),
            dest: dest.to_path_buf(),
            written: HashSet::new(),
            report: AssemblyReport::default(),
        }
    }

    fn options() -> FileOptions {
        FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644)
    }

    fn dir_options() -> FileOptions {
        Self::options().unix_permissions(0o755)
    }

    fn write_manifest(&mut self, manifest: &JarManifest) -> BuildResult<()> {
        self.add_directory("META-INF/")?;
        self.add_file(MANIFEST_PATH, &mut manifest.render().as_slice())?;
        Ok(())
    }

    /// Add a directory entry unless already present
    fn add_directory(&mut self, name: &str) -> BuildResult<()> {
        if !self.written.insert(name.to_string()) {
            return Ok(());
        }
        self.zip
            .add_directory(name, Self::dir_options())
            .map_err(|e| BuildError::archive(&self.dest, e))?;
        self.report.directories_written += 1;
        Ok(())
    }

    /// Add a file entry; returns false if the path was already written
    fn add_file(&mut self, name: &str, content: &mut dyn Read) -> BuildResult<bool> {
        if self.written.contains(name) {
            debug!(entry = name, "duplicate entry skipped");
            self.report.duplicates_skipped += 1;
            return Ok(false);
        }
        self.zip
            .start_file(name, Self::options())
            .map_err(|e| BuildError::archive(&self.dest, e))?;
        io::copy(content, &mut self.zip).map_err(|e| BuildError::io(&self.dest, e))?;
        self.written.insert(name.to_string());
        self.report.files_written += 1;
        Ok(true)
    }

    /// Add a file, stripping signatures when `filter` is set
    fn add_filtered(&mut self, name: &str, content: &mut dyn Read, filter: bool) -> BuildResult<()> {
        if filter && is_signature_file(name) {
            debug!(entry = name, "signature file stripped");
            self.report.signatures_stripped += 1;
            return Ok(());
        }
        self.add_file(name, content)?;
        Ok(())
    }

    /// Add every file under `root`, named relative to `root`, in name order
    fn add_tree(&mut self, root: &Path, filter: bool) -> BuildResult<()> {
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                BuildError::io(path, e.into())
            })?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| BuildError::io(entry.path(), io::Error::other(e)))?;
            let mut name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if entry.file_type().is_dir() {
                name.push('/');
                self.add_directory(&name)?;
            } else {
                let mut file =
                    File::open(entry.path()).map_err(|e| BuildError::io(entry.path(), e))?;
                self.add_filtered(&name, &mut file, filter)?;
            }
        }
        Ok(())
    }

    /// Add a single file at the archive root
    fn add_extra_file(&mut self, path: &Path) -> BuildResult<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BuildError::missing_input("archive", path))?;
        let mut file = File::open(path).map_err(|e| BuildError::io(path, e))?;
        self.add_file(&name, &mut file)?;
        Ok(())
    }

    /// Explode an archive or walk a directory from the classpath
    fn add_classpath_entry(&mut self, path: &Path) -> BuildResult<()> {
        if !path.exists() {
            warn!(path = %path.display(), "classpath entry does not exist, skipping");
            self.report.missing_inputs.push(path.to_path_buf());
            return Ok(());
        }
        if path.is_dir() {
            return self.add_tree(path, true);
        }

        let file = File::open(path).map_err(|e| BuildError::io(path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| BuildError::archive(path, e))?;
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| BuildError::archive(path, e))?;
            if entry.enclosed_name().is_none() {
                warn!(entry = entry.name(), archive = %path.display(), "unsafe entry name, skipping");
                continue;
            }
            let name = entry.name().to_string();
            if entry.is_dir() {
                self.add_directory(&name)?;
            } else {
                self.add_filtered(&name, &mut entry, true)?;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> BuildResult<AssemblyReport> {
        self.zip
            .finish()
            .map_err(|e| BuildError::archive(&self.dest, e))?;
        Ok(self.report)
    }
}
