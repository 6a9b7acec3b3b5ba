//! Atomic file output
//!
//! Every file the pipeline produces is written to a temporary file in the
//! destination directory and renamed into place once complete, so readers
//! never observe a partially written file and a failed step leaves the
//! previous file untouched.

use crate::error::{BuildError, BuildResult};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `dest` by handing a temporary file to `write`, then renaming it.
///
/// The parent directory is created if needed. If `write` fails the temporary
/// file is removed and `dest` is not touched.
pub fn write_atomic<T>(
    dest: &Path,
    write: impl FnOnce(&mut File) -> BuildResult<T>,
) -> BuildResult<T> {
    let dir = match dest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| BuildError::io(dir, e))?;
    let value = write(temp.as_file_mut())?;
    temp.as_file()
        .sync_all()
        .map_err(|e| BuildError::io(temp.path(), e))?;
    temp.persist(dest)
        .map_err(|e| BuildError::io(dest, e.error))?;
    Ok(value)
}

/// Copy `src` to `dest` atomically, overwriting any existing file
pub fn copy_atomic(src: &Path, dest: &Path) -> BuildResult<u64> {
    let mut input = File::open(src).map_err(|e| BuildError::io(src, e))?;
    write_atomic(dest, |out| {
        io::copy(&mut input, out).map_err(|e| BuildError::io(src, e))
    })
}
