//! Additive directory merge.
//!
//! [`mirror`] copies a source tree onto a destination tree. Files at the
//! same relative path are overwritten by the source; anything that exists
//! only in the destination is left alone. The copy is not transactional:
//! a failure part-way leaves the files written so far in place.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("source directory does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Summary of one [`mirror`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub directories: usize,
    pub files: usize,
}

/// Recursively copy everything under `source` into `destination`.
pub fn mirror(source: &Path, destination: &Path) -> Result<MirrorStats, MirrorError> {
    if !source.is_dir() {
        return Err(MirrorError::MissingSource(source.to_path_buf()));
    }

    fs::create_dir_all(destination).map_err(|e| MirrorError::Write {
        path: destination.to_path_buf(),
        source: e,
    })?;

    let mut stats = MirrorStats::default();
    for entry in WalkDir::new(source).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| MirrorError::Read {
            path: e.path().unwrap_or(source).to_path_buf(),
            source: e,
        })?;

        // WalkDir only yields paths under `source`.
        let relative = match entry.path().strip_prefix(source) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = destination.join(relative);

        let result = if entry.file_type().is_dir() {
            stats.directories += 1;
            fs::create_dir_all(&target)
        } else {
            stats.files += 1;
            fs::copy(entry.path(), &target).map(|_| ())
        };
        result.map_err(|e| MirrorError::Write {
            path: target.clone(),
            source: e,
        })?;
    }

    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        files = stats.files,
        directories = stats.directories,
        "mirrored directory"
    );
    Ok(stats)
}
