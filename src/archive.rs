//! Single-entry extraction from zip containers (AAR, JAR, APK).

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to open archive {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("{path} is not a valid zip archive: {source}")]
    Invalid { path: PathBuf, source: ZipError },

    #[error("entry '{entry}' not found in {archive}")]
    MissingEntry { archive: PathBuf, entry: String },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Extract `entry` from the zip at `archive` into `destination`.
///
/// The entry's directory components are dropped: `libs/classes.jar` lands
/// at `destination/classes.jar`. An existing file there is overwritten.
/// Returns the path of the written file.
pub fn extract_entry(
    archive: &Path,
    entry: &str,
    destination: &Path,
) -> Result<PathBuf, ArchiveError> {
    let file = File::open(archive).map_err(|source| ArchiveError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = ZipArchive::new(file).map_err(|source| ArchiveError::Invalid {
        path: archive.to_path_buf(),
        source,
    })?;

    let mut contents = match zip.by_name(entry) {
        Ok(contents) => contents,
        Err(ZipError::FileNotFound) => {
            return Err(ArchiveError::MissingEntry {
                archive: archive.to_path_buf(),
                entry: entry.to_string(),
            })
        }
        Err(source) => {
            return Err(ArchiveError::Invalid {
                path: archive.to_path_buf(),
                source,
            })
        }
    };

    let file_name = Path::new(entry)
        .file_name()
        .ok_or_else(|| ArchiveError::MissingEntry {
            archive: archive.to_path_buf(),
            entry: entry.to_string(),
        })?;
    let out_path = destination.join(file_name);

    let write_err = |source| ArchiveError::Write {
        path: out_path.clone(),
        source,
    };
    fs::create_dir_all(destination).map_err(write_err)?;
    let mut out = File::create(&out_path).map_err(write_err)?;
    io::copy(&mut contents, &mut out).map_err(write_err)?;

    tracing::debug!(
        archive = %archive.display(),
        entry,
        out = %out_path.display(),
        "extracted archive entry"
    );
    Ok(out_path)
}
