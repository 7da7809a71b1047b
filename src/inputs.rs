//! Validation of the paths given on the command line.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("File does not exist! Provided path: {}", .0.display())]
    Missing(PathBuf),

    #[error("at least one source archive is required")]
    NoSources,
}

/// Paths a patch run starts from, checked to exist on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchInputs {
    pub target: PathBuf,
    pub sources: Vec<PathBuf>,
}

impl PatchInputs {
    /// Check that the target and every source exist, reporting the first
    /// missing path in argument order.
    pub fn validate(target: &Path, sources: &[PathBuf]) -> Result<Self, InputError> {
        if sources.is_empty() {
            return Err(InputError::NoSources);
        }
        for path in std::iter::once(target).chain(sources.iter().map(PathBuf::as_path)) {
            if !path.exists() {
                return Err(InputError::Missing(path.to_path_buf()));
            }
        }
        Ok(Self {
            target: target.to_path_buf(),
            sources: sources.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_all_present() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("app.apk");
        let aar = dir.path().join("lib.aar");
        fs::write(&apk, b"").unwrap();
        fs::write(&aar, b"").unwrap();

        let inputs = PatchInputs::validate(&apk, &[aar.clone()]).unwrap();
        assert_eq!(inputs.target, apk);
        assert_eq!(inputs.sources, vec![aar]);
    }

    #[test]
    fn test_reports_first_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("app.apk");
        fs::write(&apk, b"").unwrap();
        let missing = dir.path().join("missing.aar");
        let also_missing = dir.path().join("also-missing.aar");

        let err = PatchInputs::validate(&apk, &[missing.clone(), also_missing]).unwrap_err();
        assert_eq!(err, InputError::Missing(missing.clone()));
        assert!(err.to_string().contains(&*missing.to_string_lossy()));
    }

    #[test]
    fn test_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let err = PatchInputs::validate(&dir.path().join("app.apk"), &[dir.path().to_path_buf()])
            .unwrap_err();
        assert!(matches!(err, InputError::Missing(_)));
    }

    #[test]
    fn test_requires_a_source() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            PatchInputs::validate(dir.path(), &[]),
            Err(InputError::NoSources)
        );
    }
}
