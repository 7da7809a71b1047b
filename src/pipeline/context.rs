use super::StageError;
use crate::matcher::MergeRoot;
use std::path::{Path, PathBuf};

/// Facts threaded through the stages of one pipeline run.
///
/// The inputs are fixed when the run starts. Every derived field stays
/// `None` until the stage that produces it has succeeded; stages fetch
/// what they depend on through the `require_*` accessors, which fail
/// instead of handing out a missing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    /// Directory owned by this run for all intermediate output.
    pub working_dir: PathBuf,
    /// APK being patched.
    pub target_package: PathBuf,
    /// AAR archives supplied on the command line.
    pub source_archives: Vec<PathBuf>,

    /// Output of the decode stage.
    pub decoded_target_dir: Option<PathBuf>,
    /// Source archives after the compatibility stage, one per source.
    pub library_archives: Option<Vec<PathBuf>>,
    /// Disassembled code tree of each library archive.
    pub library_tree_dirs: Option<Vec<PathBuf>>,
    /// Merge roots chosen by the code merge stage.
    pub merge_roots: Option<Vec<MergeRoot>>,
}

impl PipelineContext {
    pub fn new(
        working_dir: impl Into<PathBuf>,
        target_package: impl Into<PathBuf>,
        source_archives: Vec<PathBuf>,
    ) -> Self {
        Self {
            working_dir: working_dir.into(),
            target_package: target_package.into(),
            source_archives,
            decoded_target_dir: None,
            library_archives: None,
            library_tree_dirs: None,
            merge_roots: None,
        }
    }

    pub fn require_decoded_target_dir(&self) -> Result<&Path, StageError> {
        self.decoded_target_dir
            .as_deref()
            .ok_or(StageError::MissingContext {
                field: "decoded_target_dir",
            })
    }

    pub fn require_library_archives(&self) -> Result<&[PathBuf], StageError> {
        self.library_archives
            .as_deref()
            .ok_or(StageError::MissingContext {
                field: "library_archives",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_fail_fast() {
        let ctx = PipelineContext::new("/work", "app.apk", vec!["lib.aar".into()]);
        assert!(matches!(
            ctx.require_decoded_target_dir(),
            Err(StageError::MissingContext {
                field: "decoded_target_dir"
            })
        ));
        assert!(matches!(
            ctx.require_library_archives(),
            Err(StageError::MissingContext {
                field: "library_archives"
            })
        ));
    }

    #[test]
    fn test_present_fields_are_returned() {
        let mut ctx = PipelineContext::new("/work", "app.apk", Vec::new());
        ctx.decoded_target_dir = Some("/work/decompiled-apk".into());
        assert_eq!(
            ctx.require_decoded_target_dir().unwrap(),
            Path::new("/work/decompiled-apk")
        );
    }
}
