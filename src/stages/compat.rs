use crate::matcher::{disassembly_roots, top_level_packages, PackageSegment};
use crate::pipeline::{PipelineContext, Stage, StageError};
use crate::tools::Jetifier;
use std::path::PathBuf;

/// Top-level package whose presence marks a target built on AndroidX.
pub const ANDROIDX_PACKAGE: &str = "androidx";

/// Makes the source archives use the same support library family as the
/// target.
///
/// When the decoded target has an `androidx` top-level package, every
/// source archive is jetified into the workspace. Otherwise the sources are
/// passed through unchanged.
pub struct CompatibilityStage {
    jetifier: Jetifier,
    mapping_config: Option<PathBuf>,
}

impl CompatibilityStage {
    pub fn new(jetifier: Jetifier) -> Self {
        Self {
            jetifier,
            mapping_config: None,
        }
    }

    /// Custom jetifier mapping file used instead of the built-in one.
    pub fn with_mapping_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.mapping_config = Some(path.into());
        self
    }
}

impl Stage for CompatibilityStage {
    fn title(&self) -> &str {
        "Ensure Support Library / Jetpack compatibility"
    }

    fn run(
        &self,
        ctx: &mut PipelineContext,
        progress: &mut dyn FnMut(&str),
    ) -> Result<(), StageError> {
        let decoded = ctx.require_decoded_target_dir()?;

        progress("Scanning APK package structure");
        let roots = disassembly_roots(decoded)?;
        let uses_androidx = top_level_packages(&roots)?.iter().any(|package| {
            PackageSegment::of(package).is_some_and(|segment| segment.as_str() == ANDROIDX_PACKAGE)
        });

        if !uses_androidx {
            progress("Target APK does not use AndroidX, no need to jetify the AAR");
            ctx.library_archives = Some(ctx.source_archives.clone());
            return Ok(());
        }

        let mut archives = Vec::with_capacity(ctx.source_archives.len());
        for (index, source) in ctx.source_archives.iter().enumerate() {
            progress(&format!("Jetifying {}", source.display()));
            let output = ctx.working_dir.join(format!("jetified-{index}.aar"));
            self.jetifier
                .jetify(source, &output, self.mapping_config.as_deref())?
                .drain(|line| progress(line))?;
            archives.push(output);
        }

        tracing::info!(count = archives.len(), "jetified source archives");
        ctx.library_archives = Some(archives);
        Ok(())
    }
}
