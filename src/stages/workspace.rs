use crate::pipeline::{PipelineContext, Stage, StageError};
use std::fs;

/// Wipes and recreates the working directory. Debug runs only.
pub struct PrepareWorkspaceStage {
    debug: bool,
}

impl PrepareWorkspaceStage {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl Stage for PrepareWorkspaceStage {
    fn title(&self) -> &str {
        "[DEBUG] Prepare workspace"
    }

    fn enabled(&self, _ctx: &PipelineContext) -> bool {
        self.debug
    }

    fn run(
        &self,
        ctx: &mut PipelineContext,
        progress: &mut dyn FnMut(&str),
    ) -> Result<(), StageError> {
        let dir = &ctx.working_dir;
        let io_err = |source| StageError::Io {
            path: dir.clone(),
            source,
        };

        if dir.exists() {
            progress("Removing previous workspace");
            fs::remove_dir_all(dir).map_err(io_err)?;
        }
        fs::create_dir_all(dir).map_err(io_err)?;
        Ok(())
    }
}
