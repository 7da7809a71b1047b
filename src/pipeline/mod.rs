//! Ordered, skippable patch pipeline.
//!
//! A [`Pipeline`] is a fixed list of [`Stage`]s sharing one
//! [`PipelineContext`]. Stages run strictly in declaration order, each at
//! most once:
//!
//! - a stage whose [`Stage::enabled`] check returns `false` is marked
//!   skipped and its body never runs;
//! - the first failing stage ends the run, and later stages are never
//!   started (they are not reported as skipped either);
//! - the run succeeds when every stage that was not skipped succeeded.
//!
//! # Example
//!
//! ```
//! use apk_patcher::pipeline::{NoopObserver, Pipeline, PipelineContext, Stage, StageError};
//!
//! struct Hello;
//!
//! impl Stage for Hello {
//!     fn title(&self) -> &str {
//!         "Say hello"
//!     }
//!
//!     fn run(
//!         &self,
//!         _ctx: &mut PipelineContext,
//!         progress: &mut dyn FnMut(&str),
//!     ) -> Result<(), StageError> {
//!         progress("hello");
//!         Ok(())
//!     }
//! }
//!
//! let mut ctx = PipelineContext::new("/tmp/work", "app.apk", vec![]);
//! let report = Pipeline::new()
//!     .with_stage(Hello)
//!     .run(&mut ctx, &mut NoopObserver)
//!     .unwrap();
//! assert_eq!(report.succeeded(), 1);
//! ```

mod context;

pub use context::PipelineContext;

use crate::archive::ArchiveError;
use crate::matcher::MatchError;
use crate::mirror::MirrorError;
use crate::tools::ToolError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("pipeline context is missing `{field}`")]
    MissingContext { field: &'static str },

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Filesystem(#[from] MirrorError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
#[error("stage '{stage}' failed: {source}")]
pub struct PipelineError {
    pub stage: String,
    pub source: StageError,
}

/// Terminal state of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Skipped,
    Succeeded,
    Failed,
}

/// A named unit of pipeline work.
pub trait Stage {
    fn title(&self) -> &str;

    /// Checked immediately before the stage would run.
    fn enabled(&self, _ctx: &PipelineContext) -> bool {
        true
    }

    /// Do the work. `progress` receives human-readable lines, such as
    /// live output of external tools.
    fn run(
        &self,
        ctx: &mut PipelineContext,
        progress: &mut dyn FnMut(&str),
    ) -> Result<(), StageError>;
}

/// Receives stage transitions and progress lines as the pipeline runs.
pub trait Observer {
    fn stage_started(&mut self, _title: &str) {}
    fn stage_output(&mut self, _title: &str, _line: &str) {}
    fn stage_finished(&mut self, _title: &str, _status: StageStatus) {}
}

pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Stages that reached a terminal state, in the order they ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub stages: Vec<(String, StageStatus)>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> usize {
        self.count(StageStatus::Succeeded)
    }

    pub fn skipped(&self) -> usize {
        self.count(StageStatus::Skipped)
    }

    fn count(&self, status: StageStatus) -> usize {
        self.stages.iter().filter(|(_, s)| *s == status).count()
    }
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Run every stage in order. Consumes the pipeline so no stage can run
    /// twice.
    pub fn run(
        self,
        ctx: &mut PipelineContext,
        observer: &mut dyn Observer,
    ) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();

        for stage in &self.stages {
            let title = stage.title();

            if !stage.enabled(ctx) {
                tracing::info!(stage = title, "stage skipped");
                observer.stage_finished(title, StageStatus::Skipped);
                report.stages.push((title.to_string(), StageStatus::Skipped));
                continue;
            }

            tracing::info!(stage = title, "stage started");
            observer.stage_started(title);
            let result = {
                let mut progress = |line: &str| observer.stage_output(title, line);
                stage.run(ctx, &mut progress)
            };

            match result {
                Ok(()) => {
                    tracing::info!(stage = title, "stage succeeded");
                    observer.stage_finished(title, StageStatus::Succeeded);
                    report
                        .stages
                        .push((title.to_string(), StageStatus::Succeeded));
                }
                Err(source) => {
                    tracing::error!(stage = title, error = %source, "stage failed");
                    observer.stage_finished(title, StageStatus::Failed);
                    return Err(PipelineError {
                        stage: title.to_string(),
                        source,
                    });
                }
            }
        }

        Ok(report)
    }
}
