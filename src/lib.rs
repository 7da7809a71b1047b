//! APK Patcher: splice the code of AAR libraries into a built APK
//!
//! The target APK is decoded into smali trees, each library archive is
//! compiled and disassembled into its own smali tree, and the library
//! packages are copied into the target tree where their namespaces line up.
//!
//! # Architecture
//!
//! - [`tools`]: external programs (apktool, d8, baksmali, jetifier) behind
//!   one [`ToolRunner`] capability that streams output lines.
//! - [`archive`] and [`mirror`]: zip entry extraction and additive
//!   directory merge.
//! - [`matcher`]: finds the directory in a multi-root target tree where a
//!   library package must be merged.
//! - [`pipeline`] and [`stages`]: the ordered, skippable stages of a patch
//!   run and the context they share.
//!
//! # Example
//!
//! ```no_run
//! use apk_patcher::pipeline::{NoopObserver, PipelineContext};
//! use apk_patcher::{settings, stages};
//!
//! let settings = settings::discover(None)?;
//! let pipeline = stages::patch_pipeline(settings.toolchain(), settings.compile.clone(), false);
//!
//! let mut ctx = PipelineContext::new("/tmp/apk-patcher", "app.apk", vec!["library.aar".into()]);
//! pipeline.run(&mut ctx, &mut NoopObserver)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod inputs;
pub mod matcher;
pub mod mirror;
pub mod pipeline;
pub mod settings;
pub mod stages;
pub mod tools;

// Re-exports
pub use archive::{extract_entry, ArchiveError};
pub use inputs::{InputError, PatchInputs};
pub use matcher::{find_merge_root, find_merge_root_for, MatchError, MergeRoot, PackageSegment};
pub use mirror::{mirror, MirrorError, MirrorStats};
pub use pipeline::{
    Observer, Pipeline, PipelineContext, PipelineError, PipelineReport, Stage, StageError,
    StageStatus,
};
pub use settings::{Settings, SettingsError};
pub use tools::{ToolError, ToolOutput, ToolRunner, Toolchain};
