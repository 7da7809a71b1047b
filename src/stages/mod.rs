//! The concrete stages of the APK patch pipeline.

mod compat;
mod decode;
mod merge_code;
mod workspace;

pub use compat::{CompatibilityStage, ANDROIDX_PACKAGE};
pub use decode::DecodeStage;
pub use merge_code::{MergeCodeStage, CLASSES_JAR};
pub use workspace::PrepareWorkspaceStage;

use crate::pipeline::Pipeline;
use crate::settings::CompileSettings;
use crate::tools::Toolchain;

/// The full patch pipeline, in execution order.
///
/// The workspace reset stage only runs in debug mode.
pub fn patch_pipeline(toolchain: Toolchain, compile: CompileSettings, debug: bool) -> Pipeline {
    let Toolchain {
        apktool,
        d8,
        baksmali,
        jetifier,
    } = toolchain;

    let mut compat = CompatibilityStage::new(jetifier);
    if let Some(mapping) = &compile.jetifier_config {
        compat = compat.with_mapping_config(mapping);
    }

    Pipeline::new()
        .with_stage(PrepareWorkspaceStage::new(debug))
        .with_stage(DecodeStage::new(apktool))
        .with_stage(compat)
        .with_stage(MergeCodeStage::new(d8, baksmali, compile))
}
