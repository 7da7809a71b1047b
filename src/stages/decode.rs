use crate::pipeline::{PipelineContext, Stage, StageError};
use crate::tools::Apktool;

/// Directory under the workspace that receives the decoded APK.
const DECODED_DIR: &str = "decompiled-apk";

/// Decodes the target APK with apktool.
pub struct DecodeStage {
    apktool: Apktool,
}

impl DecodeStage {
    pub fn new(apktool: Apktool) -> Self {
        Self { apktool }
    }
}

impl Stage for DecodeStage {
    fn title(&self) -> &str {
        "Decode target APK file"
    }

    fn run(
        &self,
        ctx: &mut PipelineContext,
        progress: &mut dyn FnMut(&str),
    ) -> Result<(), StageError> {
        let decoded = ctx.working_dir.join(DECODED_DIR);
        self.apktool
            .decode(&ctx.target_package, &decoded, true)?
            .drain(|line| progress(line))?;
        ctx.decoded_target_dir = Some(decoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolError, ToolOutput};
    use std::ffi::OsString;

    #[test]
    fn test_records_decoded_dir() {
        let apktool = Apktool::new(Box::new(|_: &[OsString]| -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::from_lines("apktool", ["I: Using Apktool"]))
        }));
        let mut ctx = PipelineContext::new("/work", "app.apk", Vec::new());
        let mut lines = Vec::new();

        DecodeStage::new(apktool)
            .run(&mut ctx, &mut |line| lines.push(line.to_string()))
            .unwrap();

        assert_eq!(lines, vec!["Using Apktool"]);
        assert_eq!(
            ctx.decoded_target_dir.as_deref(),
            Some(std::path::Path::new("/work/decompiled-apk"))
        );
    }

    #[test]
    fn test_failed_decode_leaves_context_untouched() {
        let apktool = Apktool::new(Box::new(|_: &[OsString]| -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::new(
                "apktool",
                std::iter::once(Err(ToolError::FatalOutput {
                    tool: "apktool".into(),
                    line: "brut.androlib.AndrolibException".into(),
                })),
            ))
        }));
        let mut ctx = PipelineContext::new("/work", "app.apk", Vec::new());

        let result = DecodeStage::new(apktool).run(&mut ctx, &mut |_| {});

        assert!(matches!(result, Err(StageError::Tool(_))));
        assert!(ctx.decoded_target_dir.is_none());
    }
}
