//! Jetifier: rewrites Support Library references in an AAR to AndroidX,
//! or back again.

use super::{push_opt, ToolError, ToolOutput, ToolRunner};
use std::ffi::OsString;
use std::path::Path;

pub const MAIN_CLASS: &str = "com.android.tools.build.jetifier.standalone.Main";

pub struct Jetifier {
    runner: Box<dyn ToolRunner>,
}

impl Jetifier {
    pub fn new(runner: Box<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    /// Migrate Support Library references in `input` to AndroidX.
    pub fn jetify(
        &self,
        input: &Path,
        output: &Path,
        mapping_config: Option<&Path>,
    ) -> Result<ToolOutput, ToolError> {
        let mut args: Vec<OsString> = vec![
            "--input".into(),
            input.into(),
            "--output".into(),
            output.into(),
        ];
        push_opt(&mut args, "--config", mapping_config);
        self.runner.run(&args)
    }

    /// Migrate AndroidX references in `input` back to the Support Library.
    pub fn dejetify(&self, input: &Path, output: &Path) -> Result<ToolOutput, ToolError> {
        let args: Vec<OsString> = vec![
            "--reverse".into(),
            "--input".into(),
            input.into(),
            "--output".into(),
            output.into(),
        ];
        self.runner.run(&args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Jetifier {
        Jetifier::new(Box::new(|args: &[OsString]| -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::from_lines(
                "jetifier",
                args.iter().map(|a| a.to_string_lossy().into_owned()),
            ))
        }))
    }

    #[test]
    fn test_jetify_arguments() {
        let lines = echo()
            .jetify(Path::new("in.aar"), Path::new("out.aar"), None)
            .unwrap()
            .collect_lines()
            .unwrap();
        assert_eq!(lines, vec!["--input", "in.aar", "--output", "out.aar"]);
    }

    #[test]
    fn test_dejetify_is_reversed() {
        let lines = echo()
            .dejetify(Path::new("in.aar"), Path::new("out.aar"))
            .unwrap()
            .collect_lines()
            .unwrap();
        assert_eq!(lines[0], "--reverse");
    }
}
