//! Apktool: decodes an APK into resources plus smali trees.

use super::{ToolError, ToolOutput, ToolRunner};
use std::ffi::OsString;
use std::path::Path;

pub struct Apktool {
    runner: Box<dyn ToolRunner>,
}

impl Apktool {
    pub fn new(runner: Box<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    /// Decode `apk` into `output`.
    ///
    /// With `force`, an existing `output` directory is replaced. The
    /// `I: ` progress prefix is stripped from every line.
    pub fn decode(&self, apk: &Path, output: &Path, force: bool) -> Result<ToolOutput, ToolError> {
        let mut args: Vec<OsString> = vec![
            "decode".into(),
            apk.into(),
            "--output".into(),
            output.into(),
        ];
        if force {
            args.push("--force".into());
        }
        Ok(self
            .runner
            .run(&args)?
            .map_lines(|line| line.replace("I: ", "")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_decode_arguments_and_prefix() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&seen);
        let apktool = Apktool::new(Box::new(
            move |args: &[OsString]| -> Result<ToolOutput, ToolError> {
                recorder.borrow_mut().extend(args.iter().cloned());
                Ok(ToolOutput::from_lines("apktool", ["I: Baksmaling classes.dex..."]))
            },
        ));

        let lines = apktool
            .decode(Path::new("app.apk"), Path::new("out"), true)
            .unwrap()
            .collect_lines()
            .unwrap();

        assert_eq!(lines, vec!["Baksmaling classes.dex..."]);
        assert_eq!(
            *seen.borrow(),
            vec!["decode", "app.apk", "--output", "out", "--force"]
        );
    }
}
