//! Baksmali: disassembles a dex file into a smali tree.

use super::{push_opt, ToolError, ToolOutput, ToolRunner};
use std::ffi::OsString;
use std::path::Path;

/// Printed by baksmali on a missing input, with a zero exit status.
const FATAL_MARKERS: &[&str] = &["Can't find the file"];

pub struct Baksmali {
    runner: Box<dyn ToolRunner>,
}

impl Baksmali {
    pub fn new(runner: Box<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    pub fn disassemble(
        &self,
        dex: &Path,
        output: &Path,
        api_level: Option<u32>,
    ) -> Result<ToolOutput, ToolError> {
        let mut args: Vec<OsString> = vec![dex.into(), "--output".into(), output.into()];
        push_opt(&mut args, "--api", api_level.map(|level| level.to_string()));
        Ok(self.runner.run(&args)?.fail_on(FATAL_MARKERS))
    }
}
