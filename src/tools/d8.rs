//! D8: compiles Java bytecode into a dex file.

use super::{push_opt, ToolError, ToolOutput, ToolRunner};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildFlavor {
    Debug,
    #[default]
    Release,
}

impl BuildFlavor {
    fn flag(self) -> &'static str {
        match self {
            BuildFlavor::Debug => "--debug",
            BuildFlavor::Release => "--release",
        }
    }
}

pub struct D8 {
    runner: Box<dyn ToolRunner>,
}

impl D8 {
    pub fn new(runner: Box<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    /// Compile the bytecode in `jar` into `output/classes.dex`.
    pub fn compile(
        &self,
        jar: &Path,
        output: &Path,
        flavor: BuildFlavor,
        min_api: u32,
        proguard_config: Option<&Path>,
    ) -> Result<ToolOutput, ToolError> {
        let mut args: Vec<OsString> = vec![
            jar.into(),
            flavor.flag().into(),
            "--output".into(),
            output.into(),
            "--min-api".into(),
            min_api.to_string().into(),
        ];
        push_opt(&mut args, "--pg-conf", proguard_config);
        self.runner.run(&args)
    }
}
