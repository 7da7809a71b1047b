//! External tool collaborators.
//!
//! Every external program (apktool, d8, baksmali, jetifier) is reached
//! through one capability: [`ToolRunner::run`], which takes a list of
//! arguments and yields a lazy [`ToolOutput`] stream of trimmed lines.
//! Tool-specific behavior (argument layout, fatal output markers, line
//! rewriting) lives in thin wrappers that own a `Box<dyn ToolRunner>`,
//! so any of them can be backed by a real process or by a test double.
//!
//! # Example
//!
//! ```no_run
//! use apk_patcher::tools::{Launcher, ProcessRunner, ToolRunner};
//!
//! let runner = ProcessRunner::new("echo", Launcher::native("echo"));
//! let lines = runner.run(&["hello".into()])?.collect_lines()?;
//! assert_eq!(lines, vec!["hello".to_string()]);
//! # Ok::<(), apk_patcher::tools::ToolError>(())
//! ```

pub mod apktool;
pub mod baksmali;
pub mod d8;
pub mod jetifier;
pub mod process;

pub use apktool::Apktool;
pub use baksmali::Baksmali;
pub use d8::{BuildFlavor, D8};
pub use jetifier::Jetifier;
pub use process::{Launcher, ProcessRunner};

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to start {tool} ({program}): {source}")]
    Spawn {
        tool: String,
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}")]
    ExitStatus { tool: String, status: ExitStatus },

    #[error("{tool} reported a fatal error: {line}")]
    FatalOutput { tool: String, line: String },

    #[error("failed to read output of {tool}: {source}")]
    Read {
        tool: String,
        source: std::io::Error,
    },
}

/// A single capability: run the tool with `args` and stream its output.
///
/// Implemented by [`ProcessRunner`] and by any closure of the matching
/// shape, which is how tests script tool behavior.
pub trait ToolRunner {
    fn run(&self, args: &[OsString]) -> Result<ToolOutput, ToolError>;
}

impl<F> ToolRunner for F
where
    F: Fn(&[OsString]) -> Result<ToolOutput, ToolError>,
{
    fn run(&self, args: &[OsString]) -> Result<ToolOutput, ToolError> {
        self(args)
    }
}

/// Every external tool one pipeline run needs.
pub struct Toolchain {
    pub apktool: Apktool,
    pub d8: D8,
    pub baksmali: Baksmali,
    pub jetifier: Jetifier,
}

/// Lazy sequence of output lines from one tool invocation.
///
/// Lines become available as the tool produces them. The stream ends with
/// `None` on success, or yields one `Err` and then ends when the tool
/// fails (non-zero exit or a fatal output marker).
#[must_use = "tool output does nothing unless it is consumed"]
pub struct ToolOutput {
    tool: String,
    lines: Box<dyn Iterator<Item = Result<String, ToolError>>>,
}

impl ToolOutput {
    pub fn new(
        tool: impl Into<String>,
        lines: impl Iterator<Item = Result<String, ToolError>> + 'static,
    ) -> Self {
        Self {
            tool: tool.into(),
            lines: Box::new(lines),
        }
    }

    /// Output of a tool that already finished successfully with `lines`.
    pub fn from_lines<I, S>(tool: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<Result<String, ToolError>> =
            lines.into_iter().map(|line| Ok(line.into())).collect();
        Self::new(tool, lines.into_iter())
    }

    /// Rewrite every successful line.
    pub fn map_lines<F>(self, f: F) -> Self
    where
        F: Fn(String) -> String + 'static,
    {
        let tool = self.tool;
        let lines = self.lines.map(move |line| line.map(&f));
        Self::new(tool, lines)
    }

    /// Escalate lines containing any of `patterns` to a
    /// [`ToolError::FatalOutput`], ending the stream there.
    pub fn fail_on(self, patterns: &'static [&'static str]) -> Self {
        let tool = self.tool.clone();
        let mut inner = self.lines;
        let mut done = false;
        let lines = std::iter::from_fn(move || {
            if done {
                return None;
            }
            match inner.next()? {
                Ok(line) if patterns.iter().any(|p| line.contains(p)) => {
                    done = true;
                    Some(Err(ToolError::FatalOutput {
                        tool: tool.clone(),
                        line,
                    }))
                }
                Ok(line) => Some(Ok(line)),
                Err(e) => {
                    done = true;
                    Some(Err(e))
                }
            }
        });
        Self::new(self.tool, lines)
    }

    /// Consume the stream, handing each line to `on_line`.
    pub fn drain(self, mut on_line: impl FnMut(&str)) -> Result<(), ToolError> {
        for line in self {
            on_line(&line?);
        }
        Ok(())
    }

    pub fn collect_lines(self) -> Result<Vec<String>, ToolError> {
        self.collect()
    }
}

impl Iterator for ToolOutput {
    type Item = Result<String, ToolError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

impl std::fmt::Debug for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolOutput")
            .field("tool", &self.tool)
            .finish_non_exhaustive()
    }
}

/// Push `flag value` onto `args` when `value` is present.
pub(crate) fn push_opt(args: &mut Vec<OsString>, flag: &str, value: Option<impl Into<OsString>>) {
    if let Some(value) = value {
        args.push(flag.into());
        args.push(value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_on_stops_at_marker() {
        let output = ToolOutput::from_lines("baksmali", ["ok", "Can't find the file x", "after"])
            .fail_on(&["Can't find the file"]);
        let items: Vec<_> = output.collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(line) if line == "ok"));
        assert!(matches!(
            &items[1],
            Err(ToolError::FatalOutput { line, .. }) if line.contains("x")
        ));
    }

    #[test]
    fn test_map_lines_rewrites_only_ok_lines() {
        let lines = ToolOutput::from_lines("apktool", ["I: Loading", "done"])
            .map_lines(|line| line.replace("I: ", ""))
            .collect_lines()
            .unwrap();
        assert_eq!(lines, vec!["Loading", "done"]);
    }

    #[test]
    fn test_drain_propagates_error() {
        let output = ToolOutput::new(
            "d8",
            vec![
                Ok("one".to_string()),
                Err(ToolError::FatalOutput {
                    tool: "d8".into(),
                    line: "boom".into(),
                }),
            ]
            .into_iter(),
        );
        let mut seen = Vec::new();
        let result = output.drain(|line| seen.push(line.to_string()));
        assert!(result.is_err());
        assert_eq!(seen, vec!["one"]);
    }

    #[test]
    fn test_closure_is_a_runner() {
        let runner = |args: &[OsString]| -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::from_lines(
                "fake",
                args.iter().map(|a| a.to_string_lossy().into_owned()),
            ))
        };
        let lines = runner
            .run(&["a".into(), "b".into()])
            .unwrap()
            .collect_lines()
            .unwrap();
        assert_eq!(lines, vec!["a", "b"]);
    }
}
