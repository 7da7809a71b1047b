//! Process-backed [`ToolRunner`].
//!
//! stdout and stderr are read on two helper threads and folded into one
//! channel, so lines reach the caller as the tool prints them. stderr is
//! not fatal on its own; only the exit status and the wrapper's fatal
//! markers decide failure.

use super::{ToolError, ToolOutput, ToolRunner};
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// How a tool program is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// `<java> -jar <jar> ARGS...`
    Jar { java: PathBuf, jar: PathBuf },
    /// `<java> -classpath <dir>/* <main_class> ARGS...`
    ClassPath {
        java: PathBuf,
        dir: PathBuf,
        main_class: String,
    },
    /// `<program> ARGS...`
    Native { program: PathBuf },
}

impl Launcher {
    pub fn jar(java: impl Into<PathBuf>, jar: impl Into<PathBuf>) -> Self {
        Launcher::Jar {
            java: java.into(),
            jar: jar.into(),
        }
    }

    pub fn native(program: impl Into<PathBuf>) -> Self {
        Launcher::Native {
            program: program.into(),
        }
    }

    fn program(&self) -> &Path {
        match self {
            Launcher::Jar { java, .. } | Launcher::ClassPath { java, .. } => java,
            Launcher::Native { program } => program,
        }
    }

    fn command(&self, args: &[OsString]) -> Command {
        let mut cmd = Command::new(self.program());
        match self {
            Launcher::Jar { jar, .. } => {
                cmd.arg("-jar").arg(jar);
            }
            Launcher::ClassPath {
                dir, main_class, ..
            } => {
                cmd.arg("-classpath").arg(dir.join("*")).arg(main_class);
            }
            Launcher::Native { .. } => {}
        }
        cmd.args(args);
        cmd
    }
}

/// Runs a named tool as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    name: String,
    launcher: Launcher,
}

impl ProcessRunner {
    pub fn new(name: impl Into<String>, launcher: Launcher) -> Self {
        Self {
            name: name.into(),
            launcher,
        }
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, args: &[OsString]) -> Result<ToolOutput, ToolError> {
        tracing::debug!(tool = %self.name, ?args, "spawning tool");

        let mut child = self
            .launcher
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: self.name.clone(),
                program: self.launcher.program().to_path_buf(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone(), false);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx, true);
        }

        let lines = ProcessLines {
            tool: self.name.clone(),
            child: Some(child),
            rx,
        };
        Ok(ToolOutput::new(self.name.clone(), lines))
    }
}

struct Line {
    text: String,
    stderr: bool,
}

fn forward_lines<R: Read + Send + 'static>(
    pipe: R,
    tx: Sender<std::io::Result<Line>>,
    stderr: bool,
) {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(Ok(Line { text, stderr })).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
}

/// Line iterator over a running child. Reaps the child when exhausted and
/// kills it if dropped early.
struct ProcessLines {
    tool: String,
    child: Option<Child>,
    rx: Receiver<std::io::Result<Line>>,
}

impl ProcessLines {
    fn finish(&mut self) -> Option<ToolError> {
        let mut child = self.child.take()?;
        match child.wait() {
            Ok(status) if status.success() => {
                tracing::debug!(tool = %self.tool, "tool finished");
                None
            }
            Ok(status) => Some(ToolError::ExitStatus {
                tool: self.tool.clone(),
                status,
            }),
            Err(source) => Some(ToolError::Read {
                tool: self.tool.clone(),
                source,
            }),
        }
    }
}

impl Iterator for ProcessLines {
    type Item = Result<String, ToolError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.child.as_ref()?;
        loop {
            match self.rx.recv() {
                Ok(Ok(line)) => {
                    let text = line.text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if line.stderr {
                        tracing::debug!(tool = %self.tool, stderr = true, "{text}");
                    }
                    return Some(Ok(text.to_string()));
                }
                Ok(Err(source)) => {
                    if let Some(mut child) = self.child.take() {
                        let _ = child.kill();
                        let _ = child.wait();
                    }
                    return Some(Err(ToolError::Read {
                        tool: self.tool.clone(),
                        source,
                    }));
                }
                // Both pipes closed.
                Err(_) => return self.finish().map(Err),
            }
        }
    }
}

impl Drop for ProcessLines {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn sh() -> ProcessRunner {
        ProcessRunner::new("sh", Launcher::native("sh"))
    }

    fn script(body: &str) -> Vec<OsString> {
        vec!["-c".into(), body.into()]
    }

    #[test]
    fn test_streams_trimmed_lines() {
        let lines = sh()
            .run(&script("echo '  first  '; echo; echo second"))
            .unwrap()
            .collect_lines()
            .unwrap();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_lines_arrive_while_tool_runs() {
        let started = Instant::now();
        let mut output = sh()
            .run(&script("echo first; sleep 3; echo second"))
            .unwrap();

        let first = output.next().unwrap().unwrap();

        assert_eq!(first, "first");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stderr_is_folded_into_output() {
        let lines = sh()
            .run(&script("echo warning >&2"))
            .unwrap()
            .collect_lines()
            .unwrap();
        assert_eq!(lines, vec!["warning"]);
    }

    #[test]
    fn test_non_zero_exit_fails_after_output() {
        let items: Vec<_> = sh().run(&script("echo partial; exit 3")).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(line) if line == "partial"));
        assert!(matches!(&items[1], Err(ToolError::ExitStatus { .. })));
    }

    #[test]
    fn test_fatal_marker_on_success_exit() {
        let result = sh()
            .run(&script("echo \"Can't find the file classes.dex\""))
            .unwrap()
            .fail_on(&["Can't find the file"])
            .collect_lines();
        assert!(matches!(result, Err(ToolError::FatalOutput { .. })));
    }

    #[test]
    fn test_spawn_failure() {
        let runner = ProcessRunner::new("missing", Launcher::native("/nonexistent/tool-binary"));
        let result = runner.run(&[]);
        assert!(matches!(result, Err(ToolError::Spawn { .. })));
    }

    #[test]
    fn test_jar_launcher_layout() {
        let launcher = Launcher::jar("java", "libs/d8.jar");
        let cmd = launcher.command(&["in.jar".into()]);
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(cmd.get_program(), "java");
        assert_eq!(args, vec!["-jar", "libs/d8.jar", "in.jar"]);
    }

    #[test]
    fn test_classpath_launcher_layout() {
        let launcher = Launcher::ClassPath {
            java: "java".into(),
            dir: "libs/jetifier".into(),
            main_class: "Main".into(),
        };
        let cmd = launcher.command(&["--input".into()]);
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["-classpath", "libs/jetifier/*", "Main", "--input"]);
    }
}
