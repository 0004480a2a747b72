//! External command execution.
//!
//! Every collaborator (git, the build tool, tar, ssh, rsync) is reached through
//! [`CommandRunner`]. Runners never fail: a spawn error or a non-zero exit is
//! reported in the returned [`CommandResult`] and the caller decides what it means.

mod scripted;

pub use scripted::{Reply, ScriptedRunner};

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name, resolved through PATH
    pub program: String,
    /// Arguments passed verbatim
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Build a command from a program and any iterable of arguments
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Outcome of one external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// True only when the process ran and exited with status 0
    pub exited_zero: bool,
    /// Exit code, if the process ran to completion
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error, or the spawn error text
    pub stderr: String,
}

impl CommandResult {
    /// Successful result carrying the given stdout
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exited_zero: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed result with an exit code and stderr text
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exited_zero: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Short human-readable reason for a failed result
    pub fn failure_reason(&self) -> String {
        let detail = self.stderr.trim();
        let detail = if detail.is_empty() { self.stdout.trim() } else { detail };
        let status = match self.code {
            Some(code) => format!("exit code {code}"),
            None => "did not run to completion".to_string(),
        };
        match detail.lines().last() {
            Some(line) if !line.is_empty() => format!("{status}: {line}"),
            _ => status,
        }
    }
}

/// Capability to run external commands
pub trait CommandRunner {
    /// Run a command to completion and capture its result
    fn run(&self, command: &CommandSpec) -> impl Future<Output = CommandResult>;

    /// Check whether a tool can be found on PATH
    fn tool_available(&self, tool: &str) -> bool {
        which::which(tool).is_ok()
    }
}

/// Runs commands as real child processes in a fixed working directory
#[derive(Debug, Clone)]
pub struct SystemRunner {
    work_dir: PathBuf,
}

impl SystemRunner {
    /// Create a runner rooted at the given directory
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    /// Directory commands run in
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Reports a command whose future was dropped before the child exited
struct InFlight<'a> {
    command: &'a CommandSpec,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("interrupted, killing child: {}", self.command);
        }
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> CommandResult {
        log::debug!("exec: {} (in {})", command, self.work_dir.display());
        let mut in_flight = InFlight {
            command,
            finished: false,
        };

        // Dropping the future (interrupt) must not leave the child running
        let output = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(&self.work_dir)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;
        in_flight.finished = true;

        match output {
            Ok(output) => {
                let result = CommandResult {
                    exited_zero: output.status.success(),
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                };
                if !result.exited_zero {
                    log::debug!("exec failed: {} -> {:?}", command, result.code);
                }
                result
            }
            Err(e) => {
                log::warn!("failed to spawn {}: {}", command.program, e);
                CommandResult {
                    exited_zero: false,
                    code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                }
            }
        }
    }
}
