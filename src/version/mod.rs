//! Version discovery and rewriting.
//!
//! The current version comes from the build tool itself, never from parsing
//! build files, so whatever the tool considers configured is what gets replaced.

pub mod rewriter;

pub use rewriter::{RewriteSummary, VersionRewriter};

use crate::config::BuildConfig;
use crate::error::VersionError;
use crate::runner::{CommandRunner, CommandSpec};
use regex::Regex;
use std::sync::LazyLock;

/// CSI sequences (colors, cursor movement) and OSC sequences (titles, links)
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("static regex")
});

/// A whole line holding nothing but a version, e.g. `1.0`, `2.3.1-SNAPSHOT`
static VERSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?([0-9]+(?:\.[0-9A-Za-z]+)*(?:[-+][0-9A-Za-z.+-]+)?)$").expect("static regex")
});

/// Remove terminal control sequences from tool output
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Find the last line of `output` that is a bare version token
pub fn parse_version(output: &str) -> Option<String> {
    output
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| VERSION_TOKEN.captures(line))
        .map(|caps| caps[1].to_string())
}

/// Asks the build tool for the configured version
#[derive(Debug)]
pub struct VersionResolver<'a, R> {
    runner: &'a R,
    build: &'a BuildConfig,
}

impl<'a, R: CommandRunner> VersionResolver<'a, R> {
    /// Create a resolver over the given runner and build tool settings
    pub fn new(runner: &'a R, build: &'a BuildConfig) -> Self {
        Self { runner, build }
    }

    /// Query command, exposed for reporting
    pub fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.build.program, &self.build.version_args)
    }

    /// Resolve the currently configured version
    pub async fn resolve(&self) -> Result<String, VersionError> {
        if !self.runner.tool_available(&self.build.program) {
            return Err(VersionError::ToolUnavailable {
                tool: self.build.program.clone(),
                reason: "not found on PATH".to_string(),
            });
        }

        let command = self.command();
        let result = self.runner.run(&command).await;
        if !result.exited_zero {
            return Err(VersionError::ToolUnavailable {
                tool: self.build.program.clone(),
                reason: result.failure_reason(),
            });
        }

        let clean = strip_ansi(&result.stdout);
        match parse_version(&clean) {
            Some(version) => {
                log::info!("build tool reports version {}", version);
                Ok(version)
            }
            None => Err(VersionError::ParseError {
                output: clean.trim().to_string(),
            }),
        }
    }
}
