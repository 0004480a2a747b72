//! Command line argument parsing.
//!
//! Help and usage errors both exit with status 1, so clap's built-in help
//! flag is replaced by a plain switch handled in [`super::run_with`].

use crate::config::{CONFIG_FILE_NAME, ReleaseConfig};
use crate::orchestrator::ReleaseOptions;
use clap::{ArgAction, CommandFactory, Parser};
use std::path::{Path, PathBuf};

/// Transactional release driver
#[derive(Parser, Debug)]
#[command(
    name = "release",
    about = "Cut a release: branch, rewrite version, build, package, tag, push, publish",
    long_about = "Cut a release of the project in the current directory.

Everything up to and including tagging happens locally and is rolled back on
failure or interrupt. Pushing and publishing are irreversible: a failure there
stops with a banner and leaves the state for the operator to inspect.",
    override_usage = "release [options] VERSION",
    disable_help_flag = true
)]
pub struct Args {
    /// Print usage and exit
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    pub help: bool,

    /// Require the test step to pass before building
    #[arg(short = 't', long = "run-tests")]
    pub run_tests: bool,

    /// Remote host for publication
    #[arg(short = 's', long = "server", value_name = "NAME", env = "RELEASE_SERVER")]
    pub server: Option<String>,

    /// Remote directory for publication
    #[arg(short = 'p', long = "path", value_name = "PATH", env = "RELEASE_PATH")]
    pub path: Option<String>,

    /// Simulate push and publish; revert local changes afterwards
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// With --dry-run, keep the release branch and tag for inspection
    #[arg(short = 'r', long = "no-revert")]
    pub no_revert: bool,

    /// Project root
    #[arg(short = 'C', long = "project-dir", value_name = "DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Config file (default: <project-dir>/release.toml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only print errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Version to release
    #[arg(index = 1, value_name = "VERSION")]
    pub target_version: Option<String>,
}

impl Args {
    /// Rendered long help text
    pub fn help_text() -> String {
        Self::command().render_long_help().to_string()
    }

    /// Rendered one-line usage
    pub fn usage_text() -> String {
        Self::command().render_usage().to_string()
    }

    /// Config file to load for the given project root
    pub fn config_path(&self, project_root: &Path) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| project_root.join(CONFIG_FILE_NAME))
    }

    /// Merge flags over the config file
    pub fn release_options(&self, target_version: &str, config: &ReleaseConfig) -> ReleaseOptions {
        ReleaseOptions {
            target_version: target_version.to_string(),
            dry_run: self.dry_run,
            no_revert: self.no_revert,
            run_tests: self.run_tests,
            server: self
                .server
                .clone()
                .unwrap_or_else(|| config.publish.server.clone()),
            remote_path: self
                .path
                .clone()
                .unwrap_or_else(|| config.publish.path.clone()),
        }
    }
}
