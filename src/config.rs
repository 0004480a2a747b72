//! Release configuration file (`release.toml`).
//!
//! Every field is optional. Command line flags take precedence over the file,
//! and the file over the built-in defaults below.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the project root
pub const CONFIG_FILE_NAME: &str = "release.toml";

/// Default remote host for publication
pub const DEFAULT_SERVER: &str = "releases.example.org";

/// Default remote directory for publication
pub const DEFAULT_REMOTE_PATH: &str = "/srv/releases";

/// Complete release configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Project identity
    pub project: ProjectConfig,
    /// Build tool invocation
    pub build: BuildConfig,
    /// Local release layout and git remote
    pub release: ReleaseLayout,
    /// Remote publication target
    pub publish: PublishConfig,
    /// Version rewrite scope
    pub rewrite: RewriteConfig,
}

/// Project identity
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Archive prefix; defaults to the project directory name
    pub name: Option<String>,
}

/// How the build tool is invoked
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Build tool program
    pub program: String,
    /// Arguments that print the configured version
    pub version_args: Vec<String>,
    /// Arguments for the clean step
    pub clean_args: Vec<String>,
    /// Arguments for the test step
    pub test_args: Vec<String>,
    /// Arguments for the release build
    pub build_args: Vec<String>,
    /// Build output directory that gets archived, relative to the project root
    pub output_dir: PathBuf,
    /// Glob patterns of schema files copied into the release directory
    pub schema_globs: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: "mvn".to_string(),
            version_args: vec![
                "help:evaluate".to_string(),
                "-Dexpression=project.version".to_string(),
                "-q".to_string(),
                "-DforceStdout".to_string(),
            ],
            clean_args: vec!["clean".to_string()],
            test_args: vec!["test".to_string()],
            build_args: vec!["package".to_string(), "-DskipTests".to_string()],
            output_dir: PathBuf::from("target/dist"),
            schema_globs: Vec::new(),
        }
    }
}

/// Local release layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseLayout {
    /// Directory receiving the archive and schema files; must be ignored by git
    pub dir: PathBuf,
    /// Git remote that receives the branch and tags
    pub remote: String,
}

impl Default for ReleaseLayout {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("target/release-artifacts"),
            remote: "origin".to_string(),
        }
    }
}

/// Remote publication target
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// Remote host
    pub server: String,
    /// Remote directory
    pub path: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            path: DEFAULT_REMOTE_PATH.to_string(),
        }
    }
}

/// Version rewrite scope
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Directory names skipped in addition to version-control metadata
    pub exclude: Vec<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            exclude: vec!["target".to_string()],
        }
    }
}

impl ReleaseConfig {
    /// Load the config file, or defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse config text; `origin` is only used in error messages
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| {
            ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// Archive prefix: configured name, else the project directory name
    pub fn project_name(&self, project_root: &Path) -> String {
        self.project
            .name
            .clone()
            .or_else(|| {
                project_root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "project".to_string())
    }
}
