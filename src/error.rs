//! Error types for release operations.
//!
//! Failures are classified once, at the call site, into one of three kinds:
//! validation errors (nothing mutated yet), reversible step failures (cleanup
//! applied) and fatal step failures (irreversible state exists, no cleanup).

use crate::state::Phase;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Input or repository state rejected before any mutation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Version query or rewrite errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Configuration file errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A step before the publication boundary failed; cleanup was attempted
    #[error("Release aborted during {stage} (reached {phase}): {reason}")]
    Aborted {
        /// Highest phase reached before the failure
        phase: Phase,
        /// Tool stage that failed
        stage: String,
        /// Reason for the failure
        reason: String,
        /// Cleanup actions that did not succeed
        cleanup_failures: usize,
    },

    /// A step at or after the publication boundary failed; no cleanup attempted
    #[error("FATAL failure during {stage} (reached {phase}): {reason}")]
    Fatal {
        /// Highest phase reached before the failure
        phase: Phase,
        /// Tool stage that failed
        stage: String,
        /// Reason for the failure
        reason: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Errors that stop the release before anything is touched
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Target version is malformed
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// Version string
        version: String,
        /// Reason for the error
        reason: String,
    },

    /// Target version equals the configured version
    #[error("Version '{version}' is already the configured version")]
    SameVersion {
        /// Version string
        version: String,
    },

    /// Working tree has uncommitted changes
    #[error("Working tree not clean. Please commit or stash changes before releasing.")]
    DirtyWorkingTree {
        /// Porcelain status lines
        changes: Vec<String>,
    },

    /// HEAD is not on a named branch
    #[error("Not on a named branch (detached HEAD)")]
    DetachedHead,

    /// Not inside a git work tree
    #[error("Not a git repository: {path}")]
    NotRepository {
        /// Directory that was checked
        path: PathBuf,
    },

    /// A required external tool is not on PATH
    #[error("Required tool '{tool}' not found on PATH")]
    MissingTool {
        /// Tool name
        tool: String,
    },

    /// Release branch left over from an earlier run
    #[error("Branch '{branch}' already exists")]
    BranchExists {
        /// Branch name
        branch: String,
    },

    /// Release tag already exists
    #[error("Tag '{tag}' already exists")]
    TagExists {
        /// Tag name
        tag: String,
    },

    /// Release output would be committed or removed by cleanup
    #[error("'{path}' is not ignored by git; release outputs must not be committed")]
    NotIgnored {
        /// Path relative to the project root
        path: PathBuf,
    },

    /// Remote host did not answer the ssh probe
    #[error("Remote server '{server}' is not reachable over ssh")]
    RemoteUnreachable {
        /// Server address
        server: String,
    },
}

/// Version query and rewrite errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Build tool could not be invoked or exited non-zero
    #[error("Build tool '{tool}' unavailable: {reason}")]
    ToolUnavailable {
        /// Tool name
        tool: String,
        /// Reason for the error
        reason: String,
    },

    /// Build tool output carried no version token
    #[error("No version found in build tool output: {output:?}")]
    ParseError {
        /// Output after ANSI stripping
        output: String,
    },

    /// A file could not be rewritten
    #[error("Failed to rewrite version in {path}: {source}")]
    RewriteFailed {
        /// File being rewritten
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File exists but could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the config schema
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Parser error
        #[source]
        source: toml::de::Error,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Validation(ValidationError::DirtyWorkingTree { .. }) => vec![
                "Commit pending changes: git add . && git commit -m 'message'".to_string(),
                "Stash changes temporarily: git stash".to_string(),
            ],
            ReleaseError::Validation(ValidationError::DetachedHead) => {
                vec!["Check out the branch to release from: git checkout <branch>".to_string()]
            }
            ReleaseError::Validation(ValidationError::BranchExists { branch }) => vec![format!(
                "Remove the leftover branch if it is stale: git branch -D {branch}"
            )],
            ReleaseError::Validation(ValidationError::TagExists { tag }) => vec![
                format!("Choose a different version, or remove the tag: git tag -d {tag}"),
            ],
            ReleaseError::Validation(ValidationError::RemoteUnreachable { server }) => vec![
                format!("Check ssh access: ssh {server} true"),
                "Use --server to pick a different host".to_string(),
            ],
            ReleaseError::Validation(ValidationError::NotIgnored { path }) => vec![format!(
                "Add '{}/' to .gitignore and commit it",
                path.display()
            )],
            ReleaseError::Validation(ValidationError::MissingTool { tool }) => {
                vec![format!("Install '{tool}' or add it to PATH")]
            }
            ReleaseError::Aborted {
                cleanup_failures: 0,
                ..
            } => vec!["The repository was restored; fix the failing step and re-run".to_string()],
            ReleaseError::Aborted {
                cleanup_failures, ..
            } => vec![
                format!(
                    "{cleanup_failures} cleanup action(s) failed; the repository was NOT fully restored"
                ),
                "Inspect the tree: git status && git branch && git tag --list".to_string(),
                "Restore by hand: git reset --hard, git checkout <branch>, git branch -D releasing-<version>, git tag -d v<version>"
                    .to_string(),
            ],
            ReleaseError::Fatal { .. } => vec![
                "Inspect the remote branch and tags: git ls-remote --heads --tags origin"
                    .to_string(),
                "Inspect the remote release directory before re-running anything".to_string(),
                "Local branch and tag were left in place on purpose".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Whether this error was raised past the publication boundary
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReleaseError::Fatal { .. })
    }
}
