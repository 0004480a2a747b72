//! Branch, commit, tag and push operations for a release run.
//!
//! Step operations return the raw [`CommandResult`]; the orchestrator decides
//! whether a failure is reversible. Cleanup operations are idempotent.

use crate::runner::{CommandResult, CommandRunner, CommandSpec};
use std::path::{Path, PathBuf};

const GIT: &str = "git";

fn git<I, S>(args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    CommandSpec::new(GIT, args)
}

/// Git operations used by the release workflow
#[derive(Debug)]
pub struct GitWorkflowManager<'a, R> {
    runner: &'a R,
    remote: String,
}

impl<'a, R: CommandRunner> GitWorkflowManager<'a, R> {
    /// Manager pushing to `remote`
    pub fn new(runner: &'a R, remote: impl Into<String>) -> Self {
        Self {
            runner,
            remote: remote.into(),
        }
    }

    /// Remote that receives pushes
    pub fn remote(&self) -> &str {
        &self.remote
    }

    async fn exec(&self, command: CommandSpec) -> CommandResult {
        let result = self.runner.run(&command).await;
        if !result.exited_zero {
            log::warn!("[git] {} failed: {}", command, result.failure_reason());
        }
        result
    }

    /// Whether the working directory is inside a git work tree
    pub async fn is_repository(&self) -> bool {
        self.exec(git(["rev-parse", "--is-inside-work-tree"]))
            .await
            .exited_zero
    }

    /// Name of the checked-out branch, `None` on detached HEAD
    pub async fn current_branch(&self) -> Option<String> {
        let result = self
            .exec(git(["symbolic-ref", "--short", "-q", "HEAD"]))
            .await;
        let name = result.stdout.trim();
        (result.exited_zero && !name.is_empty()).then(|| name.to_string())
    }

    /// Porcelain status lines; empty means clean
    pub async fn uncommitted_changes(&self) -> Result<Vec<String>, CommandResult> {
        let result = self.exec(git(["status", "--porcelain"])).await;
        if !result.exited_zero {
            return Err(result);
        }
        Ok(result
            .stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Whether a local branch with exactly this name exists
    pub async fn branch_exists(&self, name: &str) -> bool {
        self.exec(git([
            "rev-parse".to_string(),
            "--verify".to_string(),
            "--quiet".to_string(),
            format!("refs/heads/{name}"),
        ]))
        .await
        .exited_zero
    }

    /// Whether `path` is covered by an ignore rule
    pub async fn is_ignored(&self, path: &Path) -> bool {
        self.runner
            .run(&git([
                "check-ignore".to_string(),
                "-q".to_string(),
                path.to_string_lossy().into_owned(),
            ]))
            .await
            .exited_zero
    }

    /// All local tag names
    pub async fn tags(&self) -> Result<Vec<String>, CommandResult> {
        let result = self.exec(git(["tag", "--list"])).await;
        if !result.exited_zero {
            return Err(result);
        }
        Ok(result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Tracked file paths, relative to the working directory
    pub async fn tracked_files(&self) -> Result<Vec<PathBuf>, CommandResult> {
        let result = self.exec(git(["ls-files", "-z"])).await;
        if !result.exited_zero {
            return Err(result);
        }
        Ok(result
            .stdout
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    /// Whether a tag with exactly this name exists
    ///
    /// Compares whole names, so `v1.1` never matches `v1.10` or `xv1.1`.
    pub async fn tag_exists(&self, name: &str) -> Result<bool, CommandResult> {
        Ok(self.tags().await?.iter().any(|t| t == name))
    }

    /// Create and check out the release branch
    pub async fn create_release_branch(&self, name: &str) -> CommandResult {
        self.exec(git(["checkout", "-b", name])).await
    }

    /// Stage everything and commit
    pub async fn commit_all(&self, message: &str) -> CommandResult {
        let staged = self.exec(git(["add", "--all"])).await;
        if !staged.exited_zero {
            return staged;
        }
        self.exec(git(["commit", "-m", message])).await
    }

    /// Create an annotated tag on HEAD
    pub async fn tag(&self, name: &str, message: &str) -> CommandResult {
        self.exec(git(["tag", "-a", name, "-m", message])).await
    }

    /// Command that pushes the release branch
    pub fn push_branch_command(&self, name: &str) -> CommandSpec {
        git(["push", self.remote.as_str(), name])
    }

    /// Command that pushes tags
    pub fn push_tags_command(&self) -> CommandSpec {
        git(["push", self.remote.as_str(), "--tags"])
    }

    /// Push the release branch; not reversible once it succeeds
    pub async fn push_branch(&self, name: &str) -> CommandResult {
        self.exec(self.push_branch_command(name)).await
    }

    /// Push tags; not reversible once it succeeds
    pub async fn push_tags(&self) -> CommandResult {
        self.exec(self.push_tags_command()).await
    }

    /// Check out an existing branch
    pub async fn checkout(&self, branch: &str) -> CommandResult {
        self.exec(git(["checkout", branch])).await
    }

    /// Hard reset and remove untracked files
    pub async fn discard_changes(&self) -> CommandResult {
        let reset = self.exec(git(["reset", "--hard"])).await;
        if !reset.exited_zero {
            return reset;
        }
        self.exec(git(["clean", "-fd"])).await
    }

    /// Delete `name` only if it is in the tag list
    ///
    /// Succeeds without doing anything when the tag is already gone.
    pub async fn delete_tag_if_present(&self, name: &str) -> CommandResult {
        match self.tag_exists(name).await {
            Ok(true) => self.exec(git(["tag", "-d", name])).await,
            Ok(false) => {
                log::debug!("tag {} not present, nothing to delete", name);
                CommandResult::success("")
            }
            Err(result) => result,
        }
    }

    /// Return to `initial` and delete `release`
    ///
    /// Safe to repeat: a missing release branch is not an error.
    pub async fn checkout_and_delete_branch(&self, initial: &str, release: &str) -> CommandResult {
        if self.current_branch().await.as_deref() != Some(initial) {
            let checkout = self.checkout(initial).await;
            if !checkout.exited_zero {
                return checkout;
            }
        }
        if !self.branch_exists(release).await {
            log::debug!("branch {} not present, nothing to delete", release);
            return CommandResult::success("");
        }
        self.exec(git(["branch", "-D", release])).await
    }
}
