//! Read-only checks run before anything is mutated.

use super::{ReleaseOptions, ReleaseOrchestrator};
use crate::error::{Result, ValidationError};
use crate::runner::CommandRunner;
use crate::state::{ReleaseSession, SessionOptions, release_branch_name, release_tag_name};
use crate::version::VersionResolver;
use regex::Regex;
use std::sync::LazyLock;

static VERSION_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z][0-9A-Za-z._+-]*$").expect("static regex"));

/// Check that `version` can be used inside a branch and tag name
pub fn validate_version(version: &str) -> std::result::Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidVersion {
        version: version.to_string(),
        reason: reason.to_string(),
    };

    if version.is_empty() {
        return Err(invalid("version is empty"));
    }
    if !VERSION_SYNTAX.is_match(version) {
        return Err(invalid(
            "use letters, digits, '.', '_', '+' or '-', starting with a letter or digit",
        ));
    }
    if version.contains("..") || version.ends_with('.') || version.ends_with(".lock") {
        return Err(invalid("not usable in a git ref name"));
    }
    Ok(())
}

impl<R: CommandRunner> ReleaseOrchestrator<'_, R> {
    /// Validate input and repository state, then build the session
    pub(super) async fn preflight(&self, options: &ReleaseOptions) -> Result<ReleaseSession> {
        validate_version(&options.target_version)?;

        let mut tools = vec!["git", self.config.build.program.as_str(), "tar"];
        if !options.dry_run {
            tools.extend(["ssh", "rsync"]);
        }
        for tool in tools {
            if !self.runner.tool_available(tool) {
                return Err(ValidationError::MissingTool {
                    tool: tool.to_string(),
                }
                .into());
            }
        }

        let git = self.git();
        if !git.is_repository().await {
            return Err(ValidationError::NotRepository {
                path: self.project_root.clone(),
            }
            .into());
        }

        let initial_branch = git
            .current_branch()
            .await
            .ok_or(ValidationError::DetachedHead)?;

        let changes = git.uncommitted_changes().await.map_err(|_| {
            ValidationError::NotRepository {
                path: self.project_root.clone(),
            }
        })?;
        if !changes.is_empty() {
            for change in &changes {
                self.output.indent(change);
            }
            return Err(ValidationError::DirtyWorkingTree { changes }.into());
        }

        // Release outputs must survive `git clean` and stay out of the commit
        for path in [&self.config.release.dir, &self.config.build.output_dir] {
            if !git.is_ignored(path).await {
                return Err(ValidationError::NotIgnored { path: path.clone() }.into());
            }
        }

        let branch = release_branch_name(&options.target_version);
        if git.branch_exists(&branch).await {
            return Err(ValidationError::BranchExists { branch }.into());
        }
        let tag = release_tag_name(&options.target_version);
        let tag_present = git.tag_exists(&tag).await.map_err(|_| {
            ValidationError::NotRepository {
                path: self.project_root.clone(),
            }
        })?;
        if tag_present {
            return Err(ValidationError::TagExists { tag }.into());
        }

        let current_version = VersionResolver::new(self.runner, &self.config.build)
            .resolve()
            .await?;
        if current_version == options.target_version {
            return Err(ValidationError::SameVersion {
                version: current_version,
            }
            .into());
        }

        if !options.dry_run {
            let gateway = self.gateway_for(&options.server, &options.remote_path);
            if !gateway.probe().await.exited_zero {
                return Err(ValidationError::RemoteUnreachable {
                    server: options.server.clone(),
                }
                .into());
            }
        }

        self.output.success("Preflight checks passed");
        Ok(ReleaseSession::new(
            options.target_version.clone(),
            current_version,
            initial_branch,
            SessionOptions {
                dry_run: options.dry_run,
                no_revert: options.no_revert,
                run_tests: options.run_tests,
                server_address: options.server.clone(),
                remote_path: options.remote_path.clone(),
            },
        ))
    }
}
