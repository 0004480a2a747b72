//! Publication of the release directory to the remote server.
//!
//! Reachability is probed over ssh; the transfer is a recursive,
//! permission-preserving rsync of the release directory's contents.

use crate::runner::{CommandResult, CommandRunner, CommandSpec};
use std::path::{Path, PathBuf};

/// Remote host plus destination directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// ssh-reachable host (may include `user@`)
    pub server: String,
    /// Destination directory on the host
    pub path: String,
}

impl RemoteTarget {
    /// `host:path/` destination spec for rsync
    pub fn destination(&self) -> String {
        format!("{}:{}/", self.server, self.path.trim_end_matches('/'))
    }
}

/// Talks to the remote release server
#[derive(Debug)]
pub struct PublishGateway<'a, R> {
    runner: &'a R,
    target: RemoteTarget,
}

impl<'a, R: CommandRunner> PublishGateway<'a, R> {
    /// Gateway for the given remote target
    pub fn new(runner: &'a R, target: RemoteTarget) -> Self {
        Self { runner, target }
    }

    /// Remote target
    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    /// Non-interactive ssh command that only checks the host answers
    pub fn probe_command(&self) -> CommandSpec {
        CommandSpec::new(
            "ssh",
            ["-o", "BatchMode=yes", self.target.server.as_str(), "true"],
        )
    }

    /// rsync command that transfers `release_dir`'s contents
    pub fn transfer_command(&self, release_dir: &Path) -> CommandSpec {
        let mut source = PathBuf::from(release_dir).into_os_string();
        source.push("/");
        CommandSpec::new(
            "rsync",
            [
                "-av".to_string(),
                source.to_string_lossy().into_owned(),
                self.target.destination(),
            ],
        )
    }

    /// Check that the remote host accepts a non-interactive ssh session
    pub async fn probe(&self) -> CommandResult {
        let command = self.probe_command();
        let result = self.runner.run(&command).await;
        if !result.exited_zero {
            log::warn!("[ssh] {} failed: {}", command, result.failure_reason());
        }
        result
    }

    /// Synchronize the release directory to the remote path
    pub async fn transfer(&self, release_dir: &Path) -> CommandResult {
        let command = self.transfer_command(release_dir);
        let result = self.runner.run(&command).await;
        if !result.exited_zero {
            log::error!("[rsync] {} failed: {}", command, result.failure_reason());
        }
        result
    }
}
