//! Release session, phase and cleanup derivation.

use chrono::{DateTime, Utc};
use std::fmt;

/// Progress marker for a release run
///
/// Ordering matters: everything from [`Phase::Pushing`] on lies past the
/// publication boundary and is never rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Validated, nothing mutated
    Init,
    /// Release branch created and checked out
    BranchCreated,
    /// Old version string replaced with the new one
    VersionRewritten,
    /// Build tool clean step done
    Cleaned,
    /// Test step passed
    Tested,
    /// Release build done
    Built,
    /// Schema artifacts copied and archive written
    Packaged,
    /// Version changes committed on the release branch
    Committed,
    /// Release tag created
    Tagged,
    /// Push to origin started
    Pushing,
    /// Release directory synchronized to the remote
    Published,
}

impl Phase {
    /// First phase past the publication boundary
    pub const BOUNDARY: Phase = Phase::Pushing;

    /// Whether irreversible external state may exist at this phase
    pub fn is_irreversible(self) -> bool {
        self >= Self::BOUNDARY
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "Init",
            Phase::BranchCreated => "BranchCreated",
            Phase::VersionRewritten => "VersionRewritten",
            Phase::Cleaned => "Cleaned",
            Phase::Tested => "Tested",
            Phase::Built => "Built",
            Phase::Packaged => "Packaged",
            Phase::Committed => "Committed",
            Phase::Tagged => "Tagged",
            Phase::Pushing => "Pushing",
            Phase::Published => "Published",
        };
        f.write_str(name)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// Pushed and published
    Published,
    /// Dry run finished; `reverted` tells whether local artifacts were cleaned up
    Simulated {
        /// Whether cleanup ran after the simulation
        reverted: bool,
    },
    /// Reversible failure, cleanup applied
    Aborted,
    /// Failure past the boundary, cleanup refused
    Fatal,
}

/// Counter-operation for a reversible phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    /// Hard reset and remove untracked files
    DiscardChanges,
    /// Delete the release tag if it is present in the tag list
    DeleteTag {
        /// Exact tag name
        tag: String,
    },
    /// Check out the initial branch and delete the release branch
    RestoreBranch {
        /// Branch to return to
        initial: String,
        /// Branch to delete
        release: String,
    },
}

impl CleanupAction {
    /// Ordered cleanup set for the highest phase reached
    ///
    /// Empty at [`Phase::Init`] and for every phase past the boundary.
    /// Tag deletion is scheduled once the tag step may have run; the action
    /// only deletes an exact match.
    pub fn for_phase(phase: Phase, session: &ReleaseSession) -> Vec<CleanupAction> {
        if phase == Phase::Init || phase.is_irreversible() {
            return Vec::new();
        }

        let mut actions = vec![CleanupAction::DiscardChanges];
        if phase >= Phase::Committed {
            actions.push(CleanupAction::DeleteTag {
                tag: session.release_tag(),
            });
        }
        actions.push(CleanupAction::RestoreBranch {
            initial: session.initial_branch.clone(),
            release: session.release_branch.clone(),
        });
        actions
    }
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupAction::DiscardChanges => write!(f, "discard uncommitted changes"),
            CleanupAction::DeleteTag { tag } => write!(f, "delete tag {tag}"),
            CleanupAction::RestoreBranch { initial, release } => {
                write!(f, "return to {initial} and delete {release}")
            }
        }
    }
}

/// Everything one release run needs to know, fixed at startup
#[derive(Debug, Clone)]
pub struct ReleaseSession {
    /// Version being released
    pub target_version: String,
    /// Version the build tool reported before the run
    pub current_version: String,
    /// Branch checked out when the run started
    pub initial_branch: String,
    /// `releasing-<version>`
    pub release_branch: String,
    /// Simulate push and publish
    pub dry_run: bool,
    /// On dry run, keep branch and tag for inspection
    pub no_revert: bool,
    /// Run the test step before building
    pub run_tests: bool,
    /// Remote host for publication
    pub server_address: String,
    /// Remote directory for publication
    pub remote_path: String,
    /// When the session was created
    pub started_at: DateTime<Utc>,
    phase: Phase,
}

/// Inputs for [`ReleaseSession::new`]
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Simulate push and publish
    pub dry_run: bool,
    /// On dry run, keep branch and tag for inspection
    pub no_revert: bool,
    /// Run the test step before building
    pub run_tests: bool,
    /// Remote host for publication
    pub server_address: String,
    /// Remote directory for publication
    pub remote_path: String,
}

impl ReleaseSession {
    /// Create a session at [`Phase::Init`]
    pub fn new(
        target_version: impl Into<String>,
        current_version: impl Into<String>,
        initial_branch: impl Into<String>,
        options: SessionOptions,
    ) -> Self {
        let target_version = target_version.into();
        Self {
            release_branch: release_branch_name(&target_version),
            target_version,
            current_version: current_version.into(),
            initial_branch: initial_branch.into(),
            dry_run: options.dry_run,
            no_revert: options.no_revert,
            run_tests: options.run_tests,
            server_address: options.server_address,
            remote_path: options.remote_path,
            started_at: Utc::now(),
            phase: Phase::Init,
        }
    }

    /// Highest phase reached so far
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move forward to `phase`; never moves backwards
    pub fn advance(&mut self, phase: Phase) {
        if phase > self.phase {
            log::debug!("phase {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// `v<version>`
    pub fn release_tag(&self) -> String {
        release_tag_name(&self.target_version)
    }

    /// Commit message for the version change
    pub fn commit_message(&self) -> String {
        format!("Update version for release {}", self.target_version)
    }

    /// Annotation for the release tag
    pub fn tag_message(&self) -> String {
        format!("Release {}", self.target_version)
    }

    /// Time since the session was created
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

/// Release branch name for a version
pub fn release_branch_name(version: &str) -> String {
    format!("releasing-{version}")
}

/// Release tag name for a version
pub fn release_tag_name(version: &str) -> String {
    format!("v{version}")
}
