//! Reversible-phase cleanup.

use super::ReleaseOrchestrator;
use crate::runner::CommandRunner;
use crate::state::{CleanupAction, Phase, ReleaseSession};

/// What a cleanup pass managed to do
#[derive(Debug, Clone, Default)]
pub(super) struct CleanupOutcome {
    /// Actions that succeeded, in order
    pub(super) performed: Vec<CleanupAction>,
    /// Actions that failed, in order
    pub(super) failed: Vec<CleanupAction>,
}

impl CleanupOutcome {
    pub(super) fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<R: CommandRunner> ReleaseOrchestrator<'_, R> {
    /// Apply the cleanup set for `reached`
    ///
    /// Every action is attempted even if an earlier one fails. Refuses to do
    /// anything once the boundary has been crossed.
    pub(super) async fn apply_cleanup(
        &self,
        session: &ReleaseSession,
        reached: Phase,
    ) -> CleanupOutcome {
        let mut outcome = CleanupOutcome::default();
        if reached.is_irreversible() {
            log::error!("cleanup requested at phase {}; refusing", reached);
            return outcome;
        }

        let actions = CleanupAction::for_phase(reached, session);
        if actions.is_empty() {
            self.output.info("Nothing to clean up");
            return outcome;
        }

        let git = self.git();

        for action in actions {
            self.output.progress(&format!("cleanup: {action}"));
            let result = match &action {
                CleanupAction::DiscardChanges => git.discard_changes().await,
                CleanupAction::DeleteTag { tag } => git.delete_tag_if_present(tag).await,
                CleanupAction::RestoreBranch { initial, release } => {
                    git.checkout_and_delete_branch(initial, release).await
                }
            };

            if result.exited_zero {
                outcome.performed.push(action);
            } else {
                self.output.stage_failure(
                    "git",
                    &format!("cleanup '{action}' failed: {}", result.failure_reason()),
                );
                outcome.failed.push(action);
            }
        }

        if outcome.is_complete() {
            self.output.success(&format!(
                "Repository restored to {}",
                session.initial_branch
            ));
        } else {
            self.output.warn(&format!(
                "{} cleanup action(s) failed; check `git status` and `git branch`",
                outcome.failed.len()
            ));
        }
        outcome
    }
}
