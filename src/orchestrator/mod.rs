//! Release state machine.
//!
//! ```text
//! Init → BranchCreated → VersionRewritten → Cleaned → (Tested) → Built
//!      → Packaged → Committed → Tagged ┃ Pushing → Published
//!                                      ┃
//!            reversible: Aborted       ┃   irreversible: Fatal
//! ```
//!
//! Every step before the boundary is guarded: a non-zero result or a trapped
//! signal aborts the run and applies the cleanup set for the highest phase
//! reached. From [`Phase::Pushing`] on, the same events are fatal: nothing is
//! cleaned up and a banner tells the operator to take over.

mod cleanup;
mod preflight;

pub use preflight::validate_version;

use crate::build::BuildPipeline;
use crate::cli::OutputManager;
use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::git::GitWorkflowManager;
use crate::publish::{PublishGateway, RemoteTarget};
use crate::runner::{CommandResult, CommandRunner};
use crate::signal::SignalBridge;
use crate::state::{CleanupAction, Phase, ReleaseSession, TerminalState};
use crate::version::VersionRewriter;
use std::future::Future;
use std::path::{Path, PathBuf};

/// What the operator asked for
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    /// Version to release
    pub target_version: String,
    /// Simulate push and publish
    pub dry_run: bool,
    /// On dry run, keep branch and tag
    pub no_revert: bool,
    /// Run the test step before building
    pub run_tests: bool,
    /// Remote host
    pub server: String,
    /// Remote directory
    pub remote_path: String,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct ReleaseReport {
    /// Session the run used
    pub session: ReleaseSession,
    /// How the run ended
    pub terminal: TerminalState,
    /// Cleanup actions applied, in order
    pub cleanup_performed: Vec<CleanupAction>,
    /// Archive produced, relative to the project root
    pub archive: Option<PathBuf>,
    /// Schema files copied into the release directory
    pub schema_files: Vec<PathBuf>,
    /// Files touched by the version rewrite
    pub rewritten_files: Vec<PathBuf>,
    /// Commands a dry run reported instead of running
    pub simulated: Vec<String>,
}

impl ReleaseReport {
    fn new(session: ReleaseSession) -> Self {
        Self {
            session,
            terminal: TerminalState::Aborted,
            cleanup_performed: Vec::new(),
            archive: None,
            schema_files: Vec::new(),
            rewritten_files: Vec::new(),
            simulated: Vec::new(),
        }
    }

    /// Multi-line summary for display
    pub fn format_summary(&self) -> String {
        let s = &self.session;
        let mut out = match self.terminal {
            TerminalState::Published => format!(
                "Release {} published ({} → {})\n",
                s.target_version, s.current_version, s.target_version
            ),
            TerminalState::Simulated { reverted } => format!(
                "Dry run for {} finished; repository {}\n",
                s.target_version,
                if reverted { "restored" } else { "left on the release branch" }
            ),
            TerminalState::Aborted => format!("Release {} aborted\n", s.target_version),
            TerminalState::Fatal => format!("Release {} FAILED past the boundary\n", s.target_version),
        };
        out.push_str(&format!("  Branch:  {}\n", s.release_branch));
        out.push_str(&format!("  Tag:     {}\n", s.release_tag()));
        if let Some(archive) = &self.archive {
            out.push_str(&format!("  Archive: {}\n", archive.display()));
        }
        if !self.simulated.is_empty() {
            out.push_str(&format!("  Skipped: {} command(s)\n", self.simulated.len()));
        }
        let secs = s.elapsed().num_milliseconds() as f64 / 1000.0;
        out.push_str(&format!("  Elapsed: {secs:.1}s"));
        out
    }
}

/// Why a guarded step did not succeed
#[derive(Debug, Clone)]
struct StepFailure {
    stage: &'static str,
    step: String,
    reason: String,
}

/// Sequences the release and owns the abort/fatal policy
#[derive(Debug)]
pub struct ReleaseOrchestrator<'a, R> {
    runner: &'a R,
    config: &'a ReleaseConfig,
    project_root: PathBuf,
    signals: &'a SignalBridge,
    output: OutputManager,
}

impl<'a, R: CommandRunner> ReleaseOrchestrator<'a, R> {
    /// Orchestrator over a project root; `runner` must run commands in that root
    pub fn new(
        runner: &'a R,
        config: &'a ReleaseConfig,
        project_root: &Path,
        signals: &'a SignalBridge,
        output: OutputManager,
    ) -> Self {
        Self {
            runner,
            config,
            project_root: project_root.to_path_buf(),
            signals,
            output,
        }
    }

    fn git(&self) -> GitWorkflowManager<'a, R> {
        GitWorkflowManager::new(self.runner, self.config.release.remote.clone())
    }

    fn pipeline(&self) -> BuildPipeline<'a, R> {
        BuildPipeline::new(self.runner, self.config, &self.project_root)
    }

    fn gateway_for(&self, server: &str, path: &str) -> PublishGateway<'a, R> {
        PublishGateway::new(
            self.runner,
            RemoteTarget {
                server: server.to_string(),
                path: path.to_string(),
            },
        )
    }

    /// Run a full release
    pub async fn run(&self, options: ReleaseOptions) -> Result<ReleaseReport> {
        self.output.section(&format!("Release {}", options.target_version));
        let session = self.preflight(&options).await?;

        if self.signals.token().is_cancelled() {
            let reason = self.interrupt_reason();
            self.output.stage_failure("signal", &format!("{reason} before any change was made"));
            return Err(ReleaseError::Aborted {
                phase: Phase::Init,
                stage: "signal".to_string(),
                reason,
                cleanup_failures: 0,
            });
        }

        self.output.info(&format!(
            "Releasing {} → {} from branch {}{}",
            session.current_version,
            session.target_version,
            session.initial_branch,
            if session.dry_run { " (dry run)" } else { "" }
        ));

        let mut report = ReleaseReport::new(session.clone());
        let mut session = session;
        let outcome = self.execute(&mut session, &mut report).await;
        let reached = session.phase();
        report.session = session.clone();
        log::debug!("pipeline stopped at phase {}", reached);

        match outcome {
            Err(failure) if reached.is_irreversible() => Err(self.escalate(&session, failure)),
            Err(failure) => {
                self.output.stage_failure(
                    failure.stage,
                    &format!("{} failed: {}", failure.step, failure.reason),
                );
                self.output
                    .warn(&format!("Aborting at phase {reached}; restoring the repository"));
                let cleanup = self.apply_cleanup(&session, reached).await;
                Err(ReleaseError::Aborted {
                    phase: reached,
                    stage: failure.stage.to_string(),
                    reason: format!("{} failed: {}", failure.step, failure.reason),
                    cleanup_failures: cleanup.failed.len(),
                })
            }
            Ok(()) if session.dry_run => {
                let reverted = !session.no_revert;
                if reverted {
                    self.output.info("Dry run complete; reverting local changes");
                    let cleanup = self.apply_cleanup(&session, reached).await;
                    if !cleanup.is_complete() {
                        let failed: Vec<String> =
                            cleanup.failed.iter().map(ToString::to_string).collect();
                        return Err(ReleaseError::Aborted {
                            phase: reached,
                            stage: "cleanup".to_string(),
                            reason: format!(
                                "dry run could not be reverted: {}",
                                failed.join(", ")
                            ),
                            cleanup_failures: cleanup.failed.len(),
                        });
                    }
                    report.cleanup_performed = cleanup.performed;
                } else {
                    self.output.info(&format!(
                        "Dry run complete; leaving {} and {} for inspection",
                        session.release_branch,
                        session.release_tag()
                    ));
                }
                report.terminal = TerminalState::Simulated { reverted };
                self.output.success(&report.format_summary());
                Ok(report)
            }
            Ok(()) => {
                report.terminal = TerminalState::Published;
                self.output.success(&report.format_summary());
                Ok(report)
            }
        }
    }

    fn interrupt_reason(&self) -> String {
        match self.signals.received() {
            Some(signal) => format!("interrupted by {signal}"),
            None => "interrupted".to_string(),
        }
    }

    fn check_interrupt(&self, stage: &'static str, step: &str) -> std::result::Result<(), StepFailure> {
        if self.signals.token().is_cancelled() {
            return Err(StepFailure {
                stage,
                step: step.to_string(),
                reason: self.interrupt_reason(),
            });
        }
        Ok(())
    }

    /// Await one external step, racing it against the interrupt token
    async fn guarded<F>(&self, stage: &'static str, step: &str, work: F) -> std::result::Result<CommandResult, StepFailure>
    where
        F: Future<Output = CommandResult>,
    {
        self.check_interrupt(stage, step)?;
        self.output.progress(step);
        let token = self.signals.token();

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = work => Some(result),
        };

        match result {
            None => {
                log::warn!("[{}] {} interrupted; child process killed", stage, step);
                Err(StepFailure {
                    stage,
                    step: step.to_string(),
                    reason: self.interrupt_reason(),
                })
            }
            Some(result) if result.exited_zero => Ok(result),
            Some(result) => Err(StepFailure {
                stage,
                step: step.to_string(),
                reason: result.failure_reason(),
            }),
        }
    }

    async fn execute(
        &self,
        session: &mut ReleaseSession,
        report: &mut ReleaseReport,
    ) -> std::result::Result<(), StepFailure> {
        let git = self.git();
        let pipeline = self.pipeline();
        let version = session.target_version.clone();
        let branch = session.release_branch.clone();
        let tag = session.release_tag();

        self.guarded("git", &format!("create branch {branch}"), git.create_release_branch(&branch))
            .await?;
        session.advance(Phase::BranchCreated);

        self.check_interrupt("rewrite", "rewrite version")?;
        self.output.progress(&format!(
            "rewrite {} → {}",
            session.current_version, session.target_version
        ));
        let tracked = git.tracked_files().await.map_err(|result| StepFailure {
            stage: "git",
            step: "list tracked files".to_string(),
            reason: result.failure_reason(),
        })?;
        let rewriter = VersionRewriter::new(&self.project_root, &self.config.rewrite.exclude)
            .only_tracked(tracked);
        let summary = rewriter
            .rewrite(&session.current_version, &session.target_version)
            .map_err(|e| StepFailure {
                stage: "rewrite",
                step: "rewrite version".to_string(),
                reason: e.to_string(),
            })?;
        if summary.modified_files.is_empty() {
            self.output.warn(&format!(
                "version string '{}' was not found in any file",
                session.current_version
            ));
        } else {
            self.output.indent(&format!(
                "{} replacement(s) in {} file(s)",
                summary.replacements,
                summary.modified_files.len()
            ));
        }
        report.rewritten_files = summary.modified_files;
        session.advance(Phase::VersionRewritten);

        self.guarded("build", "clean", pipeline.clean()).await?;
        session.advance(Phase::Cleaned);

        if session.run_tests {
            self.guarded("build", "test", pipeline.test()).await?;
            session.advance(Phase::Tested);
        }

        self.guarded("build", "release build", pipeline.build_release()).await?;
        session.advance(Phase::Built);

        self.check_interrupt("schema", "copy schema artifacts")?;
        report.schema_files = pipeline.copy_schema_artifacts().map_err(|e| StepFailure {
            stage: "schema",
            step: "copy schema artifacts".to_string(),
            reason: e.to_string(),
        })?;

        let archive = pipeline.archive_path(&version);
        let source = self.config.build.output_dir.clone();
        self.guarded(
            "tar",
            &format!("package {}", archive.display()),
            pipeline.package_archive(&source, &archive),
        )
        .await?;
        report.archive = Some(archive);
        session.advance(Phase::Packaged);

        self.guarded("git", "commit", git.commit_all(&session.commit_message()))
            .await?;
        session.advance(Phase::Committed);

        self.guarded("git", &format!("tag {tag}"), git.tag(&tag, &session.tag_message()))
            .await?;
        session.advance(Phase::Tagged);

        // Last chance to abort cleanly
        self.check_interrupt("git", "push")?;

        let gateway = self.gateway_for(&session.server_address, &session.remote_path);
        if session.dry_run {
            for command in [
                git.push_branch_command(&branch),
                git.push_tags_command(),
                gateway.transfer_command(pipeline.release_dir()),
            ] {
                let line = command.to_string();
                self.output.dry_run(&line);
                report.simulated.push(line);
            }
            return Ok(());
        }

        session.advance(Phase::Pushing);
        self.output.section("Publishing (no automatic rollback past this point)");

        self.guarded("git", &format!("push {branch}"), git.push_branch(&branch))
            .await?;
        self.guarded("git", "push tags", git.push_tags()).await?;
        self.guarded(
            "rsync",
            &format!("sync to {}", gateway.target().destination()),
            gateway.transfer(pipeline.release_dir()),
        )
        .await?;
        session.advance(Phase::Published);

        self.guarded(
            "git",
            &format!("return to {}", session.initial_branch),
            git.checkout(&session.initial_branch),
        )
        .await?;
        Ok(())
    }

    fn escalate(&self, session: &ReleaseSession, failure: StepFailure) -> ReleaseError {
        let phase = session.phase();
        let git = self.git();
        self.output.stage_failure(
            failure.stage,
            &format!("{} failed: {}", failure.step, failure.reason),
        );
        log::error!(
            "fatal failure at phase {} during {}: {}",
            phase,
            failure.step,
            failure.reason
        );
        self.output.fatal_banner(
            "RELEASE FAILED AFTER PUBLICATION STARTED",
            &[
                format!("Step:    [{}] {}", failure.stage, failure.step),
                format!("Reason:  {}", failure.reason),
                format!("Phase:   {phase}"),
                format!(
                    "Branch {} and tag {} may already be on '{}'.",
                    session.release_branch,
                    session.release_tag(),
                    git.remote()
                ),
                format!(
                    "The remote copy at {}:{} may be partial.",
                    session.server_address, session.remote_path
                ),
                "No automatic cleanup was attempted.".to_string(),
                "MANUAL INTERVENTION REQUIRED.".to_string(),
            ],
        );
        ReleaseError::Fatal {
            phase,
            stage: failure.stage.to_string(),
            reason: format!("{} failed: {}", failure.step, failure.reason),
        }
    }
}
