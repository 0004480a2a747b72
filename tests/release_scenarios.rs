//! End-to-end release scenarios against a scripted command runner.

use release_pilot::cli::OutputManager;
use release_pilot::runner::{Reply, ScriptedRunner};
use release_pilot::signal::TerminationSignal;
use release_pilot::{
    CleanupAction, Phase, ReleaseConfig, ReleaseError, ReleaseOptions, ReleaseOrchestrator,
    ReleaseReport, SignalBridge, TerminalState, ValidationError,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MUTATING: &[&str] = &[
    "git checkout",
    "git add",
    "git commit",
    "git tag -a",
    "git tag -d",
    "git reset",
    "git clean",
    "git branch -D",
    "git push",
    "mvn clean",
    "mvn package",
    "tar",
    "rsync",
];

const CLEANUP: &[&str] = &["git reset", "git clean", "git tag -d", "git branch -D"];

fn project() -> (TempDir, ReleaseConfig) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("pom.xml"), "<version>1.0</version>\n").unwrap();
    let mut config = ReleaseConfig::default();
    config.project.name = Some("project".to_string());
    (dir, config)
}

/// Repository on `main` at 1.0 with no release branch or tag yet.
///
/// Overrides are queued ahead of the defaults for the same prefix.
fn repository(overrides: Vec<(&str, Reply)>) -> ScriptedRunner {
    let mut runner = ScriptedRunner::new();
    for (prefix, reply) in overrides {
        runner = runner.on(prefix, reply);
    }
    runner
        .on("git symbolic-ref", Reply::Ok("main\n".into()))
        .on("git symbolic-ref", Reply::Ok("releasing-1.1\n".into()))
        .on("git rev-parse --verify", Reply::Fail(1, String::new()))
        .on("git rev-parse --verify", Reply::Ok(String::new()))
        .on("git tag --list", Reply::Ok("v1.0\n".into()))
        .on("git tag --list", Reply::Ok("v1.0\nv1.1\n".into()))
        .on("mvn help:evaluate", Reply::Ok("[INFO] Scanning\n1.0\n".into()))
        .on("git ls-files", Reply::Ok("pom.xml\0".into()))
}

fn options(version: &str) -> ReleaseOptions {
    ReleaseOptions {
        target_version: version.to_string(),
        dry_run: false,
        no_revert: false,
        run_tests: false,
        server: "releases.example.org".to_string(),
        remote_path: "/srv/releases".to_string(),
    }
}

async fn release(
    runner: &ScriptedRunner,
    config: &ReleaseConfig,
    root: &Path,
    signals: &SignalBridge,
    options: ReleaseOptions,
) -> release_pilot::Result<ReleaseReport> {
    ReleaseOrchestrator::new(runner, config, root, signals, OutputManager::new(true))
        .run(options)
        .await
}

fn assert_untouched(runner: &ScriptedRunner, root: &Path) {
    for prefix in MUTATING {
        assert!(!runner.ran(prefix), "unexpected `{prefix}` in {:?}", runner.calls());
    }
    assert_eq!(
        fs::read_to_string(root.join("pom.xml")).unwrap(),
        "<version>1.0</version>\n"
    );
}

fn kind(error: &ValidationError) -> &'static str {
    match error {
        ValidationError::InvalidVersion { .. } => "InvalidVersion",
        ValidationError::SameVersion { .. } => "SameVersion",
        ValidationError::DirtyWorkingTree { .. } => "DirtyWorkingTree",
        ValidationError::DetachedHead => "DetachedHead",
        ValidationError::NotRepository { .. } => "NotRepository",
        ValidationError::MissingTool { .. } => "MissingTool",
        ValidationError::BranchExists { .. } => "BranchExists",
        ValidationError::TagExists { .. } => "TagExists",
        ValidationError::NotIgnored { .. } => "NotIgnored",
        ValidationError::RemoteUnreachable { .. } => "RemoteUnreachable",
    }
}

fn assert_no_cleanup(runner: &ScriptedRunner) {
    for prefix in CLEANUP {
        assert!(!runner.ran(prefix), "unexpected `{prefix}` in {:?}", runner.calls());
    }
}

#[tokio::test]
async fn publishes_a_release_end_to_end() {
    let (dir, config) = project();
    let runner = repository(vec![]);
    let signals = SignalBridge::detached();

    let report = release(&runner, &config, dir.path(), &signals, options("1.1"))
        .await
        .unwrap();

    assert_eq!(report.terminal, TerminalState::Published);
    assert_eq!(report.session.phase(), Phase::Published);
    assert_eq!(report.session.current_version, "1.0");
    assert_eq!(
        report.archive.as_deref(),
        Some(Path::new("target/release-artifacts/project-1.1.tgz"))
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("pom.xml")).unwrap(),
        "<version>1.1</version>\n"
    );

    let expected = [
        "git checkout -b releasing-1.1",
        "mvn clean",
        "mvn package -DskipTests",
        "tar -czf target/release-artifacts/project-1.1.tgz -C target dist",
        "git add --all",
        "git commit -m \"Update version for release 1.1\"",
        "git tag -a v1.1 -m \"Release 1.1\"",
        "git push origin releasing-1.1",
        "git push origin --tags",
        "rsync -av target/release-artifacts/ releases.example.org:/srv/releases/",
        "git checkout main",
    ];
    let calls = runner.calls();
    let positions: Vec<usize> = expected
        .iter()
        .map(|line| {
            calls
                .iter()
                .position(|c| c == line)
                .unwrap_or_else(|| panic!("`{line}` not run; calls: {calls:?}"))
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "out of order: {calls:?}");

    assert!(!runner.ran("mvn test"));
    assert_no_cleanup(&runner);
}

#[tokio::test]
async fn test_step_runs_only_when_requested() {
    let (dir, config) = project();
    let runner = repository(vec![]);
    let signals = SignalBridge::detached();
    let mut opts = options("1.1");
    opts.run_tests = true;

    release(&runner, &config, dir.path(), &signals, opts)
        .await
        .unwrap();

    let test = runner.position("mvn test").unwrap();
    assert!(runner.position("mvn clean").unwrap() < test);
    assert!(test < runner.position("mvn package").unwrap());
}

#[tokio::test]
async fn dirty_tree_is_rejected_before_any_change() {
    let (dir, config) = project();
    let runner = repository(vec![(
        "git status --porcelain",
        Reply::Ok(" M pom.xml\n?? notes.txt\n".into()),
    )]);
    let signals = SignalBridge::detached();

    let err = release(&runner, &config, dir.path(), &signals, options("1.1"))
        .await
        .unwrap_err();

    match err {
        ReleaseError::Validation(ValidationError::DirtyWorkingTree { changes }) => {
            assert_eq!(changes.len(), 2)
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_untouched(&runner, dir.path());
}

#[tokio::test]
async fn preflight_rejections_leave_the_repository_untouched() {
    let cases = vec![
        (
            "DetachedHead",
            vec![("git symbolic-ref", Reply::Fail(1, String::new()))],
        ),
        (
            "BranchExists",
            vec![("git rev-parse --verify", Reply::Ok(String::new()))],
        ),
        (
            "TagExists",
            vec![("git tag --list", Reply::Ok("v1.0\nv1.1\n".into()))],
        ),
        (
            "NotIgnored",
            vec![("git check-ignore", Reply::Fail(1, String::new()))],
        ),
        (
            "NotRepository",
            vec![(
                "git rev-parse --is-inside-work-tree",
                Reply::Fail(128, "fatal: not a git repository".into()),
            )],
        ),
        (
            "RemoteUnreachable",
            vec![("ssh", Reply::Fail(255, "Connection refused".into()))],
        ),
        (
            "SameVersion",
            vec![("mvn help:evaluate", Reply::Ok("1.1\n".into()))],
        ),
    ];

    for (expected, overrides) in cases {
        let (dir, config) = project();
        let runner = repository(overrides);
        let signals = SignalBridge::detached();

        let err = release(&runner, &config, dir.path(), &signals, options("1.1"))
            .await
            .unwrap_err();
        match &err {
            ReleaseError::Validation(v) => assert_eq!(kind(v), expected, "{v}"),
            other => panic!("{expected}: unexpected error {other}"),
        }
        assert_untouched(&runner, dir.path());
    }
}

#[tokio::test]
async fn malformed_version_and_missing_tools_are_rejected() {
    let (dir, config) = project();
    let signals = SignalBridge::detached();

    let runner = repository(vec![]);
    let err = release(&runner, &config, dir.path(), &signals, options("1..2"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::Validation(ValidationError::InvalidVersion { .. })
    ));
    assert!(runner.calls().is_empty());

    let runner = repository(vec![]).without_tool("tar");
    let err = release(&runner, &config, dir.path(), &signals, options("1.1"))
        .await
        .unwrap_err();
    match err {
        ReleaseError::Validation(ValidationError::MissingTool { tool }) => assert_eq!(tool, "tar"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn failures_before_push_abort_and_restore() {
    // (failing step, run tests, tag listed during cleanup, phase reached)
    let cases = [
        ("git checkout -b", false, false, Phase::Init),
        ("mvn clean", false, false, Phase::VersionRewritten),
        ("mvn test", true, false, Phase::Cleaned),
        ("mvn package", false, false, Phase::Cleaned),
        ("mvn package", true, false, Phase::Tested),
        ("tar", false, false, Phase::Built),
        ("git commit", false, false, Phase::Packaged),
        ("git tag -a", false, false, Phase::Committed),
        ("git tag -a", false, true, Phase::Committed),
    ];

    for (step, run_tests, tag_listed, phase) in cases {
        let (dir, config) = project();
        let mut overrides = vec![(step, Reply::Fail(1, format!("{step} broke")))];
        if !tag_listed {
            overrides.push(("git tag --list", Reply::Ok("v1.0\n".into())));
            overrides.push(("git tag --list", Reply::Ok("v1.0\n".into())));
        }
        let runner = repository(overrides);
        let signals = SignalBridge::detached();
        let mut opts = options("1.1");
        opts.run_tests = run_tests;

        let err = release(&runner, &config, dir.path(), &signals, opts)
            .await
            .unwrap_err();
        match &err {
            ReleaseError::Aborted {
                phase: reached,
                reason,
                cleanup_failures,
                ..
            } => {
                assert_eq!(*reached, phase, "{step}");
                assert!(reason.contains("broke"), "{step}: {reason}");
                assert_eq!(*cleanup_failures, 0, "{step}");
            }
            other => panic!("{step}: unexpected error {other}"),
        }
        assert!(!err.is_fatal());
        assert!(!runner.ran("git push"), "{step}");
        assert!(!runner.ran("rsync"), "{step}");

        if phase == Phase::Init {
            assert_no_cleanup(&runner);
            continue;
        }

        let reset = runner.position("git reset --hard").unwrap();
        let clean = runner.position("git clean -fd").unwrap();
        let delete = runner.position("git branch -D releasing-1.1").unwrap();
        assert!(reset < clean && clean < delete, "{step}: {:?}", runner.calls());
        assert!(runner.ran("git checkout main"), "{step}");
        assert_eq!(runner.ran("git tag -d v1.1"), tag_listed, "{step}");
    }
}

#[tokio::test]
async fn cleanup_keeps_going_after_a_failed_action() {
    let (dir, config) = project();
    let runner = repository(vec![
        ("mvn package", Reply::Fail(1, "compile error".into())),
        ("git reset", Reply::Fail(1, "index.lock exists".into())),
    ]);
    let signals = SignalBridge::detached();

    let err = release(&runner, &config, dir.path(), &signals, options("1.1"))
        .await
        .unwrap_err();

    match &err {
        ReleaseError::Aborted {
            cleanup_failures, ..
        } => assert_eq!(*cleanup_failures, 1),
        other => panic!("unexpected error {other}"),
    }
    assert!(runner.ran("git reset --hard"));
    assert!(runner.ran("git branch -D releasing-1.1"));

    let advice = err.recovery_suggestions();
    assert!(advice[0].contains("NOT fully restored"), "{advice:?}");
}

#[tokio::test]
async fn dry_run_that_cannot_revert_is_an_error() {
    let (dir, config) = project();
    let runner = repository(vec![
        ("git reset", Reply::Fail(1, "index.lock exists".into())),
        ("git branch -D", Reply::Fail(1, "branch is checked out".into())),
    ]);
    let signals = SignalBridge::detached();
    let mut opts = options("1.1");
    opts.dry_run = true;

    let err = release(&runner, &config, dir.path(), &signals, opts)
        .await
        .unwrap_err();

    match &err {
        ReleaseError::Aborted {
            phase,
            stage,
            cleanup_failures,
            ..
        } => {
            assert_eq!(*phase, Phase::Tagged);
            assert_eq!(stage, "cleanup");
            assert_eq!(*cleanup_failures, 2);
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(runner.ran("git tag -d v1.1"));
    assert!(!runner.ran("git push"));
}

#[tokio::test]
async fn failures_after_push_starts_are_fatal_and_untouched() {
    let cases = [
        ("git push origin releasing-1.1", Phase::Pushing),
        ("git push origin --tags", Phase::Pushing),
        ("rsync", Phase::Pushing),
        ("git checkout main", Phase::Published),
    ];

    for (step, phase) in cases {
        let (dir, config) = project();
        let runner = repository(vec![(step, Reply::Fail(1, "remote rejected".into()))]);
        let signals = SignalBridge::detached();

        let err = release(&runner, &config, dir.path(), &signals, options("1.1"))
            .await
            .unwrap_err();

        assert!(err.is_fatal(), "{step}: {err}");
        match &err {
            ReleaseError::Fatal { phase: reached, .. } => assert_eq!(*reached, phase, "{step}"),
            other => panic!("{step}: unexpected error {other}"),
        }
        assert_no_cleanup(&runner);
    }
}

#[tokio::test]
async fn branch_push_failure_stops_before_tags_and_transfer() {
    let (dir, config) = project();
    let runner = repository(vec![(
        "git push origin releasing-1.1",
        Reply::Fail(1, "rejected".into()),
    )]);
    let signals = SignalBridge::detached();

    let err = release(&runner, &config, dir.path(), &signals, options("1.1"))
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(!runner.ran("git push origin --tags"));
    assert!(!runner.ran("rsync"));
}

#[tokio::test]
async fn dry_run_simulates_publication_and_reverts() {
    let (dir, config) = project();
    let runner = repository(vec![]).without_tool("ssh").without_tool("rsync");
    let signals = SignalBridge::detached();
    let mut opts = options("1.1");
    opts.dry_run = true;

    let report = release(&runner, &config, dir.path(), &signals, opts)
        .await
        .unwrap();

    assert_eq!(report.terminal, TerminalState::Simulated { reverted: true });
    assert_eq!(report.session.phase(), Phase::Tagged);
    assert!(runner.ran("tar -czf target/release-artifacts/project-1.1.tgz"));
    assert!(!runner.ran("git push"));
    assert!(!runner.ran("rsync"));
    assert!(!runner.ran("ssh"));

    assert_eq!(
        report.simulated,
        vec![
            "git push origin releasing-1.1".to_string(),
            "git push origin --tags".to_string(),
            "rsync -av target/release-artifacts/ releases.example.org:/srv/releases/".to_string(),
        ]
    );
    assert_eq!(
        report.cleanup_performed,
        vec![
            CleanupAction::DiscardChanges,
            CleanupAction::DeleteTag {
                tag: "v1.1".to_string()
            },
            CleanupAction::RestoreBranch {
                initial: "main".to_string(),
                release: "releasing-1.1".to_string()
            },
        ]
    );
    assert!(runner.ran("git reset --hard"));
    assert!(runner.ran("git tag -d v1.1"));
    assert!(runner.ran("git branch -D releasing-1.1"));
}

#[tokio::test]
async fn dry_run_without_revert_keeps_branch_and_tag() {
    let (dir, config) = project();
    let runner = repository(vec![]);
    let signals = SignalBridge::detached();
    let mut opts = options("1.1");
    opts.dry_run = true;
    opts.no_revert = true;

    let report = release(&runner, &config, dir.path(), &signals, opts)
        .await
        .unwrap();

    assert_eq!(report.terminal, TerminalState::Simulated { reverted: false });
    assert!(report.cleanup_performed.is_empty());
    assert_no_cleanup(&runner);
    assert!(!runner.ran("git push"));
    assert!(runner.ran("git tag -a v1.1"));
}

#[tokio::test]
async fn signal_during_build_aborts_and_restores() {
    let (dir, config) = project();
    let signals = SignalBridge::detached();
    let runner = repository(vec![("mvn package", Reply::Interrupt)]).with_interrupt(signals.token());

    let err = release(&runner, &config, dir.path(), &signals, options("1.1"))
        .await
        .unwrap_err();

    match &err {
        ReleaseError::Aborted {
            phase,
            stage,
            reason,
            ..
        } => {
            assert_eq!(*phase, Phase::Cleaned);
            assert_eq!(stage, "build");
            assert!(reason.contains("release build"), "{reason}");
            assert!(reason.contains("interrupted"), "{reason}");
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(!runner.ran("tar"));
    assert!(runner.ran("git reset --hard"));
    assert!(runner.ran("git branch -D releasing-1.1"));
}

#[tokio::test]
async fn signal_during_push_is_fatal() {
    let (dir, config) = project();
    let signals = SignalBridge::detached();
    let runner = repository(vec![("git push origin releasing-1.1", Reply::Interrupt)])
        .with_interrupt(signals.token());

    let err = release(&runner, &config, dir.path(), &signals, options("1.1"))
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert_no_cleanup(&runner);
}

#[tokio::test]
async fn signal_before_start_changes_nothing() {
    let (dir, config) = project();
    let runner = repository(vec![]);
    let signals = SignalBridge::detached();
    signals.trigger(TerminationSignal::Interrupt);

    let err = release(&runner, &config, dir.path(), &signals, options("1.1"))
        .await
        .unwrap_err();

    match &err {
        ReleaseError::Aborted { phase, reason, .. } => {
            assert_eq!(*phase, Phase::Init);
            assert!(reason.contains("SIGINT"), "{reason}");
        }
        other => panic!("unexpected error {other}"),
    }
    assert_untouched(&runner, dir.path());
}
