//! Command line surface tests.

use assert_cmd::Command;
use predicates::prelude::*;

fn release() -> Command {
    let mut cmd = Command::cargo_bin("release").unwrap();
    cmd.env_remove("RELEASE_SERVER").env_remove("RELEASE_PATH");
    cmd
}

#[test]
fn help_prints_usage_and_exits_one() {
    release()
        .arg("-h")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("release [options] VERSION"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn missing_version_is_a_usage_error() {
    release()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("VERSION"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    release()
        .args(["--frobnicate", "1.1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--frobnicate"));
}

#[test]
fn malformed_version_is_rejected_before_touching_anything() {
    let dir = tempfile::tempdir().unwrap();
    release()
        .current_dir(dir.path())
        .args(["--dry-run", "1..2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid version"));
}

#[test]
fn missing_project_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    release()
        .args(["-C"])
        .arg(dir.path().join("absent"))
        .arg("1.1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn broken_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("release.toml"), "[build\nprogram = ").unwrap();
    release()
        .args(["-C"])
        .arg(dir.path())
        .arg("1.1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("release.toml"));
}
