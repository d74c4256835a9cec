//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `stratify` binary to verify that
//! argument parsing, help text, and error handling work end-to-end.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("stratify").unwrap()
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("select"))
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stratify"));
}

// ---------------------------------------------------------------------------
// select subcommand
// ---------------------------------------------------------------------------

#[test]
fn select_without_required_args_errors() {
    cmd().arg("select").assert().failure();
}

#[test]
fn select_nonexistent_table_errors() {
    cmd()
        .args(["select", "--df", "/nonexistent/df.txt", "--method", "chi2"])
        .assert()
        .failure();
}

#[test]
fn select_unknown_method_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("df.txt");
    std::fs::write(&path, "ID\tClass\tf1\na\t1\t1.0\nb\t0\t0.0\n").unwrap();
    cmd()
        .args(["select", "--df", path.to_str().unwrap(), "--method", "pca"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported feature-selection method"));
}

// ---------------------------------------------------------------------------
// classify subcommand
// ---------------------------------------------------------------------------

#[test]
fn classify_without_table_errors() {
    cmd().args(["classify", "--alg", "RF"]).assert().failure();
}

#[test]
fn classify_nonexistent_table_errors() {
    cmd()
        .args(["classify", "--df", "/nonexistent/df.txt", "--alg", "RF"])
        .assert()
        .failure();
}

#[test]
fn classify_unknown_algorithm_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("df.txt");
    std::fs::write(&path, "ID\tClass\tf1\na\t1\t1.0\nb\t0\t0.0\n").unwrap();
    cmd()
        .args(["classify", "--df", path.to_str().unwrap(), "--alg", "gbdt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported algorithm"));
}

// ---------------------------------------------------------------------------
// compare subcommand
// ---------------------------------------------------------------------------

#[test]
fn compare_without_required_args_errors() {
    cmd().arg("compare").assert().failure();
}

#[test]
fn compare_nonexistent_scores_errors() {
    cmd()
        .args([
            "compare",
            "--scores",
            "/nonexistent/a_scores.txt",
            "--ids",
            "a",
        ])
        .assert()
        .failure();
}
