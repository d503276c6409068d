//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway database.

use std::path::Path;
use std::process::Command;

/// Run a CLI command against the given database file.
fn run_cli(db: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "quitboard-cli", "--quiet", "--"])
        .args(["--database", db.to_str().unwrap()])
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn register_then_top_shows_member() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("quitboard.db");

    let (stdout, stderr, code) = run_cli(&db, &["register", "1", "10", "250", "--name", "alice"]);
    assert_eq!(code, 0, "register failed: {stderr}");
    assert!(stdout.contains("streak: 10 d."), "unexpected output: {stdout}");

    let (stdout, _, code) = run_cli(&db, &["board", "top"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("alice"));
}

#[test]
fn relapse_increments_counter() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("quitboard.db");

    let (stdout, _, code) = run_cli(&db, &["member", "relapse", "5"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("total: 1"));

    let (stdout, _, code) = run_cli(&db, &["member", "relapse", "5"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("total: 2"));
}

#[test]
fn empty_board_prints_defined_text() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("quitboard.db");

    let (stdout, _, code) = run_cli(&db, &["board", "top"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Nobody on the board yet."));
}

#[test]
fn bad_date_fails_with_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("quitboard.db");

    let (_, stderr, code) = run_cli(&db, &["register", "1", "junk", "250"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("validation"), "stderr: {stderr}");
}
