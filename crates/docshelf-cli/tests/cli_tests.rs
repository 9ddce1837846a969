//! Integration tests for the `docshelf` CLI binary.
//!
//! These tests exercise the CLI as a subprocess against a temporary data
//! directory, verifying exit codes, stdout output and file-system side
//! effects.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Helper: locate the `docshelf` binary built by `cargo test`.
fn docshelf_bin() -> String {
    let path = env!("CARGO_BIN_EXE_docshelf");
    assert!(
        Path::new(path).exists(),
        "docshelf binary not found at {path}"
    );
    path.to_owned()
}

/// Helper: run docshelf against `dir` and return (`exit_code`, stdout, stderr).
fn run(dir: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(docshelf_bin())
        .args(args)
        .env("DOCSHELF_DATA_DIR", dir.path().join("data"))
        .env("DOCSHELF_DOCUMENTS_DIR", dir.path().join("user_files"))
        .env("DOCSHELF_BCRYPT_COST", "4")
        .env_remove("DOCSHELF_CREDENTIALS_FILE")
        .output()
        .expect("failed to execute docshelf");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&dir, &["--version"]);
    assert_eq!(code, 0, "docshelf --version should exit 0");
    assert!(stdout.contains("docshelf"), "unexpected version output: {stdout}");
}

#[test]
fn test_help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&dir, &["--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("users"));
    assert!(stdout.contains("docs"));
}

// ── Users ────────────────────────────────────────────────────────────

#[test]
fn test_users_list_seeds_store() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run(&dir, &["users", "list"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("admin (admin)"), "{stdout}");
    assert!(stdout.contains("frederik (regular)"), "{stdout}");

    let raw = fs::read_to_string(dir.path().join("data/credentials.json")).unwrap();
    assert!(!raw.contains("secret"), "plaintext password persisted");
    assert!(!raw.contains("fredspassword"), "plaintext password persisted");
}

#[test]
fn test_verify_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let (ok, _, _) = run(&dir, &["users", "verify", "admin", "--password", "secret"]);
    assert_eq!(ok, 0);

    let (wrong, stdout, _) = run(&dir, &["users", "verify", "admin", "--password", "nope"]);
    assert_eq!(wrong, 1);
    assert!(stdout.contains("Wrong username or password."));

    let (unknown, _, _) = run(&dir, &["users", "verify", "ghost", "--password", "secret"]);
    assert_eq!(unknown, 1);
}

#[test]
fn test_add_edit_delete_cycle() {
    let dir = tempfile::tempdir().unwrap();

    let (code, stdout, stderr) = run(&dir, &["users", "add", "jane", "--password", "janespw", "--admin"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("jane was created."));

    let (_, stdout, _) = run(&dir, &["users", "list"]);
    assert!(stdout.contains("jane (admin)"));

    let (code, _, stderr) = run(&dir, &["users", "add", "jane", "--password", "again"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already exists"), "{stderr}");

    let (code, stdout, _) = run(
        &dir,
        &["users", "edit", "jane", "--rename", "janet", "--password", "newpw"],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("janet was updated."));
    let (code, _, _) = run(&dir, &["users", "verify", "janet", "--password", "newpw"]);
    assert_eq!(code, 0);
    let (code, _, _) = run(&dir, &["users", "verify", "jane", "--password", "janespw"]);
    assert_eq!(code, 1);

    let (code, stdout, _) = run(&dir, &["users", "delete", "janet"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("janet was deleted."));
    let (_, stdout, _) = run(&dir, &["users", "list"]);
    assert!(!stdout.contains("janet"));
}

#[test]
fn test_rename_keeps_password() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run(&dir, &["users", "edit", "frederik", "--rename", "fred"]);
    assert_eq!(code, 0);
    let (code, _, _) = run(&dir, &["users", "verify", "fred", "--password", "fredspassword"]);
    assert_eq!(code, 0);
}

#[test]
fn test_edit_missing_user_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&dir, &["users", "edit", "ghost", "--password", "x"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn test_delete_missing_user_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&dir, &["users", "delete", "ghost"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("ghost was not found."));
}

#[test]
fn test_last_admin_cannot_be_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&dir, &["users", "delete", "admin"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("last administrator"), "{stderr}");
}

#[test]
fn test_corrupt_store_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(dir.path().join("data/credentials.json"), "not json").unwrap();
    let (code, _, stderr) = run(&dir, &["users", "list"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("corrupt"), "{stderr}");
}

// ── Docs ─────────────────────────────────────────────────────────────

#[test]
fn test_docs_list() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("user_files");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("herstory.txt"), "Kamala Harris").unwrap();
    fs::write(docs.join("sample_markdown.md"), "This is a sample").unwrap();

    let (code, stdout, _) = run(&dir, &["docs", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("herstory.txt"));
    assert!(stdout.contains("sample_markdown.md"));
}

#[test]
fn test_docs_check_messages() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&dir, &["docs", "check", "notes.md"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("notes.md is a valid document name."));

    let (code, stdout, _) = run(&dir, &["docs", "check", "test.doc"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("Filename must end in .md or .txt."));

    let (code, stdout, _) = run(&dir, &["docs", "check", "new_file>.txt"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("Filename may only contain"));
}
