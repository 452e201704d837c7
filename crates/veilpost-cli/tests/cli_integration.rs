//! CLI Integration Tests
//!
//! These tests verify the CLI commands work correctly end-to-end.
//! They test the "wiring" between the CLI and the core library.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

fn cli_cmd() -> Command {
    Command::cargo_bin("veilpost").expect("Failed to find veilpost binary")
}

/// Write a decryption script into the temp dir and return its path
fn write_script(dir: &TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("script.json");
    std::fs::write(&path, json).unwrap();
    path
}

/// Build a `decrypt` command for alice's post viewed by bob
fn decrypt_cmd(script: &PathBuf) -> Command {
    let mut cmd = cli_cmd();
    cmd.arg("decrypt")
        .arg("--script")
        .arg(script)
        .arg("--posted-by")
        .arg("person:twitter.com/alice")
        .arg("--whoami")
        .arg("person:twitter.com/bob");
    cmd
}

// ============================================================================
// Decrypt Command Tests
// ============================================================================

#[test]
fn test_decrypt_success() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        r#"{ "units": { "text": [
            { "item": { "type": "stage", "event": "try_decrypt_by_e2e" } },
            { "item": { "type": "info", "iv": [1, 2, 3], "public_shared": true } },
            { "item": { "type": "success", "content": { "text": "hi" } } }
        ] } }"#,
    );

    decrypt_cmd(&script)
        .arg("--payload")
        .arg("--text")
        .arg("🎼 payload")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[decrypted (public)] person:twitter.com/alice: hi",
        ))
        .stdout(predicate::str::contains("Comment iv: 010203"));
}

#[test]
fn test_decrypt_error_and_progress_in_order() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        r#"{ "units": {
            "text": [ { "item": { "type": "error", "message": "bad key" } } ],
            "https://img/1.png": [ { "delay_ms": 50, "item": { "type": "stage", "event": "try_decrypt_by_e2e" } } ]
        } }"#,
    );

    let output = decrypt_cmd(&script)
        .arg("--payload")
        .arg("--image")
        .arg("https://img/1.png")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "[failed] person:twitter.com/alice: bad key",
            "[decrypting] person:twitter.com/alice: finding post key",
        ]
    );
}

#[test]
fn test_decrypt_plain_post() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        r#"{ "units": { "https://img/cat.png": [
            { "item": { "type": "error", "message": "no payload" } }
        ] } }"#,
    );

    decrypt_cmd(&script)
        .arg("--image")
        .arg("https://img/cat.png")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not a secret post"));
}

#[test]
fn test_decrypt_protocol_violation_fails() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        r#"{ "units": { "text": [
            { "item": { "type": "stage", "event": "download_image" } }
        ] } }"#,
    );

    decrypt_cmd(&script)
        .arg("--payload")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Protocol violation"));
}

#[test]
fn test_decrypt_invalid_profile() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, r#"{ "units": {} }"#);

    cli_cmd()
        .arg("decrypt")
        .arg("--script")
        .arg(&script)
        .arg("--posted-by")
        .arg("alice")
        .arg("--whoami")
        .arg("person:twitter.com/bob")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid profile"));
}

#[test]
fn test_decrypt_missing_script() {
    let dir = TempDir::new().unwrap();
    decrypt_cmd(&dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load script"));
}

// ============================================================================
// Comment Command Tests
// ============================================================================

#[test]
fn test_comment_roundtrip() {
    let output = cli_cmd()
        .args(["comment", "encrypt", "--iv", "010203", "--post-text", "hi", "nice post"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let sealed = String::from_utf8(output.stdout).unwrap().trim().to_string();

    cli_cmd()
        .args(["comment", "decrypt", "--iv", "010203", "--post-text", "hi"])
        .arg(&sealed)
        .assert()
        .success()
        .stdout(predicate::str::contains("nice post"));
}

#[test]
fn test_comment_wrong_post_fails() {
    let output = cli_cmd()
        .args(["comment", "encrypt", "--iv", "010203", "--post-text", "hi", "nice post"])
        .output()
        .unwrap();
    let sealed = String::from_utf8(output.stdout).unwrap().trim().to_string();

    cli_cmd()
        .args(["comment", "decrypt", "--iv", "010203", "--post-text", "other"])
        .arg(&sealed)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Decryption failed"));
}

#[test]
fn test_comment_invalid_iv() {
    cli_cmd()
        .args(["comment", "encrypt", "--iv", "zz", "--post-text", "hi", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid iv"));
}
