//! Common utilities for CLI E2E tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

/// Invoke a CLI command against an isolated data directory.
pub fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "chronoboard-cli", "--"])
        .args(args)
        .env("CHRONOBOARD_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Invoke a CLI command with `RUST_LOG` set, returning stdout and stderr.
pub fn run_cli_logged(data_dir: &Path, filter: &str, args: &[&str]) -> (String, String) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "chronoboard-cli", "--"])
        .args(args)
        .env("CHRONOBOARD_DATA_DIR", data_dir)
        .env("RUST_LOG", filter)
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute CLI command");
    assert!(output.status.success(), "CLI command {:?} failed", args);

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Invoke a CLI command and expect success.
pub fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command {:?} failed with code {}: {}", args, code, stderr);
    stdout
}

/// Invoke a CLI command, expect success, and parse stdout as JSON.
pub fn run_cli_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let stdout = run_cli_success(data_dir, args);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON from {args:?}: {e}\n{stdout}"))
}

/// Invoke a CLI command and expect failure.
pub fn run_cli_failure(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_ne!(code, 0, "CLI command {:?} unexpectedly succeeded: {}", args, stdout);
    (stdout, stderr, code)
}

/// Check if string contains substring
pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        haystack.contains(needle),
        "Expected '{}' to contain '{}'",
        haystack, needle
    );
}
