//! Integration tests for the `cresctl` CLI binary.
//!
//! Argument parsing, config handling and error exit codes, without a
//! live device.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `cresctl` binary with env isolation.
///
/// Clears all `CRESCTL_*` env vars and points the config file at `config`
/// so tests never touch the user's real configuration.
fn cresctl_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("cresctl");
    cmd.env("HOME", "/tmp/cresctl-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/cresctl-test-nonexistent")
        .env("CRESCTL_CONFIG", config)
        .env_remove("CRESCTL_PROFILE")
        .env_remove("CRESCTL_HOST")
        .env_remove("CRESCTL_OUTPUT")
        .env_remove("CRESCTL_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// Nothing listens on port 1 of the loopback interface.
const DEAD_HOST: &str = "127.0.0.1:1";

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = cresctl_cmd(&dir.path().join("config.toml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    cresctl_cmd(&dir.path().join("config.toml"))
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("status")
                .and(predicate::str::contains("watch"))
                .and(predicate::str::contains("fan")),
        );
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    cresctl_cmd(&dir.path().join("config.toml"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cresctl"));
}

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    cresctl_cmd(&dir.path().join("config.toml"))
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_unknown_category_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = cresctl_cmd(&dir.path().join("config.toml"))
        .args(["--host", DEAD_HOST, "get", "lamp", "a", "voltage"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_fan_duty_out_of_range_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = cresctl_cmd(&dir.path().join("config.toml"))
        .args(["--host", DEAD_HOST, "fan", "duty", "150"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("outside 0-100"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    cresctl_cmd(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    cresctl_cmd(&path)
        .args(["config", "init", "--host", "192.168.1.50", "--name", "tent"])
        .assert()
        .success();
    assert!(path.exists());

    cresctl_cmd(&path)
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"tent\"")
                .and(predicate::str::contains("192.168.1.50"))
                .and(predicate::str::contains("\"default_profile\": \"tent\"")),
        );
}

#[test]
fn test_missing_config_without_host() {
    let dir = tempfile::tempdir().unwrap();
    let output = cresctl_cmd(&dir.path().join("config.toml"))
        .arg("status")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("No device configured"));
}

#[test]
fn test_unknown_profile_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let output = cresctl_cmd(&dir.path().join("config.toml"))
        .args(["--profile", "nope", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

// ── Device errors ───────────────────────────────────────────────────

#[test]
fn test_unreachable_device_exits_with_connection_code() {
    let dir = tempfile::tempdir().unwrap();
    let output = cresctl_cmd(&dir.path().join("config.toml"))
        .args(["--host", DEAD_HOST, "test"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn test_status_scan_against_unreachable_device() {
    let dir = tempfile::tempdir().unwrap();
    let output = cresctl_cmd(&dir.path().join("config.toml"))
        .args(["--host", DEAD_HOST, "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("sensor"));
}

#[test]
fn test_reboot_requires_yes_without_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let output = cresctl_cmd(&dir.path().join("config.toml"))
        .args(["--host", DEAD_HOST, "reboot"])
        .write_stdin("")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}
