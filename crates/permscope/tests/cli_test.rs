//! Integration tests for the `permscope` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! and error handling — all without requiring a live audit service.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `permscope` binary with env isolation.
///
/// Clears all `PERMSCOPE_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn permscope_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("permscope");
    cmd.env("HOME", "/tmp/permscope-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/permscope-cli-test-nonexistent")
        .env_remove("PERMSCOPE_PROFILE")
        .env_remove("PERMSCOPE_SERVICE")
        .env_remove("PERMSCOPE_TOKEN")
        .env_remove("PERMSCOPE_OUTPUT")
        .env_remove("PERMSCOPE_INSECURE")
        .env_remove("PERMSCOPE_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = permscope_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("Usage"),
        "Expected 'Usage' in output:\n{text}"
    );
}

#[test]
fn test_help_flag() {
    permscope_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("permissions")
            .and(predicate::str::contains("export"))
            .and(predicate::str::contains("users"))
            .and(predicate::str::contains("templates")),
    );
}

#[test]
fn test_version_flag() {
    permscope_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("permscope"));
}

#[test]
fn test_unknown_subcommand_fails() {
    permscope_cmd()
        .arg("frobnicate")
        .assert()
        .failure()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    permscope_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    permscope_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("permscope"));
}

// ── Config commands (offline) ───────────────────────────────────────

#[test]
fn test_config_path_prints_a_path() {
    permscope_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_runs_without_config_file() {
    permscope_cmd().args(["config", "show"]).assert().success();
}

// ── Connection-requiring commands without config ────────────────────

#[test]
fn test_permissions_list_without_config_errors() {
    let output = permscope_cmd()
        .args(["permissions", "list"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("Configuration file not found") || text.contains("--service"),
        "expected a configuration error, got:\n{text}"
    );
}

#[test]
fn test_export_without_token_errors_with_auth_code() {
    let output = permscope_cmd()
        .args(["export", "bulk", "--service", "https://audit.example.com"])
        .output()
        .unwrap();

    // A service URL without any token resolves to the no-token error.
    assert_eq!(output.status.code(), Some(3));
}

// ── Export flag parsing ─────────────────────────────────────────────

#[test]
fn test_export_template_requires_id() {
    permscope_cmd()
        .args(["export", "template"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_templates_save_requires_file_flag() {
    permscope_cmd()
        .args(["templates", "save", "tpl-1"])
        .assert()
        .failure()
        .code(2);
}
