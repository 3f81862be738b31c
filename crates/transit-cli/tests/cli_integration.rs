//! CLI Integration Tests
//!
//! These tests run the `transit` binary for commands that need no network.

use std::fs;
use std::process::{Command, Output};

fn run_transit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_transit"))
        .args(args)
        .env_remove("TRANSIT_CONFIG")
        .env_remove("TRANSIT_BASE_URL")
        .output()
        .expect("Failed to run transit binary")
}

#[test]
fn test_help_command() {
    let output = run_transit(&["--help"]);

    assert!(output.status.success(), "Help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["reload", "lines", "stop", "search", "line-trips", "stop-trips"] {
        assert!(stdout.contains(command), "Help should list {command}");
    }
}

#[test]
fn test_version_command() {
    let output = run_transit(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_completions_command() {
    let output = run_transit(&["completions", "bash"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("transit"));
}

#[test]
fn test_config_command_masks_password() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "base_url = \"http://localhost:9\"\nusername = \"reader\"\npassword = \"hunter2\"\n",
    )
    .unwrap();

    let output = run_transit(&["--config", path.to_str().unwrap(), "config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("http://localhost:9"));
    assert!(stdout.contains("reader"));
    assert!(!stdout.contains("hunter2"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let output = run_transit(&["--config", path.to_str().unwrap(), "status"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read config"));
}

#[test]
fn test_invalid_area_is_rejected() {
    let output = run_transit(&["lines", "--area", "99"]);

    assert!(!output.status.success());
}
