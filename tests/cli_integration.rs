//! CLI integration tests for Slipway.
//!
//! These cover argument handling and the failure paths that need no
//! network, no cmake, and no particular host layout. Successful install
//! runs are exercised manually; the resolver itself is covered by the
//! library tests.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the slipway binary command.
fn slipway() -> Command {
    Command::cargo_bin("slipway").unwrap()
}

// ============================================================================
// argument parsing
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    slipway()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("patch"));
}

#[test]
fn test_version_flag() {
    slipway().arg("--version").assert().success();
}

#[test]
fn test_unknown_subcommand_fails() {
    slipway().arg("frobnicate").assert().failure();
}

#[test]
fn test_install_help_shows_feature_flags() {
    slipway()
        .args(["install", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--with-examples"))
        .stdout(predicate::str::contains("--with-qt5"))
        .stdout(predicate::str::contains("--without-legacy"))
        .stdout(predicate::str::contains("--define"));
}

// ============================================================================
// slipway resolve
// ============================================================================

#[test]
fn test_resolve_conflicting_toolkits_fails() {
    slipway()
        .args(["resolve", "--with-qt", "--with-qt5", "--without-python"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration resolution failed"));
}

#[test]
fn test_resolve_conflicting_runtimes_fails() {
    slipway()
        .args(["resolve", "--with-python3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration resolution failed"));
}

#[test]
fn test_resolve_missing_recipe_file_fails() {
    slipway()
        .args(["resolve", "--recipe", "/nonexistent/recipe.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read recipe"));
}

#[test]
fn test_resolve_malformed_recipe_fails() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.toml");
    std::fs::write(&path, "name = \"broken\"\nthis is not toml").unwrap();

    slipway()
        .args(["resolve", "--recipe"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse recipe"));
}

#[test]
fn test_resolve_rejects_bad_define() {
    slipway()
        .args(["resolve", "--define", "NO_EQUALS_SIGN"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

// ============================================================================
// slipway install
// ============================================================================

#[test]
fn test_install_rejects_bad_define() {
    slipway()
        .args(["install", "--define", "=VALUE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

// ============================================================================
// slipway probe
// ============================================================================

#[test]
fn test_probe_json_is_valid() {
    let output = slipway().args(["probe", "--json"]).output().unwrap();
    assert!(output.status.success());

    let facts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(facts.get("os").is_some());
    assert!(facts.get("dependencies").is_some());
}

// ============================================================================
// slipway completions
// ============================================================================

#[test]
fn test_completions_bash() {
    slipway()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("slipway"));
}

#[test]
fn test_completions_rejects_unknown_shell() {
    slipway().args(["completions", "csh"]).assert().failure();
}
