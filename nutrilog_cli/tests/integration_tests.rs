//! Integration tests for the nutrilog binary.
//!
//! These tests verify end-to-end behavior including:
//! - Onboarding setup and goal computation
//! - Food logging with the mock AI provider
//! - Daily/weekly views and goal editing
//! - Entry removal

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("nutrilog"))
}

/// Run the onboarding setup with the reference biometrics
fn run_setup(data_dir: &Path) {
    cli()
        .args([
            "setup",
            "--gender",
            "male",
            "--age",
            "30",
            "--weight",
            "70",
            "--height",
            "175",
            "--activity",
            "sedentary",
            "--goal",
            "maintain",
            "--diet",
            "omnivore",
            "--non-interactive",
            "--data-dir",
        ])
        .arg(data_dir)
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Personal nutrition tracker"));
}

#[test]
fn test_setup_computes_reference_goals() {
    let temp_dir = setup_test_dir();

    cli()
        .args([
            "setup",
            "--gender",
            "male",
            "--age",
            "30",
            "--weight",
            "70",
            "--height",
            "175",
            "--activity",
            "sedentary",
            "--goal",
            "maintain",
            "--diet",
            "omnivore",
            "--non-interactive",
            "--data-dir",
        ])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile saved"))
        .stdout(predicate::str::contains("1979 kcal"))
        .stdout(predicate::str::contains("148g protein"));

    // Profile persisted under the per-user directory
    let profile_path = temp_dir.path().join("users/local-user/profile.json");
    assert!(profile_path.exists());

    let profile: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&profile_path).unwrap()).unwrap();
    assert_eq!(profile["macro_goals"]["calories"], 1979);
    assert_eq!(profile["bmi"], 22.9);
}

#[test]
fn test_setup_shows_bmi_suggestion() {
    let temp_dir = setup_test_dir();

    cli()
        .args([
            "setup",
            "--gender",
            "female",
            "--age",
            "40",
            "--weight",
            "50",
            "--height",
            "172",
            "--activity",
            "light",
            "--diet",
            "vegan",
            "--non-interactive",
            "--data-dir",
        ])
        .arg(temp_dir.path())
        .assert()
        .success()
        // BMI 16.9 pre-fills a gain goal when none is given explicitly
        .stdout(predicate::str::contains("suggested goal: gain"));
}

#[test]
fn test_setup_non_interactive_requires_biometrics() {
    let temp_dir = setup_test_dir();

    cli()
        .args([
            "setup",
            "--gender",
            "male",
            "--weight",
            "70",
            "--height",
            "175",
            "--activity",
            "sedentary",
            "--goal",
            "maintain",
            "--diet",
            "omnivore",
            "--non-interactive",
            "--data-dir",
        ])
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--age is required"));
}

#[test]
fn test_log_requires_setup() {
    let temp_dir = setup_test_dir();

    cli()
        .args(["log", "banana", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("nutrilog setup"));
}

#[test]
fn test_log_and_day_roundtrip() {
    let temp_dir = setup_test_dir();
    run_setup(temp_dir.path());

    cli()
        .args(["log", "one banana", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged Banana"));

    cli()
        .args(["day", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Banana"))
        .stdout(predicate::str::contains("105 / 1979 kcal"));
}

#[test]
fn test_log_unknown_food_is_not_an_error() {
    let temp_dir = setup_test_dir();
    run_setup(temp_dir.path());

    cli()
        .args(["log", "unobtainium stew", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No match found"));

    // Nothing was written
    assert!(!temp_dir.path().join("users/local-user/logs.jsonl").exists());
}

#[test]
fn test_remove_logged_entry() {
    let temp_dir = setup_test_dir();
    run_setup(temp_dir.path());

    cli()
        .args(["log", "banana", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success();

    // Recover the generated entry id from the log file
    let logs_path = temp_dir.path().join("users/local-user/logs.jsonl");
    let line = fs::read_to_string(&logs_path).unwrap();
    let entry: serde_json::Value = serde_json::from_str(line.lines().next().unwrap()).unwrap();
    let id = entry["id"].as_str().unwrap();

    cli()
        .args(["remove", id, "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Entry removed"));

    cli()
        .args(["day", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No food logged"));
}

#[test]
fn test_goals_show_and_update() {
    let temp_dir = setup_test_dir();
    run_setup(temp_dir.path());

    cli()
        .args(["goals", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1979 kcal"));

    cli()
        .args(["goals", "--calories", "1800", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Goals updated"))
        .stdout(predicate::str::contains("1800 kcal"));

    // Other goal fields survive the partial edit
    cli()
        .args(["goals", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1800 kcal"))
        .stdout(predicate::str::contains("148g protein"));
}

#[test]
fn test_goal_crossing_warns_once() {
    let temp_dir = setup_test_dir();
    run_setup(temp_dir.path());

    // Lower the goal so one banana crosses it
    cli()
        .args(["goals", "--calories", "100", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success();

    cli()
        .args(["log", "banana", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("at or over your 100 kcal goal"));

    // Already over: the next addition does not warn again
    cli()
        .args(["log", "apple", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("goal").not());
}

#[test]
fn test_week_view_includes_summary() {
    let temp_dir = setup_test_dir();
    run_setup(temp_dir.path());

    cli()
        .args(["log", "banana", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success();

    cli()
        .args(["week", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Days logged: 1/7"))
        .stdout(predicate::str::contains("Total: 105 kcal"))
        .stdout(predicate::str::contains("Average (logged days): 105 kcal"));
}

#[test]
fn test_insights_with_mock_provider() {
    let temp_dir = setup_test_dir();
    run_setup(temp_dir.path());

    // Nothing logged yet: canned message, no provider round-trip needed
    cli()
        .args(["insights", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No food has been logged yet"));

    cli()
        .args(["log", "banana", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success();

    cli()
        .args(["insights", "--ai", "mock", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("105 kcal"));
}

#[test]
fn test_default_command_is_day_view() {
    let temp_dir = setup_test_dir();
    run_setup(temp_dir.path());

    cli()
        .args(["--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No food logged"));
}
