//! Corruption recovery tests for bactrack.
//!
//! These tests verify the system can handle:
//! - Corrupted state files (kept aside before being replaced)
//! - Single unreadable entries
//! - Empty state files
//! - Totals that drifted from the stored entries
//! - Invalid stored profiles

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const NOW: &str = "2025-03-10T19:00:00";

fn setup_test_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("config.toml"), "").unwrap();
    fs::create_dir_all(dir.path().join("data")).unwrap();
    dir
}

fn cli(dir: &TempDir) -> Command {
    cli_at(dir, NOW)
}

fn cli_at(dir: &TempDir, now: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bactrack"));
    cmd.arg("--data-dir")
        .arg(dir.path().join("data"))
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .arg("--now")
        .arg(now);
    cmd
}

#[test]
fn test_corrupted_state_file() {
    let temp_dir = setup_test_dir();
    let state_path = temp_dir.path().join("data/state.json");
    fs::write(&state_path, "{ invalid json }}}}").expect("Failed to write corrupted state");

    cli(&temp_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("BAC: 0.000"));

    // The next write replaces the corrupted file
    cli(&temp_dir).args(["drink", "beer", "500"]).assert().success();
    let contents = fs::read_to_string(&state_path).unwrap();
    let state: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(state["history"].as_array().unwrap().len(), 1);

    let backup = fs::read_to_string(temp_dir.path().join("data/state.json.corrupt")).unwrap();
    assert_eq!(backup, "{ invalid json }}}}");
}

#[test]
fn test_unreadable_entry_does_not_erase_history() {
    let temp_dir = setup_test_dir();
    cli_at(&temp_dir, "2025-03-10T19:00:00")
        .args(["drink", "beer", "500"])
        .assert()
        .success();
    cli_at(&temp_dir, "2025-03-10T19:30:00")
        .args(["drink", "wine", "150"])
        .assert()
        .success();

    let state_path = temp_dir.path().join("data/state.json");
    let mut state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&state_path).unwrap()).unwrap();
    state["history"][0]["drink"] = serde_json::json!("mead");
    fs::write(&state_path, state.to_string()).unwrap();

    cli_at(&temp_dir, "2025-03-10T20:00:00")
        .args(["drink", "vodka", "50"])
        .assert()
        .success();

    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&state_path).unwrap()).unwrap();
    let history = state["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["drink"], "vodka");
    assert_eq!(history[1]["drink"], "beer");
    assert_eq!(state["totalAmount"], 550);
    assert_eq!(
        state["dailyRecords"]["2025-03-10"]["drinks"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_empty_state_file() {
    let temp_dir = setup_test_dir();
    fs::write(temp_dir.path().join("data/state.json"), "").unwrap();

    cli(&temp_dir)
        .arg("week")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mon 2025-03-10: 0 mL"));
}

#[test]
fn test_drifted_total_is_rederived_from_history() {
    let temp_dir = setup_test_dir();

    // Record a real drink, then tamper with the stored total
    cli(&temp_dir).args(["drink", "beer", "500"]).assert().success();
    let state_path = temp_dir.path().join("data/state.json");
    let mut state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&state_path).unwrap()).unwrap();
    state["totalAlcoholGrams"] = serde_json::json!(500.0);
    state["totalAmount"] = serde_json::json!(12345);
    fs::write(&state_path, state.to_string()).unwrap();

    cli(&temp_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("BAC: 0.403"))
        .stdout(predicate::str::contains("Session: 500 mL"));
}

#[test]
fn test_missing_session_start_is_recovered() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir).args(["drink", "beer", "500"]).assert().success();
    let state_path = temp_dir.path().join("data/state.json");
    let mut state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&state_path).unwrap()).unwrap();
    state["firstDrinkTime"] = serde_json::json!(0);
    fs::write(&state_path, state.to_string()).unwrap();

    // Session start falls back to the oldest entry, so decay still applies
    cli_at(&temp_dir, "2025-03-10T21:00:00")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("BAC: 0.103"));
}

#[test]
fn test_invalid_stored_profile_uses_defaults() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("data/state.json"),
        r#"{"userProfile": {"weight": 5.0, "isMale": true, "metabolism": 0.15}}"#,
    )
    .unwrap();

    cli(&temp_dir)
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Weight: 70.0 kg"));
}

#[test]
fn test_zero_stored_metabolism_is_repaired() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("data/state.json"),
        r#"{"userProfile": {"weight": 60.0, "isMale": false, "metabolism": 0.0}}"#,
    )
    .unwrap();

    cli(&temp_dir)
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Elimination rate: 0.130 ‰/h"));
}
