//! Integration tests for the daycache binary
//!
//! Runs the binary against a temporary cache directory.

use std::process::Command;

use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_daycache"))
        .args(args)
        .output()
        .expect("Failed to execute daycache")
}

fn seed_record(dir: &std::path::Path, resource: &str, day: &str, data: &str) {
    let key = format!("daycache_v1:{}:{}:1", resource, day);
    let written_at = chrono::Utc::now().timestamp_millis();
    let record = format!(
        r#"{{"data":{},"day":"{}","writtenAt":{},"version":"1"}}"#,
        data, day, written_at
    );
    std::fs::write(
        dir.join(format!("{}.json", urlencoding::encode(&key))),
        record,
    )
    .expect("Failed to seed record");
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("daycache"), "Help should mention daycache");
    assert!(stdout.contains("stats"), "Help should list the stats command");
}

#[test]
fn test_invalid_day_prints_error_and_exits() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();
    let output = run_cli(&["--dir", dir, "get", "dailyProps", "--day", "someday"]);
    assert!(!output.status.success(), "Expected invalid day to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid day"),
        "Should print error message about invalid day: {}",
        stderr
    );
}

#[test]
fn test_stats_on_empty_cache() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();

    let output = run_cli(&["--dir", dir, "stats"]);

    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["totalEntries"], 0);
}

#[test]
fn test_get_seeded_record_then_clear_all() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    seed_record(temp_dir.path(), "dailyProps", &today, r#"{"items":[1,2,3]}"#);

    let output = run_cli(&["--dir", dir, "get", "dailyProps", "--day", &today]);
    assert!(output.status.success());
    let data: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(data, serde_json::json!({"items": [1, 2, 3]}));

    let output = run_cli(&["--dir", dir, "clear-all"]);
    assert!(output.status.success());

    let output = run_cli(&["--dir", dir, "get", "dailyProps", "--day", &today]);
    assert!(!output.status.success(), "Entry should be gone after clear-all");
}

#[test]
fn test_get_missing_resource_fails() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();

    let output = run_cli(&["--dir", dir, "get", "nothing"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No valid entry"));
}
