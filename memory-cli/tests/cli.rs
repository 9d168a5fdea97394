use std::io::Write;

use assert_cmd::Command;
use tempfile::tempdir;

fn config_at(store_root: &std::path::Path) -> std::path::PathBuf {
    let dir = store_root.parent().unwrap();
    let config_path = dir.join("memory.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(file, "store_root = {:?}", store_root.display().to_string()).unwrap();
    config_path
}

#[test]
fn save_then_get_round_trips_via_json() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    let config_path = config_at(&store_root);

    let mut cmd = Command::cargo_bin("memory-cli").unwrap();
    let save_output = cmd
        .arg("--config")
        .arg(&config_path)
        .arg("--format")
        .arg("json")
        .arg("save")
        .arg("we decided to use SQLite for the embedded cache")
        .arg("--importance")
        .arg("0.8")
        .output()
        .unwrap();
    assert!(save_output.status.success(), "{:?}", save_output);

    let saved: serde_json::Value = serde_json::from_slice(&save_output.stdout).unwrap();
    let id = saved["id"].as_str().unwrap().to_string();

    let mut cmd = Command::cargo_bin("memory-cli").unwrap();
    let get_output =
        cmd.arg("--config").arg(&config_path).arg("--format").arg("json").arg("get").arg(&id).output().unwrap();
    assert!(get_output.status.success(), "{:?}", get_output);
    let fetched: serde_json::Value = serde_json::from_slice(&get_output.stdout).unwrap();
    assert_eq!(fetched["id"], saved["id"]);
    assert_eq!(fetched["content"], saved["content"]);
}

#[test]
fn stats_on_empty_store_reports_zero_total() {
    let dir = tempdir().unwrap();
    let store_root = dir.path().join("store");
    let config_path = config_at(&store_root);

    let mut cmd = Command::cargo_bin("memory-cli").unwrap();
    let output = cmd
        .arg("--config")
        .arg(&config_path)
        .arg("--format")
        .arg("json")
        .arg("stats")
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total"], 0);
}
