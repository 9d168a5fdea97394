//! Drives the `memory-cli` binary directly, the scenario a user runs
//! through a shell rather than the library API.

use std::io::Write;

use assert_cmd::Command;

fn config_at(dir: &std::path::Path) -> std::path::PathBuf {
    let store_root = dir.join("store");
    let config_path = dir.join("memory.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(file, "store_root = {:?}", store_root.display().to_string()).unwrap();
    config_path
}

#[test]
fn save_list_and_maintenance_via_binary() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = config_at(dir.path());

    Command::cargo_bin("memory-cli")
        .unwrap()
        .args(["--config"])
        .arg(&config_path)
        .args(["--format", "json", "save", "weekly standup moved to Mondays at 10am"])
        .assert()
        .success();

    let list_output = Command::cargo_bin("memory-cli")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .args(["--format", "json", "list"])
        .output()
        .unwrap();
    assert!(list_output.status.success());
    let listed: serde_json::Value = serde_json::from_slice(&list_output.stdout).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    Command::cargo_bin("memory-cli")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .args(["--format", "json", "maintenance", "--dry-run"])
        .assert()
        .success();
}
