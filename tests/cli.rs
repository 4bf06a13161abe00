use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn casefile(base: &Path) -> Command {
    let mut cmd = Command::cargo_bin("casefile").unwrap();
    cmd.env("CASEFILE_DATA_DIR", base).env_remove("RUST_LOG");
    cmd
}

fn backup_names(base: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(base.join("backups"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with("backup_"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_record_lifecycle() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();

    casefile(base)
        .args(["record", "count"])
        .assert()
        .success()
        .stdout("0\n");

    casefile(base)
        .args(["record", "put", r#"{"id": "a", "name": "original"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created record: a"));

    casefile(base)
        .args(["record", "put", r#"{"id": "a", "name": "changed"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated record: a"));

    casefile(base)
        .args(["record", "count"])
        .assert()
        .success()
        .stdout("1\n");

    casefile(base)
        .args(["record", "show", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"changed\""));

    casefile(base)
        .args(["record", "delete", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 record(s)."));
}

#[test]
fn test_show_missing_record_fails() {
    let temp = TempDir::new().unwrap();

    casefile(temp.path())
        .args(["record", "show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record not found: nope"));
}

#[test]
fn test_put_rejects_non_object() {
    let temp = TempDir::new().unwrap();

    casefile(temp.path())
        .args(["record", "put", "[1, 2, 3]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}

#[test]
fn test_backup_without_data_fails() {
    let temp = TempDir::new().unwrap();

    casefile(temp.path())
        .args(["backup", "create"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Data file not found"));
}

#[test]
fn test_backup_and_restore() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();

    casefile(base)
        .args(["record", "put", r#"{"id": "a"}"#])
        .assert()
        .success();

    casefile(base)
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created: backup_"));

    casefile(base)
        .args(["record", "put", r#"{"id": "b"}"#])
        .assert()
        .success();

    casefile(base)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 backup(s)"));

    // Without --force nothing changes
    casefile(base)
        .args(["backup", "restore", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
    casefile(base)
        .args(["record", "count"])
        .assert()
        .stdout("2\n");

    casefile(base)
        .args(["backup", "restore", "latest", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Previous data saved as: before_restore_"));

    casefile(base)
        .args(["record", "count"])
        .assert()
        .stdout("1\n");

    assert_eq!(backup_names(base).len(), 1);
}

#[test]
fn test_restore_unknown_backup_fails() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();

    casefile(base)
        .args(["record", "put", r#"{"id": "a"}"#])
        .assert()
        .success();

    casefile(base)
        .args(["backup", "restore", "nonexistent.snap", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup not found"));

    casefile(base)
        .args(["record", "count"])
        .assert()
        .stdout("1\n");
}

#[test]
fn test_retention_from_settings() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();

    fs::write(
        base.join("config.json"),
        r#"{"backup": {"max_backup_count": 2}}"#,
    )
    .unwrap();

    casefile(base)
        .args(["record", "put", r#"{"id": "a"}"#])
        .assert()
        .success();

    for _ in 0..4 {
        casefile(base).args(["backup", "create"]).assert().success();
    }

    assert_eq!(backup_names(base).len(), 2);
}

#[test]
fn test_config_shows_paths() {
    let temp = TempDir::new().unwrap();

    casefile(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("records.json"))
        .stdout(predicate::str::contains("Max backup count: 10"));
}

#[test]
fn test_watch_refuses_when_auto_backup_disabled() {
    let temp = TempDir::new().unwrap();

    casefile(temp.path())
        .args(["backup", "watch"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Auto-backup is disabled"));
}

#[test]
fn test_watch_uses_configured_interval_when_enabled() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();

    fs::write(
        base.join("config.json"),
        r#"{"backup": {"auto_backup_enabled": true, "interval_hours": 2}}"#,
    )
    .unwrap();

    casefile(base)
        .args(["backup", "watch"])
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Auto-backup running every 2h"))
        .stdout(predicate::str::contains("Auto-backup stopped."));
}

#[test]
fn test_watch_interval_override_and_huge_interval() {
    let temp = TempDir::new().unwrap();

    casefile(temp.path())
        .args(["backup", "watch", "--interval-hours", "3000000000000"])
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("every 3000000000000h"));
}
