//! CLI integration tests
//!
//! Tests the sshw CLI using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PLAINTEXT: &str = "- name: web\n  host: 10.0.0.5\n  password: hunter2\n";
const ENCRYPTED: &str = "- name: web\n  host: 10.0.0.5\n  password: c2VjcmV0\n  is_encrypted: true\n";
const PARTIAL: &str = "- name: web\n  host: 10.0.0.5\n  is_encrypted: true\n- name: db\n  host: 10.0.0.6\n";

/// sshw with its home and config dirs pointed at `home`
fn sshw(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sshw")
        .expect("Failed to locate sshw binary - ensure it's built before running tests");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

fn store(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("hosts.yml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    sshw(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SSH client wrapper for automatic login"))
        .stdout(predicate::str::contains("--encrypt"))
        .stdout(predicate::str::contains("--forget-master-password"));
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    sshw(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sshw"));
}

#[test]
fn test_check_plaintext() {
    let home = TempDir::new().unwrap();
    let path = store(&home, PLAINTEXT);
    sshw(home.path())
        .args(["--check", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("All configurations are not encrypted"));
}

#[test]
fn test_check_encrypted() {
    let home = TempDir::new().unwrap();
    let path = store(&home, ENCRYPTED);
    sshw(home.path())
        .args(["--check", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("All configurations are encrypted"));
}

#[test]
fn test_check_partial() {
    let home = TempDir::new().unwrap();
    let path = store(&home, PARTIAL);
    sshw(home.path())
        .args(["--check", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is partially encrypted"));
}

#[test]
fn test_encrypt_already_encrypted() {
    let home = TempDir::new().unwrap();
    let path = store(&home, ENCRYPTED);
    sshw(home.path())
        .args(["--encrypt", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("All configurations are already encrypted"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), ENCRYPTED);
}

#[test]
fn test_encrypt_warns_about_nested_plaintext() {
    let home = TempDir::new().unwrap();
    let content = "- name: group\n  host: ''\n  children:\n  - name: db\n    host: 10.0.1.5\n    password: hunter2\n";
    let path = store(&home, content);
    sshw(home.path())
        .args(["--encrypt", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("All configurations are already encrypted"))
        .stderr(predicate::str::contains("Nested profiles still hold plaintext secrets"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
}

#[test]
fn test_decrypt_already_decrypted() {
    let home = TempDir::new().unwrap();
    let path = store(&home, PLAINTEXT);
    sshw(home.path())
        .args(["--decrypt", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("All configurations are already decrypted"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), PLAINTEXT);
}

#[test]
fn test_empty_store_reports_no_configuration() {
    let home = TempDir::new().unwrap();
    let path = store(&home, "");
    sshw(home.path())
        .args(["--check", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("No configuration found"));
}

#[test]
fn test_missing_config_fails() {
    let home = TempDir::new().unwrap();
    sshw(home.path())
        .args(["--check", "-c"])
        .arg(home.path().join("missing.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_unparsable_config_fails() {
    let home = TempDir::new().unwrap();
    let path = store(&home, "{ not: [valid");
    sshw(home.path())
        .args(["--check", "-c"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn test_conflicting_actions_rejected() {
    let home = TempDir::new().unwrap();
    sshw(home.path())
        .args(["--encrypt", "--decrypt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
