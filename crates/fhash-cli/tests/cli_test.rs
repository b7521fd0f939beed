//! Integration tests for the fhash binary

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run fhash inside `dir` with HOME pointed there too, so no real config leaks in.
fn fhash_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fhash"))
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env_remove("FHASH_BUCKETS")
        .env_remove("FHASH_THREADS")
        .env_remove("FHASH_DUMP_ON_MISS")
        .output()
        .expect("Failed to execute fhash")
}

#[test]
fn test_bucket_reports_crc_and_slot() {
    let temp = TempDir::new().unwrap();
    let output = fhash_in(temp.path(), &["bucket", "123456789", "--buckets", "512"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("crc16=0xbb3d"), "{}", stdout);
    assert!(stdout.contains("bucket=317/512"), "{}", stdout);
}

#[test]
fn test_stress_json_report_is_clean() {
    let temp = TempDir::new().unwrap();
    let output = fhash_in(
        temp.path(),
        &["stress", "-j", "4", "--files", "8", "--rounds", "20", "--json"],
    );
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["leaked"], 0);
    assert_eq!(report["totals"]["corrupt"], 0);
    assert_eq!(report["totals"]["closed_while_held"], 0);
    assert_eq!(report["totals"]["closed"], report["totals"]["opened"]);
    assert_eq!(report["totals"]["lookups"], 80);
    assert_eq!(report["plan"]["threads"], 4);
    assert_eq!(report["buckets"], 512);
}

#[test]
fn test_stress_rejects_zero_buckets() {
    let temp = TempDir::new().unwrap();
    let output = fhash_in(temp.path(), &["stress", "--buckets", "0", "--rounds", "1"]);
    assert!(!output.status.success());
}

#[test]
fn test_config_show_outputs_toml() {
    let temp = TempDir::new().unwrap();
    let output = fhash_in(temp.path(), &["config", "show"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("[table]"));
    assert!(stdout.contains("[stress]"));
    assert!(stdout.contains("[log]"));
}

#[test]
fn test_config_init_then_project_config_applies() {
    let temp = TempDir::new().unwrap();

    let output = fhash_in(temp.path(), &["config", "init"]);
    assert!(output.status.success());
    assert!(temp.path().join(".fhash/config.toml").exists());

    // Refuses to clobber without --force
    let output = fhash_in(temp.path(), &["config", "init"]);
    assert!(!output.status.success());
    let output = fhash_in(temp.path(), &["config", "init", "--force"]);
    assert!(output.status.success());

    std::fs::write(
        temp.path().join(".fhash/config.toml"),
        "[table]\nbuckets = 64\n",
    )
    .unwrap();
    let output = fhash_in(temp.path(), &["bucket", "123456789"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("/64"), "{}", stdout);
}

#[test]
fn test_config_path() {
    let temp = TempDir::new().unwrap();
    let output = fhash_in(temp.path(), &["config", "path"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Global:"));
    assert!(stdout.contains("Project:"));
}
