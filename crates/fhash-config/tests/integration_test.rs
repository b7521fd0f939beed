//! Integration tests for fhash-config
//!
//! These tests verify the full config loading pipeline with real file system operations.

use fhash_config::testing::TestEnvironment;
use fhash_config::{Config, ConfigError};
use tempfile::tempdir;

/// Test config loading from real global config file
#[test]
fn test_load_global_config_from_file() {
    let env = TestEnvironment::new().unwrap();
    env.write_global_config(
        r#"
[table]
buckets = 1024
dump_on_miss = true

[stress]
threads = 4
files = 32
rounds = 8
"#,
    )
    .unwrap();

    let config = env.load().unwrap();

    assert_eq!(config.table.buckets, 1024);
    assert!(config.table.dump_on_miss);
    assert_eq!(config.stress.threads, Some(4));
    assert_eq!(config.stress.files, 32);
    assert_eq!(config.stress.rounds, 8);
}

/// Test config hierarchy: project config overrides global
#[test]
fn test_config_hierarchy_project_overrides_global() {
    let env = TestEnvironment::new().unwrap();
    env.write_global_config(
        r#"
[stress]
files = 16

[log]
level = "debug"
"#,
    )
    .unwrap();
    env.write_project_config(
        r#"
[stress]
files = 99
"#,
    )
    .unwrap();

    let config = env.load().unwrap();

    assert_eq!(config.stress.files, 99);
    assert_eq!(config.log.level, "debug");
}

/// A project file that sets one key of a section keeps the global file's
/// other keys in that section.
#[test]
fn test_project_overrides_single_keys_within_section() {
    let env = TestEnvironment::new().unwrap();
    env.write_global_config(
        r#"
[table]
buckets = 1024

[stress]
files = 16
rounds = 4
"#,
    )
    .unwrap();
    env.write_project_config(
        r#"
[table]
dump_on_miss = true

[stress]
rounds = 9
"#,
    )
    .unwrap();

    let config = env.load().unwrap();

    assert_eq!(config.table.buckets, 1024);
    assert!(config.table.dump_on_miss);
    assert_eq!(config.stress.files, 16);
    assert_eq!(config.stress.rounds, 9);
}

/// Writing the default value explicitly still overrides the global file.
#[test]
fn test_project_can_restore_default_value() {
    let env = TestEnvironment::new().unwrap();
    env.write_global_config("[table]\nbuckets = 1024\ndump_on_miss = true\n").unwrap();
    env.write_project_config("[table]\nbuckets = 512\ndump_on_miss = false\n").unwrap();

    let config = env.load().unwrap();

    assert_eq!(config.table.buckets, 512);
    assert!(!config.table.dump_on_miss);
}

#[test]
fn test_env_overrides_both_files() {
    let env = TestEnvironment::new().unwrap();
    env.write_global_config("[table]\nbuckets = 1024\n").unwrap();
    env.write_project_config("[stress]\nthreads = 2\n").unwrap();

    let config = env
        .load_with_env(&[
            ("FHASH_BUCKETS", "32"),
            ("FHASH_DUMP_ON_MISS", "1"),
            ("FHASH_THREADS", "6"),
        ])
        .unwrap();

    assert_eq!(config.table.buckets, 32);
    assert!(config.table.dump_on_miss);
    assert_eq!(config.stress.threads, Some(6));
}

#[test]
fn test_env_can_repair_invalid_file_value() {
    let env = TestEnvironment::new().unwrap();
    env.write_project_config("[stress]\nthreads = 0\n").unwrap();

    let config = env.load_with_env(&[("FHASH_THREADS", "2")]).unwrap();
    assert_eq!(config.stress.threads, Some(2));
}

#[test]
fn test_env_bucket_override_is_validated() {
    let env = TestEnvironment::new().unwrap();

    let err = env.load_with_env(&[("FHASH_BUCKETS", "0")]).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_partial_config_uses_defaults() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[log]\nlevel = \"info\"\n").unwrap();

    let config = Config::load_from(Some(path.as_path()), None).unwrap();

    assert_eq!(config.log.level, "info");
    assert_eq!(config.stress.rounds, 64);
}

#[test]
fn test_missing_files_are_skipped() {
    let temp = tempdir().unwrap();
    let config = Config::load_from(
        Some(temp.path().join("nope.toml").as_path()),
        Some(temp.path().join("also-nope.toml").as_path()),
    )
    .unwrap();

    assert_eq!(config.stress.files, 256);
}

#[test]
fn test_invalid_toml_is_reported() {
    let env = TestEnvironment::new().unwrap();
    env.write_project_config("[table\nbuckets = ").unwrap();

    let err = env.load().unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_zero_threads_rejected() {
    let env = TestEnvironment::new().unwrap();
    env.write_project_config("[stress]\nthreads = 0\n").unwrap();

    let err = env.load().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_default_toml_parses_back() {
    let toml_str = Config::default_toml();
    let parsed: Config = toml::from_str(&toml_str).unwrap();
    assert_eq!(parsed.table.buckets, 512);
    assert_eq!(parsed.log.level, "warn");
}
