//! Integration tests for configuration loading

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

use aliddns::config::Config;
use aliddns::provider::RecordType;

const ENV_KEYS: &[&str] = &[
    "ALIDDNS_ACCESS_KEY_ID",
    "ALIDDNS_ACCESS_KEY_SECRET",
    "ALIDDNS_DOMAIN",
    "ALIDDNS_REGION",
];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).expect("write config");
    (dir, path)
}

#[test]
#[serial]
fn load_full_config_from_file() {
    clear_env();
    let (_dir, path) = write_config(
        r#"
access_key_id = "LTAI4Ftest"
access_key_secret = "secret123"
domain = "example.com"
interval = 600
ttl = 120

[[records]]
rr = "@"
type = "A"

[[records]]
rr = "nas"
type = "AAAA"
ttl = 60
"#,
    );

    let cfg = Config::load(Some(path)).expect("config load");
    assert_eq!(cfg.domain, "example.com");
    assert_eq!(cfg.interval, Duration::from_secs(600));
    assert_eq!(cfg.ttl, 120);
    assert_eq!(cfg.records.len(), 2);
    assert_eq!(cfg.records[1].record_type, RecordType::AAAA);
    assert_eq!(cfg.records[1].ttl, Some(60));
}

#[test]
#[serial]
fn env_credentials_override_file() {
    clear_env();
    let (_dir, path) = write_config(
        r#"
access_key_id = "file_key"
access_key_secret = "file_secret"
domain = "example.com"

[[records]]
rr = "www"
type = "A"
"#,
    );

    env::set_var("ALIDDNS_ACCESS_KEY_ID", "env_key");
    env::set_var("ALIDDNS_ACCESS_KEY_SECRET", "env_secret");

    let cfg = Config::load(Some(path)).expect("config load");
    assert_eq!(cfg.access_key_id.as_str(), "env_key");
    assert_eq!(cfg.access_key_secret.as_str(), "env_secret");

    clear_env();
}

#[test]
#[serial]
fn missing_credentials_fail_before_any_sync() {
    clear_env();
    let (_dir, path) = write_config(
        r#"
domain = "example.com"

[[records]]
rr = "www"
type = "A"
"#,
    );

    let err = Config::load(Some(path)).expect_err("missing credentials");
    assert!(format!("{err}").contains("access_key_id"));
}

#[test]
#[serial]
fn unsupported_record_type_is_rejected() {
    clear_env();
    let (_dir, path) = write_config(
        r#"
access_key_id = "LTAI4Ftest"
access_key_secret = "secret123"
domain = "example.com"

[[records]]
rr = "www"
type = "CNAME"
"#,
    );

    let err = Config::load(Some(path)).expect_err("bad record type");
    assert!(format!("{err:#}").contains("type must be A or AAAA"));
}
