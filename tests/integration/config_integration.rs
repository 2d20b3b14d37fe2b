//! Configuration loading from a full TOML file.

use groupsync::config::ConfigLoader;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_full_config_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("groupsync.toml");

    std::fs::write(
        &config_file,
        r#"
access_key = "ak"
secret_key = "sk"
base_url = "https://platform.example.com"
category = "Agent Groups"
create_delay_ms = 250

[cache]
dir = "/var/cache/groupsync"
ttl_secs = 7200

[logging]
level = "warn"
format = "json"
output = "file"
file = "/var/log/groupsync.log"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load(Some(&config_file)).unwrap();
    assert!(config.validate().is_ok());

    assert_eq!(config.base_url, "https://platform.example.com");
    assert_eq!(config.create_delay_ms, 250);
    assert_eq!(config.cache.dir, PathBuf::from("/var/cache/groupsync"));
    assert_eq!(config.cache.ttl_secs, 7200);
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.output, "file");
    assert_eq!(config.logging.file, PathBuf::from("/var/log/groupsync.log"));
}

#[test]
fn test_minimal_config_gets_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("groupsync.toml");
    std::fs::write(&config_file, "access_key = \"ak\"\nsecret_key = \"sk\"\n").unwrap();

    let config = ConfigLoader::load(Some(&config_file)).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.base_url, "https://cloud.tenable.com");
    assert_eq!(config.category, "Agent Groups");
    assert_eq!(config.cache.ttl_secs, 86400);
    assert_eq!(config.logging.output, "both");
}
