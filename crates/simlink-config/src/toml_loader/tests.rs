//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use crate::schema::{LogLevel, SimlinkConfig};
use simlink_common::ConfigError;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_simlink_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[server]
port = 9100
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 9100);
    // Defaults preserved
    assert_eq!(config.server.bind_address, "0.0.0.0");
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_config_with_invalid_values_keeps_parsed_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[server]
port = 0
bind_address = "nowhere"
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 0);
    assert_eq!(config.server.bind_address, "nowhere");
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("simlink").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 7410);
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn create_default_config_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\nport = 8000\n").unwrap();

    create_default_config(&path).unwrap();
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.server.port, 8000);
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;

    let content = default_config_toml();
    let config: SimlinkConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.server.port, 7410);
}

#[test]
fn default_config_path_is_reasonable() {
    // No config dir in some CI sandboxes.
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("simlink"));
        assert!(path_str.ends_with("config.toml"));
    }
}
