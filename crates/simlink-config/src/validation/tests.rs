//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = SimlinkConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_port_zero() {
    let mut config = SimlinkConfig::default();
    config.server.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port = 0 is out of range [1, 65535]"));
}

#[test]
fn catches_port_too_large() {
    let mut config = SimlinkConfig::default();
    config.server.port = 65536;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
}

#[test]
fn catches_bad_bind_address() {
    let mut config = SimlinkConfig::default();
    config.server.bind_address = "localhost".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.bind_address"));
}

#[test]
fn accepts_ipv6_bind_address() {
    let mut config = SimlinkConfig::default();
    config.server.bind_address = "::".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn collects_all_errors() {
    let mut config = SimlinkConfig::default();
    config.server.bind_address = "".into();
    config.server.port = 0;
    let err = validate(&config).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
    let msg = err.to_string();
    assert!(msg.contains("server.bind_address"));
    assert!(msg.contains("server.port"));
    assert!(msg.contains("; "));
}
