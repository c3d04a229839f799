//! Full configuration validation.
//!
//! Collects every problem into a single `ConfigError` rather than
//! stopping at the first one.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::SimlinkConfig;
use simlink_common::ConfigError;

use helpers::{validate_ip, validate_range};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &SimlinkConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_ip(&mut errors, "server.bind_address", &config.server.bind_address);
    validate_range(&mut errors, "server.port", config.server.port, 1, 65535);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
