//! simlink configuration system.
//!
//! TOML-based configuration for the simulation server. All sections use
//! defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use simlink_config::{load_config, config_to_json, validation};
//!
//! let config = load_config(None).expect("failed to load config");
//! if let Err(e) = validation::validate(&config) {
//!     eprintln!("{e}");
//! }
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{LogLevel, LoggingConfig, ServerConfig, SimlinkConfig};

use std::path::Path;

use simlink_common::ConfigError;

/// Load config from `path`, or from the platform default path when `None`.
///
/// An explicit path must exist. The default file is created with
/// commented defaults if missing. Values are parsed but not validated:
/// callers apply their overrides first, then run
/// [`validation::validate`] once and keep the config on failure.
pub fn load_config(path: Option<&Path>) -> Result<SimlinkConfig, ConfigError> {
    match path {
        Some(path) => toml_loader::load_from_path(path),
        None => toml_loader::load_default(),
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &SimlinkConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
