//! Config path resolution and default file creation.

use std::io::Write;
use std::path::{Path, PathBuf};

use simlink_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

/// Directory under the platform config dir holding `config.toml`.
const APP_DIR: &str = "simlink";

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join(APP_DIR).join("config.toml"))
}

/// Create a default TOML config file with documentation comments.
///
/// An existing file at `path` is left untouched.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(()),
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to create {}: {e}",
                path.display()
            )))
        }
    };

    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to write default config to {}: {e}",
                path.display()
            ))
        })?;

    info!("created default config at {}", path.display());
    Ok(())
}
