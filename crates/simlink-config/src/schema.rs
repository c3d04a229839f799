//! Configuration schema types for simlink.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults below.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};
use simlink_protocol::DEFAULT_SIMULATOR_PORT;

/// Root configuration for the simulation server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimlinkConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Server
// =============================================================================

/// Listening socket of the simulation server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind, as an IP literal.
    pub bind_address: String,
    /// TCP port (valid range: 1-65535).
    pub port: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: u32::from(DEFAULT_SIMULATOR_PORT),
        }
    }
}

impl ServerConfig {
    /// Resolve the configured address, falling back to the unspecified
    /// IPv4 address and the default port for values that do not parse.
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .bind_address
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = u16::try_from(self.port)
            .ok()
            .filter(|p| *p != 0)
            .unwrap_or(DEFAULT_SIMULATOR_PORT);
        SocketAddr::new(ip, port)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}
