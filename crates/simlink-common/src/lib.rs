//! Shared building blocks for the simlink workspace: the error taxonomy
//! and identifier helpers used by the config, protocol and server crates.

pub mod errors;
pub mod id;

pub use errors::{ConfigError, SimlinkError};
pub use id::{new_id, SessionId};

pub type Result<T> = std::result::Result<T, SimlinkError>;
