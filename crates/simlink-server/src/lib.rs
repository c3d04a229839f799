//! simlink-server: connects a running simulation to remote controllers
//! and viewers over TCP.
//!
//! Each accepted socket becomes a [`ClientSession`] which first waits for
//! the client to present itself as controller, viewer, or both. Control
//! messages from controllers are forwarded to every registered
//! [`ServerListener`]; simulation updates are pushed to viewers through
//! the broadcast methods on [`NetworkServer`], which encode a frame once
//! and write the same bytes to each viewer.

mod broadcast;
pub mod error;
pub mod listener;
pub mod registry;
pub mod role;
pub mod server;
pub mod session;

#[cfg(test)]
mod test_support;


pub use error::{ServerError, SessionError};
pub use listener::{EventDispatcher, ServerListener};
pub use registry::{ConnectionRegistry, Snapshot};
pub use role::ConnectionRole;
pub use server::NetworkServer;
pub use session::{ClientSession, SessionEnd};
