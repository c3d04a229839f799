use std::net::SocketAddr;

use simlink_protocol::CodecError;

use crate::role::ConnectionRole;

/// Failure of a send on a single client session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session has no role yet, or its role does not accept viewer frames.
    #[error("session {session} is not a viewer (role: {role:?})")]
    InvalidRole {
        session: String,
        role: Option<ConnectionRole>,
    },

    #[error("session {0} has no open output stream")]
    NoOutputStream(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error("listening socket is closed")]
    ListenerClosed,
}
