//! Role a client announces during the presentation handshake.

use std::fmt;

use simlink_protocol::MessageType;

/// Role of a connected client. Set once by the handshake, never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRole {
    Controller,
    Viewer,
    Both,
}

impl ConnectionRole {
    /// `true` if the client may drive the simulation.
    pub fn is_controller(self) -> bool {
        matches!(self, ConnectionRole::Controller | ConnectionRole::Both)
    }

    /// `true` if the client receives simulation updates.
    pub fn is_viewer(self) -> bool {
        matches!(self, ConnectionRole::Viewer | ConnectionRole::Both)
    }
}

impl TryFrom<MessageType> for ConnectionRole {
    type Error = MessageType;

    fn try_from(message_type: MessageType) -> Result<Self, Self::Error> {
        match message_type {
            MessageType::IAmController => Ok(ConnectionRole::Controller),
            MessageType::IAmViewer => Ok(ConnectionRole::Viewer),
            MessageType::IAmBoth => Ok(ConnectionRole::Both),
            other => Err(other),
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionRole::Controller => "CONTROLLER",
            ConnectionRole::Viewer => "VIEWER",
            ConnectionRole::Both => "BOTH",
        })
    }
}
