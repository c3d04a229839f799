//! One accepted client connection and its protocol state machine.
//!
//! A session is driven by a single task running [`ClientSession::run`].
//! Other tasks interact with it through the viewer send API and
//! [`ClientSession::close_connection`].

mod handlers;
mod viewer;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use simlink_common::SessionId;
use simlink_protocol::FrameReader;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::listener::EventDispatcher;
use crate::registry::ConnectionRegistry;
use crate::role::ConnectionRole;

use handlers::LoopControl;

type SessionReader = FrameReader<BufReader<OwnedReadHalf>>;

/// Why [`ClientSession::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// [`ClientSession::close_connection`] was observed between reads.
    StopRequested,
    /// The client said `BYE` or sent a message illegal in its state.
    Ended,
    /// The stream failed or the peer disconnected.
    Failed(String),
}

/// Write side of the socket.
///
/// The half is held from accept, but frames may only be written once the
/// handshake has opened it for a viewer.
struct Outbound {
    half: Option<OwnedWriteHalf>,
    open: bool,
}

impl Outbound {
    fn writer(&mut self) -> Option<&mut OwnedWriteHalf> {
        if self.open {
            self.half.as_mut()
        } else {
            None
        }
    }
}

pub struct ClientSession {
    id: SessionId,
    peer: SocketAddr,
    role: OnceLock<ConnectionRole>,
    stop_requested: AtomicBool,
    pending_end: AtomicBool,
    reader: Mutex<Option<SessionReader>>,
    outbound: tokio::sync::Mutex<Outbound>,
    registry: ConnectionRegistry,
    dispatcher: Arc<EventDispatcher>,
}

impl ClientSession {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        registry: ConnectionRegistry,
        dispatcher: Arc<EventDispatcher>,
    ) -> Arc<Self> {
        let (read_half, write_half) = stream.into_split();
        let session = Arc::new(Self {
            id: SessionId::new(),
            peer,
            role: OnceLock::new(),
            stop_requested: AtomicBool::new(false),
            pending_end: AtomicBool::new(false),
            reader: Mutex::new(Some(FrameReader::new(BufReader::new(read_half)))),
            outbound: tokio::sync::Mutex::new(Outbound {
                half: Some(write_half),
                open: false,
            }),
            registry,
            dispatcher,
        });
        info!(session = %session.id, peer = %peer, "Client connection established");
        session
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.peer
    }

    /// `None` until the presentation handshake completes.
    pub fn role(&self) -> Option<ConnectionRole> {
        self.role.get().copied()
    }

    /// Ask the read loop to stop. The socket stays open until the loop
    /// next checks the flag, which happens between two messages.
    pub fn close_connection(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// `true` after a `START` was sent to this viewer without a matching `END`.
    pub fn has_pending_end_message(&self) -> bool {
        self.pending_end.load(Ordering::SeqCst)
    }

    /// Drive the session until the client leaves, the stream fails, or
    /// [`close_connection`](Self::close_connection) is observed.
    ///
    /// Fires `on_connection_opened` before the first read and
    /// `on_connection_closed` after the session has left the registry.
    pub async fn run(self: Arc<Self>) -> SessionEnd {
        let taken = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut reader) = taken else {
            warn!(session = %self.id, "Session loop already ran");
            return SessionEnd::Failed("session loop already ran".into());
        };

        debug!(session = %self.id, "Client connection is running");
        self.dispatcher.fire_connection_opened(&self);

        let end = loop {
            if self.is_stop_requested() {
                break SessionEnd::StopRequested;
            }
            let control = match self.role() {
                None => self.listen_for_presentation(&mut reader).await,
                Some(role) if role.is_controller() => self.listen_controller(&mut reader).await,
                Some(_) => self.listen_viewer(&mut reader).await,
            };
            match control {
                LoopControl::Continue => {}
                LoopControl::EndSession => break SessionEnd::Ended,
                LoopControl::FatalError(e) => {
                    if e.is_eof() {
                        debug!(session = %self.id, peer = %self.peer, "Client closed the connection");
                    } else {
                        warn!(session = %self.id, peer = %self.peer, error = %e, "Client connection lost");
                    }
                    break SessionEnd::Failed(e.to_string());
                }
            }
        };

        drop(reader);
        self.release_output().await;
        self.registry.remove(&self);

        info!(
            session = %self.id,
            peer = %self.peer,
            role = ?self.role(),
            reason = ?end,
            "Client disconnected"
        );
        self.dispatcher.fire_connection_closed(&self);
        end
    }

    /// Shut down and drop the write half. Closing errors are only logged.
    async fn release_output(&self) {
        let mut out = self.outbound.lock().await;
        out.open = false;
        if let Some(mut half) = out.half.take() {
            if let Err(e) = half.shutdown().await {
                debug!(session = %self.id, error = %e, "Cannot close output stream");
            }
        }
    }

    /// Make the write half usable for viewer frames. No-op if already open.
    async fn open_output(&self) {
        let mut out = self.outbound.lock().await;
        if out.half.is_some() {
            out.open = true;
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("role", &self.role())
            .field("stop_requested", &self.is_stop_requested())
            .finish_non_exhaustive()
    }
}
