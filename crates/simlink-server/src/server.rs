//! The listening side of the server: accepts TCP connections and turns
//! each one into a [`ClientSession`] running on its own task.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use simlink_protocol::DEFAULT_SIMULATOR_PORT;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::ServerError;
use crate::listener::{EventDispatcher, ServerListener};
use crate::registry::{ConnectionRegistry, Snapshot};
use crate::session::ClientSession;

pub struct NetworkServer {
    local_addr: SocketAddr,
    /// Taken by [`start`](Self::start); `None` once the socket is closed.
    listener: Mutex<Option<TcpListener>>,
    listening: AtomicBool,
    shutdown: watch::Sender<bool>,
    executor: Handle,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) dispatcher: Arc<EventDispatcher>,
    pub(crate) frames_encoded: AtomicU64,
}

impl NetworkServer {
    /// Bind the listening socket. Sessions are spawned on the runtime
    /// this is called from unless [`with_executor`](Self::with_executor)
    /// says otherwise.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;
        info!(addr = %local_addr, "Simulator server bound");

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            local_addr,
            listener: Mutex::new(Some(listener)),
            listening: AtomicBool::new(false),
            shutdown,
            executor: Handle::current(),
            registry: ConnectionRegistry::new(),
            dispatcher: Arc::new(EventDispatcher::new()),
            frames_encoded: AtomicU64::new(0),
        })
    }

    /// Bind on every IPv4 interface at [`DEFAULT_SIMULATOR_PORT`].
    pub async fn bind_default() -> Result<Self, ServerError> {
        Self::bind(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            DEFAULT_SIMULATOR_PORT,
        ))
        .await
    }

    /// Spawn sessions on `executor` instead of the binding runtime.
    pub fn with_executor(mut self, executor: Handle) -> Self {
        self.executor = executor;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Accept connections until [`stop`](Self::stop) is called.
    ///
    /// Returns `Ok(())` after a deliberate stop. Any accept failure
    /// otherwise terminates the loop and is returned; existing sessions
    /// keep running.
    pub async fn start(&self) -> Result<(), ServerError> {
        let taken = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let listener = taken.ok_or(ServerError::ListenerClosed)?;

        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return Ok(());
        }
        self.listening.store(true, Ordering::SeqCst);
        info!(addr = %self.local_addr, "Simulator server listening");

        let result = loop {
            tokio::select! {
                _ = shutdown.changed() => break Ok(()),
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                        if self.listening.swap(false, Ordering::SeqCst) {
                            break Err(ServerError::Accept(e));
                        }
                        break Ok(());
                    }
                },
            }
        };

        self.listening.store(false, Ordering::SeqCst);
        info!(addr = %self.local_addr, "Simulator server stopped listening");
        result
    }

    fn spawn_session(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let session = ClientSession::new(
            stream,
            peer,
            self.registry.clone(),
            Arc::clone(&self.dispatcher),
        );
        self.registry.add(&session);
        self.executor.spawn(session.run());
    }

    /// Stop accepting and close the listening socket. Sessions already
    /// accepted keep running.
    pub fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(true);
        // Not yet started: the socket is still parked here.
        drop(
            self.listener
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
    }

    /// Close the listening socket, then empty the registry and ask every
    /// session it held to close.
    pub fn close_all_connections(&self) {
        self.stop();
        let sessions = self.registry.take_all();
        info!(count = sessions.len(), "Closing client connections");
        for session in sessions.iter() {
            session.close_connection();
        }
    }

    /// `true` while at least one session is registered.
    pub fn is_client_connection_established(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn client_connections(&self) -> Snapshot<ClientSession> {
        self.registry.snapshot()
    }

    pub fn add_listener(&self, listener: Arc<dyn ServerListener>) -> bool {
        self.dispatcher.register(listener)
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ServerListener>) -> bool {
        self.dispatcher.unregister(listener)
    }

    /// Number of frames the broadcast API has encoded so far.
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded.load(Ordering::Relaxed)
    }
}
