//! Loopback sockets, an event recorder, and polling helpers for tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;
use simlink_protocol::codec::write_header;
use simlink_protocol::{MessageType, ProbeDescription, ProbeIdentifier, SimulationConfiguration};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::listener::{EventDispatcher, ServerListener};
use crate::registry::ConnectionRegistry;
use crate::session::ClientSession;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Opened(String),
    Closed(String),
    Init(SimulationConfiguration),
    Play,
    Step,
    Pause,
    Stop,
    AddProbe(ProbeDescription),
    RemoveProbe(ProbeIdentifier),
    Delay(i64),
    Kill,
}

/// Listener that remembers every event in arrival order.
#[derive(Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub(crate) fn closed(&self) -> usize {
        self.count(|e| matches!(e, Event::Closed(_)))
    }
}

impl ServerListener for Recorder {
    fn on_connection_opened(&self, session: &Arc<ClientSession>) {
        self.push(Event::Opened(session.id().to_string()));
    }

    fn on_connection_closed(&self, session: &Arc<ClientSession>) {
        self.push(Event::Closed(session.id().to_string()));
    }

    fn on_init_message(&self, config: &SimulationConfiguration) {
        self.push(Event::Init(config.clone()));
    }

    fn on_play_message(&self) {
        self.push(Event::Play);
    }

    fn on_step_message(&self) {
        self.push(Event::Step);
    }

    fn on_pause_message(&self) {
        self.push(Event::Pause);
    }

    fn on_stop_message(&self) {
        self.push(Event::Stop);
    }

    fn on_add_probe_message(&self, probe: &ProbeDescription) {
        self.push(Event::AddProbe(probe.clone()));
    }

    fn on_remove_probe_message(&self, probe_id: &ProbeIdentifier) {
        self.push(Event::RemoveProbe(probe_id.clone()));
    }

    fn on_set_simulation_delay(&self, delay_ms: i64) {
        self.push(Event::Delay(delay_ms));
    }

    fn on_kill_simulation_message(&self) {
        self.push(Event::Kill);
    }
}

/// Registry and dispatcher wired to a [`Recorder`], as the server does.
pub(crate) struct Harness {
    pub(crate) registry: ConnectionRegistry,
    pub(crate) dispatcher: Arc<EventDispatcher>,
    pub(crate) recorder: Arc<Recorder>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let dispatcher = Arc::new(EventDispatcher::new());
        let recorder = Arc::new(Recorder::default());
        dispatcher.register(recorder.clone());
        Self {
            registry: ConnectionRegistry::new(),
            dispatcher,
            recorder,
        }
    }

    /// A registered session over loopback, not yet running, and the
    /// client end of its socket.
    pub(crate) async fn session(&self) -> (Arc<ClientSession>, TcpStream) {
        let (client, accepted, peer) = loopback_pair().await;
        let session =
            ClientSession::new(accepted, peer, self.registry.clone(), self.dispatcher.clone());
        self.registry.add(&session);
        (session, client)
    }
}

/// Client and server ends of a fresh loopback connection.
pub(crate) async fn loopback_pair() -> (TcpStream, TcpStream, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    let (accepted, peer) = accepted.unwrap();
    (client.unwrap(), accepted, peer)
}

/// Build one or more frames and write them to `stream`.
pub(crate) async fn send(stream: &mut TcpStream, build: impl FnOnce(&mut BytesMut)) {
    let mut buf = BytesMut::new();
    build(&mut buf);
    stream.write_all(&buf).await.unwrap();
}

pub(crate) async fn send_type(stream: &mut TcpStream, message_type: MessageType) {
    send(stream, |buf| write_header(buf, message_type)).await;
}

/// Poll `cond` until it holds, failing the test after five seconds.
pub(crate) async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}
