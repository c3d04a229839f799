//! Listener trait for inbound control messages and connection lifecycle,
//! and the multicast dispatcher that fans events out to every listener.

use std::sync::Arc;

use simlink_protocol::{ProbeDescription, ProbeIdentifier, SimulationConfiguration};

use crate::registry::SnapshotSet;
use crate::session::ClientSession;

/// Receives server events. Every method defaults to a no-op so an
/// implementation only overrides what it needs.
///
/// Callbacks run synchronously on the task of the session that produced
/// the event; a slow callback delays only that session.
pub trait ServerListener: Send + Sync {
    /// A session started its read loop.
    fn on_connection_opened(&self, _session: &Arc<ClientSession>) {}

    /// A session finished cleanup and left the registry.
    fn on_connection_closed(&self, _session: &Arc<ClientSession>) {}

    fn on_init_message(&self, _config: &SimulationConfiguration) {}

    fn on_play_message(&self) {}

    fn on_step_message(&self) {}

    fn on_pause_message(&self) {}

    /// Also fired when a controller says `BYE`.
    fn on_stop_message(&self) {}

    fn on_add_probe_message(&self, _probe: &ProbeDescription) {}

    fn on_remove_probe_message(&self, _probe_id: &ProbeIdentifier) {}

    fn on_set_simulation_delay(&self, _delay_ms: i64) {}

    fn on_kill_simulation_message(&self) {}
}

/// Multicast registry of [`ServerListener`]s.
pub struct EventDispatcher {
    listeners: SnapshotSet<dyn ServerListener>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: SnapshotSet::new(),
        }
    }

    /// Returns `false` if this exact listener was already registered.
    pub fn register(&self, listener: Arc<dyn ServerListener>) -> bool {
        self.listeners.insert(listener)
    }

    /// Returns `false` if this listener was not registered.
    ///
    /// Dispatch runs over a snapshot taken when the event fires, not under
    /// the registration lock. An event already being delivered on another
    /// session's task may still reach the listener after this returns
    /// `true`; every event fired afterwards will not.
    pub fn unregister(&self, listener: &Arc<dyn ServerListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn each(&self, f: impl Fn(&dyn ServerListener)) {
        for listener in self.listeners.snapshot().iter() {
            f(listener.as_ref());
        }
    }

    pub fn fire_connection_opened(&self, session: &Arc<ClientSession>) {
        self.each(|l| l.on_connection_opened(session));
    }

    pub fn fire_connection_closed(&self, session: &Arc<ClientSession>) {
        self.each(|l| l.on_connection_closed(session));
    }

    pub fn fire_init(&self, config: &SimulationConfiguration) {
        self.each(|l| l.on_init_message(config));
    }

    pub fn fire_play(&self) {
        self.each(|l| l.on_play_message());
    }

    pub fn fire_step(&self) {
        self.each(|l| l.on_step_message());
    }

    pub fn fire_pause(&self) {
        self.each(|l| l.on_pause_message());
    }

    pub fn fire_stop(&self) {
        self.each(|l| l.on_stop_message());
    }

    pub fn fire_add_probe(&self, probe: &ProbeDescription) {
        self.each(|l| l.on_add_probe_message(probe));
    }

    pub fn fire_remove_probe(&self, probe_id: &ProbeIdentifier) {
        self.each(|l| l.on_remove_probe_message(probe_id));
    }

    pub fn fire_set_simulation_delay(&self, delay_ms: i64) {
        self.each(|l| l.on_set_simulation_delay(delay_ms));
    }

    pub fn fire_kill_simulation(&self) {
        self.each(|l| l.on_kill_simulation_message());
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
