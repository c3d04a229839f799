//! Per-state message handlers of the session read loop.

use simlink_protocol::{CodecError, MessageType};
use tracing::{debug, info, warn};

use super::{ClientSession, SessionReader};
use crate::role::ConnectionRole;

/// Outcome of handling one inbound message.
#[derive(Debug)]
pub(super) enum LoopControl {
    Continue,
    /// Graceful or protocol-violation end; the socket is still healthy.
    EndSession,
    /// The stream can no longer be read.
    FatalError(CodecError),
}

impl From<CodecError> for LoopControl {
    fn from(e: CodecError) -> Self {
        LoopControl::FatalError(e)
    }
}

/// Await a decode, or return its error as the fatal outcome.
macro_rules! read_or_fail {
    ($e:expr) => {
        match $e.await {
            Ok(v) => v,
            Err(e) => return LoopControl::from(e),
        }
    };
}

impl ClientSession {
    /// `UNIDENTIFIED` state: wait for `IAMCONTROLLER`, `IAMVIEWER` or `IAMBOTH`.
    pub(super) async fn listen_for_presentation(&self, reader: &mut SessionReader) -> LoopControl {
        let message_type = read_or_fail!(reader.read_message_header());

        let role = match ConnectionRole::try_from(message_type) {
            Ok(role) => role,
            Err(other) => {
                warn!(session = %self.id, message = %other, "Unexpected message before presentation");
                return LoopControl::EndSession;
            }
        };

        if self.role.set(role).is_err() {
            warn!(session = %self.id, "Role already assigned");
            return LoopControl::EndSession;
        }
        if role.is_viewer() {
            self.open_output().await;
        }
        info!(session = %self.id, peer = %self.peer, role = %role, "Client identified");
        LoopControl::Continue
    }

    /// `VIEWER` state: only `BYE` is legal.
    pub(super) async fn listen_viewer(&self, reader: &mut SessionReader) -> LoopControl {
        match read_or_fail!(reader.read_message_header()) {
            MessageType::Bye => {
                debug!(session = %self.id, "Viewer said goodbye");
            }
            other => {
                warn!(session = %self.id, message = %other, "Unexpected message from viewer");
            }
        }
        LoopControl::EndSession
    }

    /// `CONTROLLER` and `BOTH` states: decode commands and fire events.
    pub(super) async fn listen_controller(&self, reader: &mut SessionReader) -> LoopControl {
        let message_type = read_or_fail!(reader.read_message_header());
        debug!(session = %self.id, message = %message_type, "Controller message");

        let events = &self.dispatcher;
        match message_type {
            MessageType::Bye => {
                events.fire_stop();
                return LoopControl::EndSession;
            }
            MessageType::Init => {
                let config = read_or_fail!(reader.read_init_message());
                events.fire_init(&config);
            }
            MessageType::Play => events.fire_play(),
            MessageType::Step => events.fire_step(),
            MessageType::Pause => events.fire_pause(),
            MessageType::Stop => events.fire_stop(),
            MessageType::AddProbe => {
                let probe = read_or_fail!(reader.read_add_probe_message());
                events.fire_add_probe(&probe);
            }
            MessageType::RemoveProbe => {
                let probe_id = read_or_fail!(reader.read_remove_probe_message());
                events.fire_remove_probe(&probe_id);
            }
            MessageType::SetSimulationDelay => {
                let delay_ms = read_or_fail!(reader.read_set_simulation_delay_message());
                events.fire_set_simulation_delay(delay_ms);
            }
            MessageType::KillSimulator => events.fire_kill_simulation(),
            other => {
                warn!(session = %self.id, message = %other, "Unexpected message from controller");
                return LoopControl::EndSession;
            }
        }
        LoopControl::Continue
    }
}
