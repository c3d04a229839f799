//! Server-level outbound API: one logical event to every viewer.
//!
//! A payload is encoded once and the same bytes are written to each
//! `VIEWER` or `BOTH` session of a registry snapshot, one after another.
//! The first write failure stops the loop and is returned; viewers later
//! in the snapshot do not get the frame. A payload that exceeds the codec
//! limits is refused with [`SessionError::Codec`] before any write. Each call returns how many
//! viewers were written to.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use simlink_protocol::codec::{
    write_addition_message, write_deletion_message, write_idle_message, write_move_action_message,
    write_probe_message, write_start_message,
};
use simlink_protocol::{
    CodecError, MobileEntityMoveInfo, MobileEntitySpawningInfo, PlaceInfo, ProbeInfo, SimulationInfo,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::SessionError;
use crate::server::NetworkServer;
use crate::session::ClientSession;

impl NetworkServer {
    /// Encode a frame for the whole broadcast. A payload that cannot be
    /// encoded fails here, before any viewer is written to.
    fn encode_once(
        &self,
        encode: impl FnOnce(&mut BytesMut) -> Result<(), CodecError>,
    ) -> Result<Bytes, SessionError> {
        let mut buf = BytesMut::new();
        encode(&mut buf)?;
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
        Ok(buf.freeze())
    }

    /// Viewer sessions of the current registry snapshot. Sessions still
    /// in the handshake have no role and are skipped.
    fn viewers(&self) -> Vec<Arc<ClientSession>> {
        self.registry
            .snapshot()
            .iter()
            .filter(|s| s.role().is_some_and(|r| r.is_viewer()))
            .cloned()
            .collect()
    }

    async fn broadcast(&self, frame: Bytes) -> Result<usize, SessionError> {
        let mut sent = 0;
        for session in self.viewers() {
            session.send_bytes(&frame).await?;
            sent += 1;
        }
        debug!(bytes = frame.len(), viewers = sent, "Broadcast frame");
        Ok(sent)
    }

    /// Send `START` to every viewer and mark each one as owing an `END`.
    pub async fn send_start_message(
        &self,
        info: &SimulationInfo,
        places: &[PlaceInfo],
    ) -> Result<usize, SessionError> {
        let frame = self.encode_once(|buf| write_start_message(buf, info, places))?;
        let mut sent = 0;
        for session in self.viewers() {
            session.send_start_bytes(&frame).await?;
            sent += 1;
        }
        Ok(sent)
    }

    pub async fn send_end_message(&self) -> Result<usize, SessionError> {
        let mut sent = 0;
        for session in self.viewers() {
            session.send_end_message().await?;
            sent += 1;
        }
        Ok(sent)
    }

    pub async fn send_action_message(
        &self,
        time: f64,
        duration: f64,
        moves: &[MobileEntityMoveInfo],
    ) -> Result<usize, SessionError> {
        let frame =
            self.encode_once(|buf| write_move_action_message(buf, time, duration, moves))?;
        self.broadcast(frame).await
    }

    pub async fn send_idle_message(&self, time: f64, duration: f64) -> Result<usize, SessionError> {
        let frame = self.encode_once(|buf| {
            write_idle_message(buf, time, duration);
            Ok(())
        })?;
        self.broadcast(frame).await
    }

    pub async fn send_addition_message(
        &self,
        time: f64,
        entities: &[MobileEntitySpawningInfo],
    ) -> Result<usize, SessionError> {
        let frame = self.encode_once(|buf| write_addition_message(buf, time, entities))?;
        self.broadcast(frame).await
    }

    pub async fn send_deletion_message(
        &self,
        time: f64,
        entity_ids: &[Uuid],
    ) -> Result<usize, SessionError> {
        let frame = self.encode_once(|buf| write_deletion_message(buf, time, entity_ids))?;
        self.broadcast(frame).await
    }

    pub async fn send_probe_message(
        &self,
        time: f64,
        probes: &[ProbeInfo],
    ) -> Result<usize, SessionError> {
        let frame = self.encode_once(|buf| write_probe_message(buf, time, probes))?;
        self.broadcast(frame).await
    }

    /// Send `KILLED` to every viewer, each preceded by `END` where a
    /// `START` is still unmatched.
    pub async fn send_killed_message(&self) -> Result<usize, SessionError> {
        let mut sent = 0;
        for session in self.viewers() {
            session.send_killed_message().await?;
            sent += 1;
        }
        Ok(sent)
    }
}
