//! Frames the server pushes to a single viewer session.
//!
//! Every send checks the role first: a session without a role, or with
//! the `CONTROLLER` role, gets [`SessionError::InvalidRole`] and nothing is
//! written. A payload the decoder would reject fails with
//! [`SessionError::Codec`], also before anything is written. Frames are
//! written whole while holding the output lock, so concurrent senders never
//! interleave bytes.

use std::sync::atomic::Ordering;

use bytes::BytesMut;
use simlink_protocol::codec::{
    write_addition_message, write_deletion_message, write_end_message, write_idle_message,
    write_killed_message, write_move_action_message, write_probe_message, write_start_message,
};
use simlink_protocol::{
    MobileEntityMoveInfo, MobileEntitySpawningInfo, PlaceInfo, ProbeInfo, SimulationInfo,
};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{ClientSession, Outbound};
use crate::error::SessionError;

impl ClientSession {
    fn ensure_viewer(&self) -> Result<(), SessionError> {
        match self.role() {
            Some(role) if role.is_viewer() => Ok(()),
            role => Err(SessionError::InvalidRole {
                session: self.id.to_string(),
                role,
            }),
        }
    }

    async fn write_locked(&self, out: &mut Outbound, frame: &[u8]) -> Result<(), SessionError> {
        let writer = out
            .writer()
            .ok_or_else(|| SessionError::NoOutputStream(self.id.to_string()))?;
        writer.write_all(frame).await?;
        Ok(())
    }

    async fn write_frame(&self, frame: &[u8]) -> Result<(), SessionError> {
        let mut out = self.outbound.lock().await;
        self.write_locked(&mut out, frame).await
    }

    /// Write an already-encoded frame. Used by the server broadcast.
    pub(crate) async fn send_bytes(&self, frame: &[u8]) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        self.write_frame(frame).await
    }

    /// Write an already-encoded `START` frame and mark `END` as pending.
    pub(crate) async fn send_start_bytes(&self, frame: &[u8]) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        let mut out = self.outbound.lock().await;
        self.write_locked(&mut out, frame).await?;
        self.pending_end.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn send_start_message(
        &self,
        info: &SimulationInfo,
        places: &[PlaceInfo],
    ) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        let mut buf = BytesMut::new();
        write_start_message(&mut buf, info, places)?;
        self.send_start_bytes(&buf).await
    }

    pub async fn send_end_message(&self) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        let mut buf = BytesMut::with_capacity(1);
        write_end_message(&mut buf);
        let mut out = self.outbound.lock().await;
        self.write_locked(&mut out, &buf).await?;
        self.pending_end.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub async fn send_action_message(
        &self,
        time: f64,
        duration: f64,
        moves: &[MobileEntityMoveInfo],
    ) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        let mut buf = BytesMut::new();
        write_move_action_message(&mut buf, time, duration, moves)?;
        self.write_frame(&buf).await
    }

    pub async fn send_idle_message(&self, time: f64, duration: f64) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        let mut buf = BytesMut::with_capacity(17);
        write_idle_message(&mut buf, time, duration);
        self.write_frame(&buf).await
    }

    pub async fn send_addition_message(
        &self,
        time: f64,
        entities: &[MobileEntitySpawningInfo],
    ) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        let mut buf = BytesMut::new();
        write_addition_message(&mut buf, time, entities)?;
        self.write_frame(&buf).await
    }

    pub async fn send_deletion_message(
        &self,
        time: f64,
        entity_ids: &[Uuid],
    ) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        let mut buf = BytesMut::new();
        write_deletion_message(&mut buf, time, entity_ids)?;
        self.write_frame(&buf).await
    }

    pub async fn send_probe_message(
        &self,
        time: f64,
        probes: &[ProbeInfo],
    ) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        let mut buf = BytesMut::new();
        write_probe_message(&mut buf, time, probes)?;
        self.write_frame(&buf).await
    }

    /// Write `KILLED`, preceded by `END` if a `START` is still unmatched.
    /// The pending flag is only cleared once the write has succeeded.
    pub async fn send_killed_message(&self) -> Result<(), SessionError> {
        self.ensure_viewer()?;
        let mut buf = BytesMut::with_capacity(2);
        let mut out = self.outbound.lock().await;
        let pending = self.pending_end.load(Ordering::SeqCst);
        if pending {
            write_end_message(&mut buf);
        }
        write_killed_message(&mut buf);
        self.write_locked(&mut out, &buf).await?;
        if pending {
            self.pending_end.store(false, Ordering::SeqCst);
        }
        Ok(())
    }
}
