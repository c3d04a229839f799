//! Frame encoders.

use std::collections::BTreeMap;

use bytes::{BufMut, BytesMut};
use uuid::Uuid;

use super::{
    CodecError, MAX_COLLECTION_LEN, MAX_STRING_LEN, PROBE_VALUE_BOOL, PROBE_VALUE_INTEGER,
    PROBE_VALUE_REAL, PROBE_VALUE_TEXT,
};
use crate::message::MessageType;
use crate::types::{
    GroundInfo, MobileEntityMoveInfo, MobileEntitySpawningInfo, PlaceInfo, Point3, ProbeDescription,
    ProbeIdentifier, ProbeInfo, ProbeValue, Quaternion, SimulationConfiguration, SimulationInfo,
    Vector3,
};

type Encoded = Result<(), CodecError>;

/// Appends the encoded form of a value to a buffer.
///
/// Fails with the same limit errors the decoder raises, so nothing is
/// written that a [`FrameReader`](super::FrameReader) would reject.
trait Encode {
    fn encode(&self, buf: &mut BytesMut) -> Encoded;
}

fn put_count(buf: &mut BytesMut, len: usize) -> Encoded {
    if len > MAX_COLLECTION_LEN {
        return Err(CodecError::CollectionTooLong(len));
    }
    buf.put_u32(len as u32);
    Ok(())
}

fn put_string(buf: &mut BytesMut, s: &str) -> Encoded {
    if s.len() > MAX_STRING_LEN {
        return Err(CodecError::StringTooLong(s.len()));
    }
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn put_option<T: Encode + ?Sized>(buf: &mut BytesMut, value: Option<&T>) -> Encoded {
    match value {
        Some(v) => {
            buf.put_u8(1);
            v.encode(buf)
        }
        None => {
            buf.put_u8(0);
            Ok(())
        }
    }
}

fn put_seq<T: Encode>(buf: &mut BytesMut, items: &[T]) -> Encoded {
    put_count(buf, items.len())?;
    for item in items {
        item.encode(buf)?;
    }
    Ok(())
}

/// Writes the tag and then the payload. On failure the buffer is cut back
/// to its length on entry, so no partial frame is left behind.
fn write_frame(
    buf: &mut BytesMut,
    message_type: MessageType,
    payload: impl FnOnce(&mut BytesMut) -> Encoded,
) -> Encoded {
    let mark = buf.len();
    write_header(buf, message_type);
    let res = payload(buf);
    if res.is_err() {
        buf.truncate(mark);
    }
    res
}

impl Encode for str {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        put_string(buf, self)
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        put_string(buf, self)
    }
}

impl Encode for Uuid {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        buf.put_slice(self.as_bytes());
        Ok(())
    }
}

impl Encode for Point3 {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        Ok(())
    }
}

impl Encode for Vector3 {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        Ok(())
    }
}

impl Encode for Quaternion {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        buf.put_f64(self.w);
        Ok(())
    }
}

impl Encode for ProbeValue {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        match self {
            ProbeValue::Bool(b) => {
                buf.put_u8(PROBE_VALUE_BOOL);
                buf.put_u8(u8::from(*b));
            }
            ProbeValue::Integer(i) => {
                buf.put_u8(PROBE_VALUE_INTEGER);
                buf.put_i64(*i);
            }
            ProbeValue::Real(r) => {
                buf.put_u8(PROBE_VALUE_REAL);
                buf.put_f64(*r);
            }
            ProbeValue::Text(s) => {
                buf.put_u8(PROBE_VALUE_TEXT);
                put_string(buf, s)?;
            }
        }
        Ok(())
    }
}

impl Encode for BTreeMap<String, ProbeValue> {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        put_count(buf, self.len())?;
        for (key, value) in self {
            put_string(buf, key)?;
            value.encode(buf)?;
        }
        Ok(())
    }
}

impl Encode for SimulationConfiguration {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        put_option(buf, self.search_directory.as_deref())?;
        put_string(buf, &self.xml_configuration)
    }
}

impl Encode for ProbeIdentifier {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        self.place_id.encode(buf)?;
        put_string(buf, &self.probe_name)
    }
}

impl Encode for ProbeDescription {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        self.probe_id.encode(buf)?;
        put_string(buf, &self.probe_type)?;
        self.parameters.encode(buf)
    }
}

impl Encode for SimulationInfo {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        self.run_id.encode(buf)?;
        put_string(buf, &self.scenario_name)?;
        put_option(buf, self.scenario_date.as_deref())?;
        put_seq(buf, &self.scenario_authors)?;
        put_option(buf, self.scenario_version.as_deref())?;
        put_option(buf, self.scenario_description.as_deref())?;
        put_string(buf, &self.time_unit)?;
        put_string(buf, &self.space_unit)?;
        put_string(buf, &self.speed_unit)?;
        put_string(buf, &self.rotation_unit)?;
        self.view_vector.encode(buf)?;
        self.up_vector.encode(buf)?;
        self.left_vector.encode(buf)?;
        buf.put_f32(self.dimension);
        Ok(())
    }
}

impl Encode for GroundInfo {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        self.id.encode(buf)?;
        self.min.encode(buf)?;
        self.max.encode(buf)?;
        put_option(buf, self.resource.as_deref())
    }
}

impl Encode for MobileEntitySpawningInfo {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        self.id.encode(buf)?;
        self.position.encode(buf)?;
        self.pivot.encode(buf)?;
        self.orientation.encode(buf)
    }
}

impl Encode for PlaceInfo {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        self.id.encode(buf)?;
        put_option(buf, self.name.as_deref())?;
        put_option(buf, self.ground.as_ref())?;
        put_seq(buf, &self.entities)
    }
}

impl Encode for MobileEntityMoveInfo {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        self.id.encode(buf)?;
        self.position.encode(buf)?;
        self.orientation.encode(buf)?;
        buf.put_f64(self.linear_speed);
        buf.put_f64(self.angular_speed);
        Ok(())
    }
}

impl Encode for ProbeInfo {
    fn encode(&self, buf: &mut BytesMut) -> Encoded {
        self.place_id.encode(buf)?;
        put_string(buf, &self.probe_name)?;
        self.values.encode(buf)
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------
//
// Frames with variable-length fields return `Err` when a string or
// collection exceeds the decode limits; the buffer is then left as it was.

/// Writes a bare frame tag. Complete frame for every payload-less message
/// (presentation, `BYE`, `PLAY`, `STEP`, `PAUSE`, `STOP`, `KILL_SIMULATOR`).
pub fn write_header(buf: &mut BytesMut, message_type: MessageType) {
    buf.put_u8(message_type.code());
}

pub fn write_init_message(
    buf: &mut BytesMut,
    config: &SimulationConfiguration,
) -> Result<(), CodecError> {
    write_frame(buf, MessageType::Init, |buf| config.encode(buf))
}

pub fn write_add_probe_message(
    buf: &mut BytesMut,
    probe: &ProbeDescription,
) -> Result<(), CodecError> {
    write_frame(buf, MessageType::AddProbe, |buf| probe.encode(buf))
}

pub fn write_remove_probe_message(
    buf: &mut BytesMut,
    probe_id: &ProbeIdentifier,
) -> Result<(), CodecError> {
    write_frame(buf, MessageType::RemoveProbe, |buf| probe_id.encode(buf))
}

/// `delay_ms` is the pause the simulator inserts between two steps.
pub fn write_set_simulation_delay_message(buf: &mut BytesMut, delay_ms: i64) {
    write_header(buf, MessageType::SetSimulationDelay);
    buf.put_i64(delay_ms);
}

pub fn write_start_message(
    buf: &mut BytesMut,
    info: &SimulationInfo,
    places: &[PlaceInfo],
) -> Result<(), CodecError> {
    write_frame(buf, MessageType::Start, |buf| {
        info.encode(buf)?;
        put_seq(buf, places)
    })
}

pub fn write_end_message(buf: &mut BytesMut) {
    write_header(buf, MessageType::End);
}

pub fn write_move_action_message(
    buf: &mut BytesMut,
    time: f64,
    duration: f64,
    moves: &[MobileEntityMoveInfo],
) -> Result<(), CodecError> {
    write_frame(buf, MessageType::Action, |buf| {
        buf.put_f64(time);
        buf.put_f64(duration);
        put_seq(buf, moves)
    })
}

pub fn write_idle_message(buf: &mut BytesMut, time: f64, duration: f64) {
    write_header(buf, MessageType::Idle);
    buf.put_f64(time);
    buf.put_f64(duration);
}

pub fn write_addition_message(
    buf: &mut BytesMut,
    time: f64,
    entities: &[MobileEntitySpawningInfo],
) -> Result<(), CodecError> {
    write_frame(buf, MessageType::Addition, |buf| {
        buf.put_f64(time);
        put_seq(buf, entities)
    })
}

pub fn write_deletion_message(
    buf: &mut BytesMut,
    time: f64,
    entity_ids: &[Uuid],
) -> Result<(), CodecError> {
    write_frame(buf, MessageType::Deletion, |buf| {
        buf.put_f64(time);
        put_seq(buf, entity_ids)
    })
}

pub fn write_probe_message(
    buf: &mut BytesMut,
    time: f64,
    probes: &[ProbeInfo],
) -> Result<(), CodecError> {
    write_frame(buf, MessageType::Probe, |buf| {
        buf.put_f64(time);
        put_seq(buf, probes)
    })
}

pub fn write_killed_message(buf: &mut BytesMut) {
    write_header(buf, MessageType::Killed);
}
