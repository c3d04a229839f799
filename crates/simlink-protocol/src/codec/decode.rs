//! Frame decoding from an async byte stream.

use std::collections::BTreeMap;

use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

use super::{
    CodecError, MAX_COLLECTION_LEN, MAX_STRING_LEN, PROBE_VALUE_BOOL, PROBE_VALUE_INTEGER,
    PROBE_VALUE_REAL, PROBE_VALUE_TEXT,
};
use crate::message::MessageType;
use crate::types::{
    ActionMessage, AdditionMessage, DeletionMessage, GroundInfo, IdleMessage, MobileEntityMoveInfo,
    MobileEntitySpawningInfo, PlaceInfo, Point3, ProbeDescription, ProbeIdentifier, ProbeInfo,
    ProbeMessage, ProbeValue, Quaternion, SimulationConfiguration, SimulationInfo, StartMessage,
    Vector3,
};

/// Upper bound on capacity reserved up front for a decoded collection.
const PREALLOC_LIMIT: usize = 1024;

/// Reads frames one field at a time from a stream.
///
/// Callers first read the tag with [`read_message_header`](Self::read_message_header)
/// and then the payload reader matching that tag. Every read blocks until
/// the bytes are available; no timeout is applied.
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub async fn read_message_header(&mut self) -> Result<MessageType, CodecError> {
        let code = self.inner.read_u8().await?;
        MessageType::from_code(code).ok_or(CodecError::UnknownMessageType(code))
    }

    // -----------------------------------------------------------------------
    // Controller -> server payloads
    // -----------------------------------------------------------------------

    pub async fn read_init_message(&mut self) -> Result<SimulationConfiguration, CodecError> {
        let search_directory = self.read_optional_string().await?;
        let xml_configuration = self.read_string().await?;
        Ok(SimulationConfiguration {
            search_directory,
            xml_configuration,
        })
    }

    pub async fn read_add_probe_message(&mut self) -> Result<ProbeDescription, CodecError> {
        let probe_id = self.read_probe_identifier().await?;
        let probe_type = self.read_string().await?;
        let parameters = self.read_probe_values().await?;
        Ok(ProbeDescription {
            probe_id,
            probe_type,
            parameters,
        })
    }

    pub async fn read_remove_probe_message(&mut self) -> Result<ProbeIdentifier, CodecError> {
        self.read_probe_identifier().await
    }

    /// Returns the requested delay in milliseconds.
    pub async fn read_set_simulation_delay_message(&mut self) -> Result<i64, CodecError> {
        Ok(self.inner.read_i64().await?)
    }

    // -----------------------------------------------------------------------
    // Server -> viewer payloads
    // -----------------------------------------------------------------------

    pub async fn read_start_message(&mut self) -> Result<StartMessage, CodecError> {
        let info = self.read_simulation_info().await?;
        let count = self.read_len().await?;
        let mut places = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            places.push(self.read_place_info().await?);
        }
        Ok(StartMessage { info, places })
    }

    pub async fn read_action_message(&mut self) -> Result<ActionMessage, CodecError> {
        let time = self.inner.read_f64().await?;
        let duration = self.inner.read_f64().await?;
        let count = self.read_len().await?;
        let mut moves = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            moves.push(self.read_move_info().await?);
        }
        Ok(ActionMessage {
            time,
            duration,
            moves,
        })
    }

    pub async fn read_idle_message(&mut self) -> Result<IdleMessage, CodecError> {
        let time = self.inner.read_f64().await?;
        let duration = self.inner.read_f64().await?;
        Ok(IdleMessage { time, duration })
    }

    pub async fn read_addition_message(&mut self) -> Result<AdditionMessage, CodecError> {
        let time = self.inner.read_f64().await?;
        let count = self.read_len().await?;
        let mut entities = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            entities.push(self.read_spawning_info().await?);
        }
        Ok(AdditionMessage { time, entities })
    }

    pub async fn read_deletion_message(&mut self) -> Result<DeletionMessage, CodecError> {
        let time = self.inner.read_f64().await?;
        let count = self.read_len().await?;
        let mut entity_ids = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            entity_ids.push(self.read_uuid().await?);
        }
        Ok(DeletionMessage { time, entity_ids })
    }

    pub async fn read_probe_message(&mut self) -> Result<ProbeMessage, CodecError> {
        let time = self.inner.read_f64().await?;
        let count = self.read_len().await?;
        let mut probes = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            let place_id = self.read_uuid().await?;
            let probe_name = self.read_string().await?;
            let values = self.read_probe_values().await?;
            probes.push(ProbeInfo {
                place_id,
                probe_name,
                values,
            });
        }
        Ok(ProbeMessage { time, probes })
    }

    // -----------------------------------------------------------------------
    // Field readers
    // -----------------------------------------------------------------------

    async fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = self.inner.read_u32().await? as usize;
        if len > MAX_COLLECTION_LEN {
            return Err(CodecError::CollectionTooLong(len));
        }
        Ok(len)
    }

    async fn read_flag(&mut self) -> Result<bool, CodecError> {
        match self.inner.read_u8().await? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidOptionFlag(other)),
        }
    }

    async fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.inner.read_u32().await? as usize;
        if len > MAX_STRING_LEN {
            return Err(CodecError::StringTooLong(len));
        }
        let mut bytes = vec![0u8; len];
        self.inner.read_exact(&mut bytes).await?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    async fn read_optional_string(&mut self) -> Result<Option<String>, CodecError> {
        if self.read_flag().await? {
            Ok(Some(self.read_string().await?))
        } else {
            Ok(None)
        }
    }

    async fn read_uuid(&mut self) -> Result<Uuid, CodecError> {
        let mut bytes = [0u8; 16];
        self.inner.read_exact(&mut bytes).await?;
        Ok(Uuid::from_bytes(bytes))
    }

    async fn read_triple(&mut self) -> Result<(f64, f64, f64), CodecError> {
        let x = self.inner.read_f64().await?;
        let y = self.inner.read_f64().await?;
        let z = self.inner.read_f64().await?;
        Ok((x, y, z))
    }

    async fn read_point(&mut self) -> Result<Point3, CodecError> {
        let (x, y, z) = self.read_triple().await?;
        Ok(Point3 { x, y, z })
    }

    async fn read_vector(&mut self) -> Result<Vector3, CodecError> {
        let (x, y, z) = self.read_triple().await?;
        Ok(Vector3 { x, y, z })
    }

    async fn read_quaternion(&mut self) -> Result<Quaternion, CodecError> {
        let (x, y, z) = self.read_triple().await?;
        let w = self.inner.read_f64().await?;
        Ok(Quaternion { x, y, z, w })
    }

    async fn read_probe_value(&mut self) -> Result<ProbeValue, CodecError> {
        match self.inner.read_u8().await? {
            PROBE_VALUE_BOOL => Ok(ProbeValue::Bool(self.inner.read_u8().await? != 0)),
            PROBE_VALUE_INTEGER => Ok(ProbeValue::Integer(self.inner.read_i64().await?)),
            PROBE_VALUE_REAL => Ok(ProbeValue::Real(self.inner.read_f64().await?)),
            PROBE_VALUE_TEXT => Ok(ProbeValue::Text(self.read_string().await?)),
            other => Err(CodecError::InvalidProbeValueTag(other)),
        }
    }

    async fn read_probe_values(&mut self) -> Result<BTreeMap<String, ProbeValue>, CodecError> {
        let count = self.read_len().await?;
        let mut values = BTreeMap::new();
        for _ in 0..count {
            let key = self.read_string().await?;
            let value = self.read_probe_value().await?;
            values.insert(key, value);
        }
        Ok(values)
    }

    async fn read_probe_identifier(&mut self) -> Result<ProbeIdentifier, CodecError> {
        let place_id = self.read_uuid().await?;
        let probe_name = self.read_string().await?;
        Ok(ProbeIdentifier {
            place_id,
            probe_name,
        })
    }

    async fn read_simulation_info(&mut self) -> Result<SimulationInfo, CodecError> {
        let run_id = self.read_uuid().await?;
        let scenario_name = self.read_string().await?;
        let scenario_date = self.read_optional_string().await?;
        let author_count = self.read_len().await?;
        let mut scenario_authors = Vec::with_capacity(author_count.min(PREALLOC_LIMIT));
        for _ in 0..author_count {
            scenario_authors.push(self.read_string().await?);
        }
        let scenario_version = self.read_optional_string().await?;
        let scenario_description = self.read_optional_string().await?;
        let time_unit = self.read_string().await?;
        let space_unit = self.read_string().await?;
        let speed_unit = self.read_string().await?;
        let rotation_unit = self.read_string().await?;
        let view_vector = self.read_vector().await?;
        let up_vector = self.read_vector().await?;
        let left_vector = self.read_vector().await?;
        let dimension = self.inner.read_f32().await?;
        Ok(SimulationInfo {
            run_id,
            scenario_name,
            scenario_date,
            scenario_authors,
            scenario_version,
            scenario_description,
            time_unit,
            space_unit,
            speed_unit,
            rotation_unit,
            view_vector,
            up_vector,
            left_vector,
            dimension,
        })
    }

    async fn read_ground_info(&mut self) -> Result<GroundInfo, CodecError> {
        let id = self.read_uuid().await?;
        let min = self.read_point().await?;
        let max = self.read_point().await?;
        let resource = self.read_optional_string().await?;
        Ok(GroundInfo {
            id,
            min,
            max,
            resource,
        })
    }

    async fn read_spawning_info(&mut self) -> Result<MobileEntitySpawningInfo, CodecError> {
        let id = self.read_uuid().await?;
        let position = self.read_point().await?;
        let pivot = self.read_vector().await?;
        let orientation = self.read_quaternion().await?;
        Ok(MobileEntitySpawningInfo {
            id,
            position,
            pivot,
            orientation,
        })
    }

    async fn read_place_info(&mut self) -> Result<PlaceInfo, CodecError> {
        let id = self.read_uuid().await?;
        let name = self.read_optional_string().await?;
        let ground = if self.read_flag().await? {
            Some(self.read_ground_info().await?)
        } else {
            None
        };
        let count = self.read_len().await?;
        let mut entities = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            entities.push(self.read_spawning_info().await?);
        }
        Ok(PlaceInfo {
            id,
            name,
            ground,
            entities,
        })
    }

    async fn read_move_info(&mut self) -> Result<MobileEntityMoveInfo, CodecError> {
        let id = self.read_uuid().await?;
        let position = self.read_point().await?;
        let orientation = self.read_quaternion().await?;
        let linear_speed = self.inner.read_f64().await?;
        let angular_speed = self.inner.read_f64().await?;
        Ok(MobileEntityMoveInfo {
            id,
            position,
            orientation,
            linear_speed,
            angular_speed,
        })
    }
}
