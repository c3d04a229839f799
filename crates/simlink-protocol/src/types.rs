//! Payload records carried by protocol frames.
//!
//! These are plain values owned by the simulation model; the server only
//! passes them through the codec.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller -> server payloads
// ---------------------------------------------------------------------------

/// Scenario to load, sent with `INIT`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationConfiguration {
    /// Directory against which relative resources of the scenario resolve.
    pub search_directory: Option<String>,
    pub xml_configuration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProbeIdentifier {
    pub place_id: Uuid,
    pub probe_name: String,
}

/// A value collected by, or configuring, an environmental probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProbeValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeDescription {
    pub probe_id: ProbeIdentifier,
    pub probe_type: String,
    pub parameters: BTreeMap<String, ProbeValue>,
}

// ---------------------------------------------------------------------------
// Server -> viewer payloads
// ---------------------------------------------------------------------------

/// Scenario metadata and view conventions, sent with `START`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInfo {
    pub run_id: Uuid,
    pub scenario_name: String,
    pub scenario_date: Option<String>,
    pub scenario_authors: Vec<String>,
    pub scenario_version: Option<String>,
    pub scenario_description: Option<String>,
    pub time_unit: String,
    pub space_unit: String,
    pub speed_unit: String,
    pub rotation_unit: String,
    pub view_vector: Vector3,
    pub up_vector: Vector3,
    pub left_vector: Vector3,
    /// Dimension of the simulated world (1.5 or 3).
    pub dimension: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundInfo {
    pub id: Uuid,
    pub min: Point3,
    pub max: Point3,
    /// Heightmap image or other resource backing the ground, if any.
    pub resource: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileEntitySpawningInfo {
    pub id: Uuid,
    pub position: Point3,
    pub pivot: Vector3,
    pub orientation: Quaternion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceInfo {
    pub id: Uuid,
    pub name: Option<String>,
    pub ground: Option<GroundInfo>,
    pub entities: Vec<MobileEntitySpawningInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileEntityMoveInfo {
    pub id: Uuid,
    pub position: Point3,
    pub orientation: Quaternion,
    pub linear_speed: f64,
    pub angular_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub place_id: Uuid,
    pub probe_name: String,
    pub values: BTreeMap<String, ProbeValue>,
}

// ---------------------------------------------------------------------------
// Decoded viewer-bound frame bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StartMessage {
    pub info: SimulationInfo,
    pub places: Vec<PlaceInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionMessage {
    pub time: f64,
    pub duration: f64,
    pub moves: Vec<MobileEntityMoveInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleMessage {
    pub time: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdditionMessage {
    pub time: f64,
    pub entities: Vec<MobileEntitySpawningInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletionMessage {
    pub time: f64,
    pub entity_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeMessage {
    pub time: f64,
    pub probes: Vec<ProbeInfo>,
}
