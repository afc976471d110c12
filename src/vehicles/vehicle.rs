use serde::{Deserialize, Serialize};
use std::fmt;

use crate::road_network::lane::EdgeId;
use crate::shared_data::{Tick, VehicleSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vehicle class as tagged by the motion simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    #[default]
    Ordinary,
    Emergency,
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VehicleClass::Ordinary => write!(f, "ordinary"),
            VehicleClass::Emergency => write!(f, "emergency"),
        }
    }
}

/// Everything the coordinator remembers about a vehicle it has seen.
/// Records are never removed; `completed` only ever goes from false to true.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub class: VehicleClass,
    /// Last observed edge, position and speed.
    pub edge: EdgeId,
    pub position: (f64, f64),
    pub speed: f64,
    pub route: Option<Vec<EdgeId>>,
    pub first_seen: Tick,
    pub last_seen: Tick,
    completed: bool,
}

impl VehicleRecord {
    pub fn from_snapshot(snapshot: &VehicleSnapshot, tick: Tick) -> Self {
        Self {
            id: snapshot.id.clone(),
            class: snapshot.class,
            edge: snapshot.edge.clone(),
            position: snapshot.position,
            speed: snapshot.speed,
            route: snapshot.route.clone(),
            first_seen: tick,
            last_seen: tick,
            completed: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_emergency(&self) -> bool {
        self.class == VehicleClass::Emergency
    }

    pub(crate) fn observe(&mut self, snapshot: &VehicleSnapshot, tick: Tick) {
        self.edge = snapshot.edge.clone();
        self.position = snapshot.position;
        self.speed = snapshot.speed;
        if snapshot.route.is_some() {
            self.route = snapshot.route.clone();
        }
        self.last_seen = tick;
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }
}
