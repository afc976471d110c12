// src/shared_data.rs
//
// Wire types exchanged with the motion simulator and signal actuators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::control_system::mode_arbiter::ControlMode;
use crate::emergency::greenwave::{Deferral, Retirement};
use crate::flow_analyzer::reward::RewardBreakdown;
use crate::road_network::intersection::{JunctionId, PhaseId};
use crate::road_network::lane::EdgeId;
use crate::vehicles::lifecycle::LifecycleEvent;
use crate::vehicles::vehicle::{VehicleClass, VehicleId};

/// Simulation step counter supplied by the motion simulator.
pub type Tick = u64;

/// One vehicle as seen by the motion simulator this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    #[serde(default)]
    pub class: VehicleClass,
    pub edge: EdgeId,
    pub position: (f64, f64),
    #[serde(default)]
    pub speed: f64,
    /// Accumulated time spent halted, in seconds.
    #[serde(default)]
    pub waiting_time: f64,
    /// Planned route as an ordered edge list, when known.
    #[serde(default)]
    pub route: Option<Vec<EdgeId>>,
}

impl VehicleSnapshot {
    pub fn new(id: impl Into<String>, class: VehicleClass, edge: impl Into<EdgeId>, position: (f64, f64)) -> Self {
        Self {
            id: VehicleId::new(id),
            class,
            edge: edge.into(),
            position,
            speed: 0.0,
            waiting_time: 0.0,
            route: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_waiting_time(mut self, waiting_time: f64) -> Self {
        self.waiting_time = waiting_time;
        self
    }

    pub fn with_route<I, E>(mut self, route: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EdgeId>,
    {
        self.route = Some(route.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_emergency(&self) -> bool {
        self.class == VehicleClass::Emergency
    }
}

/// Immutable per-tick input from the motion simulator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick: Tick,
    pub vehicles: Vec<VehicleSnapshot>,
}

impl TickSnapshot {
    pub fn new(tick: Tick, vehicles: Vec<VehicleSnapshot>) -> Self {
        Self { tick, vehicles }
    }

    /// Vehicles keyed by id. Later duplicates of an id win.
    pub fn by_id(&self) -> BTreeMap<&VehicleId, &VehicleSnapshot> {
        self.vehicles.iter().map(|v| (&v.id, v)).collect()
    }
}

/// Signal state for one junction, sent to the actuators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOutput {
    pub junction: JunctionId,
    /// Phase currently granted, or the phase being cleared towards.
    pub phase: PhaseId,
    /// One character per approach: `G` green, `y` clearing, `r` stopped.
    pub state: String,
    pub mode: ControlMode,
    pub in_clearance: bool,
}

/// Everything the coordinator produced for one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: Tick,
    pub signals: Vec<SignalOutput>,
    /// Required phase per junction after conflict resolution.
    pub overrides: BTreeMap<JunctionId, PhaseId>,
    pub deferred: Vec<Deferral>,
    pub lifecycle: Vec<LifecycleEvent>,
    pub retired: Vec<Retirement>,
    /// Policy requests that were rejected as invalid.
    pub rejected_requests: Vec<(JunctionId, PhaseId)>,
    pub reward: RewardBreakdown,
}

impl TickReport {
    pub fn signal(&self, junction: &JunctionId) -> Option<&SignalOutput> {
        self.signals.iter().find(|s| &s.junction == junction)
    }
}

/// Generates a wall-clock timestamp (seconds since UNIX epoch) for ledgers.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
