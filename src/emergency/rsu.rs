use serde::Serialize;
use std::collections::BTreeMap;

use crate::road_network::grid::RoadNetwork;
use crate::road_network::intersection::{Junction, JunctionId};
use crate::shared_data::{TickSnapshot, VehicleSnapshot};
use crate::vehicles::vehicle::VehicleId;

/// An emergency vehicle seen by a junction's roadside unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub vehicle: VehicleId,
    pub junction: JunctionId,
    pub distance: f64,
}

/// Roadside-unit sensor model: a disc of fixed radius around each junction.
#[derive(Debug, Clone, Copy)]
pub struct RsuDetector {
    pub radius: f64,
}

impl RsuDetector {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Emergency vehicles within the radius of `junction`, nearest first
    /// (ties by id). Pure over the snapshot.
    pub fn scan(&self, junction: &Junction, vehicles: &[VehicleSnapshot]) -> Vec<Detection> {
        let mut detections: Vec<Detection> = vehicles
            .iter()
            .filter(|v| v.is_emergency())
            .filter_map(|v| {
                let distance = junction.distance_to(v.position);
                (distance <= self.radius).then(|| Detection {
                    vehicle: v.id.clone(),
                    junction: junction.id.clone(),
                    distance,
                })
            })
            .collect();
        detections.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.vehicle.cmp(&b.vehicle))
        });
        detections.dedup_by(|a, b| a.vehicle == b.vehicle);
        detections
    }

    /// Scans every junction. Junctions with no detections are omitted.
    pub fn scan_all(
        &self,
        network: &RoadNetwork,
        snapshot: &TickSnapshot,
    ) -> BTreeMap<JunctionId, Vec<Detection>> {
        network
            .junctions()
            .map(|junction| (junction.id.clone(), self.scan(junction, &snapshot.vehicles)))
            .filter(|(_, detections)| !detections.is_empty())
            .collect()
    }
}
