// traffic_analyzer.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::road_network::grid::RoadNetwork;
use crate::road_network::intersection::Junction;
use crate::road_network::lane::EdgeId;
use crate::shared_data::TickSnapshot;

/// Per-approach traffic figures for one tick.
/// Ordinary traffic only; emergency vehicles are counted separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ApproachStats {
    pub vehicles: usize,
    pub halted: usize,
    pub speed_sum: f64,
    pub total_wait: f64,
    pub emergency: usize,
}

impl ApproachStats {
    pub fn mean_speed(&self) -> f64 {
        if self.vehicles == 0 {
            0.0
        } else {
            self.speed_sum / self.vehicles as f64
        }
    }

    /// Every vehicle on the approach, emergency ones included.
    pub fn occupancy(&self) -> usize {
        self.vehicles + self.emergency
    }

    fn absorb(&mut self, other: &ApproachStats) {
        self.vehicles += other.vehicles;
        self.halted += other.halted;
        self.speed_sum += other.speed_sum;
        self.total_wait += other.total_wait;
        self.emergency += other.emergency;
    }
}

/// Approach statistics keyed by edge, for every edge that feeds a junction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrafficData {
    pub approaches: BTreeMap<EdgeId, ApproachStats>,
}

impl TrafficData {
    pub fn approach(&self, edge: &EdgeId) -> ApproachStats {
        self.approaches.get(edge).copied().unwrap_or_default()
    }

    /// Sum over a set of approaches.
    pub fn combined<'a, I>(&self, edges: I) -> ApproachStats
    where
        I: IntoIterator<Item = &'a EdgeId>,
    {
        let mut total = ApproachStats::default();
        for edge in edges {
            total.absorb(&self.approach(edge));
        }
        total
    }

    /// Sum over every approach of `junction`.
    pub fn junction_totals(&self, junction: &Junction) -> ApproachStats {
        self.combined(&junction.approaches)
    }

    pub fn network_totals(&self) -> ApproachStats {
        self.combined(self.approaches.keys())
    }
}

/// Collect real-time approach data from the tick snapshot. Vehicles on edges
/// that feed no junction are ignored.
pub fn collect_traffic_data(
    network: &RoadNetwork,
    snapshot: &TickSnapshot,
    halting_speed: f64,
) -> TrafficData {
    let mut approaches: BTreeMap<EdgeId, ApproachStats> = network
        .junctions()
        .flat_map(|junction| junction.approaches.iter())
        .map(|edge| (edge.clone(), ApproachStats::default()))
        .collect();

    for vehicle in &snapshot.vehicles {
        let Some(stats) = approaches.get_mut(&vehicle.edge) else {
            continue;
        };
        if vehicle.is_emergency() {
            stats.emergency += 1;
            continue;
        }
        stats.vehicles += 1;
        stats.speed_sum += vehicle.speed;
        stats.total_wait += vehicle.waiting_time;
        if vehicle.speed < halting_speed {
            stats.halted += 1;
        }
    }

    TrafficData { approaches }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road_network::grid::grid_junction_id;
    use crate::shared_data::VehicleSnapshot;
    use crate::vehicles::vehicle::VehicleClass;

    #[test]
    fn counts_vehicles_per_approach() {
        let network = RoadNetwork::grid(1, 2, 100.0).unwrap();
        let snapshot = TickSnapshot::new(
            3,
            vec![
                VehicleSnapshot::new("a", VehicleClass::Ordinary, "inW-J0_0", (-10.0, 0.0))
                    .with_waiting_time(4.0),
                VehicleSnapshot::new("b", VehicleClass::Ordinary, "inW-J0_0", (-20.0, 0.0))
                    .with_speed(6.0),
                VehicleSnapshot::new("c", VehicleClass::Emergency, "inW-J0_0", (-30.0, 0.0)),
                VehicleSnapshot::new("d", VehicleClass::Ordinary, "J0_1-outE", (130.0, 0.0)),
            ],
        );
        let data = collect_traffic_data(&network, &snapshot, 0.1);
        let west = data.approach(&EdgeId::new("inW-J0_0"));
        assert_eq!(west.vehicles, 2);
        assert_eq!(west.halted, 1);
        assert_eq!(west.emergency, 1);
        assert_eq!(west.occupancy(), 3);
        assert!((west.mean_speed() - 3.0).abs() < 1e-9);
        assert!((west.total_wait - 4.0).abs() < 1e-9);
        // Exit edges feed no junction and are not tracked.
        assert!(!data.approaches.contains_key(&EdgeId::new("J0_1-outE")));
        let j0 = network.junction(&grid_junction_id(0, 0)).unwrap();
        assert_eq!(data.junction_totals(j0).vehicles, 2);
        assert_eq!(data.network_totals().vehicles, 2);
    }
}
