use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::shared_data::TickSnapshot;
use crate::vehicles::vehicle::{VehicleClass, VehicleId, VehicleRecord};

/// Emitted once per vehicle per transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Appeared { vehicle: VehicleId, class: VehicleClass },
    Completed { vehicle: VehicleId, class: VehicleClass },
}

/// Arena of every vehicle ever observed. Records stay in the arena forever;
/// completion is a flag, so lookups for vanished vehicles stay valid.
#[derive(Debug, Default)]
pub struct VehicleLifecycleTracker {
    records: BTreeMap<VehicleId, VehicleRecord>,
    active: BTreeSet<VehicleId>,
}

impl VehicleLifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconciles the arena with the vehicles visible this tick.
    ///
    /// New ids become active records; active ids missing from the snapshot are
    /// marked completed. Ids that were already completed stay completed even
    /// if they show up again.
    pub fn update(&mut self, snapshot: &TickSnapshot) -> Vec<LifecycleEvent> {
        let tick = snapshot.tick;
        let mut events = Vec::new();
        let mut present = BTreeSet::new();

        for vehicle in &snapshot.vehicles {
            present.insert(vehicle.id.clone());
            match self.records.get_mut(&vehicle.id) {
                Some(record) if record.is_completed() => {
                    warn!(
                        "Vehicle {} reappeared at tick {} after completing its route; ignoring",
                        vehicle.id, tick
                    );
                }
                Some(record) => record.observe(vehicle, tick),
                None => {
                    debug!("Vehicle {} ({}) first seen at tick {}", vehicle.id, vehicle.class, tick);
                    self.records
                        .insert(vehicle.id.clone(), VehicleRecord::from_snapshot(vehicle, tick));
                    self.active.insert(vehicle.id.clone());
                    events.push(LifecycleEvent::Appeared {
                        vehicle: vehicle.id.clone(),
                        class: vehicle.class,
                    });
                }
            }
        }

        let gone: Vec<VehicleId> = self.active.difference(&present).cloned().collect();
        for id in gone {
            self.active.remove(&id);
            if let Some(record) = self.records.get_mut(&id) {
                record.mark_completed();
                if record.is_emergency() {
                    info!("Emergency vehicle {} completed at tick {}", id, tick);
                }
                events.push(LifecycleEvent::Completed {
                    vehicle: id,
                    class: record.class,
                });
            }
        }

        events
    }

    pub fn is_known(&self, id: &VehicleId) -> bool {
        self.records.contains_key(id)
    }

    pub fn is_active(&self, id: &VehicleId) -> bool {
        self.active.contains(id)
    }

    pub fn is_completed(&self, id: &VehicleId) -> bool {
        self.records.get(id).is_some_and(VehicleRecord::is_completed)
    }

    pub fn record(&self, id: &VehicleId) -> Option<&VehicleRecord> {
        self.records.get(id)
    }
}
