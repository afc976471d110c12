use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::emergency::rsu::Detection;
use crate::road_network::grid::RoadNetwork;
use crate::road_network::intersection::{JunctionId, PhaseId};
use crate::road_network::lane::EdgeId;
use crate::shared_data::{Tick, TickSnapshot, VehicleSnapshot};
use crate::vehicles::lifecycle::VehicleLifecycleTracker;
use crate::vehicles::vehicle::VehicleId;

/// One junction the emergency vehicle will cross, and the phase that lets it through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub junction: JunctionId,
    pub phase: PhaseId,
    /// Edge the vehicle enters the junction on.
    pub approach: EdgeId,
    /// Position of `approach` in the plan's route.
    pub route_index: usize,
}

/// Ordered override sequence for one emergency vehicle.
/// Entries only ever leave the front of the list.
#[derive(Debug, Clone, Serialize)]
pub struct GreenwavePlan {
    pub vehicle: VehicleId,
    pub created: Tick,
    entries: Vec<PlanEntry>,
    route: Vec<EdgeId>,
}

impl GreenwavePlan {
    /// Walks `route` forward from the vehicle's current edge and collects up
    /// to `lookahead` junctions. The walk stops at the first junction where no
    /// phase serves the entry approach, or at the first edge the network does
    /// not know. Returns `None` when nothing could be planned.
    pub fn compute(
        vehicle: &VehicleSnapshot,
        route: &[EdgeId],
        network: &RoadNetwork,
        lookahead: usize,
        tick: Tick,
    ) -> Option<Self> {
        let start = route.iter().position(|edge| edge == &vehicle.edge)?;

        let mut entries = Vec::new();
        for (route_index, edge_id) in route.iter().enumerate().skip(start) {
            if entries.len() >= lookahead {
                break;
            }
            let Some(edge) = network.edge(edge_id) else {
                break;
            };
            let Some(junction) = edge.to.as_ref().and_then(|j| network.junction(j)) else {
                continue;
            };
            let Some(phase) = junction.phase_serving(edge_id) else {
                debug!(
                    "No phase at {} serves approach {}; truncating plan for {}",
                    junction.id, edge_id, vehicle.id
                );
                break;
            };
            entries.push(PlanEntry {
                junction: junction.id.clone(),
                phase,
                approach: edge_id.clone(),
                route_index,
            });
        }

        (!entries.is_empty()).then(|| Self {
            vehicle: vehicle.id.clone(),
            created: tick,
            entries,
            route: route.to_vec(),
        })
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn references(&self, junction: &JunctionId) -> bool {
        self.entries.iter().any(|e| &e.junction == junction)
    }

    /// Whether the vehicle is still on the route this plan was built from.
    /// `route` is the vehicle's currently known route, if any.
    pub fn follows(&self, vehicle: &VehicleSnapshot, route: Option<&[EdgeId]>) -> bool {
        route.map_or(true, |r| r == self.route.as_slice()) && self.route.contains(&vehicle.edge)
    }

    /// Drops leading entries for junctions the vehicle has already crossed.
    /// Returns the number of entries dropped.
    pub fn drop_passed(&mut self, vehicle: &VehicleSnapshot, network: &RoadNetwork) -> usize {
        let current_index = self.route.iter().position(|edge| edge == &vehicle.edge);
        let current_edge = network.edge(&vehicle.edge);

        let passed = self
            .entries
            .iter()
            .take_while(|entry| {
                current_index.is_some_and(|ci| ci > entry.route_index)
                    || current_edge.is_some_and(|edge| edge.leaves(&entry.junction))
            })
            .count();
        self.entries.drain(..passed);
        passed
    }
}

/// Coordination state for an emergency vehicle that RSUs have seen.
#[derive(Debug, Clone, Serialize)]
pub struct EmergencyVehicleState {
    pub vehicle: VehicleId,
    pub first_detected: Tick,
    pub last_detected: Tick,
    /// Junction whose RSU most recently saw the vehicle (nearest one on ties).
    pub last_rsu: JunctionId,
    pub plan: Option<GreenwavePlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetireReason {
    /// The vehicle finished its route.
    Completed,
    /// Every planned junction has been crossed.
    Exhausted,
    /// No RSU has seen the vehicle within the re-detection timeout.
    Timeout,
    /// The vehicle left the planned route; a replacement plan may follow.
    Rerouted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Retirement {
    pub vehicle: VehicleId,
    pub reason: RetireReason,
}

/// A plan entry that lost a same-tick conflict and is retried next tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deferral {
    pub vehicle: VehicleId,
    pub junction: JunctionId,
    pub phase: PhaseId,
    pub winner: VehicleId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideClaim {
    pub phase: PhaseId,
    pub vehicle: VehicleId,
}

/// Conflict-free override instructions for one tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverrideSet {
    pub required: BTreeMap<JunctionId, OverrideClaim>,
    pub deferred: Vec<Deferral>,
}

impl OverrideSet {
    pub fn phase_for(&self, junction: &JunctionId) -> Option<PhaseId> {
        self.required.get(junction).map(|claim| claim.phase)
    }

    pub fn contains(&self, junction: &JunctionId) -> bool {
        self.required.contains_key(junction)
    }

    pub fn phases(&self) -> BTreeMap<JunctionId, PhaseId> {
        self.required
            .iter()
            .map(|(junction, claim)| (junction.clone(), claim.phase))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub overrides: OverrideSet,
    pub created: Vec<VehicleId>,
    pub retired: Vec<Retirement>,
}

/// Owns every active greenwave plan and keeps them in step with vehicle progress.
#[derive(Debug)]
pub struct GreenwavePlanner {
    lookahead: usize,
    redetection_timeout: u64,
    tracked: BTreeMap<VehicleId, EmergencyVehicleState>,
}

impl GreenwavePlanner {
    pub fn new(lookahead: usize, redetection_timeout: u64) -> Self {
        Self {
            lookahead,
            redetection_timeout,
            tracked: BTreeMap::new(),
        }
    }

    /// Runs one planning pass: plan for newly detected vehicles, shrink plans
    /// as vehicles cross junctions, retire finished plans, then resolve
    /// same-junction conflicts into a single override set.
    pub fn reconcile(
        &mut self,
        detections: &BTreeMap<JunctionId, Vec<Detection>>,
        snapshot: &TickSnapshot,
        tracker: &VehicleLifecycleTracker,
        network: &RoadNetwork,
    ) -> ReconcileOutcome {
        let tick = snapshot.tick;
        let vehicles = snapshot.by_id();
        let mut outcome = ReconcileOutcome::default();

        // Several RSUs may report the same vehicle; keep the nearest.
        let mut nearest: BTreeMap<&VehicleId, &Detection> = BTreeMap::new();
        for detection in detections.values().flatten() {
            nearest
                .entry(&detection.vehicle)
                .and_modify(|best| {
                    if detection.distance < best.distance {
                        *best = detection;
                    }
                })
                .or_insert(detection);
        }

        for (vehicle_id, detection) in nearest {
            if tracker.is_completed(vehicle_id) {
                continue;
            }
            let state = self
                .tracked
                .entry(vehicle_id.clone())
                .or_insert_with(|| EmergencyVehicleState {
                    vehicle: vehicle_id.clone(),
                    first_detected: tick,
                    last_detected: tick,
                    last_rsu: detection.junction.clone(),
                    plan: None,
                });
            state.last_detected = tick;
            state.last_rsu = detection.junction.clone();

            if state.plan.is_some() {
                continue;
            }
            let Some(vehicle) = vehicles.get(vehicle_id) else {
                continue;
            };
            let Some(route) = known_route(vehicle, tracker) else {
                debug!("No known route for emergency vehicle {} at tick {}", vehicle_id, tick);
                continue;
            };
            if let Some(plan) = GreenwavePlan::compute(vehicle, route, network, self.lookahead, tick) {
                info!(
                    "Greenwave plan for {} at tick {}: {}",
                    vehicle_id,
                    tick,
                    describe(&plan)
                );
                state.plan = Some(plan);
                outcome.created.push(vehicle_id.clone());
            } else {
                debug!("No plannable route for emergency vehicle {} at tick {}", vehicle_id, tick);
            }
        }

        let lookahead = self.lookahead;
        for state in self.tracked.values_mut() {
            let Some(vehicle) = vehicles.get(&state.vehicle) else {
                continue;
            };
            let route = known_route(vehicle, tracker);
            if state.plan.as_ref().is_some_and(|plan| !plan.follows(vehicle, route)) {
                let replacement =
                    route.and_then(|r| GreenwavePlan::compute(vehicle, r, network, lookahead, tick));
                info!(
                    "Vehicle {} left its planned route at tick {} (on {}); replanned: {}",
                    state.vehicle,
                    tick,
                    vehicle.edge,
                    replacement.as_ref().map_or_else(|| "none".to_string(), describe)
                );
                outcome.retired.push(Retirement {
                    vehicle: state.vehicle.clone(),
                    reason: RetireReason::Rerouted,
                });
                if replacement.is_some() {
                    outcome.created.push(state.vehicle.clone());
                }
                state.plan = replacement;
                continue;
            }
            let Some(plan) = state.plan.as_mut() else {
                continue;
            };
            let dropped = plan.drop_passed(vehicle, network);
            if dropped > 0 {
                debug!(
                    "Vehicle {} crossed {} planned junction(s); {} remaining",
                    state.vehicle,
                    dropped,
                    plan.entries.len()
                );
            }
        }

        let timeout = self.redetection_timeout;
        self.tracked.retain(|vehicle, state| {
            let reason = if tracker.is_completed(vehicle) {
                Some(RetireReason::Completed)
            } else if tick.saturating_sub(state.last_detected) > timeout {
                Some(RetireReason::Timeout)
            } else {
                None
            };
            match reason {
                Some(reason) => {
                    if state.plan.is_some() {
                        info!("Retiring greenwave plan for {} at tick {} ({:?})", vehicle, tick, reason);
                        outcome.retired.push(Retirement {
                            vehicle: vehicle.clone(),
                            reason,
                        });
                    }
                    false
                }
                None => {
                    if state.plan.as_ref().is_some_and(GreenwavePlan::is_empty) {
                        info!("Greenwave plan for {} exhausted at tick {}", vehicle, tick);
                        state.plan = None;
                        outcome.retired.push(Retirement {
                            vehicle: vehicle.clone(),
                            reason: RetireReason::Exhausted,
                        });
                    }
                    true
                }
            }
        });

        outcome.overrides = self.resolve_conflicts();
        outcome
    }

    /// First-detected vehicle wins each junction. Losing entries that ask for
    /// a different phase are deferred; the plan keeps them for the next tick.
    fn resolve_conflicts(&self) -> OverrideSet {
        let mut claims: BTreeMap<&JunctionId, Vec<(Tick, &VehicleId, PhaseId)>> = BTreeMap::new();
        for state in self.tracked.values() {
            let Some(plan) = &state.plan else { continue };
            for entry in plan.entries() {
                claims
                    .entry(&entry.junction)
                    .or_default()
                    .push((state.first_detected, &state.vehicle, entry.phase));
            }
        }

        let mut set = OverrideSet::default();
        for (junction, mut contenders) in claims {
            contenders.sort();
            let (_, winner, phase) = contenders[0];
            for &(_, vehicle, other) in &contenders[1..] {
                if other != phase {
                    debug!(
                        "Junction {}: {} wants phase {}, deferred behind {} (phase {})",
                        junction, vehicle, other, winner, phase
                    );
                    set.deferred.push(Deferral {
                        vehicle: vehicle.clone(),
                        junction: junction.clone(),
                        phase: other,
                        winner: winner.clone(),
                    });
                }
            }
            set.required.insert(
                junction.clone(),
                OverrideClaim {
                    phase,
                    vehicle: winner.clone(),
                },
            );
        }
        set
    }

    pub fn plan(&self, vehicle: &VehicleId) -> Option<&GreenwavePlan> {
        self.tracked.get(vehicle).and_then(|s| s.plan.as_ref())
    }

    pub fn state(&self, vehicle: &VehicleId) -> Option<&EmergencyVehicleState> {
        self.tracked.get(vehicle)
    }

    pub fn active_plans(&self) -> impl Iterator<Item = &GreenwavePlan> {
        self.tracked.values().filter_map(|s| s.plan.as_ref())
    }

    pub fn references(&self, junction: &JunctionId) -> bool {
        self.active_plans().any(|plan| plan.references(junction))
    }
}

/// Route from this tick's snapshot, else the last one the tracker recorded.
fn known_route<'a>(
    vehicle: &'a VehicleSnapshot,
    tracker: &'a VehicleLifecycleTracker,
) -> Option<&'a [EdgeId]> {
    vehicle
        .route
        .as_deref()
        .or_else(|| tracker.record(&vehicle.id).and_then(|r| r.route.as_deref()))
}

fn describe(plan: &GreenwavePlan) -> String {
    plan.entries
        .iter()
        .map(|e| format!("{}@{}", e.junction, e.phase))
        .collect::<Vec<_>>()
        .join(" -> ")
}
