// coordinator.rs
//
// Owns every component and runs them in a fixed order each tick:
// lifecycle -> RSU scan -> greenwave reconcile -> mode arbitration ->
// signal control -> reward.

use log::{debug, warn};
use std::collections::BTreeMap;

use crate::config::CoordinatorConfig;
use crate::control_system::mode_arbiter::{ControlMode, ModeArbiter};
use crate::control_system::policy::SignalPolicy;
use crate::control_system::traffic_light_controller::{ControlInput, TrafficLightController};
use crate::emergency::greenwave::GreenwavePlanner;
use crate::emergency::rsu::RsuDetector;
use crate::error::Result;
use crate::flow_analyzer::reward::{EmergencyStatus, RewardBreakdown, RewardShaper};
use crate::flow_analyzer::traffic_analyzer::{collect_traffic_data, TrafficData};
use crate::road_network::grid::RoadNetwork;
use crate::road_network::intersection::JunctionId;
use crate::shared_data::{Tick, TickReport, TickSnapshot, VehicleSnapshot};
use crate::vehicles::lifecycle::VehicleLifecycleTracker;

pub struct Coordinator {
    network: RoadNetwork,
    config: CoordinatorConfig,
    tracker: VehicleLifecycleTracker,
    rsu: RsuDetector,
    planner: GreenwavePlanner,
    arbiters: BTreeMap<JunctionId, ModeArbiter>,
    lights: TrafficLightController,
    shaper: RewardShaper,
    last_tick: Option<Tick>,
    last_traffic: TrafficData,
    last_emergencies: Vec<EmergencyStatus>,
}

impl Coordinator {
    /// Validates the configuration against the network and builds every component.
    /// Inconsistent configuration is refused here rather than at run time.
    pub fn new(network: RoadNetwork, config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        network.validate_holds(config.default_min_hold_ticks, config.default_max_hold_ticks)?;

        let arbiters = network
            .junctions()
            .map(|j| (j.id.clone(), ModeArbiter::new(j.id.clone(), config.debounce_ticks)))
            .collect();
        let lights = TrafficLightController::initialize(&network, config.signal_timing());

        Ok(Self {
            rsu: RsuDetector::new(config.rsu_radius_m),
            planner: GreenwavePlanner::new(
                config.lookahead_junctions,
                config.redetection_timeout_ticks,
            ),
            shaper: RewardShaper::new(config.reward.clone()),
            tracker: VehicleLifecycleTracker::new(),
            arbiters,
            lights,
            network,
            config,
            last_tick: None,
            last_traffic: TrafficData::default(),
            last_emergencies: Vec::new(),
        })
    }

    /// Advances the whole system by one tick of the motion simulator.
    ///
    /// `policy` is consulted once for each junction in `ExternalPolicy` mode.
    pub fn tick<P>(&mut self, snapshot: &TickSnapshot, policy: &mut P) -> TickReport
    where
        P: SignalPolicy + ?Sized,
    {
        let tick = snapshot.tick;
        if self.last_tick.is_some_and(|last| tick <= last) {
            warn!(
                "Tick {} does not advance past previous tick {:?}",
                tick, self.last_tick
            );
        }
        self.last_tick = Some(tick);

        let lifecycle = self.tracker.update(snapshot);

        let detections = self.rsu.scan_all(&self.network, snapshot);
        if !detections.is_empty() {
            debug!("Tick {}: RSU detections at {:?}", tick, detections.keys().collect::<Vec<_>>());
        }

        let outcome = self
            .planner
            .reconcile(&detections, snapshot, &self.tracker, &self.network);

        let emergencies: Vec<&VehicleSnapshot> = snapshot
            .vehicles
            .iter()
            .filter(|v| v.is_emergency() && self.tracker.is_active(&v.id))
            .collect();

        let mut modes = BTreeMap::new();
        for junction in self.network.junctions() {
            let Some(arbiter) = self.arbiters.get_mut(&junction.id) else {
                continue;
            };
            let nearby = emergencies
                .iter()
                .any(|v| junction.distance_to(v.position) <= self.config.proximity_radius_m);
            let mode = arbiter.step(outcome.overrides.contains(&junction.id), nearby);
            modes.insert(junction.id.clone(), mode);
        }

        let traffic = collect_traffic_data(&self.network, snapshot, self.config.halting_speed_mps);
        let mut rejected_requests = Vec::new();
        for (id, ctrl) in self.lights.controllers.iter_mut() {
            let mode = modes.get(id).copied().unwrap_or(ControlMode::Density);
            let input = match (mode, outcome.overrides.phase_for(id)) {
                (ControlMode::GreenwaveOverride, Some(phase)) => ControlInput::Override { phase },
                (ControlMode::ExternalPolicy, _) => {
                    let observation = ctrl.observation(tick, &traffic);
                    ControlInput::Policy {
                        request: policy.choose_phase(&observation),
                    }
                }
                _ => ControlInput::Density {
                    score: ctrl.density_score(&traffic),
                },
            };
            if let Some(phase) = ctrl.step(input) {
                rejected_requests.push((id.clone(), phase));
            }
        }

        let statuses: Vec<EmergencyStatus> = emergencies
            .iter()
            .map(|v| EmergencyStatus {
                vehicle: v.id.clone(),
                speed: v.speed,
                waiting_time: v.waiting_time,
            })
            .collect();
        let reward = self.shaper.evaluate(&traffic, &statuses);
        self.last_traffic = traffic;
        self.last_emergencies = statuses;

        TickReport {
            tick,
            signals: self.lights.outputs(),
            overrides: outcome.overrides.phases(),
            deferred: outcome.overrides.deferred,
            lifecycle,
            retired: outcome.retired,
            rejected_requests,
            reward,
        }
    }

    /// Reward for the most recent tick. Recomputed on every call.
    pub fn reward(&self) -> RewardBreakdown {
        self.shaper.evaluate(&self.last_traffic, &self.last_emergencies)
    }

    /// Current mode of `junction`; `None` for junctions not in the network.
    pub fn mode(&self, junction: &JunctionId) -> Option<ControlMode> {
        self.arbiters.get(junction).map(ModeArbiter::mode)
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn tracker(&self) -> &VehicleLifecycleTracker {
        &self.tracker
    }

    pub fn planner(&self) -> &GreenwavePlanner {
        &self.planner
    }

    pub fn lights(&self) -> &TrafficLightController {
        &self.lights
    }

    pub fn shaper(&self) -> &RewardShaper {
        &self.shaper
    }
}
