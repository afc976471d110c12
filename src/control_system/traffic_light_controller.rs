use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::control_system::mode_arbiter::ControlMode;
use crate::control_system::policy::PolicyObservation;
use crate::flow_analyzer::traffic_analyzer::TrafficData;
use crate::road_network::grid::RoadNetwork;
use crate::road_network::intersection::{Junction, JunctionId, PhaseId};
use crate::road_network::lane::EdgeId;
use crate::shared_data::{SignalOutput, Tick};

/// Timing parameters shared by every junction controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalTiming {
    pub clearance_ticks: u32,
    pub override_clearance_ticks: u32,
    pub density_low: f64,
    pub density_high: f64,
    pub default_min_hold: u32,
    pub default_max_hold: u32,
}

/// What the lamps are doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SignalState {
    Green { phase: PhaseId },
    /// Transitional phase between two green phases with different approach sets.
    Clearance {
        from: PhaseId,
        to: PhaseId,
        remaining: u32,
    },
}

/// The driver for one tick, chosen by the junction's control mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    Density { score: f64 },
    Policy { request: Option<PhaseId> },
    Override { phase: PhaseId },
}

impl ControlInput {
    pub fn mode(&self) -> ControlMode {
        match self {
            ControlInput::Density { .. } => ControlMode::Density,
            ControlInput::Policy { .. } => ControlMode::ExternalPolicy,
            ControlInput::Override { .. } => ControlMode::GreenwaveOverride,
        }
    }
}

/// Per-junction signal state machine.
#[derive(Debug, Clone)]
pub struct IntersectionController {
    junction: Junction,
    timing: SignalTiming,
    signal: SignalState,
    /// Ticks spent in the current green.
    elapsed: u32,
    mode: ControlMode,
    /// Policy request waiting for the minimum hold to elapse.
    pending: Option<PhaseId>,
}

impl IntersectionController {
    /// Starts in the junction's first phase.
    pub fn new(junction: Junction, timing: SignalTiming) -> Self {
        Self {
            junction,
            timing,
            signal: SignalState::Green { phase: PhaseId(0) },
            elapsed: 0,
            mode: ControlMode::Density,
            pending: None,
        }
    }

    pub fn junction(&self) -> &Junction {
        &self.junction
    }

    pub fn signal(&self) -> SignalState {
        self.signal
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn pending(&self) -> Option<PhaseId> {
        self.pending
    }

    pub fn in_clearance(&self) -> bool {
        matches!(self.signal, SignalState::Clearance { .. })
    }

    /// The green phase, or the phase being cleared towards.
    pub fn phase(&self) -> PhaseId {
        match self.signal {
            SignalState::Green { phase } => phase,
            SignalState::Clearance { to, .. } => to,
        }
    }

    fn hold_bounds(&self, phase: PhaseId) -> (u32, u32) {
        self.junction
            .phase(phase)
            .map(|p| p.hold_bounds(self.timing.default_min_hold, self.timing.default_max_hold))
            .unwrap_or((self.timing.default_min_hold, self.timing.default_max_hold))
    }

    /// Vehicles on the approaches the current phase serves.
    pub fn density_score(&self, traffic: &TrafficData) -> f64 {
        self.junction
            .phase(self.phase())
            .map(|p| traffic.combined(&p.approaches).occupancy() as f64)
            .unwrap_or(0.0)
    }

    pub fn observation(&self, tick: Tick, traffic: &TrafficData) -> PolicyObservation {
        PolicyObservation::new(
            tick,
            &self.junction,
            self.phase(),
            self.in_clearance(),
            self.elapsed,
            traffic,
        )
    }

    /// Advances one tick. Returns the policy's request if it was rejected as invalid.
    pub fn step(&mut self, input: ControlInput) -> Option<PhaseId> {
        let mode = input.mode();
        if mode != self.mode {
            self.pending = None;
            self.mode = mode;
        }
        match input {
            ControlInput::Density { score } => {
                self.density_step(score);
                None
            }
            ControlInput::Policy { request } => self.policy_step(request),
            ControlInput::Override { phase } => {
                self.override_step(phase);
                None
            }
        }
    }

    fn density_step(&mut self, score: f64) {
        if self.tick_clearance() {
            return;
        }
        let current = self.phase();
        let (min, max) = self.hold_bounds(current);
        if self.elapsed < min {
            self.elapsed += 1;
            return;
        }

        let (low, high) = (self.timing.density_low, self.timing.density_high);
        let target = if score >= high {
            max
        } else if score <= low {
            min
        } else {
            let fraction = (score - low) / (high - low);
            min + (fraction * (max - min) as f64).round() as u32
        };

        if self.elapsed >= target {
            let next = self.junction.successor(current);
            self.begin_transition(next, self.timing.clearance_ticks);
        } else {
            self.elapsed += 1;
        }
    }

    fn policy_step(&mut self, request: Option<PhaseId>) -> Option<PhaseId> {
        let mut rejected = None;
        if let Some(requested) = request {
            if self.junction.phase(requested).is_none() {
                warn!(
                    "Junction {}: policy requested invalid phase {} ({} phases); keeping phase {}",
                    self.junction.id,
                    requested,
                    self.junction.phases.len(),
                    self.phase()
                );
                rejected = Some(requested);
            } else if requested == self.phase() {
                self.pending = None;
            } else {
                self.pending = Some(requested);
            }
        }

        if self.tick_clearance() {
            return rejected;
        }
        let current = self.phase();
        let (min, max) = self.hold_bounds(current);
        if self.elapsed < min {
            self.elapsed += 1;
        } else if let Some(next) = self.pending.take() {
            self.begin_transition(next, self.timing.clearance_ticks);
        } else if self.elapsed >= max {
            let next = self.junction.successor(current);
            self.begin_transition(next, self.timing.clearance_ticks);
        } else {
            self.elapsed += 1;
        }
        rejected
    }

    /// Forces `phase` as fast as clearance allows. Minimum hold does not apply,
    /// but a change of right-of-way still passes through a (shortened) clearance.
    fn override_step(&mut self, phase: PhaseId) {
        if self.junction.phase(phase).is_none() {
            warn!("Junction {}: ignoring override to unknown phase {}", self.junction.id, phase);
            if !self.tick_clearance() {
                self.elapsed += 1;
            }
            return;
        }
        let short = self.timing.override_clearance_ticks.max(1);
        match self.signal {
            SignalState::Green { phase: current } if current == phase => self.elapsed += 1,
            SignalState::Green { .. } => self.begin_transition(phase, short),
            SignalState::Clearance { from, .. } if from == phase => {
                debug!("Junction {}: clearance cancelled, phase {} stays green", self.junction.id, from);
                self.signal = SignalState::Green { phase: from };
                self.elapsed = 0;
            }
            SignalState::Clearance { from, remaining, .. } => {
                self.signal = SignalState::Clearance {
                    from,
                    to: phase,
                    remaining: remaining.min(short),
                };
                self.tick_clearance();
            }
        }
    }

    /// Counts down an active clearance. Returns false when the junction is green.
    fn tick_clearance(&mut self) -> bool {
        let SignalState::Clearance { from, to, remaining } = self.signal else {
            return false;
        };
        if remaining <= 1 {
            debug!("Junction {}: clearance done, phase {} green", self.junction.id, to);
            self.signal = SignalState::Green { phase: to };
            self.elapsed = 0;
        } else {
            self.signal = SignalState::Clearance {
                from,
                to,
                remaining: remaining - 1,
            };
        }
        true
    }

    fn begin_transition(&mut self, to: PhaseId, clearance: u32) {
        let from = self.phase();
        self.elapsed = 0;
        if self.junction.changes_right_of_way(from, to) {
            debug!(
                "Junction {}: phase {} -> {} via {} tick clearance",
                self.junction.id, from, to, clearance
            );
            self.signal = SignalState::Clearance {
                from,
                to,
                remaining: clearance.max(1),
            };
        } else {
            self.signal = SignalState::Green { phase: to };
        }
    }

    /// One character per approach: `G` green, `y` losing green, `r` stopped.
    pub fn state_string(&self) -> String {
        let serves = |phase: PhaseId, edge: &EdgeId| {
            self.junction.phase(phase).is_some_and(|p| p.serves(edge))
        };
        self.junction
            .approaches
            .iter()
            .map(|edge| match self.signal {
                SignalState::Green { phase } if serves(phase, edge) => 'G',
                SignalState::Green { .. } => 'r',
                SignalState::Clearance { from, to, .. } => match (serves(from, edge), serves(to, edge)) {
                    (true, true) => 'G',
                    (true, false) => 'y',
                    _ => 'r',
                },
            })
            .collect()
    }

    pub fn output(&self) -> SignalOutput {
        SignalOutput {
            junction: self.junction.id.clone(),
            phase: self.phase(),
            state: self.state_string(),
            mode: self.mode,
            in_clearance: self.in_clearance(),
        }
    }
}

/// All junction controllers, keyed by junction.
#[derive(Debug, Clone)]
pub struct TrafficLightController {
    pub controllers: BTreeMap<JunctionId, IntersectionController>,
}

impl TrafficLightController {
    /// Creates a controller for each junction in the network.
    pub fn initialize(network: &RoadNetwork, timing: SignalTiming) -> Self {
        let controllers = network
            .junctions()
            .map(|junction| {
                (
                    junction.id.clone(),
                    IntersectionController::new(junction.clone(), timing),
                )
            })
            .collect();
        Self { controllers }
    }

    pub fn get(&self, junction: &JunctionId) -> Option<&IntersectionController> {
        self.controllers.get(junction)
    }

    pub fn get_mut(&mut self, junction: &JunctionId) -> Option<&mut IntersectionController> {
        self.controllers.get_mut(junction)
    }

    /// Whether `approach` currently has green at `junction`. Unknown junctions
    /// and approaches answer false.
    pub fn is_approach_green(&self, junction: &JunctionId, approach: &EdgeId) -> bool {
        let Some(ctrl) = self.controllers.get(junction) else {
            return false;
        };
        let Some(index) = ctrl.junction.approaches.iter().position(|e| e == approach) else {
            return false;
        };
        ctrl.state_string().chars().nth(index) == Some('G')
    }

    pub fn outputs(&self) -> Vec<SignalOutput> {
        self.controllers.values().map(IntersectionController::output).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road_network::intersection::Phase;

    const TIMING: SignalTiming = SignalTiming {
        clearance_ticks: 3,
        override_clearance_ticks: 2,
        density_low: 2.0,
        density_high: 8.0,
        default_min_hold: 3,
        default_max_hold: 10,
    };

    fn controller() -> IntersectionController {
        let mut junction = Junction::new(
            "A",
            (0.0, 0.0),
            vec![Phase::new(["n", "s"]), Phase::new(["e", "w"])],
        );
        junction.approaches = ["n", "s", "e", "w"].into_iter().map(EdgeId::new).collect();
        IntersectionController::new(junction, TIMING)
    }

    fn run(ctrl: &mut IntersectionController, input: ControlInput, ticks: usize) -> Vec<SignalState> {
        (0..ticks)
            .map(|_| {
                ctrl.step(input);
                ctrl.signal()
            })
            .collect()
    }

    const GREEN0: SignalState = SignalState::Green { phase: PhaseId(0) };
    const GREEN1: SignalState = SignalState::Green { phase: PhaseId(1) };

    #[test]
    fn low_density_advances_right_after_min_hold() {
        let mut ctrl = controller();
        let states = run(&mut ctrl, ControlInput::Density { score: 0.0 }, 4);
        assert_eq!(&states[..3], &[GREEN0, GREEN0, GREEN0]);
        assert!(matches!(states[3], SignalState::Clearance { to: PhaseId(1), .. }));
    }

    #[test]
    fn clearance_lasts_its_configured_duration() {
        let mut ctrl = controller();
        let states = run(&mut ctrl, ControlInput::Density { score: 0.0 }, 7);
        let clearing = states.iter().filter(|s| matches!(s, SignalState::Clearance { .. })).count();
        assert_eq!(clearing, 3);
        assert_eq!(states[6], GREEN1);
        assert_eq!(ctrl.state_string(), "rrGG");
    }

    #[test]
    fn high_density_holds_until_max() {
        let mut ctrl = controller();
        let states = run(&mut ctrl, ControlInput::Density { score: 20.0 }, 11);
        assert!(states[..10].iter().all(|s| *s == GREEN0));
        assert!(matches!(states[10], SignalState::Clearance { .. }));
    }

    #[test]
    fn medium_density_interpolates_hold() {
        // Halfway between thresholds: target = 3 + round(0.5 * 7) = 7.
        let mut ctrl = controller();
        let states = run(&mut ctrl, ControlInput::Density { score: 5.0 }, 8);
        assert!(states[..7].iter().all(|s| *s == GREEN0));
        assert!(matches!(states[7], SignalState::Clearance { .. }));
    }

    #[test]
    fn policy_switch_is_queued_until_min_hold() {
        let mut ctrl = controller();
        let request = ControlInput::Policy { request: Some(PhaseId(1)) };
        ctrl.step(request);
        assert_eq!(ctrl.signal(), GREEN0);
        assert_eq!(ctrl.pending(), Some(PhaseId(1)));
        let hold = ControlInput::Policy { request: None };
        ctrl.step(hold);
        ctrl.step(hold);
        assert_eq!(ctrl.signal(), GREEN0);
        ctrl.step(hold);
        assert!(matches!(ctrl.signal(), SignalState::Clearance { to: PhaseId(1), remaining: 3, .. }));
        assert_eq!(ctrl.pending(), None);
    }

    #[test]
    fn invalid_policy_phase_is_rejected() {
        let mut ctrl = controller();
        for _ in 0..5 {
            let rejected = ctrl.step(ControlInput::Policy { request: Some(PhaseId(9)) });
            assert_eq!(rejected, Some(PhaseId(9)));
        }
        assert_eq!(ctrl.signal(), GREEN0);
        assert_eq!(ctrl.pending(), None);
    }

    #[test]
    fn policy_mode_still_enforces_max_hold() {
        let mut ctrl = controller();
        let states = run(&mut ctrl, ControlInput::Policy { request: None }, 11);
        assert!(matches!(states[10], SignalState::Clearance { to: PhaseId(1), .. }));
    }

    #[test]
    fn override_ignores_min_hold_but_not_clearance() {
        let mut ctrl = controller();
        let force = ControlInput::Override { phase: PhaseId(1) };
        ctrl.step(force);
        assert_eq!(
            ctrl.signal(),
            SignalState::Clearance { from: PhaseId(0), to: PhaseId(1), remaining: 2 }
        );
        assert_eq!(ctrl.state_string(), "yyrr");
        ctrl.step(force);
        assert!(ctrl.in_clearance());
        ctrl.step(force);
        assert_eq!(ctrl.signal(), GREEN1);
        assert_eq!(ctrl.mode(), ControlMode::GreenwaveOverride);
    }

    #[test]
    fn override_shortens_a_running_clearance() {
        let mut ctrl = controller();
        run(&mut ctrl, ControlInput::Density { score: 0.0 }, 4);
        assert!(matches!(ctrl.signal(), SignalState::Clearance { remaining: 3, .. }));
        ctrl.step(ControlInput::Override { phase: PhaseId(1) });
        assert_eq!(
            ctrl.signal(),
            SignalState::Clearance { from: PhaseId(0), to: PhaseId(1), remaining: 1 }
        );
        ctrl.step(ControlInput::Override { phase: PhaseId(1) });
        assert_eq!(ctrl.signal(), GREEN1);
    }

    #[test]
    fn override_back_to_the_clearing_phase_restores_green() {
        let mut ctrl = controller();
        ctrl.step(ControlInput::Override { phase: PhaseId(1) });
        assert!(ctrl.in_clearance());
        ctrl.step(ControlInput::Override { phase: PhaseId(0) });
        assert_eq!(ctrl.signal(), GREEN0);
        assert!(!ctrl.in_clearance());
        assert_eq!(ctrl.state_string(), "GGrr");
        // Same-phase override from here just holds.
        let states = run(&mut ctrl, ControlInput::Override { phase: PhaseId(0) }, 5);
        assert!(states.iter().all(|s| *s == GREEN0));
    }

    #[test]
    fn override_on_current_phase_holds_it() {
        let mut ctrl = controller();
        let states = run(&mut ctrl, ControlInput::Override { phase: PhaseId(0) }, 30);
        assert!(states.iter().all(|s| *s == GREEN0));
    }

    #[test]
    fn same_approach_set_switches_without_clearance() {
        let mut junction = Junction::new("B", (0.0, 0.0), vec![Phase::new(["x"]), Phase::new(["x"])]);
        junction.approaches = vec![EdgeId::new("x")];
        let mut ctrl = IntersectionController::new(junction, TIMING);
        ctrl.step(ControlInput::Override { phase: PhaseId(1) });
        assert_eq!(ctrl.signal(), GREEN1);
    }

    #[test]
    fn unknown_queries_answer_false() {
        let lights = TrafficLightController {
            controllers: BTreeMap::from([(JunctionId::new("A"), controller())]),
        };
        assert!(lights.is_approach_green(&JunctionId::new("A"), &EdgeId::new("n")));
        assert!(!lights.is_approach_green(&JunctionId::new("A"), &EdgeId::new("e")));
        assert!(!lights.is_approach_green(&JunctionId::new("Z"), &EdgeId::new("n")));
        assert!(!lights.is_approach_green(&JunctionId::new("A"), &EdgeId::new("zz")));
        assert!(lights.get(&JunctionId::new("Z")).is_none());
    }
}
