use serde::Serialize;
use std::collections::BTreeSet;

use crate::flow_analyzer::traffic_analyzer::{ApproachStats, TrafficData};
use crate::road_network::intersection::{Junction, JunctionId, PhaseId};
use crate::road_network::lane::EdgeId;
use crate::shared_data::Tick;

/// What the external decision-maker sees for one junction in `ExternalPolicy` mode.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyObservation {
    pub tick: Tick,
    pub junction: JunctionId,
    pub phase: PhaseId,
    pub in_clearance: bool,
    /// Ticks spent in the current green.
    pub elapsed: u32,
    pub approaches: Vec<(EdgeId, ApproachStats)>,
    /// Approaches served by each phase, indexed by phase id.
    pub phases: Vec<BTreeSet<EdgeId>>,
}

impl PolicyObservation {
    pub fn new(
        tick: Tick,
        junction: &Junction,
        phase: PhaseId,
        in_clearance: bool,
        elapsed: u32,
        traffic: &TrafficData,
    ) -> Self {
        Self {
            tick,
            junction: junction.id.clone(),
            phase,
            in_clearance,
            elapsed,
            approaches: junction
                .approaches
                .iter()
                .map(|edge| (edge.clone(), traffic.approach(edge)))
                .collect(),
            phases: junction.phases.iter().map(|p| p.approaches.clone()).collect(),
        }
    }

    pub fn stats(&self, edge: &EdgeId) -> ApproachStats {
        self.approaches
            .iter()
            .find(|(e, _)| e == edge)
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }
}

/// A pluggable decision-maker: rule table, learned model, or operator.
///
/// Returning `None` keeps the current phase. Returned ids are not trusted;
/// the controller rejects out-of-range ones.
pub trait SignalPolicy {
    fn choose_phase(&mut self, observation: &PolicyObservation) -> Option<PhaseId>;
}

impl<F> SignalPolicy for F
where
    F: FnMut(&PolicyObservation) -> Option<PhaseId>,
{
    fn choose_phase(&mut self, observation: &PolicyObservation) -> Option<PhaseId> {
        self(observation)
    }
}

/// Never asks for a change; the controller still enforces max hold.
#[derive(Debug, Default, Clone, Copy)]
pub struct HoldCurrentPolicy;

impl SignalPolicy for HoldCurrentPolicy {
    fn choose_phase(&mut self, _observation: &PolicyObservation) -> Option<PhaseId> {
        None
    }
}

/// Rule table: serve the phase with the most halted vehicles, ties to the lower id.
#[derive(Debug, Default, Clone, Copy)]
pub struct LongestQueuePolicy;

impl SignalPolicy for LongestQueuePolicy {
    fn choose_phase(&mut self, observation: &PolicyObservation) -> Option<PhaseId> {
        let mut best: Option<(usize, PhaseId)> = None;
        for (index, approaches) in observation.phases.iter().enumerate() {
            let queue: usize = approaches.iter().map(|e| observation.stats(e).halted).sum();
            if best.map_or(true, |(top, _)| queue > top) {
                best = Some((queue, PhaseId(index)));
            }
        }
        best.map(|(_, phase)| phase)
    }
}
