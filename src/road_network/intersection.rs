use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::road_network::lane::EdgeId;

/// Unique identifier for a signal-controlled junction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JunctionId(pub String);

impl JunctionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for JunctionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a phase within its junction's cyclic sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseId(pub usize);

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fixed assignment of right-of-way to a subset of a junction's approaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Approaches granted green while this phase is active.
    pub approaches: BTreeSet<EdgeId>,
    /// Minimum hold in ticks. Falls back to the coordinator default when absent.
    #[serde(default)]
    pub min_hold: Option<u32>,
    /// Maximum hold in ticks. Falls back to the coordinator default when absent.
    #[serde(default)]
    pub max_hold: Option<u32>,
}

impl Phase {
    pub fn new<I, E>(approaches: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EdgeId>,
    {
        Self {
            approaches: approaches.into_iter().map(Into::into).collect(),
            min_hold: None,
            max_hold: None,
        }
    }

    pub fn with_holds(mut self, min_hold: u32, max_hold: u32) -> Self {
        self.min_hold = Some(min_hold);
        self.max_hold = Some(max_hold);
        self
    }

    pub fn serves(&self, edge: &EdgeId) -> bool {
        self.approaches.contains(edge)
    }

    /// Resolves (min, max) hold against the given defaults.
    pub fn hold_bounds(&self, default_min: u32, default_max: u32) -> (u32, u32) {
        (
            self.min_hold.unwrap_or(default_min),
            self.max_hold.unwrap_or(default_max),
        )
    }
}

/// Static description of a junction. Read-only after the network is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Junction {
    pub id: JunctionId,
    /// Reference point used for RSU and proximity distance checks.
    pub position: (f64, f64),
    /// Cyclic phase sequence; the successor of the last phase is the first.
    pub phases: Vec<Phase>,
    /// Incoming approaches in state-string order. Filled in by the network builder.
    #[serde(default)]
    pub approaches: Vec<EdgeId>,
}

impl Junction {
    pub fn new(id: impl Into<String>, position: (f64, f64), phases: Vec<Phase>) -> Self {
        Self {
            id: JunctionId::new(id),
            position,
            phases,
            approaches: Vec::new(),
        }
    }

    pub fn phase(&self, id: PhaseId) -> Option<&Phase> {
        self.phases.get(id.0)
    }

    pub fn successor(&self, id: PhaseId) -> PhaseId {
        PhaseId((id.0 + 1) % self.phases.len().max(1))
    }

    /// First phase in the cycle that grants right-of-way to `edge`.
    pub fn phase_serving(&self, edge: &EdgeId) -> Option<PhaseId> {
        self.phases.iter().position(|p| p.serves(edge)).map(PhaseId)
    }

    pub fn distance_to(&self, point: (f64, f64)) -> f64 {
        let dx = self.position.0 - point.0;
        let dy = self.position.1 - point.1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Whether moving from `from` to `to` changes the set of approaches with green.
    pub fn changes_right_of_way(&self, from: PhaseId, to: PhaseId) -> bool {
        match (self.phase(from), self.phase(to)) {
            (Some(a), Some(b)) => a.approaches != b.approaches,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_phase() -> Junction {
        Junction::new(
            "A",
            (0.0, 0.0),
            vec![Phase::new(["n_in", "s_in"]), Phase::new(["e_in", "w_in"])],
        )
    }

    #[test]
    fn successor_wraps_around() {
        let j = two_phase();
        assert_eq!(j.successor(PhaseId(0)), PhaseId(1));
        assert_eq!(j.successor(PhaseId(1)), PhaseId(0));
    }

    #[test]
    fn phase_serving_finds_first_match() {
        let j = two_phase();
        assert_eq!(j.phase_serving(&EdgeId::new("e_in")), Some(PhaseId(1)));
        assert_eq!(j.phase_serving(&EdgeId::new("nowhere")), None);
    }

    #[test]
    fn hold_bounds_fall_back_to_defaults() {
        let p = Phase::new(["x"]);
        assert_eq!(p.hold_bounds(5, 40), (5, 40));
        assert_eq!(p.with_holds(2, 9).hold_bounds(5, 40), (2, 9));
    }

    #[test]
    fn distance_is_euclidean() {
        let j = Junction::new("A", (3.0, 4.0), vec![Phase::new(["x"])]);
        assert!((j.distance_to((0.0, 0.0)) - 5.0).abs() < 1e-9);
    }
}
