use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::road_network::intersection::{Junction, JunctionId, Phase};
use crate::road_network::lane::{Edge, EdgeId};

/// Serialized form of a road network, as loaded from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkDescription {
    pub junctions: Vec<Junction>,
    pub edges: Vec<Edge>,
}

/// Immutable road topology: junctions, directed edges, phase sequences.
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    junctions: BTreeMap<JunctionId, Junction>,
    edges: BTreeMap<EdgeId, Edge>,
}

impl RoadNetwork {
    /// Builds and validates a network. Junction approach lists are filled in
    /// from the edges that feed each junction, in edge declaration order.
    pub fn new(junctions: Vec<Junction>, edges: Vec<Edge>) -> Result<Self> {
        let mut edge_map = BTreeMap::new();
        for edge in &edges {
            if edge_map.insert(edge.id.clone(), edge.clone()).is_some() {
                return Err(ConfigError::DuplicateEdge(edge.id.clone()));
            }
        }

        let mut junction_map = BTreeMap::new();
        for mut junction in junctions {
            if junction.phases.is_empty() {
                return Err(ConfigError::EmptyPhaseList(junction.id));
            }
            for (index, phase) in junction.phases.iter().enumerate() {
                if let (Some(min), Some(max)) = (phase.min_hold, phase.max_hold) {
                    if min > max {
                        return Err(ConfigError::HoldBounds {
                            junction: junction.id.clone(),
                            phase: index,
                            min,
                            max,
                        });
                    }
                }
                for approach in &phase.approaches {
                    let edge = edge_map.get(approach).ok_or_else(|| ConfigError::UnknownEdge {
                        junction: junction.id.clone(),
                        phase: index,
                        edge: approach.clone(),
                    })?;
                    if !edge.feeds(&junction.id) {
                        return Err(ConfigError::ForeignApproach {
                            junction: junction.id.clone(),
                            edge: approach.clone(),
                        });
                    }
                }
            }
            junction.approaches = edges
                .iter()
                .filter(|edge| edge.feeds(&junction.id))
                .map(|edge| edge.id.clone())
                .collect();
            let id = junction.id.clone();
            if junction_map.insert(id.clone(), junction).is_some() {
                return Err(ConfigError::DuplicateJunction(id));
            }
        }

        Ok(Self {
            junctions: junction_map,
            edges: edge_map,
        })
    }

    pub fn from_description(description: NetworkDescription) -> Result<Self> {
        Self::new(description.junctions, description.edges)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let description: NetworkDescription = serde_json::from_str(json)?;
        Self::from_description(description)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks every phase's resolved hold bounds against the configured defaults.
    pub fn validate_holds(&self, default_min: u32, default_max: u32) -> Result<()> {
        for junction in self.junctions.values() {
            for (index, phase) in junction.phases.iter().enumerate() {
                let (min, max) = phase.hold_bounds(default_min, default_max);
                if min > max {
                    return Err(ConfigError::HoldBounds {
                        junction: junction.id.clone(),
                        phase: index,
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn junction(&self, id: &JunctionId) -> Option<&Junction> {
        self.junctions.get(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Junctions in identifier order.
    pub fn junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    /// Edges leaving `junction`.
    pub fn edges_from(&self, junction: &JunctionId) -> Vec<&Edge> {
        self.edges.values().filter(|e| e.leaves(junction)).collect()
    }

    /// Builds a `rows` x `cols` grid of two-phase junctions `spacing` meters apart.
    ///
    /// Junction `J{r}_{c}` sits at `(c * spacing, r * spacing)`. Internal edges are
    /// named `{from}-{to}`; boundary edges are `in{D}-{junction}` and `{junction}-out{D}`
    /// where `D` is one of `N`, `S`, `W`, `E`. Phase 0 serves the north/south
    /// approaches, phase 1 the west/east approaches.
    pub fn grid(rows: usize, cols: usize, spacing: f64) -> Result<Self> {
        let mut junctions = Vec::new();
        let mut edges = Vec::new();

        for row in 0..rows {
            for col in 0..cols {
                let here = grid_junction_id(row, col);
                let mut north_south = BTreeSet::new();
                let mut west_east = BTreeSet::new();

                let neighbours = [
                    ('N', row.checked_sub(1).map(|r| (r, col))),
                    ('S', (row + 1 < rows).then_some((row + 1, col))),
                    ('W', col.checked_sub(1).map(|c| (row, c))),
                    ('E', (col + 1 < cols).then_some((row, col + 1))),
                ];

                for (side, neighbour) in neighbours {
                    let approach = match neighbour {
                        Some((r, c)) => {
                            let there = grid_junction_id(r, c);
                            let id = format!("{}-{}", there, here);
                            edges.push(Edge::new(
                                id.clone(),
                                Some(there),
                                Some(here.clone()),
                                spacing,
                            ));
                            id
                        }
                        None => {
                            let entry = format!("in{}-{}", side, here);
                            edges.push(Edge::new(entry.clone(), None, Some(here.clone()), spacing));
                            edges.push(Edge::new(
                                format!("{}-out{}", here, side),
                                Some(here.clone()),
                                None,
                                spacing,
                            ));
                            entry
                        }
                    };
                    match side {
                        'N' | 'S' => north_south.insert(EdgeId::new(approach)),
                        _ => west_east.insert(EdgeId::new(approach)),
                    };
                }

                let phases = vec![
                    Phase {
                        approaches: north_south,
                        min_hold: None,
                        max_hold: None,
                    },
                    Phase {
                        approaches: west_east,
                        min_hold: None,
                        max_hold: None,
                    },
                ];
                junctions.push(Junction {
                    id: here,
                    position: (col as f64 * spacing, row as f64 * spacing),
                    phases,
                    approaches: Vec::new(),
                });
            }
        }

        Self::new(junctions, edges)
    }
}

pub fn grid_junction_id(row: usize, col: usize) -> JunctionId {
    JunctionId(format!("J{}_{}", row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: &str, from: Option<&str>, to: Option<&str>) -> Edge {
        Edge::new(id, from.map(JunctionId::new), to.map(JunctionId::new), 100.0)
    }

    #[test]
    fn grid_has_four_approaches_per_junction() {
        let network = RoadNetwork::grid(2, 3, 100.0).unwrap();
        assert_eq!(network.junction_count(), 6);
        for junction in network.junctions() {
            assert_eq!(junction.approaches.len(), 4);
            assert_eq!(junction.phases.len(), 2);
        }
        let corner = network.junction(&grid_junction_id(0, 0)).unwrap();
        assert!(corner.phases[1].serves(&EdgeId::new("J0_1-J0_0")));
        assert!(corner.phases[0].serves(&EdgeId::new("inN-J0_0")));
    }

    #[test]
    fn empty_phase_list_is_rejected() {
        let err = RoadNetwork::new(vec![Junction::new("A", (0.0, 0.0), vec![])], vec![])
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPhaseList(_)));
    }

    #[test]
    fn inverted_hold_bounds_are_rejected() {
        let junction = Junction::new(
            "A",
            (0.0, 0.0),
            vec![Phase::new(["a_in"]).with_holds(10, 3)],
        );
        let err = RoadNetwork::new(vec![junction], vec![edge("a_in", None, Some("A"))])
            .unwrap_err();
        assert!(matches!(err, ConfigError::HoldBounds { min: 10, max: 3, .. }));
    }

    #[test]
    fn default_holds_are_checked_on_request() {
        let junction = Junction::new("A", (0.0, 0.0), vec![Phase::new(["a_in"])]);
        let network = RoadNetwork::new(vec![junction], vec![edge("a_in", None, Some("A"))])
            .unwrap();
        assert!(network.validate_holds(5, 40).is_ok());
        assert!(network.validate_holds(50, 40).is_err());
    }

    #[test]
    fn approaches_must_feed_their_junction() {
        let junction = Junction::new("A", (0.0, 0.0), vec![Phase::new(["a_out"])]);
        let err = RoadNetwork::new(vec![junction], vec![edge("a_out", Some("A"), None)])
            .unwrap_err();
        assert!(matches!(err, ConfigError::ForeignApproach { .. }));

        let junction = Junction::new("A", (0.0, 0.0), vec![Phase::new(["ghost"])]);
        let err = RoadNetwork::new(vec![junction], vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEdge { .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = RoadNetwork::new(
            vec![],
            vec![edge("x", None, None), edge("x", None, None)],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEdge(_)));
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "junctions": [
                {"id": "A", "position": [0.0, 0.0],
                 "phases": [{"approaches": ["a_in"], "min_hold": 2, "max_hold": 6}]}
            ],
            "edges": [{"id": "a_in", "to": "A"}, {"id": "a_out", "from": "A"}]
        }"#;
        let network = RoadNetwork::from_json_str(json).unwrap();
        let a = network.junction(&JunctionId::new("A")).unwrap();
        assert_eq!(a.approaches, vec![EdgeId::new("a_in")]);
        assert_eq!(network.edges_from(&a.id).len(), 1);
    }
}
