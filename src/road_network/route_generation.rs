// route_generation.rs
//
// Breadth-first edge routes through a RoadNetwork. Routes are ordered edge
// lists: each edge's downstream junction is the next edge's upstream one.

use crate::road_network::grid::RoadNetwork;
use crate::road_network::lane::{Edge, EdgeId};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::{HashMap, VecDeque};

/// Shortest route (by edge count) from `start` to `target`, both inclusive.
/// Returns `None` when the target is unreachable or either edge is unknown.
pub fn shortest_route(network: &RoadNetwork, start: &EdgeId, target: &EdgeId) -> Option<Vec<EdgeId>> {
    network.edge(target)?;
    bfs(network, start, |e| e == target, None::<&mut rand::rngs::ThreadRng>)
}

/// Shortest route from `start` to whichever network exit is closest in edges.
pub fn route_to_exit(network: &RoadNetwork, start: &EdgeId) -> Option<Vec<EdgeId>> {
    let is_exit = |id: &EdgeId| network.edge(id).is_some_and(|e| e.to.is_none());
    bfs(network, start, is_exit, None::<&mut rand::rngs::ThreadRng>)
}

/// Random boundary-to-boundary route: picks an entry edge and an exit edge at
/// random and connects them with a randomized BFS. Returns an empty vector
/// when the network has no entries or exits.
pub fn random_route<R: Rng>(network: &RoadNetwork, rng: &mut R) -> Vec<EdgeId> {
    let entries: Vec<&Edge> = network.edges().filter(|e| e.from.is_none()).collect();
    let exits: Vec<&Edge> = network.edges().filter(|e| e.to.is_none()).collect();

    let (Some(entry), Some(exit)) = (entries.choose(rng), exits.choose(rng)) else {
        return Vec::new();
    };
    let (start, target) = (entry.id.clone(), exit.id.clone());
    bfs(network, &start, |e| e == &target, Some(rng)).unwrap_or_default()
}

fn bfs<R, F>(
    network: &RoadNetwork,
    start: &EdgeId,
    is_target: F,
    mut rng: Option<&mut R>,
) -> Option<Vec<EdgeId>>
where
    R: Rng,
    F: Fn(&EdgeId) -> bool,
{
    network.edge(start)?;

    let mut queue = VecDeque::new();
    queue.push_back(start.clone());
    let mut came_from: HashMap<EdgeId, EdgeId> = HashMap::new();
    came_from.insert(start.clone(), start.clone());

    while let Some(current) = queue.pop_front() {
        if is_target(&current) {
            let mut path = vec![current.clone()];
            let mut cur = current;
            while &cur != start {
                cur = came_from.get(&cur)?.clone();
                path.push(cur.clone());
            }
            path.reverse();
            return Some(path);
        }

        let Some(downstream) = network.edge(&current).and_then(|e| e.to.clone()) else {
            continue;
        };
        let mut next: Vec<EdgeId> = network
            .edges_from(&downstream)
            .into_iter()
            .map(|e| e.id.clone())
            .collect();
        if let Some(rng) = rng.as_deref_mut() {
            next.shuffle(rng);
        }
        for edge in next {
            if !came_from.contains_key(&edge) {
                came_from.insert(edge.clone(), current.clone());
                queue.push_back(edge);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road_network::intersection::JunctionId;

    #[test]
    fn shortest_route_crosses_the_grid() {
        let network = RoadNetwork::grid(1, 3, 100.0).unwrap();
        let route = shortest_route(
            &network,
            &EdgeId::new("inW-J0_0"),
            &EdgeId::new("J0_2-outE"),
        )
        .unwrap();
        let names: Vec<&str> = route.iter().map(|e| e.0.as_str()).collect();
        assert_eq!(names, vec!["inW-J0_0", "J0_0-J0_1", "J0_1-J0_2", "J0_2-outE"]);
    }

    #[test]
    fn unknown_edges_have_no_route() {
        let network = RoadNetwork::grid(1, 1, 100.0).unwrap();
        assert!(shortest_route(&network, &EdgeId::new("nope"), &EdgeId::new("J0_0-outE")).is_none());
    }

    #[test]
    fn exit_route_stops_at_first_boundary() {
        let network = RoadNetwork::grid(1, 3, 100.0).unwrap();
        let route = route_to_exit(&network, &EdgeId::new("J0_0-J0_1")).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route[0], EdgeId::new("J0_0-J0_1"));
        assert!(network.edge(&route[1]).unwrap().to.is_none());
        assert!(network.edge(&route[1]).unwrap().leaves(&JunctionId::new("J0_1")));
    }

    #[test]
    fn random_route_runs_entry_to_exit() {
        let network = RoadNetwork::grid(3, 3, 100.0).unwrap();
        let mut rng = rand::rng();
        let route = random_route(&network, &mut rng);
        assert!(!route.is_empty());
        assert!(network.edge(&route[0]).unwrap().from.is_none());
        assert!(network.edge(route.last().unwrap()).unwrap().to.is_none());
    }
}
