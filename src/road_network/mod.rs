pub mod grid;
pub mod intersection;
pub mod lane;
pub mod route_generation;

pub use grid::{grid_junction_id, NetworkDescription, RoadNetwork};
pub use intersection::{Junction, JunctionId, Phase, PhaseId};
pub use lane::{Edge, EdgeId};
