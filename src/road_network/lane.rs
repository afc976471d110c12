use serde::{Deserialize, Serialize};
use std::fmt;

use crate::road_network::intersection::JunctionId;

/// Unique identifier for a directed edge (an approach when it feeds a junction).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A directed road connection between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Junction the edge leaves; `None` for edges entering from the network boundary.
    #[serde(default)]
    pub from: Option<JunctionId>,
    /// Junction the edge feeds; `None` for edges leaving the network.
    #[serde(default)]
    pub to: Option<JunctionId>,
    /// Lane identifiers, used for display and lane-level feeds.
    #[serde(default)]
    pub lanes: Vec<String>,
    #[serde(default)]
    pub length_meters: f64,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        from: Option<JunctionId>,
        to: Option<JunctionId>,
        length_meters: f64,
    ) -> Self {
        let id = EdgeId::new(id);
        let lanes = vec![format!("{}_0", id)];
        Self {
            id,
            from,
            to,
            lanes,
            length_meters,
        }
    }

    /// Whether this edge is an approach of `junction`.
    pub fn feeds(&self, junction: &JunctionId) -> bool {
        self.to.as_ref() == Some(junction)
    }

    pub fn leaves(&self, junction: &JunctionId) -> bool {
        self.from.as_ref() == Some(junction)
    }
}
