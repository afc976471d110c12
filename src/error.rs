use crate::road_network::intersection::JunctionId;
use crate::road_network::lane::EdgeId;

/// Result type for configuration and topology loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Static configuration problems. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("junction {0} has no phases")]
    EmptyPhaseList(JunctionId),

    #[error("junction {junction} phase {phase}: min hold {min} exceeds max hold {max}")]
    HoldBounds {
        junction: JunctionId,
        phase: usize,
        min: u32,
        max: u32,
    },

    #[error("duplicate junction id {0}")]
    DuplicateJunction(JunctionId),

    #[error("duplicate edge id {0}")]
    DuplicateEdge(EdgeId),

    #[error("junction {junction} phase {phase} references unknown edge {edge}")]
    UnknownEdge {
        junction: JunctionId,
        phase: usize,
        edge: EdgeId,
    },

    #[error("edge {edge} does not feed junction {junction}")]
    ForeignApproach { junction: JunctionId, edge: EdgeId },

    #[error("invalid option {option}: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
