use padtree_core::{NodeId, TreeError};
use thiserror::Error;

#[derive(Debug, Error)]
/// Error type for agent construction, settings loading, and the per-frame
/// state machine. The machine variants signal broken internal invariants and
/// should be treated as fatal by the host.
pub enum AgentError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("search tree failure: {0}")]
    Tree(#[from] TreeError),

    #[error("selected node {} has no savestate to restore", node_id.index())]
    MissingSavestate { node_id: NodeId },

    #[error("expanded node {} left expansion without a savestate", node_id.index())]
    ExpandedWithoutSavestate { node_id: NodeId },

    #[error("expansion finished without producing a node")]
    NoExpandedNode,

    #[error("simulation finished without a node to backpropagate into")]
    NoSimulatedNode,

    #[error("state machine did not settle after {hops} transitions in one frame")]
    PhaseLoop { hops: u32 },
}
