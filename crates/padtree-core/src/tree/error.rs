use std::fmt;

use crate::tree::ids::NodeId;

/// Error type for tree construction and tree-policy operations. All of these
/// indicate a broken internal invariant rather than a recoverable condition;
/// callers are expected to treat them as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Attempted to access a node id that does not exist in the arena.
    MissingNode { node_id: NodeId },
    /// Selection descended more steps than the safety bound allows.
    SelectionBudgetExhausted { limit: usize },
    /// Expansion produced a node, but the parent did not hold exactly one
    /// unvisited child afterwards.
    NoUnvisitedChild { node_id: NodeId },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::MissingNode { node_id } => {
                write!(f, "missing node with id {}", node_id.index())
            }
            TreeError::SelectionBudgetExhausted { limit } => {
                write!(f, "selection walked more than {limit} steps without stopping")
            }
            TreeError::NoUnvisitedChild { node_id } => write!(
                f,
                "expected exactly one unvisited child under node {}",
                node_id.index()
            ),
        }
    }
}

impl std::error::Error for TreeError {}
