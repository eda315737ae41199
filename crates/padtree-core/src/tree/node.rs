use std::collections::HashMap;

use crate::tree::{
    buttons::ButtonSet,
    ids::NodeId,
    savestate::Savestate,
    stats::ScoreStats,
};

/// One explored position in the search tree. A node records how it was reached
/// (the parent link and the edge action), which actions have been tried from
/// it, its accumulated score, and optionally the savestate that reproduces it.
#[derive(Debug)]
pub struct Node {
    depth: u64,
    parent: Option<(NodeId, ButtonSet)>,
    children: HashMap<ButtonSet, NodeId>,
    savestate: Option<Savestate>,
    stats: ScoreStats,
}

impl Node {
    pub fn new(depth: u64, parent: Option<(NodeId, ButtonSet)>) -> Self {
        Node {
            depth,
            parent,
            children: HashMap::new(),
            savestate: None,
            stats: ScoreStats::new(),
        }
    }

    /// Number of parent hops to the root.
    pub fn depth(&self) -> u64 {
        self.depth
    }

    /// The parent id and the action labelling the parent-to-this edge.
    pub fn parent(&self) -> Option<(NodeId, ButtonSet)> {
        self.parent
    }

    /// Look up the child reached by taking `action` from this node.
    pub fn child(&self, action: ButtonSet) -> Option<NodeId> {
        self.children.get(&action).copied()
    }

    /// Check whether an action edge already exists on this node.
    pub fn contains_action(&self, action: ButtonSet) -> bool {
        self.children.contains_key(&action)
    }

    /// Reverse edge lookup: the action that leads from this node to `child`.
    pub fn action_leading_to(&self, child: NodeId) -> Option<ButtonSet> {
        self.children
            .iter()
            .find(|(_, id)| **id == child)
            .map(|(action, _)| *action)
    }

    pub fn number_of_children(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterate the (action, child) edges of this node.
    pub fn children(&self) -> impl Iterator<Item = (ButtonSet, NodeId)> + '_ {
        self.children.iter().map(|(action, id)| (*action, *id))
    }

    /// Register a child edge. Returns false if the action already had one;
    /// the existing edge is kept untouched in that case.
    pub(crate) fn insert_child(&mut self, action: ButtonSet, child: NodeId) -> bool {
        if self.children.contains_key(&action) {
            false
        } else {
            self.children.insert(action, child);
            true
        }
    }

    pub fn has_savestate(&self) -> bool {
        self.savestate.is_some()
    }

    pub fn savestate(&self) -> Option<&Savestate> {
        self.savestate.as_ref()
    }

    /// Attach the savestate that reproduces this node's position. The node
    /// owns it exclusively from here on.
    pub fn set_savestate(&mut self, savestate: Savestate) {
        self.savestate = Some(savestate);
    }

    pub fn stats(&self) -> &ScoreStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut ScoreStats {
        &mut self.stats
    }
}
