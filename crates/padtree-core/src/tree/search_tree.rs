use crate::tree::{
    arena::Arena,
    buttons::ButtonSet,
    error::TreeError,
    ids::NodeId,
    node::Node,
    savestate::Savestate,
};

/// The tree of explored action sequences. Owns the arena (root is always at
/// index 0) and tracks the best-scoring node seen so far; the UCT policy in
/// `uct` drives it one search iteration at a time.
#[derive(Debug)]
pub struct Tree {
    arena: Arena<Node>,
    best_scoring: NodeId,
}

impl Tree {
    /// Create a tree with a single root node and no savestate attached yet.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.allocate(Node::new(0, None));
        Tree {
            arena,
            best_scoring: root,
        }
    }

    /// Return the root node id.
    pub fn root_id(&self) -> NodeId {
        NodeId::from(0)
    }

    /// Return how many nodes exist in the tree arena.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// The node currently considered the best scoring in the whole tree.
    /// Starts at the root; updated during backpropagation.
    pub fn best_scoring(&self) -> NodeId {
        self.best_scoring
    }

    pub(crate) fn set_best_scoring(&mut self, node_id: NodeId) {
        self.best_scoring = node_id;
    }

    /// Return an immutable node handle.
    pub(crate) fn node(&self, node_id: NodeId) -> Result<&Node, TreeError> {
        self.arena
            .get(node_id)
            .ok_or(TreeError::MissingNode { node_id })
    }

    /// Return a mutable node handle.
    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Result<&mut Node, TreeError> {
        self.arena
            .get_mut(node_id)
            .ok_or(TreeError::MissingNode { node_id })
    }

    /// Visit count of a node.
    pub fn visits(&self, node_id: NodeId) -> Result<u64, TreeError> {
        Ok(self.node(node_id)?.stats().visits())
    }

    /// Accumulated score of a node.
    pub fn total_score(&self, node_id: NodeId) -> Result<f64, TreeError> {
        Ok(self.node(node_id)?.stats().total_score())
    }

    /// Mean score per visit; +infinity while unvisited.
    pub fn average_score(&self, node_id: NodeId) -> Result<f64, TreeError> {
        Ok(self.node(node_id)?.stats().average())
    }

    /// The parent of a node and the action that reaches it, if any.
    pub fn parent(&self, node_id: NodeId) -> Result<Option<(NodeId, ButtonSet)>, TreeError> {
        Ok(self.node(node_id)?.parent())
    }

    /// The (action, child) edges of a node.
    pub fn children(&self, node_id: NodeId) -> Result<Vec<(ButtonSet, NodeId)>, TreeError> {
        Ok(self.node(node_id)?.children().collect())
    }

    /// Number of distinct action edges on a node.
    pub fn number_of_children(&self, node_id: NodeId) -> Result<usize, TreeError> {
        Ok(self.node(node_id)?.number_of_children())
    }

    /// Whether a node has no children yet.
    pub fn is_leaf(&self, node_id: NodeId) -> Result<bool, TreeError> {
        Ok(self.node(node_id)?.is_leaf())
    }

    /// Whether an action edge already exists on a node.
    pub fn contains_action(&self, parent: NodeId, action: ButtonSet) -> Result<bool, TreeError> {
        Ok(self.node(parent)?.contains_action(action))
    }

    /// Add a child under `parent` for `action`. Idempotent: if the action edge
    /// already exists, the pre-existing child is returned and nothing changes.
    pub fn add_child(&mut self, parent: NodeId, action: ButtonSet) -> Result<NodeId, TreeError> {
        let parent_depth = {
            let node = self.node(parent)?;
            if let Some(existing) = node.child(action) {
                return Ok(existing);
            }
            node.depth()
        };

        let child = self
            .arena
            .allocate(Node::new(parent_depth + 1, Some((parent, action))));

        let _inserted = self.node_mut(parent)?.insert_child(action, child);
        debug_assert!(_inserted);

        Ok(child)
    }

    /// Look up the child reached by taking `action` from `parent`.
    pub fn child(&self, parent: NodeId, action: ButtonSet) -> Result<Option<NodeId>, TreeError> {
        Ok(self.node(parent)?.child(action))
    }

    /// Reverse edge lookup; used to reconstruct action sequences.
    pub fn action_leading_to(
        &self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<Option<ButtonSet>, TreeError> {
        Ok(self.node(parent)?.action_leading_to(child))
    }

    /// Number of parent hops from `node_id` to the root.
    pub fn depth(&self, node_id: NodeId) -> Result<u64, TreeError> {
        Ok(self.node(node_id)?.depth())
    }

    /// Record one backpropagated score on a single node.
    pub fn add_score(&mut self, node_id: NodeId, score: f64) -> Result<(), TreeError> {
        self.node_mut(node_id)?.stats_mut().record(score);
        Ok(())
    }

    /// Attach a savestate to a node, replacing any previous one it owned.
    pub fn set_savestate(&mut self, node_id: NodeId, savestate: Savestate) -> Result<(), TreeError> {
        self.node_mut(node_id)?.set_savestate(savestate);
        Ok(())
    }

    pub fn has_savestate(&self, node_id: NodeId) -> Result<bool, TreeError> {
        Ok(self.node(node_id)?.has_savestate())
    }

    pub fn savestate(&self, node_id: NodeId) -> Result<Option<&Savestate>, TreeError> {
        Ok(self.node(node_id)?.savestate())
    }

    /// Rebuild the literal action sequence leading from the root to `node_id`
    /// by walking parent links, in root-to-node order.
    pub fn action_sequence(&self, node_id: NodeId) -> Result<Vec<ButtonSet>, TreeError> {
        let mut sequence = Vec::new();
        let mut current = node_id;

        while let Some((parent, action)) = self.node(current)?.parent() {
            sequence.push(action);
            current = parent;
        }

        sequence.reverse();
        Ok(sequence)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}
