use padtree_core::{NodeId, SearchConfig, Tree};
use serde::Serialize;

use crate::error::AgentError;

/// The logged view of one tree node at the moment an iteration completed.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NodeSample {
    pub ucb_score: f64,
    pub average_score: f64,
    pub depth: u64,
}

/// One record per completed search iteration.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LogItem {
    pub iteration: u64,
    pub best: NodeSample,
    pub simulated: NodeSample,
}

/// Where flushed log records go. CSV layout and file handling belong to the
/// host; the agent only decides when to flush.
pub trait ScoreLogSink {
    fn save(&mut self, log: &ScoreLog);
}

/// A log of how the best scores in the tree develop over time.
#[derive(Debug)]
pub struct ScoreLog {
    items: Vec<LogItem>,
    iteration: u64,
}

impl ScoreLog {
    pub fn new() -> Self {
        ScoreLog {
            items: Vec::with_capacity(100),
            iteration: 0,
        }
    }

    pub fn items(&self) -> &[LogItem] {
        &self.items
    }

    /// Number of iterations recorded so far.
    pub fn current_iteration(&self) -> u64 {
        self.iteration
    }

    /// Record the iteration that just completed: a sample of the current
    /// best-scoring node and of the node that was simulated.
    pub fn update(
        &mut self,
        tree: &Tree,
        simulated: NodeId,
        config: &SearchConfig,
        max_score: f64,
    ) -> Result<(), AgentError> {
        self.iteration += 1;

        let item = LogItem {
            iteration: self.iteration,
            best: Self::sample(tree, tree.best_scoring(), config, max_score)?,
            simulated: Self::sample(tree, simulated, config, max_score)?,
        };
        self.items.push(item);

        Ok(())
    }

    /// Whether the configured flush cadence falls on the current iteration.
    pub fn should_save(&self, frequency: u32) -> bool {
        frequency > 0 && self.iteration % frequency as u64 == 0
    }

    fn sample(
        tree: &Tree,
        node: NodeId,
        config: &SearchConfig,
        max_score: f64,
    ) -> Result<NodeSample, AgentError> {
        Ok(NodeSample {
            ucb_score: tree.node_ucb(node, config, max_score)?,
            average_score: tree.average_score(node)?,
            depth: tree.depth(node)?,
        })
    }
}

impl Default for ScoreLog {
    fn default() -> Self {
        ScoreLog::new()
    }
}
