use std::{fmt, fs, path::Path};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tree::{
    buttons::{ButtonSet, InputSpace},
    error::TreeError,
    ids::NodeId,
    search_tree::Tree,
};

const DEFAULT_SEARCH_CONFIG_YAML: &str = include_str!("../../config/search.default.yaml");

/// Safety bound on the selection walk. The tree cannot legitimately be this
/// deep; exceeding the bound means selection is cycling and the tree invariants
/// are broken.
const SELECTION_STEP_LIMIT: usize = 1000;

/// Search configuration for the UCT engine. Immutable once handed to a state
/// machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight of the exploration term against the exploitation term.
    pub exploration_bias: f64,
    /// Base urgency granted to the not-yet-added actions of a node during
    /// partial expansion.
    pub partial_expansion_base: f64,
    /// How many frames the expansion action is held before the expanded node's
    /// savestate is captured.
    pub expansion_macro_frames: u32,
    /// How many frames each random rollout input is held before re-rolling.
    pub simulation_macro_frames: u32,
    /// Maximum rollout length, in seconds of emulated time.
    pub max_simulation_seconds: f64,
    /// Flush the score log every this many completed iterations.
    pub score_log_save_frequency: u32,
    /// Record a full playback movie every this many completed iterations;
    /// zero disables playback runs entirely.
    pub movie_save_frequency: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            exploration_bias: 0.5,
            partial_expansion_base: 1.0,
            expansion_macro_frames: 1,
            simulation_macro_frames: 1,
            max_simulation_seconds: 120.0,
            score_log_save_frequency: 10,
            movie_save_frequency: 50,
        }
    }
}

impl SearchConfig {
    /// Parse a search config from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SearchConfigError> {
        let config: SearchConfig = serde_yaml::from_str(yaml).map_err(SearchConfigError::Yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a search config from a YAML file path.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self, SearchConfigError> {
        let yaml = fs::read_to_string(path).map_err(SearchConfigError::Io)?;
        Self::from_yaml_str(&yaml)
    }

    /// Return the default YAML config included with this crate.
    pub fn default_yaml() -> &'static str {
        DEFAULT_SEARCH_CONFIG_YAML
    }

    /// Parse the default YAML config included with this crate.
    pub fn from_default_yaml() -> Result<Self, SearchConfigError> {
        Self::from_yaml_str(Self::default_yaml())
    }

    /// The rollout frame budget for a given console frame rate.
    pub fn max_simulation_frames(&self, frame_rate: u32) -> u64 {
        (frame_rate as f64 * self.max_simulation_seconds) as u64
    }

    fn validate(&self) -> Result<(), SearchConfigError> {
        if !self.exploration_bias.is_finite() || self.exploration_bias < 0.0 {
            return Err(SearchConfigError::Invalid(
                "exploration_bias must be finite and >= 0".to_string(),
            ));
        }
        if !self.partial_expansion_base.is_finite() {
            return Err(SearchConfigError::Invalid(
                "partial_expansion_base must be finite".to_string(),
            ));
        }
        if self.expansion_macro_frames == 0 {
            return Err(SearchConfigError::Invalid(
                "expansion_macro_frames must be greater than 0".to_string(),
            ));
        }
        if self.simulation_macro_frames == 0 {
            return Err(SearchConfigError::Invalid(
                "simulation_macro_frames must be greater than 0".to_string(),
            ));
        }
        if !self.max_simulation_seconds.is_finite() || self.max_simulation_seconds <= 0.0 {
            return Err(SearchConfigError::Invalid(
                "max_simulation_seconds must be finite and > 0".to_string(),
            ));
        }
        if self.score_log_save_frequency == 0 {
            return Err(SearchConfigError::Invalid(
                "score_log_save_frequency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Error type for loading and validating `SearchConfig`.
#[derive(Debug)]
pub enum SearchConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for SearchConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchConfigError::Io(err) => write!(f, "failed to read config file: {err}"),
            SearchConfigError::Yaml(err) => write!(f, "failed to parse config YAML: {err}"),
            SearchConfigError::Invalid(err) => write!(f, "invalid search config: {err}"),
        }
    }
}

impl std::error::Error for SearchConfigError {}

impl Tree {
    /// UCB1 score of `child` as seen from `parent`. Either side being
    /// unvisited forces +infinity so the pair is explored first; the
    /// exploitation term is the child's average normalised by the domain
    /// maximum score (itself +infinity for a degenerate zero maximum).
    pub fn ucb_score(
        &self,
        parent: NodeId,
        child: NodeId,
        config: &SearchConfig,
        max_score: f64,
    ) -> Result<f64, TreeError> {
        let parent_visits = self.node(parent)?.stats().visits();
        let child_stats = *self.node(child)?.stats();

        if parent_visits > 0 && child_stats.visits() > 0 {
            let radical =
                (2.0 * (parent_visits as f64).ln() / child_stats.visits() as f64).sqrt();
            Ok(child_stats.normalised_average(max_score) + config.exploration_bias * radical)
        } else {
            Ok(f64::INFINITY)
        }
    }

    /// Standalone UCB of a node: scored against its own parent, or just the
    /// normalised average for the root. Used for best-node tracking and
    /// telemetry, where the nodes being compared need not share a parent.
    pub fn node_ucb(
        &self,
        node_id: NodeId,
        config: &SearchConfig,
        max_score: f64,
    ) -> Result<f64, TreeError> {
        match self.node(node_id)?.parent() {
            Some((parent, _)) => self.ucb_score(parent, node_id, config, max_score),
            None => Ok(self.node(node_id)?.stats().normalised_average(max_score)),
        }
    }

    /// Whether selection should stop at this node and widen it instead of
    /// descending. True for leaves; otherwise the partial-expansion urgency
    /// must beat the UCB score of at least one existing child. Growing the
    /// branching factor with visit count keeps large action spaces tractable.
    pub fn needs_expanding(
        &self,
        node_id: NodeId,
        config: &SearchConfig,
        max_score: f64,
    ) -> Result<bool, TreeError> {
        let (visits, children): (u64, Vec<NodeId>) = {
            let node = self.node(node_id)?;
            if node.is_leaf() {
                return Ok(true);
            }
            (
                node.stats().visits(),
                node.children().map(|(_, id)| id).collect(),
            )
        };

        let radical =
            (2.0 * (visits as f64).ln() / (1.0 + children.len() as f64)).sqrt();
        let urgency = config.partial_expansion_base + config.exploration_bias * radical;

        for child in children {
            if urgency > self.ucb_score(node_id, child, config, max_score)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Descend from the root towards the most urgent node: the first node on
    /// the highest-UCB path that needs widening. The walk is bounded; running
    /// past the bound means the tree is malformed and is reported as fatal.
    pub fn select(&self, config: &SearchConfig, max_score: f64) -> Result<NodeId, TreeError> {
        let mut current = self.root_id();

        for _ in 0..SELECTION_STEP_LIMIT {
            if self.needs_expanding(current, config, max_score)? {
                return Ok(current);
            }

            match self.select_child(current, config, max_score)? {
                Some(next) => {
                    debug_assert_ne!(next, current);
                    current = next;
                }
                // Only leaves have no selectable child, and leaves were
                // already returned above.
                None => return Ok(current),
            }
        }

        Err(TreeError::SelectionBudgetExhausted {
            limit: SELECTION_STEP_LIMIT,
        })
    }

    /// The child with the highest UCB score, or None for a leaf. Ties keep
    /// the first candidate seen.
    fn select_child(
        &self,
        parent: NodeId,
        config: &SearchConfig,
        max_score: f64,
    ) -> Result<Option<NodeId>, TreeError> {
        let children: Vec<NodeId> = self.node(parent)?.children().map(|(_, id)| id).collect();
        let mut best: Option<(NodeId, f64)> = None;

        for child in children {
            let score = self.ucb_score(parent, child, config, max_score)?;
            best = match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((child, score)),
            };
        }

        Ok(best.map(|(id, _)| id))
    }

    /// Widen `node_id` by one not-yet-tried action, chosen uniformly at
    /// random, and return the fresh child. If every legal action already has
    /// an edge the node is returned unchanged.
    pub fn expand<R: Rng>(
        &mut self,
        node_id: NodeId,
        inputs: &InputSpace,
        rng: &mut R,
    ) -> Result<NodeId, TreeError> {
        let mut unused: Vec<ButtonSet> = {
            let node = self.node(node_id)?;
            inputs
                .all_inputs()
                .into_iter()
                .filter(|action| !node.contains_action(*action))
                .collect()
        };

        if unused.is_empty() {
            return Ok(node_id);
        }

        let action = unused.swap_remove(rng.gen_range(0..unused.len()));
        self.add_child(node_id, action)?;

        self.select_expanded_child(node_id)
    }

    /// The single unvisited child of `parent`, i.e. the node expansion just
    /// created. Anything other than exactly one such child means an iteration
    /// was backpropagated incorrectly.
    pub fn select_expanded_child(&self, parent: NodeId) -> Result<NodeId, TreeError> {
        let mut expanded = None;

        for (_, child) in self.node(parent)?.children() {
            if self.node(child)?.stats().is_unvisited() {
                if expanded.is_some() {
                    return Err(TreeError::NoUnvisitedChild { node_id: parent });
                }
                expanded = Some(child);
            }
        }

        expanded.ok_or(TreeError::NoUnvisitedChild { node_id: parent })
    }

    /// Add `score` to `node_id` and every ancestor up to the root, visiting
    /// each exactly once. While walking, the tracked best-scoring node is
    /// replaced by any touched node whose standalone UCB beats it; the two
    /// sides of that comparison may sit anywhere in the tree.
    pub fn backpropagate(
        &mut self,
        node_id: NodeId,
        score: f64,
        config: &SearchConfig,
        max_score: f64,
    ) -> Result<(), TreeError> {
        let mut current = Some(node_id);

        while let Some(id) = current {
            self.node_mut(id)?.stats_mut().record(score);

            let best_ucb = self.node_ucb(self.best_scoring(), config, max_score)?;
            let touched_ucb = self.node_ucb(id, config, max_score)?;
            if touched_ucb > best_ucb {
                self.set_best_scoring(id);
            }

            current = self.node(id)?.parent().map(|(parent, _)| parent);
        }

        Ok(())
    }
}
