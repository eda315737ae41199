use padtree_core::{ButtonSet, NodeId, SearchConfig, Tree};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::{
    environment::{Environment, MovieRecorder},
    error::AgentError,
    score,
    score_log::{ScoreLog, ScoreLogSink},
    settings::{ConsoleSpec, GameSpec},
};

/// How many phase changes one frame may trigger before the machine is
/// declared stuck. A legitimate frame chains only a handful, e.g.
/// simulation into initialisation into playback into expansion.
const MAX_PHASE_HOPS: u32 = 8;

/// The four phases the agent cycles through, one frame at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Mash through menus, then capture the root position.
    Initialisation,
    /// Select and widen the tree, restoring the machine to the chosen node.
    Expansion,
    /// Random rollout from the expanded node, reading the score as it goes.
    Simulation,
    /// Replay the action sequence leading to the best node found so far.
    Playback,
}

#[derive(Debug, Default)]
struct InitFields {
    frames: u64,
    playback_pending: bool,
}

#[derive(Debug, Default)]
struct ExpansionFields {
    expanded: Option<NodeId>,
    action: ButtonSet,
    actions_performed: u64,
}

#[derive(Debug, Default)]
struct SimulationFields {
    node: Option<NodeId>,
    frames: u64,
    held: ButtonSet,
    last_score: u32,
}

#[derive(Debug, Default)]
struct PlaybackFields {
    frames: u64,
    sequence: Vec<ButtonSet>,
}

/// The frame-driven controller that turns tree search into gameplay. Owns the
/// environment, the search tree, and all per-phase bookkeeping; the host calls
/// `step` exactly once per emulated frame.
pub struct GameStateMachine<E> {
    env: E,
    tree: Tree,
    search: SearchConfig,
    console: ConsoleSpec,
    game: GameSpec,
    rng: ChaCha8Rng,
    recorder: Option<Box<dyn MovieRecorder>>,
    log_sink: Option<Box<dyn ScoreLogSink>>,
    score_log: ScoreLog,
    phase: Phase,
    init: InitFields,
    expansion: ExpansionFields,
    simulation: SimulationFields,
    playback: PlaybackFields,
    iterations: u64,
}

impl<E: Environment> GameStateMachine<E> {
    pub fn new(env: E, search: SearchConfig, console: ConsoleSpec, game: GameSpec) -> Self {
        Self::with_seed(env, search, console, game, 0)
    }

    /// Construct with an explicit RNG seed so whole sessions replay
    /// deterministically.
    pub fn with_seed(
        env: E,
        search: SearchConfig,
        console: ConsoleSpec,
        game: GameSpec,
        seed: u64,
    ) -> Self {
        GameStateMachine {
            env,
            tree: Tree::new(),
            search,
            console,
            game,
            rng: ChaCha8Rng::seed_from_u64(seed),
            recorder: None,
            log_sink: None,
            score_log: ScoreLog::new(),
            phase: Phase::Initialisation,
            init: InitFields::default(),
            expansion: ExpansionFields::default(),
            simulation: SimulationFields::default(),
            playback: PlaybackFields::default(),
            iterations: 0,
        }
    }

    /// Bind the movie-recording collaborator.
    pub fn with_recorder(mut self, recorder: Box<dyn MovieRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Bind the score-log persistence collaborator.
    pub fn with_log_sink(mut self, sink: Box<dyn ScoreLogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn score_log(&self) -> &ScoreLog {
        &self.score_log
    }

    /// Completed search iterations so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Advance the agent by one emulated frame: settle any phase changes,
    /// compute this frame's input, and apply it to the environment. Returns
    /// the input that was applied.
    pub fn step(&mut self) -> Result<ButtonSet, AgentError> {
        let frame_score = score::read_score(self.env.memory(), &self.game.score);

        let mut hops = 0;
        loop {
            let desired = self.desired_phase()?;
            if desired == self.phase {
                break;
            }

            self.change_phase(desired)?;

            hops += 1;
            if hops > MAX_PHASE_HOPS {
                return Err(AgentError::PhaseLoop { hops });
            }
        }

        let input = self.phase_input(frame_score);
        self.env.apply_input(input);
        Ok(input)
    }

    /// Where the active phase wants the machine to be for this frame.
    fn desired_phase(&mut self) -> Result<Phase, AgentError> {
        match self.phase {
            Phase::Initialisation => {
                if self.init.frames >= self.game.max_initialisation_frames() {
                    if self.init.playback_pending {
                        Ok(Phase::Playback)
                    } else {
                        Ok(Phase::Expansion)
                    }
                } else {
                    Ok(Phase::Initialisation)
                }
            }
            Phase::Expansion => {
                let Some(expanded) = self.expansion.expanded else {
                    return Ok(Phase::Expansion);
                };

                // The action has been held long enough: the live machine now
                // sits on the expanded position, so capture it.
                if self.expansion.actions_performed >= self.search.expansion_macro_frames as u64
                    && !self.tree.has_savestate(expanded)?
                {
                    let savestate = self.env.save_state();
                    self.tree.set_savestate(expanded, savestate)?;
                }

                if self.tree.has_savestate(expanded)? {
                    Ok(Phase::Simulation)
                } else {
                    Ok(Phase::Expansion)
                }
            }
            Phase::Simulation => {
                let budget = self.search.max_simulation_frames(self.console.frame_rate);
                if self.simulation.frames >= budget {
                    let completing = self.iterations + 1;
                    let frequency = self.search.movie_save_frequency as u64;
                    if frequency > 0 && completing % frequency == 0 {
                        Ok(Phase::Initialisation)
                    } else {
                        Ok(Phase::Expansion)
                    }
                } else {
                    Ok(Phase::Simulation)
                }
            }
            Phase::Playback => {
                if self.playback_index() >= self.playback.sequence.len() {
                    Ok(Phase::Expansion)
                } else {
                    Ok(Phase::Playback)
                }
            }
        }
    }

    fn change_phase(&mut self, next: Phase) -> Result<(), AgentError> {
        let previous = self.phase;
        trace!(?previous, ?next, "phase change");

        self.on_exit(previous)?;
        self.phase = next;
        self.on_enter(next, previous)?;

        Ok(())
    }

    fn on_exit(&mut self, leaving: Phase) -> Result<(), AgentError> {
        match leaving {
            Phase::Initialisation => {
                // The live machine is now the real starting position; commit
                // it as the root.
                let savestate = self.env.save_state();
                self.tree.set_savestate(self.tree.root_id(), savestate)?;
                Ok(())
            }
            Phase::Expansion => {
                let expanded = self.expansion.expanded.ok_or(AgentError::NoExpandedNode)?;
                if self.tree.has_savestate(expanded)? {
                    Ok(())
                } else {
                    Err(AgentError::ExpandedWithoutSavestate { node_id: expanded })
                }
            }
            Phase::Simulation => {
                let node = self.simulation.node.ok_or(AgentError::NoSimulatedNode)?;
                let score = self.simulation.last_score as f64;
                let max_score = self.game.max_score() as f64;

                self.tree
                    .backpropagate(node, score, &self.search, max_score)?;
                self.iterations += 1;
                debug!(iteration = self.iterations, score, "iteration complete");

                self.score_log
                    .update(&self.tree, node, &self.search, max_score)?;
                if self.score_log.should_save(self.search.score_log_save_frequency) {
                    match self.log_sink.as_mut() {
                        Some(sink) => sink.save(&self.score_log),
                        None => debug!("no score log sink bound; skipping flush"),
                    }
                }

                Ok(())
            }
            Phase::Playback => {
                match self.recorder.as_mut() {
                    Some(recorder) => recorder.finish_recording(),
                    None => warn!("no movie recorder bound; cannot finish recording"),
                }
                Ok(())
            }
        }
    }

    fn on_enter(&mut self, entering: Phase, left: Phase) -> Result<(), AgentError> {
        match entering {
            Phase::Initialisation => {
                self.init.frames = 0;
                self.init.playback_pending = left == Phase::Simulation;

                // A playback run gets recorded from power-on.
                if self.init.playback_pending {
                    match self.recorder.as_mut() {
                        Some(recorder) => recorder.start_recording(),
                        None => warn!("no movie recorder bound; cannot start recording"),
                    }
                }

                Ok(())
            }
            Phase::Expansion => {
                self.expansion.expanded = None;
                self.expansion.action = ButtonSet::EMPTY;
                self.expansion.actions_performed = 0;

                let max_score = self.game.max_score() as f64;
                let selected = self.tree.select(&self.search, max_score)?;

                // The machine must mirror the selected node exactly before
                // any expansion input is produced.
                match self.tree.savestate(selected)? {
                    Some(state) => self.env.load_state(state),
                    None => return Err(AgentError::MissingSavestate { node_id: selected }),
                }

                let expanded = self.tree.expand(selected, &self.console.inputs, &mut self.rng)?;
                self.expansion.expanded = Some(expanded);

                // Cache the edge action that reaches the fresh node.
                if let Some((parent, _)) = self.tree.parent(expanded)? {
                    if expanded != selected {
                        let action = self.tree.action_leading_to(parent, expanded)?;
                        debug_assert!(action.is_some());
                        self.expansion.action = action.unwrap_or_default();
                    }
                }

                trace!(
                    selected = selected.index(),
                    expanded = expanded.index(),
                    "expansion ready"
                );
                Ok(())
            }
            Phase::Simulation => {
                if left == Phase::Expansion {
                    self.simulation.node = self.expansion.expanded;
                }
                self.simulation.frames = 0;
                self.simulation.held = ButtonSet::EMPTY;
                self.simulation.last_score = 0;
                Ok(())
            }
            Phase::Playback => {
                self.playback.frames = 0;
                self.playback.sequence = self.tree.action_sequence(self.tree.best_scoring())?;
                debug!(
                    length = self.playback.sequence.len(),
                    "replaying best action sequence"
                );
                Ok(())
            }
        }
    }

    /// This frame's controller input for the active phase.
    fn phase_input(&mut self, frame_score: u32) -> ButtonSet {
        match self.phase {
            Phase::Initialisation => {
                // Mash the menu-skip buttons on even frames so they register
                // as distinct presses, then wait out the rest of the budget.
                let input = if self.init.frames < self.game.init_mash_frames
                    && self.init.frames % 2 == 0
                {
                    self.console.menu_skip
                } else {
                    ButtonSet::EMPTY
                };
                self.init.frames += 1;
                input
            }
            Phase::Expansion => {
                self.expansion.actions_performed += 1;
                self.expansion.action
            }
            Phase::Simulation => {
                if self.simulation.frames % self.search.simulation_macro_frames as u64 == 0 {
                    self.simulation.held = self.console.inputs.random_input(&mut self.rng);
                }
                self.simulation.last_score = frame_score;
                self.simulation.frames += 1;
                self.simulation.held
            }
            Phase::Playback => {
                let input = self
                    .playback
                    .sequence
                    .get(self.playback_index())
                    .copied()
                    .unwrap_or(ButtonSet::EMPTY);
                self.playback.frames += 1;
                input
            }
        }
    }

    /// Which entry of the playback sequence the current frame replays; each
    /// entry is held for the expansion macro length.
    fn playback_index(&self) -> usize {
        let macro_frames = self.search.expansion_macro_frames as u64;
        if macro_frames > 0 {
            (self.playback.frames / macro_frames) as usize
        } else {
            self.playback.frames as usize
        }
    }
}
