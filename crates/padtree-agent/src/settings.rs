use std::{fs, path::Path};

use padtree_core::{ButtonSet, InputSpace};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::AgentError, score::ScoreLocation};

/// Fixed characteristics of the console being played, including its legal
/// input space. The defaults describe a NES-style pad with the usual
/// A, B, Select, Start, Up, Down, Left, Right bit order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSpec {
    /// Frames executed per second of emulated time.
    pub frame_rate: u32,
    /// Size of work RAM in bytes.
    pub ram_size: usize,
    /// The button(s) that skip title screens and menus.
    pub menu_skip: ButtonSet,
    /// The legal one-frame inputs.
    pub inputs: InputSpace,
}

impl Default for ConsoleSpec {
    fn default() -> Self {
        ConsoleSpec {
            frame_rate: 60,
            ram_size: 0x800,
            menu_skip: ButtonSet::new(1 << 3),
            inputs: InputSpace::new(
                vec![
                    ButtonSet::new(1 << 4),
                    ButtonSet::new(1 << 5),
                    ButtonSet::new(1 << 6),
                    ButtonSet::new(1 << 7),
                ],
                ButtonSet::new(0b11),
            ),
        }
    }
}

/// Per-game knowledge: how long booting takes and where the score lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSpec {
    pub name: String,
    /// Frames during which the menu-skip buttons are mashed after power-on.
    pub init_mash_frames: u64,
    /// Total frames to wait before the root position is captured.
    pub init_total_frames: u64,
    /// The reward descriptor.
    pub score: ScoreLocation,
}

impl Default for GameSpec {
    fn default() -> Self {
        GameSpec {
            name: "None".to_string(),
            init_mash_frames: 0,
            init_total_frames: 0,
            score: ScoreLocation::default(),
        }
    }
}

impl GameSpec {
    /// The full initialisation budget; mashing may not outlast it.
    pub fn max_initialisation_frames(&self) -> u64 {
        self.init_mash_frames.max(self.init_total_frames)
    }

    /// Maximum expressible score given the BCD digit count.
    pub fn max_score(&self) -> u32 {
        self.score.max_score()
    }

    pub fn has_valid_score_location(&self) -> bool {
        self.score.offset != 0 && self.score.is_valid()
    }
}

/// Load a console spec from a YAML file.
pub fn load_console(path: impl AsRef<Path>) -> Result<ConsoleSpec, AgentError> {
    let yaml = fs::read_to_string(path)?;
    let spec: ConsoleSpec = serde_yaml::from_str(&yaml)?;
    info!(frame_rate = spec.frame_rate, "loaded console settings");
    Ok(spec)
}

/// Load a game spec from a YAML file.
pub fn load_game(path: impl AsRef<Path>) -> Result<GameSpec, AgentError> {
    let yaml = fs::read_to_string(path)?;
    let spec: GameSpec = serde_yaml::from_str(&yaml)?;
    info!(game = %spec.name, "loaded game settings");
    Ok(spec)
}

/// Serialize and write a game spec to YAML.
pub fn save_game(path: impl AsRef<Path>, spec: &GameSpec) -> Result<(), AgentError> {
    let yaml = serde_yaml::to_string(spec)?;
    fs::write(path, yaml)?;
    Ok(())
}
