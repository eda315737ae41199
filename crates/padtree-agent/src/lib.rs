mod environment;
mod error;
mod machine;
mod score;
mod score_log;
mod settings;

pub use environment::{Environment, MovieRecorder};
pub use error::AgentError;
pub use machine::{GameStateMachine, Phase};
pub use score::{BCD_ERROR_VALUE, Endianness, ScoreLocation, bcd_to_int, read_score};
pub use score_log::{LogItem, NodeSample, ScoreLog, ScoreLogSink};
pub use settings::{ConsoleSpec, GameSpec, load_console, load_game, save_game};
