pub mod runner;
pub mod database;

pub use database::{Database, Standing};
pub use runner::{make_agents, run_batch, run_game, AgentKind, GameResult, PlayerResult};

use citycard_engine::{ConfigError, EngineError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("bad config: {0}")]
    Config(#[from] ConfigError),
    #[error("game exceeded {max_decisions} decisions without finishing (round {round})")]
    Stuck { max_decisions: usize, round: u32 },
    #[error("no agent for player '{0}'")]
    MissingAgent(String),
    #[error("unknown agent kind '{0}'")]
    UnknownAgentKind(String),
}
