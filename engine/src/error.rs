// ═══════════════════════════════════════════════════════════════════════
// Error types
//
// Skill failures are ordinary, recoverable game outcomes: the caller gets
// one back as the `Err` side of a skill invocation and decides whether
// to show it. None of them leave partial state behind.
// ═══════════════════════════════════════════════════════════════════════

use crate::types::GameMode;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SkillError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("insufficient gold: need {needed}, have {available}")]
    InsufficientFunds { needed: u8, available: u8 },
    #[error("blocked by {target}'s jianbukecui shield")]
    ShieldBlocked { target: String },
    #[error("{skill} is cooling down for {rounds} more round(s)")]
    OnCooldown { skill: String, rounds: u32 },
    #[error("{skill} has reached its usage limit")]
    UsageLimitReached { skill: String },
    #[error("{skill} cannot be used that way in {mode} mode")]
    IllegalForMode { skill: String, mode: GameMode },
    #[error("no eligible cities: {0}")]
    NoEligibleCities(String),
    #[error("{skill} was banned by {by}")]
    SkillBanned { skill: String, by: String },
    #[error("movement restricted for {rounds} more round(s)")]
    MovementRestricted { rounds: u32 },
    #[error("unknown skill '{0}'")]
    UnknownSkill(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("the game is already over")]
    GameOver,
    #[error("it is {expected}'s turn, not {actual}'s")]
    NotYourTurn { expected: String, actual: String },
    #[error("invalid deployment: {0}")]
    InvalidDeployment(String),
    #[error(transparent)]
    Skill(#[from] SkillError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{mode} needs {expected} players, got {actual}")]
    PlayerCount { mode: GameMode, expected: usize, actual: usize },
    #[error("duplicate player name '{0}'")]
    DuplicateName(String),
    #[error("player names must not be empty")]
    EmptyName,
    #[error("catalog has {available} cities, need {needed}")]
    NotEnoughCities { needed: usize, available: usize },
    #[error("each player needs at least one city")]
    NoCities,
    #[error("starting gold {0} exceeds the cap")]
    StartingGold(u8),
}
