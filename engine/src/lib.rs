pub mod types;
pub mod catalog;
pub mod config;
pub mod error;
pub mod journal;
pub mod usage;
pub mod ledger;
pub mod skills;
pub mod turn;
pub mod combat;
pub mod setup;
pub mod engine;
pub mod visibility;

mod tests;

pub use types::*;
pub use catalog::{Skill, SkillDef, CITIES};
pub use config::GameConfig;
pub use engine::{apply_action, Action, ActionOutcome};
pub use error::{ConfigError, EngineError, SkillError};
pub use skills::{execute_skill, SkillOutcome, SkillParams, SkillRegistry, SkillReport};
pub use turn::TurnReport;
pub use combat::{BattleReport, Front, Landing};
