// ═══════════════════════════════════════════════════════════════════════
// Game Engine — action resolution
//
// Architecture:
//   The engine is a pure state machine. It never does I/O or calls agents.
//   The acting seat is always `state.current_player`; the runner reads it,
//   asks that seat's agent for an Action, and feeds it back through
//   `apply_action()`.
//
// Flow:
//   1. Runner asks the current player's agent for an Action
//   2. `apply_action` checks the actor and dispatches:
//        UseSkill → skill pipeline (state untouched on failure)
//        Deploy   → roster for this round
//        EndTurn  → turn/round state machine
//   3. Repeat until state.outcome is Some
// ═══════════════════════════════════════════════════════════════════════

use crate::catalog::Skill;
use crate::error::EngineError;
use crate::skills::{self, SkillOutcome, SkillParams, SkillRegistry};
use crate::turn::{self, TurnReport};
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Actions that agents can submit on their turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Invoke one skill. Any number may be used per turn.
    UseSkill { skill: Skill, params: SkillParams },

    /// Choose up to three cities to fight this round.
    Deploy(Vec<String>),

    /// Hand the turn to the next standing player.
    EndTurn,
}

impl Action {
    pub fn skill(skill: Skill, params: SkillParams) -> Self {
        Action::UseSkill { skill, params }
    }
}

/// What an accepted action produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Skill(SkillOutcome),
    Deployed,
    TurnEnded(TurnReport),
}

/// Apply one action for `actor`. Only the current player may act, and
/// nothing is accepted once the game is over.
pub fn apply_action(
    state: &mut GameState,
    registry: &SkillRegistry,
    actor: &str,
    action: Action,
) -> Result<ActionOutcome, EngineError> {
    if state.is_over() {
        return Err(EngineError::GameOver);
    }
    let expected = state.current().name.clone();
    if expected != actor {
        return Err(EngineError::NotYourTurn {
            expected,
            actual: actor.to_string(),
        });
    }

    match action {
        Action::UseSkill { skill, params } => {
            let outcome = skills::execute(state, registry, actor, skill, &params)?;
            // A skill can end the game outright (a center falls with no heir).
            turn::run_inheritance(state);
            turn::check_game_over(state);
            Ok(ActionOutcome::Skill(outcome))
        }
        Action::Deploy(cities) => {
            let seat = state.current_player;
            turn::deploy(state, seat, &cities)?;
            Ok(ActionOutcome::Deployed)
        }
        Action::EndTurn => Ok(ActionOutcome::TurnEnded(turn::end_turn(state)?)),
    }
}
