// ═══════════════════════════════════════════════════════════════════════
// Agent Trait — interface that all AI agents must implement
//
// KEY DESIGN PRINCIPLE:
//   Agents receive a `PlayerView` (not raw GameState), which only
//   contains information the player is legally allowed to see.
//
//   The agent never gets to see:
//     - Opponents' cities it has not come across
//     - Real names and HP behind a disguise or mirage
//     - Other players' private log entries
//     - The pool of undealt cities
//
// The runner keeps asking the current player's agent for actions until
// it answers `Action::EndTurn`. A rejected action is not retried by the
// engine, so an agent must make progress towards ending its turn.
// ═══════════════════════════════════════════════════════════════════════

use citycard_engine::catalog::{Skill, PAID_TIER_THRESHOLD};
use citycard_engine::engine::Action;
use citycard_engine::visibility::PlayerView;

/// Trait that all AI agents must implement.
pub trait Agent: Send + Sync {
    /// Human-readable name for this agent (e.g., "Random", "Chaos").
    fn name(&self) -> &str;

    /// Pick the next action for the viewer's turn.
    fn decide(&mut self, view: &PlayerView) -> Action;
}

/// Gold the viewer would pay for `skill` right now, surcharge included.
pub fn price(view: &PlayerView, skill: Skill) -> u8 {
    let base = skill.def().cost_in(view.mode);
    if view.cost_increased && base >= PAID_TIER_THRESHOLD {
        (base as u32 * 3).div_ceil(2).min(u8::MAX as u32) as u8
    } else {
        base
    }
}

pub fn can_afford(view: &PlayerView, skill: Skill) -> bool {
    view.me.gold >= price(view, skill)
}

/// Tracks which turn an agent last acted on, so it acts at most a fixed
/// number of times per turn no matter how often it is asked.
#[derive(Debug, Clone, Default)]
pub struct TurnBudget {
    round: Option<u32>,
    used: u32,
}

impl TurnBudget {
    /// True the first time it is called in a new round.
    pub fn is_new_turn(&mut self, round: u32) -> bool {
        if self.round == Some(round) {
            return false;
        }
        self.round = Some(round);
        self.used = 0;
        true
    }

    /// Take one action from the budget, if any is left.
    pub fn spend(&mut self, limit: u32) -> bool {
        if self.used >= limit {
            return false;
        }
        self.used += 1;
        true
    }
}
