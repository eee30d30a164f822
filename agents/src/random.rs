// ═══════════════════════════════════════════════════════════════════════
// Random Agent — the weighted AI policy.
//
// Once per turn it rolls against `act_chance`. On a hit, and with at
// least 1 gold, it picks uniformly among whichever of these apply:
//   heal     — 快速治疗 on the most injured live city
//   protect  — 城市保护 on the center, or on the strongest non-center
//              city where center protection is not allowed
//   loan     — 金币贷款 while gold < 20
// Then it ends its turn. Serves as the default opponent seat.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{can_afford, Agent, TurnBudget};
use citycard_engine::catalog::Skill;
use citycard_engine::engine::Action;
use citycard_engine::skills::SkillParams;
use citycard_engine::visibility::PlayerView;
use citycard_engine::types::City;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub const DEFAULT_ACT_CHANCE: f64 = 0.3;
const LOAN_BELOW: u8 = 20;

pub struct RandomAgent {
    rng: ChaCha8Rng,
    act_chance: f64,
    budget: TurnBudget,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        RandomAgent {
            rng: ChaCha8Rng::seed_from_u64(seed),
            act_chance: DEFAULT_ACT_CHANCE,
            budget: TurnBudget::default(),
        }
    }

    pub fn with_act_chance(mut self, chance: f64) -> Self {
        self.act_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Every move the policy would consider right now.
    pub fn candidates(view: &PlayerView) -> Vec<Action> {
        let me = &view.me;
        let mut moves = Vec::new();

        let injured = me
            .alive_cities()
            .filter(|c| c.is_injured())
            .max_by_key(|c| c.hp - c.current_hp);
        if let Some(city) = injured {
            if can_afford(view, Skill::QuickHeal) {
                moves.push(Action::skill(Skill::QuickHeal, SkillParams::new().city(&city.name)));
            }
        }

        if can_afford(view, Skill::CityProtection) {
            let center_allowed = !Skill::CityProtection.def().no_center_in.contains(&view.mode);
            let pick: Option<&City> = if center_allowed {
                me.center().filter(|c| c.is_alive)
            } else {
                me.alive_non_center_by_hp().into_iter().last()
            };
            if let Some(city) = pick.filter(|c| !view.my_protections.contains_key(&c.name)) {
                moves.push(Action::skill(Skill::CityProtection, SkillParams::new().city(&city.name)));
            }
        }

        if me.gold < LOAN_BELOW && can_afford(view, Skill::GoldLoan) {
            moves.push(Action::skill(Skill::GoldLoan, SkillParams::new()));
        }

        moves
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        "Random"
    }

    fn decide(&mut self, view: &PlayerView) -> Action {
        if !self.budget.is_new_turn(view.round) {
            return Action::EndTurn;
        }
        if view.me.gold < 1 || !self.rng.gen_bool(self.act_chance) {
            return Action::EndTurn;
        }
        let moves = Self::candidates(view);
        match moves.choose(&mut self.rng) {
            Some(action) => {
                debug!("{} picks {:?}", view.viewer, action);
                action.clone()
            }
            None => Action::EndTurn,
        }
    }
}
