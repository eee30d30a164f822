// ═══════════════════════════════════════════════════════════════════════
// Chaos Agent — uniform over affordable skills with random arguments.
//
// Most of what it tries is rejected. That is the point: it drives the
// engine through odd corners of every skill while the engine has to
// keep its invariants. Targets and city names come only from the view,
// so disguised cities are addressed by the name the viewer was shown.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{can_afford, Agent, TurnBudget};
use citycard_engine::catalog::{Arity, CityState, Skill, TargetRule, CITIES};
use citycard_engine::engine::Action;
use citycard_engine::skills::{BankOp, SkillParams};
use citycard_engine::types::MAX_ROSTER;
use citycard_engine::visibility::PlayerView;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub const DEFAULT_ACTIONS_PER_TURN: u32 = 4;

pub struct ChaosAgent {
    rng: ChaCha8Rng,
    actions_per_turn: u32,
    budget: TurnBudget,
}

impl ChaosAgent {
    pub fn new(seed: u64) -> Self {
        ChaosAgent {
            rng: ChaCha8Rng::seed_from_u64(seed),
            actions_per_turn: DEFAULT_ACTIONS_PER_TURN,
            budget: TurnBudget::default(),
        }
    }

    pub fn with_actions_per_turn(mut self, n: u32) -> Self {
        self.actions_per_turn = n;
        self
    }

    fn own_cities(&mut self, view: &PlayerView, wanted: CityState, arity: Arity) -> Vec<String> {
        let pool: Vec<String> = view
            .me
            .cities
            .values()
            .filter(|c| state_matches(wanted, c.is_alive))
            .map(|c| c.name.clone())
            .collect();
        pool.choose_multiple(&mut self.rng, arity.max()).cloned().collect()
    }

    fn target(&mut self, view: &PlayerView, rule: TargetRule, wanted: CityState, arity: Arity) -> Option<(String, Vec<String>)> {
        // (name, cities the viewer knows about)
        let mut pool: Vec<(String, Vec<String>)> = Vec::new();
        if matches!(rule, TargetRule::Opponent | TargetRule::Other | TargetRule::Any) {
            for o in view.opponents.iter().filter(|o| !o.defeated) {
                let known = o
                    .known_cities
                    .iter()
                    .filter(|c| state_matches(wanted, c.is_alive))
                    .map(|c| c.shown_as.clone())
                    .collect();
                pool.push((o.name.clone(), known));
            }
        }
        if matches!(rule, TargetRule::Teammate | TargetRule::Other | TargetRule::Any) {
            if let Some(mate) = &view.teammate {
                let cities = mate
                    .cities
                    .values()
                    .filter(|c| state_matches(wanted, c.is_alive))
                    .map(|c| c.name.clone())
                    .collect();
                pool.push((mate.name.clone(), cities));
            }
        }
        let (name, cities) = pool.choose(&mut self.rng)?.clone();
        let picked = cities.choose_multiple(&mut self.rng, arity.max()).cloned().collect();
        Some((name, picked))
    }

    fn params_for(&mut self, view: &PlayerView, skill: Skill) -> SkillParams {
        let def = skill.def();
        let mut params = SkillParams::new();
        params.cities = self.own_cities(view, def.own_state, def.own_cities);
        if def.target != TargetRule::None {
            if let Some((name, cities)) = self.target(view, def.target, def.their_state, def.their_cities) {
                params.target = Some(name);
                params.target_cities = cities;
            }
        }
        params.amount = Some(self.rng.gen_range(1..=view.me.gold.max(1) as u32));
        params.skill = Skill::ALL.choose(&mut self.rng).copied();
        params.bases = Some((self.rng.gen_range(2..=10), self.rng.gen_range(2..=10)));
        params.correct = Some(self.rng.gen_range(0..=3));
        params.bank = Some(if self.rng.gen_bool(0.5) { BankOp::Deposit } else { BankOp::Withdraw });
        params.province = CITIES.choose(&mut self.rng).map(|c| c.province.to_string());
        params.catalog_city = CITIES.choose(&mut self.rng).map(|c| c.name.to_string());
        params
    }

    fn deploy(&mut self, view: &PlayerView) -> Action {
        let alive: Vec<String> = view.me.alive_cities().map(|c| c.name.clone()).collect();
        let n = self.rng.gen_range(1..=MAX_ROSTER);
        Action::Deploy(alive.choose_multiple(&mut self.rng, n).cloned().collect())
    }
}

fn state_matches(wanted: CityState, is_alive: bool) -> bool {
    match wanted {
        CityState::Alive => is_alive,
        CityState::Dead => !is_alive,
        CityState::Any => true,
    }
}

impl Agent for ChaosAgent {
    fn name(&self) -> &str {
        "Chaos"
    }

    fn decide(&mut self, view: &PlayerView) -> Action {
        self.budget.is_new_turn(view.round);
        if !self.budget.spend(self.actions_per_turn) {
            return Action::EndTurn;
        }
        if view.my_roster.is_empty() && self.rng.gen_bool(0.2) {
            return self.deploy(view);
        }

        let affordable: Vec<Skill> = Skill::ALL
            .iter()
            .copied()
            .filter(|s| s.def().legal_in(view.mode) && can_afford(view, *s))
            .collect();
        match affordable.choose(&mut self.rng).copied() {
            Some(skill) => {
                let params = self.params_for(view, skill);
                Action::skill(skill, params)
            }
            None => Action::EndTurn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::price;
    use citycard_engine::setup::create_initial_state;
    use citycard_engine::visibility::player_view;
    use citycard_engine::{GameConfig, GameMode};

    #[test]
    fn test_bounded_actions_per_turn() {
        let s = create_initial_state(&GameConfig::for_mode(GameMode::TwoPlayer, 3)).unwrap();
        let view = player_view(&s, &s.players[0].name).unwrap();
        let mut agent = ChaosAgent::new(3).with_actions_per_turn(2);
        assert_ne!(agent.decide(&view), Action::EndTurn);
        assert_ne!(agent.decide(&view), Action::EndTurn);
        assert_eq!(agent.decide(&view), Action::EndTurn);
    }

    #[test]
    fn test_only_affordable_skills() {
        let mut s = create_initial_state(&GameConfig::for_mode(GameMode::ThreePlayer, 11)).unwrap();
        s.players[0].gold = 3;
        s.rosters.insert(s.players[0].name.clone(), vec!["x".into()]);
        let view = player_view(&s, &s.players[0].name).unwrap();
        let mut agent = ChaosAgent::new(11).with_actions_per_turn(200);
        for _ in 0..200 {
            match agent.decide(&view) {
                Action::UseSkill { skill, params } => {
                    assert!(price(&view, skill) <= 3, "{} is too dear", skill.name());
                    assert!(skill.def().own_cities.max() >= params.cities.len());
                }
                Action::Deploy(_) => panic!("already deployed"),
                Action::EndTurn => {}
            }
        }
    }

    #[test]
    fn test_targets_are_other_players() {
        let mut s = create_initial_state(&GameConfig::for_mode(GameMode::TwoVsTwo, 2)).unwrap();
        s.players[0].gold = 24;
        let me = s.players[0].name.clone();
        let view = player_view(&s, &me).unwrap();
        let mut agent = ChaosAgent::new(2).with_actions_per_turn(300);
        for _ in 0..300 {
            if let Action::UseSkill { params, .. } = agent.decide(&view) {
                assert_ne!(params.target.as_deref(), Some(me.as_str()));
            }
        }
    }
}
