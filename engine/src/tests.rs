// ═══════════════════════════════════════════════════════════════════════
// Test suite for the city card engine
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use crate::catalog::{Arity, CityState, Skill, TargetRule, CITIES};
    use crate::combat::{resolve_battle, Landing, KILL_GOLD};
    use crate::config::GameConfig;
    use crate::engine::{apply_action, Action, ActionOutcome};
    use crate::error::{EngineError, SkillError};
    use crate::ledger::{Barrier, BattleMarker, Disguise};
    use crate::setup::create_initial_state;
    use crate::skills::{self, strike_city, BankOp, Harm, SkillOutcome, SkillParams, SkillRegistry, StrikeResult};
    use crate::turn::{self, check_game_over, end_turn, is_player_defeated, run_inheritance};
    use crate::types::*;
    use crate::visibility::player_view;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    // ── Helper: create states and poke at them ───────────────────────────

    fn game(mode: GameMode, seed: u64) -> GameState {
        create_initial_state(&GameConfig::for_mode(mode, seed)).unwrap()
    }

    fn name(state: &GameState, seat: usize) -> String {
        state.players[seat].name.clone()
    }

    fn center(state: &GameState, seat: usize) -> String {
        state.players[seat].center_city_name.clone()
    }

    fn weakest(state: &GameState, seat: usize) -> String {
        state.players[seat].alive_non_center_by_hp()[0].name.clone()
    }

    fn strongest(state: &GameState, seat: usize) -> String {
        state.players[seat]
            .alive_non_center_by_hp()
            .last()
            .map(|c| c.name.clone())
            .unwrap()
    }

    fn city<'a>(state: &'a GameState, seat: usize, city: &str) -> &'a City {
        state.players[seat].city(city).unwrap()
    }

    fn kill_center(state: &mut GameState, seat: usize) {
        let c = center(state, seat);
        state.players[seat].city_mut(&c).unwrap().kill();
    }

    fn cast(state: &mut GameState, seat: usize, skill: Skill, params: SkillParams) -> Result<SkillOutcome, SkillError> {
        let caster = name(state, seat);
        skills::execute(state, &SkillRegistry::standard(), &caster, skill, &params)
    }

    fn against(state: &GameState, seat: usize) -> SkillParams {
        SkillParams::new().target(&name(state, seat))
    }

    /// Cast at another seat; `params` gets the target filled in.
    fn cast_on(state: &mut GameState, seat: usize, skill: Skill, target: usize, params: SkillParams) -> Result<SkillOutcome, SkillError> {
        let params = params.target(&name(state, target));
        cast(state, seat, skill, params)
    }

    /// Run a full game with random actions (seed-deterministic).
    fn play_full_game_random(seed: u64, mode: GameMode) -> GameState {
        let mut state = game(mode, seed);
        let registry = SkillRegistry::standard();

        let mut step = 0u64;
        while !state.is_over() && step < 4_000 {
            step += 1;
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(step.wrapping_mul(999961)));
            let actor = state.current().name.clone();
            let action = random_action(&state, &actor, &mut rng);
            let _ = apply_action(&mut state, &registry, &actor, action);
            assert_invariants(&state);
        }
        state
    }

    /// Produce a random action for whoever is acting. Most are illegal;
    /// the engine is expected to reject those without side effects.
    fn random_action(state: &GameState, actor: &str, rng: &mut ChaCha8Rng) -> Action {
        let roll: f64 = rng.gen();
        if roll < 0.1 {
            let alive: Vec<String> = state
                .player(actor)
                .map(|p| p.alive_cities().map(|c| c.name.clone()).collect())
                .unwrap_or_default();
            let n = rng.gen_range(1..=MAX_ROSTER);
            return Action::Deploy(alive.choose_multiple(rng, n).cloned().collect());
        }
        if roll < 0.65 {
            let skill = *Skill::ALL.choose(rng).unwrap();
            return Action::skill(skill, random_params(state, actor, skill, rng));
        }
        Action::EndTurn
    }

    fn pick_cities(player: &Player, wanted: CityState, arity: Arity, rng: &mut ChaCha8Rng) -> Vec<String> {
        let pool: Vec<String> = player
            .cities
            .values()
            .filter(|c| match wanted {
                CityState::Alive => c.is_alive,
                CityState::Dead => !c.is_alive,
                CityState::Any => true,
            })
            .map(|c| c.name.clone())
            .collect();
        let n = arity.max();
        pool.choose_multiple(rng, n).cloned().collect()
    }

    fn random_params(state: &GameState, actor: &str, skill: Skill, rng: &mut ChaCha8Rng) -> SkillParams {
        let def = skill.def();
        let mut params = SkillParams::new();
        let me = state.player(actor).unwrap();
        params.cities = pick_cities(me, def.own_state, def.own_cities, rng);

        let others: Vec<&Player> = state.players.iter().filter(|p| p.name != actor).collect();
        if def.target != TargetRule::None {
            if let Some(target) = others.choose(rng) {
                params = params.target(&target.name);
                params.target_cities = pick_cities(target, def.their_state, def.their_cities, rng);
            }
        }

        params.amount = Some(rng.gen_range(1..=6));
        params.skill = Skill::ALL.choose(rng).copied();
        params.bases = Some((rng.gen_range(2..=10), rng.gen_range(2..=10)));
        params.correct = Some(rng.gen_range(0..=3));
        params.bank = Some(if rng.gen_bool(0.5) { BankOp::Deposit } else { BankOp::Withdraw });
        if let Some(def) = CITIES.choose(rng) {
            params.province = Some(def.province.to_string());
        }
        params.catalog_city = state.unused_cities.choose(rng).cloned();
        params
    }

    fn assert_invariants(state: &GameState) {
        for p in &state.players {
            assert!(p.gold <= GOLD_CAP, "{} holds {} gold", p.name, p.gold);
            assert!(p.cities.values().filter(|c| c.is_center).count() <= 1);
            for c in p.cities.values() {
                assert!(c.current_hp <= c.hp, "{} at {}/{}", c.name, c.current_hp, c.hp);
                assert_eq!(c.is_alive, c.current_hp > 0, "{} alive flag out of step", c.name);
            }
        }
    }

    // ═════════════════════════════════════════════════════════════════════
    // CATALOG TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_every_skill_has_a_handler() {
        let reg = SkillRegistry::standard();
        assert!(reg.missing().is_empty(), "missing: {:?}", reg.missing());
        assert_eq!(reg.len(), Skill::ALL.len());
    }

    #[test]
    fn test_skill_names_round_trip() {
        let mut names = HashSet::new();
        for skill in Skill::ALL {
            assert!(names.insert(skill.name()), "{} listed twice", skill.name());
            assert_eq!(Skill::from_name(skill.name()), Some(skill));
        }
        assert_eq!(Skill::from_name("不存在的技能"), None);
    }

    #[test]
    fn test_unknown_skill_name_rejected() {
        let mut state = game(GameMode::TwoPlayer, 1);
        let caster = name(&state, 0);
        let err = skills::execute_skill(&mut state, &SkillRegistry::standard(), &caster, "不存在", &SkillParams::new());
        assert_eq!(err, Err(SkillError::UnknownSkill("不存在".into())));

        let ok = skills::execute_skill(&mut state, &SkillRegistry::standard(), &caster, "金币贷款", &SkillParams::new());
        assert!(ok.is_ok());
    }

    #[test]
    fn test_empty_registry_has_no_handlers() {
        let mut state = game(GameMode::TwoPlayer, 1);
        let caster = name(&state, 0);
        let err = skills::execute(&mut state, &SkillRegistry::new(), &caster, Skill::GoldLoan, &SkillParams::new());
        assert!(matches!(err, Err(SkillError::UnknownSkill(_))));
        assert_eq!(state.players[0].gold, STARTING_GOLD);
    }

    #[test]
    fn test_costs_follow_the_price_list() {
        let pinned = [
            (Skill::LastStand, 6),
            (Skill::Unblock, 7),
            (Skill::Feint, 3),
            (Skill::Surge, 8),
            (Skill::SurroundedBySongs, 23),
            (Skill::TransferGold, 0),
        ];
        for (skill, cost) in pinned {
            assert_eq!(skill.def().cost, cost, "{}", skill.name());
        }
        assert_eq!(Skill::HoldPosition.def().cost_in(GameMode::TwoPlayer), 2);
        assert_eq!(Skill::HoldPosition.def().cost_in(GameMode::ThreePlayer), 4);
    }

    #[test]
    fn test_jianbukecui_only_turns_away_targeted_skills() {
        for skill in Skill::ALL {
            if skill.blocked_by_jianbukecui() {
                assert_ne!(skill.def().target, TargetRule::None, "{} names nobody", skill.name());
            }
        }
        assert!(!Skill::Decisive.blocked_by_jianbukecui());
        assert!(!Skill::SetBarrier.blocked_by_jianbukecui());
    }

    // ═════════════════════════════════════════════════════════════════════
    // PIPELINE TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_insufficient_gold_leaves_state_untouched() {
        let mut state = game(GameMode::TwoPlayer, 3);
        let city = weakest(&state, 0);
        let logs = state.journal.len();
        let err = cast(&mut state, 0, Skill::CityProtection, SkillParams::new().city(&city));
        assert_eq!(err, Err(SkillError::InsufficientFunds { needed: 3, available: STARTING_GOLD }));
        assert_eq!(state.players[0].gold, STARTING_GOLD);
        assert_eq!(state.journal.len(), logs);
        assert!(!state.ledger.has_protection(&name(&state, 0), &city));
    }

    #[test]
    fn test_center_protection_illegal_in_two_player() {
        let mut state = game(GameMode::TwoPlayer, 3);
        state.players[0].gold = 10;
        let c = center(&state, 0);
        let err = cast(&mut state, 0, Skill::CityProtection, SkillParams::new().city(&c));
        assert!(matches!(err, Err(SkillError::IllegalForMode { .. })));

        let mut state = game(GameMode::ThreePlayer, 3);
        state.players[0].gold = 10;
        let c = center(&state, 0);
        assert!(cast(&mut state, 0, Skill::CityProtection, SkillParams::new().city(&c)).is_ok());
        assert_eq!(state.players[0].gold, 7);
    }

    #[test]
    fn test_mode_restricted_skill() {
        let mut state = game(GameMode::TwoPlayer, 3);
        state.players[0].gold = GOLD_CAP;
        let err = cast(&mut state, 0, Skill::SecretPassage, SkillParams::new());
        assert!(matches!(err, Err(SkillError::IllegalForMode { .. })));
    }

    #[test]
    fn test_target_validation() {
        let mut state = game(GameMode::TwoPlayer, 4);
        state.players[0].gold = GOLD_CAP;
        let x = weakest(&state, 1);

        // no target player
        let err = cast(&mut state, 0, Skill::Plummet, SkillParams::new().target_city(&x));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        // self is not an opponent
        let own = weakest(&state, 0);
        let err = cast_on(&mut state, 0, Skill::Plummet, 0, SkillParams::new().target_city(&own));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        // wrong arity
        let err = cast_on(&mut state, 0, Skill::Plummet, 1, SkillParams::new());
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        // city the target does not own
        let err = cast_on(&mut state, 0, Skill::Plummet, 1, SkillParams::new().target_city(&own));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        // same city twice
        let a = weakest(&state, 0);
        let err = cast(&mut state, 0, Skill::TwoBirds, SkillParams::new().city(&a).city(&a));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        assert_eq!(state.players[0].gold, GOLD_CAP);
    }

    #[test]
    fn test_failed_handler_does_not_charge() {
        let mut state = game(GameMode::TwoPlayer, 5);
        state.players[0].gold = 10;
        let city = weakest(&state, 0);
        let err = cast(&mut state, 0, Skill::QuickHeal, SkillParams::new().city(&city));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        assert_eq!(state.players[0].gold, 10);
        assert_eq!(state.rng_counter, 0);
    }

    #[test]
    fn test_quick_heal_restores_full_hp() {
        let mut state = game(GameMode::TwoPlayer, 5);
        state.players[0].gold = 10;
        let name0 = strongest(&state, 0);
        state.players[0].city_mut(&name0).unwrap().take_damage(1_000);
        cast(&mut state, 0, Skill::QuickHeal, SkillParams::new().city(&name0)).unwrap();
        let c = city(&state, 0, &name0);
        assert_eq!(c.current_hp, c.hp);
        assert_eq!(state.players[0].gold, 7);
    }

    #[test]
    fn test_ban_skill() {
        let mut state = game(GameMode::TwoPlayer, 6);
        let banner = name(&state, 1);
        cast_on(&mut state, 1, Skill::BanSkill, 0, SkillParams::new().skill(Skill::GoldLoan)).unwrap();
        // half of 1, rounded up
        assert_eq!(state.players[1].gold, STARTING_GOLD - 1);

        let err = cast(&mut state, 0, Skill::GoldLoan, SkillParams::new());
        assert_eq!(
            err,
            Err(SkillError::SkillBanned { skill: Skill::GoldLoan.name().into(), by: banner })
        );
    }

    #[test]
    fn test_stare_down_freezes_except_decisive() {
        let mut state = game(GameMode::TwoPlayer, 7);
        state.players[1].gold = GOLD_CAP;
        state.players[0].gold = GOLD_CAP;
        cast_on(&mut state, 1, Skill::StareDown, 0, SkillParams::new()).unwrap();

        let err = cast(&mut state, 0, Skill::GoldLoan, SkillParams::new());
        assert_eq!(err, Err(SkillError::MovementRestricted { rounds: STARE_DOWN_ROUNDS }));

        cast(&mut state, 0, Skill::Decisive, SkillParams::new()).unwrap();
        assert_eq!(state.players[0].gold, GOLD_CAP - 10);
        assert!(cast(&mut state, 0, Skill::GoldLoan, SkillParams::new()).is_ok());
    }

    #[test]
    fn test_skill_shield_turns_away_status_effects() {
        let mut state = game(GameMode::TwoPlayer, 7);
        state.players[0].gold = GOLD_CAP;
        state.players[1].gold = GOLD_CAP;
        cast(&mut state, 0, Skill::SkillShield, SkillParams::new()).unwrap();
        let err = cast_on(&mut state, 1, Skill::StareDown, 0, SkillParams::new());
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        assert_eq!(state.players[1].gold, GOLD_CAP);
    }

    #[test]
    fn test_per_city_usage_limit() {
        let mut state = game(GameMode::TwoPlayer, 8);
        state.players[0].gold = GOLD_CAP;
        let a = weakest(&state, 0);
        let b = strongest(&state, 0);
        cast(&mut state, 0, Skill::Strengthen, SkillParams::new().city(&a)).unwrap();
        let err = cast(&mut state, 0, Skill::Strengthen, SkillParams::new().city(&a));
        assert!(matches!(err, Err(SkillError::UsageLimitReached { .. })));
        assert!(cast(&mut state, 0, Skill::Strengthen, SkillParams::new().city(&b)).is_ok());
    }

    #[test]
    fn test_cooldown_blocks_reuse() {
        let mut state = game(GameMode::TwoPlayer, 8);
        state.players[0].gold = GOLD_CAP;
        cast(&mut state, 0, Skill::SetBarrier, SkillParams::new()).unwrap();
        state.players[0].gold = GOLD_CAP;
        let err = cast(&mut state, 0, Skill::SetBarrier, SkillParams::new());
        assert!(matches!(err, Err(SkillError::OnCooldown { rounds: 3, .. })));
        assert_eq!(state.players[0].gold, GOLD_CAP);
    }

    #[test]
    fn test_cost_increase_surcharges_next_paid_skill() {
        let mut state = game(GameMode::TwoPlayer, 9);
        state.players[1].gold = GOLD_CAP;
        cast_on(&mut state, 1, Skill::CostIncrease, 0, SkillParams::new()).unwrap();
        let p0 = name(&state, 0);
        assert!(state.ledger.cost_increase.contains(&p0));

        // cheap skills are below the surcharge tier and keep the mark
        state.players[0].gold = 20;
        cast(&mut state, 0, Skill::GoldLoan, SkillParams::new()).unwrap();
        assert_eq!(state.players[0].gold, 24);
        assert!(state.ledger.cost_increase.contains(&p0));

        let x = strongest(&state, 1);
        cast_on(&mut state, 0, Skill::Plummet, 1, SkillParams::new().target_city(&x)).unwrap();
        assert_eq!(state.players[0].gold, 24 - 11);
        assert!(!state.ledger.cost_increase.contains(&p0));

        let y = weakest(&state, 1);
        cast_on(&mut state, 0, Skill::Plummet, 1, SkillParams::new().target_city(&y)).unwrap();
        assert_eq!(state.players[0].gold, 24 - 11 - 7);
    }

    // ═════════════════════════════════════════════════════════════════════
    // SHIELD TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_iron_shield_wears_down_one_layer_per_hit() {
        let mut state = game(GameMode::TwoPlayer, 10);
        let owner = name(&state, 1);
        let x = weakest(&state, 1);
        state.players[1].gold = GOLD_CAP;
        cast(&mut state, 1, Skill::IronCity, SkillParams::new().city(&x)).unwrap();
        assert_eq!(state.ledger.iron_layers(&owner, &x), IRON_LAYERS);

        // a second iron city on the same city is refused
        let err = cast(&mut state, 1, Skill::IronCity, SkillParams::new().city(&x));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        let full = city(&state, 1, &x).current_hp;
        let hit = |state: &mut GameState| {
            state.players[0].gold = GOLD_CAP;
            cast_on(state, 0, Skill::Plummet, 1, SkillParams::new().target_city(&x)).unwrap();
            // the caster pays even when a shield takes the hit
            assert_eq!(state.players[0].gold, GOLD_CAP - 7);
        };

        hit(&mut state);
        assert_eq!(state.ledger.iron_layers(&owner, &x), 1);
        assert_eq!(city(&state, 1, &x).current_hp, full);

        hit(&mut state);
        assert!(!state.ledger.is_iron(&owner, &x));
        assert_eq!(state.ledger.protection_rounds(&owner, &x), PROTECTION_ROUNDS);
        assert_eq!(city(&state, 1, &x).current_hp, full);

        hit(&mut state);
        assert!(!state.ledger.has_protection(&owner, &x));
        assert_eq!(city(&state, 1, &x).current_hp, full);

        hit(&mut state);
        assert_eq!(city(&state, 1, &x).current_hp, (full / 3).max(1));
    }

    #[test]
    fn test_protection_resets_instead_of_stacking() {
        let mut state = game(GameMode::TwoPlayer, 11);
        let owner = name(&state, 1);
        let x = weakest(&state, 1);
        state.players[1].gold = GOLD_CAP;
        cast(&mut state, 1, Skill::CityProtection, SkillParams::new().city(&x)).unwrap();
        turn::process_end_of_turn(&mut state, 1);
        assert_eq!(state.ledger.protection_rounds(&owner, &x), PROTECTION_ROUNDS - 1);

        cast(&mut state, 1, Skill::CityProtection, SkillParams::new().city(&x)).unwrap();
        assert_eq!(state.ledger.protection_rounds(&owner, &x), PROTECTION_ROUNDS);
    }

    #[test]
    fn test_protection_expires_on_owner_turns() {
        let mut state = game(GameMode::TwoPlayer, 11);
        let owner = name(&state, 1);
        let x = weakest(&state, 1);
        state.ledger.protect(&owner, &x, 2);

        // the other player's turn does not count down
        turn::process_end_of_turn(&mut state, 0);
        assert_eq!(state.ledger.protection_rounds(&owner, &x), 2);

        turn::process_end_of_turn(&mut state, 1);
        turn::process_end_of_turn(&mut state, 1);
        assert!(!state.ledger.has_protection(&owner, &x));
        assert!(!state.ledger.protections.contains_key(&owner));
    }

    #[test]
    fn test_jianbukecui_blocks_hostile_skills_for_free() {
        let mut state = game(GameMode::TwoPlayer, 12);
        state.players[1].gold = GOLD_CAP;
        cast(&mut state, 1, Skill::Jianbukecui, SkillParams::new()).unwrap();

        state.players[0].gold = 10;
        let own = weakest(&state, 0);
        let err = cast_on(&mut state, 0, Skill::AttractFire, 1, SkillParams::new().city(&own));
        assert_eq!(err, Err(SkillError::ShieldBlocked { target: name(&state, 1) }));
        assert_eq!(state.players[0].gold, 10);
        assert!(city(&state, 0, &own).modifiers.is_empty());

        // skills outside the blocked set still work
        assert!(cast(&mut state, 0, Skill::GoldLoan, SkillParams::new()).is_ok());
    }

    #[test]
    fn test_jianbukecui_wears_off_after_three_rounds() {
        let mut state = game(GameMode::TwoPlayer, 12);
        state.players[1].gold = GOLD_CAP;
        cast(&mut state, 1, Skill::Jianbukecui, SkillParams::new()).unwrap();
        let p1 = name(&state, 1);
        for _ in 0..JIANBUKECUI_ROUNDS {
            assert!(state.ledger.is_blocked_by_jianbukecui(&p1));
            end_turn(&mut state).unwrap();
            end_turn(&mut state).unwrap();
        }
        assert!(!state.ledger.is_blocked_by_jianbukecui(&p1));
        assert!(state.journal.contains_public("坚不可摧效果结束"));
    }

    #[test]
    fn test_royal_expedition_charged_against_shield() {
        let mut state = game(GameMode::TwoPlayer, 13);
        let owner = name(&state, 1);
        let x = strongest(&state, 1);
        state.ledger.protect(&owner, &x, PROTECTION_ROUNDS);
        state.players[0].gold = GOLD_CAP;

        let outcome = cast_on(&mut state, 0, Skill::RoyalExpedition, 1, SkillParams::new()).unwrap();
        assert_eq!(outcome.message, format!("the shield on {x} was broken"));
        assert_eq!(state.players[0].gold, GOLD_CAP - 8);
        assert!(city(&state, 1, &x).is_alive);
        assert!(!state.ledger.has_protection(&owner, &x));

        state.players[0].gold = GOLD_CAP;
        cast_on(&mut state, 0, Skill::RoyalExpedition, 1, SkillParams::new()).unwrap();
        assert!(!city(&state, 1, &x).is_alive);
    }

    #[test]
    fn test_scapegoat_takes_lethal_hit_on_center() {
        let mut state = game(GameMode::TwoPlayer, 14);
        let goat = weakest(&state, 1);
        let c = center(&state, 1);
        state.players[1].gold = GOLD_CAP;
        cast(&mut state, 1, Skill::Scapegoat, SkillParams::new().city(&goat)).unwrap();

        state.players[0].gold = GOLD_CAP;
        cast_on(&mut state, 0, Skill::Annihilate, 1, SkillParams::new().target_city(&c)).unwrap();
        assert!(city(&state, 1, &c).is_alive);
        assert!(!city(&state, 1, &goat).is_alive);
        assert!(!state.ledger.scapegoat.contains_key(&name(&state, 1)));
        assert!(!state.ledger.is_unrevivable(&name(&state, 1), &c));
    }

    #[test]
    fn test_barrier_soaks_damage() {
        let mut state = game(GameMode::TwoPlayer, 15);
        let owner = name(&state, 1);
        let x = strongest(&state, 1);
        state.ledger.barrier.insert(
            owner.clone(),
            Barrier { hp: BARRIER_HP, max_hp: BARRIER_HP, rounds_left: BARRIER_ROUNDS },
        );
        let before = city(&state, 1, &x).current_hp;

        assert_eq!(strike_city(&mut state, &owner, &x, Harm::Damage(10_000)), StrikeResult::Absorbed);
        assert_eq!(city(&state, 1, &x).current_hp, before);

        let result = strike_city(&mut state, &owner, &x, Harm::Damage(20_000));
        assert_eq!(result, StrikeResult::Applied { damage: 5_000 });
        assert_eq!(state.ledger.barrier[&owner].hp, 0);
        assert_eq!(city(&state, 1, &x).current_hp, before - 5_000);
    }

    #[test]
    fn test_barrier_regenerates_each_round() {
        let mut state = game(GameMode::TwoPlayer, 15);
        let owner = name(&state, 1);
        state.ledger.barrier.insert(owner.clone(), Barrier { hp: 0, max_hp: BARRIER_HP, rounds_left: 2 });
        turn::process_new_round(&mut state);
        assert_eq!(state.ledger.barrier[&owner].hp, BARRIER_REGEN);
        turn::process_new_round(&mut state);
        assert!(!state.ledger.barrier.contains_key(&owner));
    }

    // ═════════════════════════════════════════════════════════════════════
    // OFFENSE SKILL TESTS
    // ═════════════════════════════════════════════════════════════════════

    /// Every city of the seat, center included, at `hp`.
    fn level(state: &mut GameState, seat: usize, hp: u32) {
        for c in state.players[seat].cities.values_mut() {
            c.hp = hp;
            c.current_hp = hp;
        }
    }

    fn non_centers(state: &GameState, seat: usize) -> Vec<String> {
        state.players[seat]
            .alive_non_center_by_hp()
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    fn rich(mode: GameMode, seed: u64) -> GameState {
        let mut state = game(mode, seed);
        for p in state.players.iter_mut() {
            p.gold = GOLD_CAP;
        }
        state
    }

    #[test]
    fn test_base_twist_rereads_digits() {
        let mut state = rich(GameMode::TwoPlayer, 70);
        let names = non_centers(&state, 1);
        let (a, b) = (&names[0], &names[1]);
        for c in [a, b] {
            set_hp(&mut state, 1, c, 20_000);
            state.players[1].city_mut(c).unwrap().current_hp = 12_345;
        }

        // 5 is not a base-4 digit
        let err = cast_on(&mut state, 0, Skill::BaseTwist, 1, SkillParams::new().target_city(a).bases(10, 4));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        let err = cast_on(&mut state, 0, Skill::BaseTwist, 1, SkillParams::new().target_city(a).bases(1, 10));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        assert_eq!(state.players[0].gold, GOLD_CAP);

        cast_on(&mut state, 0, Skill::BaseTwist, 1, SkillParams::new().target_city(a).bases(10, 8)).unwrap();
        assert_eq!(hp_of(&state, 1, a), 5_349);

        // binary 12345 read as decimal overflows the ceiling
        cast_on(&mut state, 0, Skill::BaseTwist, 1, SkillParams::new().target_city(b).bases(2, 10)).unwrap();
        assert_eq!(hp_of(&state, 1, b), 20_000);
    }

    #[test]
    fn test_uniformity_levels_to_the_average() {
        let mut state = rich(GameMode::TwoPlayer, 71);
        let p1 = name(&state, 1);
        level(&mut state, 1, 10_000);
        let names = non_centers(&state, 1);
        let (weak, strong) = (names[0].clone(), names[1].clone());
        state.players[1].city_mut(&weak).unwrap().current_hp = 1_000;
        set_hp(&mut state, 1, &strong, 40_000);
        state.ledger.protect(&p1, &strong, PROTECTION_ROUNDS);

        // average is 12100, above every ceiling but the strong one
        cast_on(&mut state, 0, Skill::Uniformity, 1, SkillParams::new()).unwrap();
        assert_eq!(hp_of(&state, 1, &weak), 10_000);
        assert_eq!(hp_of(&state, 1, &strong), 40_000);
        assert!(!state.ledger.has_protection(&p1, &strong));
    }

    #[test]
    fn test_inversion_swaps_extremes_unless_shielded() {
        let setup = |seed| {
            let mut state = rich(GameMode::TwoPlayer, seed);
            level(&mut state, 1, 10_000);
            let names = non_centers(&state, 1);
            let (weak, strong) = (names[0].clone(), names[1].clone());
            set_hp(&mut state, 1, &weak, 30_000);
            state.players[1].city_mut(&weak).unwrap().current_hp = 2_000;
            set_hp(&mut state, 1, &strong, 30_000);
            (state, weak, strong)
        };

        let (mut state, weak, strong) = setup(72);
        cast_on(&mut state, 0, Skill::Inversion, 1, SkillParams::new()).unwrap();
        assert_eq!(hp_of(&state, 1, &strong), 2_000);
        assert_eq!(hp_of(&state, 1, &weak), 30_000);

        let (mut state, weak, strong) = setup(72);
        let p1 = name(&state, 1);
        state.ledger.protect(&p1, &strong, PROTECTION_ROUNDS);
        cast_on(&mut state, 0, Skill::Inversion, 1, SkillParams::new()).unwrap();
        assert_eq!(hp_of(&state, 1, &strong), 30_000);
        assert_eq!(hp_of(&state, 1, &weak), 2_000);
    }

    #[test]
    fn test_digit_reverse_on_either_side() {
        let mut state = rich(GameMode::TwoPlayer, 73);
        let theirs = weakest(&state, 1);
        set_hp(&mut state, 1, &theirs, 12_300);
        cast_on(&mut state, 0, Skill::DigitReverse, 1, SkillParams::new().target_city(&theirs)).unwrap();
        assert_eq!(hp_of(&state, 1, &theirs), 321);

        let mine = weakest(&state, 0);
        set_hp(&mut state, 0, &mine, 10_000);
        state.players[0].city_mut(&mine).unwrap().current_hp = 1_234;
        let me = name(&state, 0);
        cast(&mut state, 0, Skill::DigitReverse, SkillParams::new().target(&me).target_city(&mine)).unwrap();
        assert_eq!(hp_of(&state, 0, &mine), 4_321);
    }

    #[test]
    fn test_barrage_halves_two_cities() {
        let mut state = rich(GameMode::TwoPlayer, 74);
        let names = non_centers(&state, 1);
        set_hp(&mut state, 1, &names[0], 10_000);
        set_hp(&mut state, 1, &names[1], 7_001);
        cast_on(&mut state, 0, Skill::Barrage, 1, SkillParams::new().target_city(&names[0]).target_city(&names[1])).unwrap();
        assert_eq!(hp_of(&state, 1, &names[0]), 5_000);
        assert_eq!(hp_of(&state, 1, &names[1]), 3_500);
    }

    #[test]
    fn test_surge_and_bombard_area_damage() {
        let mut state = rich(GameMode::TwoPlayer, 75);
        level(&mut state, 1, 20_000);
        cast_on(&mut state, 0, Skill::Surge, 1, SkillParams::new()).unwrap();
        assert!(state.players[1].cities.values().all(|c| c.current_hp == 15_000));

        let mut state = rich(GameMode::TwoPlayer, 75);
        level(&mut state, 1, 15_000);
        cast_on(&mut state, 0, Skill::Bombard, 1, SkillParams::new()).unwrap();
        let hit = state.players[1].cities.values().filter(|c| c.current_hp == 7_000).count();
        let spared = state.players[1].cities.values().filter(|c| c.current_hp == 15_000).count();
        assert_eq!((hit, spared), (3, CITIES_PER_PLAYER - 3));
    }

    #[test]
    fn test_sweep_clean_takes_only_the_weak() {
        let mut state = rich(GameMode::TwoPlayer, 76);
        level(&mut state, 1, 20_000);
        let names = non_centers(&state, 1);
        set_hp(&mut state, 1, &names[0], 4_000);
        set_hp(&mut state, 1, &names[1], 5_000);
        let c = center(&state, 1);
        set_hp(&mut state, 1, &c, 3_000);

        cast_on(&mut state, 0, Skill::SweepClean, 1, SkillParams::new()).unwrap();
        assert!(!city(&state, 1, &names[0]).is_alive);
        assert!(!city(&state, 1, &names[1]).is_alive);
        assert_eq!(hp_of(&state, 1, &c), 3_000);
        assert_eq!(hp_of(&state, 1, &names[2]), 20_000);

        let err = cast_on(&mut state, 0, Skill::SweepClean, 1, SkillParams::new());
        assert!(matches!(err, Err(SkillError::NoEligibleCities(_))));
    }

    #[test]
    fn test_chain_reaction_spreads_through_the_province() {
        let mut state = rich(GameMode::TwoPlayer, 77);
        level(&mut state, 1, 10_000);
        for c in state.players[1].cities.values_mut() {
            c.province = "远方".into();
        }
        let names = non_centers(&state, 1);
        let (main, near, far) = (&names[0], &names[1], &names[2]);
        for c in [main, near] {
            state.players[1].city_mut(c).unwrap().province = "同省".into();
        }

        cast_on(&mut state, 0, Skill::ChainReaction, 1, SkillParams::new().target_city(main)).unwrap();
        assert_eq!(hp_of(&state, 1, main), 7_000);
        assert_eq!(hp_of(&state, 1, near), 9_000);
        assert_eq!(hp_of(&state, 1, far), 10_000);
    }

    #[test]
    fn test_dimension_strike_halves_the_ceiling() {
        let mut state = rich(GameMode::TwoPlayer, 78);
        let theirs = weakest(&state, 1);
        set_hp(&mut state, 1, &theirs, 20_000);
        cast_on(&mut state, 0, Skill::DimensionStrike, 1, SkillParams::new().target_city(&theirs)).unwrap();
        let c = city(&state, 1, &theirs);
        assert_eq!((c.hp, c.current_hp), (10_000, 10_000));
    }

    #[test]
    fn test_electromagnetic_channels_the_strongest_city() {
        let mut state = rich(GameMode::TwoPlayer, 79);
        level(&mut state, 0, 10_000);
        let mine = weakest(&state, 0);
        set_hp(&mut state, 0, &mine, 30_000);
        let theirs = weakest(&state, 1);
        set_hp(&mut state, 1, &theirs, 20_000);

        cast_on(&mut state, 0, Skill::Electromagnetic, 1, SkillParams::new().target_city(&theirs)).unwrap();
        assert_eq!(hp_of(&state, 1, &theirs), 5_000);
    }

    #[test]
    fn test_in_fighting_turns_the_top_two_on_each_other() {
        let mut state = rich(GameMode::TwoPlayer, 80);
        level(&mut state, 1, 5_000);
        let names = non_centers(&state, 1);
        set_hp(&mut state, 1, &names[0], 30_000);
        set_hp(&mut state, 1, &names[1], 20_000);

        cast_on(&mut state, 0, Skill::InFighting, 1, SkillParams::new()).unwrap();
        assert_eq!(hp_of(&state, 1, &names[0]), 20_000);
        assert_eq!(hp_of(&state, 1, &names[1]), 5_000);
    }

    #[test]
    fn test_golden_mean_pulls_down_to_the_median() {
        let mut state = rich(GameMode::TwoPlayer, 81);
        level(&mut state, 1, 10_000);
        let names = non_centers(&state, 1);
        set_hp(&mut state, 1, &names[0], 40_000);
        set_hp(&mut state, 1, &names[1], 50_000);

        cast_on(&mut state, 0, Skill::GoldenMean, 1, SkillParams::new()).unwrap();
        assert_eq!(hp_of(&state, 1, &names[0]), 10_000);
        assert_eq!(hp_of(&state, 1, &names[1]), 10_000);

        let err = cast_on(&mut state, 0, Skill::GoldenMean, 1, SkillParams::new());
        assert!(matches!(err, Err(SkillError::NoEligibleCities(_))));
    }

    #[test]
    fn test_graft_flower_trades_hp_unless_shielded() {
        let setup = || {
            let mut state = rich(GameMode::TwoPlayer, 82);
            let mine = weakest(&state, 0);
            set_hp(&mut state, 0, &mine, 40_000);
            state.players[0].city_mut(&mine).unwrap().current_hp = 5_000;
            let theirs = weakest(&state, 1);
            set_hp(&mut state, 1, &theirs, 30_000);
            (state, mine, theirs)
        };

        let (mut state, mine, theirs) = setup();
        cast_on(&mut state, 0, Skill::GraftFlower, 1, SkillParams::new().city(&mine).target_city(&theirs)).unwrap();
        assert_eq!(hp_of(&state, 1, &theirs), 5_000);
        assert_eq!(hp_of(&state, 0, &mine), 30_000);

        let (mut state, mine, theirs) = setup();
        let p1 = name(&state, 1);
        state.ledger.protect(&p1, &theirs, PROTECTION_ROUNDS);
        cast_on(&mut state, 0, Skill::GraftFlower, 1, SkillParams::new().city(&mine).target_city(&theirs)).unwrap();
        assert_eq!(hp_of(&state, 1, &theirs), 30_000);
        assert_eq!(hp_of(&state, 0, &mine), 5_000);
    }

    #[test]
    fn test_jade_shatter_strips_and_marks() {
        let mut state = rich(GameMode::TwoPlayer, 83);
        let p1 = name(&state, 1);
        let theirs = weakest(&state, 1);
        state.ledger.protect(&p1, &theirs, PROTECTION_ROUNDS);

        cast_on(&mut state, 0, Skill::JadeShatter, 1, SkillParams::new().target_city(&theirs)).unwrap();
        assert!(!state.ledger.has_protection(&p1, &theirs));
        assert!(state.ledger.markers(&p1).contains(&BattleMarker::Shatter { city: theirs }));
    }

    #[test]
    fn test_sacrifices_hit_the_enemy_center() {
        let mut state = rich(GameMode::TwoPlayer, 84);
        let c = center(&state, 1);
        set_hp(&mut state, 1, &c, 200_000);
        let mine = strongest(&state, 0);
        set_hp(&mut state, 0, &mine, 12_000);

        cast_on(&mut state, 0, Skill::SacrificeKin, 1, SkillParams::new().city(&mine)).unwrap();
        assert!(!city(&state, 0, &mine).is_alive);
        assert_eq!(hp_of(&state, 1, &c), 188_000);

        let own_center = center(&state, 0);
        let err = cast_on(&mut state, 0, Skill::SacrificeKin, 1, SkillParams::new().city(&own_center));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        // fearless gives up the weakest city
        let fodder = weakest(&state, 0);
        let fodder_hp = hp_of(&state, 0, &fodder);
        cast_on(&mut state, 0, Skill::Fearless, 1, SkillParams::new()).unwrap();
        assert!(!city(&state, 0, &fodder).is_alive);
        assert_eq!(hp_of(&state, 1, &c), 188_000 - fodder_hp);
    }

    // ═════════════════════════════════════════════════════════════════════
    // DEFENSE SKILL TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_deep_hiding_grows_every_fifth_idle_round() {
        let mut state = rich(GameMode::TwoPlayer, 90);
        let hidden = weakest(&state, 0);
        set_hp(&mut state, 0, &hidden, 10_000);
        cast(&mut state, 0, Skill::DeepHiding, SkillParams::new().city(&hidden)).unwrap();

        // through round 5 and into round 6
        for _ in 0..10 {
            end_turn(&mut state).unwrap();
        }
        assert_eq!(state.round, 6);
        assert_eq!(hp_of(&state, 0, &hidden), 10_000);

        end_turn(&mut state).unwrap();
        let c = city(&state, 0, &hidden);
        assert_eq!((c.hp, c.current_hp), (10_000 + DEEP_HIDING_BONUS, 10_000 + DEEP_HIDING_BONUS));
    }

    #[test]
    fn test_deploying_resets_deep_hiding() {
        let mut state = rich(GameMode::TwoPlayer, 91);
        let p0 = name(&state, 0);
        let hidden = weakest(&state, 0);
        cast(&mut state, 0, Skill::DeepHiding, SkillParams::new().city(&hidden)).unwrap();
        end_turn(&mut state).unwrap();
        end_turn(&mut state).unwrap();

        turn::deploy(&mut state, 0, &[hidden.clone()]).unwrap();
        assert_eq!(state.ledger.deep_hiding[&p0][&hidden], 2);
    }

    #[test]
    fn test_revive_returns_at_half_unless_annihilated() {
        let mut state = rich(GameMode::TwoPlayer, 92);
        let names = non_centers(&state, 0);
        let (fallen, wiped) = (names[0].clone(), names[1].clone());
        set_hp(&mut state, 0, &fallen, 20_000);
        state.players[0].city_mut(&fallen).unwrap().kill();

        cast(&mut state, 0, Skill::Revive, SkillParams::new().city(&fallen)).unwrap();
        let c = city(&state, 0, &fallen);
        assert!(c.is_alive);
        assert_eq!(c.current_hp, 10_000);

        let params = against(&state, 0).target_city(&wiped);
        cast(&mut state, 1, Skill::Annihilate, params).unwrap();
        assert!(!city(&state, 0, &wiped).is_alive);
        let err = cast(&mut state, 0, Skill::Revive, SkillParams::new().city(&wiped));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
    }

    #[test]
    fn test_united_front_shares_hp_evenly() {
        let mut state = rich(GameMode::TwoPlayer, 93);
        let names: Vec<String> = non_centers(&state, 0).into_iter().take(3).collect();
        for (c, hp) in names.iter().zip([10_000, 20_000, 30_000]) {
            set_hp(&mut state, 0, c, 30_000);
            state.players[0].city_mut(c).unwrap().current_hp = hp;
        }

        let params = names.iter().fold(SkillParams::new(), |p, c| p.city(c));
        cast(&mut state, 0, Skill::UnitedFront, params).unwrap();
        for c in &names {
            assert_eq!(hp_of(&state, 0, c), 20_000);
        }
    }

    #[test]
    fn test_midas_turns_a_city_into_gold() {
        let mut state = game(GameMode::TwoPlayer, 94);
        state.players[0].gold = 10;
        let mine = weakest(&state, 0);
        set_hp(&mut state, 0, &mine, 12_000);

        cast(&mut state, 0, Skill::Midas, SkillParams::new().city(&mine)).unwrap();
        assert!(!city(&state, 0, &mine).is_alive);
        // 10 - 7 + 3
        assert_eq!(state.players[0].gold, 6);

        let c = center(&state, 0);
        state.players[0].gold = 10;
        let err = cast(&mut state, 0, Skill::Midas, SkillParams::new().city(&c));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        assert!(city(&state, 0, &c).is_alive);
    }

    #[test]
    fn test_sub_center_inherits_the_center() {
        let mut state = rich(GameMode::TwoPlayer, 95);
        let p0 = name(&state, 0);
        let names = non_centers(&state, 0);
        let (heir, chamber) = (names[0].clone(), names[1].clone());

        let c = center(&state, 0);
        let err = cast(&mut state, 0, Skill::SubCenter, SkillParams::new().city(&c));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        state.ledger.purple_chamber.insert(p0.clone(), chamber.clone());
        let err = cast(&mut state, 0, Skill::SubCenter, SkillParams::new().city(&chamber));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        state.ledger.purple_chamber.clear();

        cast(&mut state, 0, Skill::SubCenter, SkillParams::new().city(&heir)).unwrap();
        kill_center(&mut state, 0);
        run_inheritance(&mut state);
        assert_eq!(center(&state, 0), heir);
        assert!(city(&state, 0, &heir).is_center);
        assert!(!state.ledger.sub_center.contains_key(&p0));
        assert!(!is_player_defeated(&state.players[0]));
    }

    #[test]
    fn test_mutual_aid_shields_the_teammates_center() {
        let mut state = rich(GameMode::TwoVsTwo, 96);
        let mate = name(&state, 1);
        let c = center(&state, 1);
        cast(&mut state, 0, Skill::MutualAid, SkillParams::new()).unwrap();
        assert_eq!(state.ledger.protection_rounds(&mate, &c), 3);

        let enemy = against(&state, 2);
        let err = cast(&mut state, 0, Skill::MutualAid, enemy);
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
    }

    // ═════════════════════════════════════════════════════════════════════
    // ECONOMY TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_gold_loan_respects_cap() {
        let mut state = game(GameMode::TwoPlayer, 16);
        state.players[0].gold = 22;
        cast(&mut state, 0, Skill::GoldLoan, SkillParams::new()).unwrap();
        assert_eq!(state.players[0].gold, GOLD_CAP);
    }

    #[test]
    fn test_transfer_gold() {
        let mut state = game(GameMode::TwoPlayer, 16);
        state.players[0].gold = 10;
        cast_on(&mut state, 0, Skill::TransferGold, 1, SkillParams::new().amount(4)).unwrap();
        assert_eq!(state.players[0].gold, 6);
        assert_eq!(state.players[1].gold, STARTING_GOLD + 4);

        let err = cast_on(&mut state, 0, Skill::TransferGold, 1, SkillParams::new().amount(7));
        assert_eq!(err, Err(SkillError::InsufficientFunds { needed: 7, available: 6 }));
    }

    #[test]
    fn test_round_income() {
        let mut state = game(GameMode::TwoPlayer, 17);
        let report = end_turn(&mut state).unwrap();
        assert!(!report.round_advanced);
        assert_eq!(state.players[0].gold, STARTING_GOLD);

        let report = end_turn(&mut state).unwrap();
        assert!(report.round_advanced);
        assert_eq!(state.round, 2);
        for p in &state.players {
            assert_eq!(p.gold, STARTING_GOLD + ROUND_INCOME);
        }
    }

    #[test]
    fn test_financial_crisis_income() {
        let mut state = game(GameMode::TwoPlayer, 18);
        state.players[0].gold = 10;
        cast(&mut state, 0, Skill::FinancialCrisis, SkillParams::new()).unwrap();
        assert_eq!(state.players[0].gold, 9);

        let err = cast(&mut state, 0, Skill::FinancialCrisis, SkillParams::new());
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        // rounds 2 and 3: the richest gets nothing, everyone else 1
        let mut expected = (9, STARTING_GOLD);
        for _ in 0..2 {
            end_turn(&mut state).unwrap();
            end_turn(&mut state).unwrap();
            expected.1 += CRISIS_INCOME;
            assert_eq!((state.players[0].gold, state.players[1].gold), expected);
        }

        // round 4: the crisis is over
        end_turn(&mut state).unwrap();
        end_turn(&mut state).unwrap();
        assert!(state.ledger.financial_crisis.is_none());
        assert!(state.journal.contains_public("金融危机结束"));
        assert_eq!(state.players[0].gold, 9 + ROUND_INCOME);
        assert_eq!(state.players[1].gold, expected.1 + ROUND_INCOME);
    }

    #[test]
    fn test_hp_bank_deposit_and_withdraw() {
        let mut state = game(GameMode::TwoPlayer, 19);
        state.players[0].gold = GOLD_CAP;
        let owner = name(&state, 0);
        let x = strongest(&state, 0);
        let full = city(&state, 0, &x).current_hp;

        cast(&mut state, 0, Skill::HpBank, SkillParams::new().city(&x).bank(BankOp::Deposit)).unwrap();
        assert_eq!(city(&state, 0, &x).current_hp, full - 10_000);
        assert_eq!(state.ledger.hp_bank[&owner], 10_000);

        cast(&mut state, 0, Skill::HpBank, SkillParams::new().city(&x).bank(BankOp::Withdraw)).unwrap();
        assert_eq!(city(&state, 0, &x).current_hp, full);
        assert!(!state.ledger.hp_bank.contains_key(&owner));
    }

    #[test]
    fn test_rob_the_rich_takes_half_the_gap() {
        let mut state = game(GameMode::TwoPlayer, 97);
        state.players[0].gold = 6;
        state.players[1].gold = 20;
        cast_on(&mut state, 0, Skill::RobTheRich, 1, SkillParams::new()).unwrap();
        // 6 - 5 + 7
        assert_eq!(state.players[0].gold, 8);
        assert_eq!(state.players[1].gold, 13);

        state.players[0].gold = 12;
        state.players[1].gold = 12;
        let err = cast_on(&mut state, 0, Skill::RobTheRich, 1, SkillParams::new());
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        assert_eq!(state.players[0].gold, 12);
    }

    #[test]
    fn test_turn_of_fortune_swaps_purses_after_paying() {
        let mut state = game(GameMode::TwoPlayer, 98);
        state.players[0].gold = 10;
        state.players[1].gold = 20;
        cast_on(&mut state, 0, Skill::TurnOfFortune, 1, SkillParams::new()).unwrap();
        assert_eq!(state.players[0].gold, 20);
        assert_eq!(state.players[1].gold, 5);
    }

    #[test]
    fn test_unblock_lifts_a_ban() {
        let mut state = rich(GameMode::TwoPlayer, 99);
        let err = cast(&mut state, 0, Skill::Unblock, SkillParams::new());
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        let ban = against(&state, 0).skill(Skill::GoldLoan);
        cast(&mut state, 1, Skill::BanSkill, ban).unwrap();
        let err = cast(&mut state, 0, Skill::GoldLoan, SkillParams::new());
        assert!(matches!(err, Err(SkillError::SkillBanned { .. })));

        cast(&mut state, 0, Skill::Unblock, SkillParams::new()).unwrap();
        assert!(cast(&mut state, 0, Skill::GoldLoan, SkillParams::new()).is_ok());
    }

    #[test]
    fn test_hair_trigger_resets_a_cooldown() {
        let mut state = rich(GameMode::TwoPlayer, 100);
        let p0 = name(&state, 0);
        let err = cast(&mut state, 0, Skill::HairTrigger, SkillParams::new().skill(Skill::SetBarrier));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        cast(&mut state, 0, Skill::SetBarrier, SkillParams::new()).unwrap();
        let cooldown = Skill::SetBarrier.def().cooldown;
        assert!(state.usage.cooldown_remaining(&p0, Skill::SetBarrier, cooldown, state.round) > 0);
        cast(&mut state, 0, Skill::HairTrigger, SkillParams::new().skill(Skill::SetBarrier)).unwrap();
        assert_eq!(state.usage.cooldown_remaining(&p0, Skill::SetBarrier, cooldown, state.round), 0);
    }

    #[test]
    fn test_breakthrough_refunds_a_capped_use() {
        let mut state = rich(GameMode::TwoPlayer, 101);
        let p0 = name(&state, 0);
        cast(&mut state, 0, Skill::AdministrativeCenter, SkillParams::new()).unwrap();
        assert_eq!(state.usage.count(&p0, Skill::AdministrativeCenter), 1);

        cast(&mut state, 0, Skill::Breakthrough, SkillParams::new().skill(Skill::AdministrativeCenter)).unwrap();
        assert_eq!(state.usage.count(&p0, Skill::AdministrativeCenter), 0);

        state.players[0].gold = GOLD_CAP;
        let err = cast(&mut state, 0, Skill::Breakthrough, SkillParams::new().skill(Skill::GoldLoan));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
    }

    #[test]
    fn test_brick_for_jade_benches_the_weakest_deployed_city() {
        let mut state = game(GameMode::TwoPlayer, 102);
        let p0 = name(&state, 0);
        let picks = field(&mut state, 0, &[5_000, 9_000]);
        cast(&mut state, 0, Skill::BrickForJade, SkillParams::new()).unwrap();
        assert_eq!(state.rosters[&p0], vec![picks[1].clone()]);
        assert_eq!(state.players[0].gold, STARTING_GOLD - 2);

        let err = turn::deploy(&mut state, 0, &[picks[0].clone()]);
        assert!(matches!(err, Err(EngineError::InvalidDeployment(_))));

        // one gold per own turn while the city sits out
        end_turn(&mut state).unwrap();
        assert_eq!(state.players[0].gold, STARTING_GOLD - 2 + 1);
    }

    // ═════════════════════════════════════════════════════════════════════
    // TURN / ROUND TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_turn_rotation_three_players() {
        let mut state = game(GameMode::ThreePlayer, 20);
        let r1 = end_turn(&mut state).unwrap();
        assert_eq!(r1.next_player, name(&state, 1));
        assert_eq!(state.current_player, 1);
        end_turn(&mut state).unwrap();
        assert_eq!(state.current_player, 2);
        assert_eq!(state.round, 1);
        let r3 = end_turn(&mut state).unwrap();
        assert!(r3.round_advanced);
        assert_eq!(state.current_player, 0);
        assert_eq!(state.round, 2);
        assert_eq!(state.turn_counter, 3);
        assert!(state.journal.contains_public("第 2 回合开始"));
    }

    #[test]
    fn test_defeated_player_is_skipped() {
        let mut state = game(GameMode::ThreePlayer, 21);
        kill_center(&mut state, 1);
        let report = end_turn(&mut state).unwrap();
        assert_eq!(report.next_player, name(&state, 2));
        assert!(state.players[1].cities.values().all(|c| !c.is_alive));
        assert!(state.outcome.is_none());
    }

    #[test]
    fn test_round_advances_when_first_seat_is_out() {
        let mut state = game(GameMode::ThreePlayer, 22);
        kill_center(&mut state, 0);
        run_inheritance(&mut state);
        state.current_player = 1;
        end_turn(&mut state).unwrap();
        assert_eq!(state.current_player, 2);
        let report = end_turn(&mut state).unwrap();
        assert!(report.round_advanced);
        assert_eq!(state.current_player, 1);
        assert_eq!(state.round, 2);
        // a defeated player earns nothing
        assert_eq!(state.players[0].gold, STARTING_GOLD);
    }

    #[test]
    fn test_time_bomb_detonates_on_owners_third_turn() {
        let mut state = game(GameMode::TwoPlayer, 23);
        let x = weakest(&state, 1);
        state.players[0].gold = GOLD_CAP;
        cast_on(&mut state, 0, Skill::TimeBomb, 1, SkillParams::new().target_city(&x)).unwrap();
        assert!(state.ledger.has_bomb(&name(&state, 1), &x));

        let err = cast_on(&mut state, 0, Skill::TimeBomb, 1, SkillParams::new().target_city(&x));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));

        for _ in 0..2 {
            end_turn(&mut state).unwrap();
            end_turn(&mut state).unwrap();
        }
        assert!(city(&state, 1, &x).is_alive);

        end_turn(&mut state).unwrap();
        end_turn(&mut state).unwrap();
        assert!(!city(&state, 1, &x).is_alive);
        assert!(state.journal.contains_public(&format!("💥 {x} 定时爆破引爆！")));
        assert!(!state.ledger.time_bombs.contains_key(&name(&state, 1)));
    }

    #[test]
    fn test_stare_down_expires_after_targets_turns() {
        let mut state = game(GameMode::TwoPlayer, 24);
        state.players[1].gold = GOLD_CAP;
        cast_on(&mut state, 1, Skill::StareDown, 0, SkillParams::new()).unwrap();
        let p0 = name(&state, 0);
        for left in (0..STARE_DOWN_ROUNDS).rev() {
            end_turn(&mut state).unwrap();
            assert_eq!(state.ledger.stare_down_rounds(&p0), left);
            end_turn(&mut state).unwrap();
        }
        assert!(cast(&mut state, 0, Skill::GoldLoan, SkillParams::new()).is_ok());
    }

    #[test]
    fn test_inheritance_chain() {
        let mut state = game(GameMode::TwoPlayer, 25);
        let p0 = name(&state, 0);
        let chamber = weakest(&state, 0);
        let sub = strongest(&state, 0);
        state.ledger.purple_chamber.insert(p0.clone(), chamber.clone());
        state.ledger.sub_center.insert(p0.clone(), sub.clone());

        kill_center(&mut state, 0);
        run_inheritance(&mut state);
        assert_eq!(state.players[0].center_city_name, chamber);
        assert!(city(&state, 0, &chamber).is_center);
        assert!(!is_player_defeated(&state.players[0]));

        kill_center(&mut state, 0);
        run_inheritance(&mut state);
        assert_eq!(state.players[0].center_city_name, sub);

        kill_center(&mut state, 0);
        run_inheritance(&mut state);
        assert!(is_player_defeated(&state.players[0]));
        assert_eq!(state.players[0].alive_count(), 0);
    }

    #[test]
    fn test_purple_chamber_grows_each_turn() {
        let mut state = game(GameMode::TwoPlayer, 26);
        let x = weakest(&state, 0);
        state.players[0].gold = GOLD_CAP;
        cast(&mut state, 0, Skill::PurpleChamber, SkillParams::new().city(&x)).unwrap();
        let before = city(&state, 0, &x).hp;
        turn::process_end_of_turn(&mut state, 0);
        assert!(city(&state, 0, &x).hp > before);
        let err = cast(&mut state, 0, Skill::PurpleChamber, SkillParams::new().city(&x));
        assert!(matches!(err, Err(SkillError::UsageLimitReached { .. })));
    }

    // ═════════════════════════════════════════════════════════════════════
    // GAME OVER TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_end_turn_declares_winner() {
        let mut state = game(GameMode::TwoPlayer, 27);
        let reg = SkillRegistry::standard();
        kill_center(&mut state, 1);
        let p0 = name(&state, 0);
        let outcome = apply_action(&mut state, &reg, &p0, Action::EndTurn).unwrap();
        match outcome {
            ActionOutcome::TurnEnded(report) => assert_eq!(report.outcome, Some(Outcome::Winner(p0.clone()))),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(apply_action(&mut state, &reg, &p0, Action::EndTurn), Err(EngineError::GameOver));
    }

    #[test]
    fn test_skill_can_end_the_game() {
        let mut state = game(GameMode::TwoPlayer, 28);
        let reg = SkillRegistry::standard();
        let p0 = name(&state, 0);
        let c = center(&state, 1);
        state.players[0].gold = GOLD_CAP;
        let action = Action::skill(Skill::Annihilate, against(&state, 1).target_city(&c));
        apply_action(&mut state, &reg, &p0, action).unwrap();
        assert_eq!(state.outcome, Some(Outcome::Winner(p0)));
        assert_eq!(state.players[1].alive_count(), 0);
        assert!(state.ledger.is_unrevivable(&name(&state, 1), &c));
    }

    #[test]
    fn test_team_victory() {
        let mut state = game(GameMode::TwoVsTwo, 29);
        kill_center(&mut state, 2);
        assert!(!check_game_over(&mut state));
        kill_center(&mut state, 3);
        assert!(check_game_over(&mut state));
        assert_eq!(state.outcome, Some(Outcome::TeamWinner(0)));
    }

    #[test]
    fn test_everyone_falls_is_a_draw() {
        let mut state = game(GameMode::TwoPlayer, 30);
        kill_center(&mut state, 0);
        kill_center(&mut state, 1);
        assert!(check_game_over(&mut state));
        assert_eq!(state.outcome, Some(Outcome::Draw));
    }

    #[test]
    fn test_only_current_player_may_act() {
        let mut state = game(GameMode::TwoPlayer, 31);
        let reg = SkillRegistry::standard();
        let p1 = name(&state, 1);
        let err = apply_action(&mut state, &reg, &p1, Action::EndTurn);
        assert_eq!(
            err,
            Err(EngineError::NotYourTurn { expected: name(&state, 0), actual: p1 })
        );
    }

    // ═════════════════════════════════════════════════════════════════════
    // DEPLOYMENT TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_deploy_rules() {
        let mut state = game(GameMode::TwoPlayer, 32);
        let mine: Vec<String> = state.players[0].cities.keys().cloned().collect();
        let bad = |r: Result<(), EngineError>| matches!(r, Err(EngineError::InvalidDeployment(_)));

        assert!(bad(turn::deploy(&mut state, 0, &[])));
        assert!(bad(turn::deploy(&mut state, 0, &mine[..4])));
        assert!(bad(turn::deploy(&mut state, 0, &[mine[0].clone(), mine[0].clone()])));
        assert!(bad(turn::deploy(&mut state, 0, &["不存在市".to_string()])));

        state.players[0].city_mut(&mine[1]).unwrap().kill();
        assert!(bad(turn::deploy(&mut state, 0, &[mine[1].clone()])));

        let pick = vec![mine[0].clone(), mine[2].clone()];
        turn::deploy(&mut state, 0, &pick).unwrap();
        assert_eq!(state.rosters[&name(&state, 0)], pick);
        assert!(state.is_known(&name(&state, 1), &name(&state, 0), &mine[0]));
        assert!(!state.is_known(&name(&state, 1), &name(&state, 0), &mine[3]));
    }

    #[test]
    fn test_hold_position_forbids_deployment() {
        let mut state = game(GameMode::TwoPlayer, 33);
        cast(&mut state, 0, Skill::HoldPosition, SkillParams::new()).unwrap();
        let c = weakest(&state, 0);
        let err = turn::deploy(&mut state, 0, &[c]);
        assert!(matches!(err, Err(EngineError::InvalidDeployment(_))));
    }

    #[test]
    fn test_rosters_cleared_each_round() {
        let mut state = game(GameMode::TwoPlayer, 34);
        let reg = SkillRegistry::standard();
        let p0 = name(&state, 0);
        let c = weakest(&state, 0);
        apply_action(&mut state, &reg, &p0, Action::Deploy(vec![c])).unwrap();
        assert!(state.rosters.contains_key(&p0));
        end_turn(&mut state).unwrap();
        end_turn(&mut state).unwrap();
        assert!(state.rosters.is_empty());
    }

    // ═════════════════════════════════════════════════════════════════════
    // BATTLE RESOLUTION TESTS
    // ═════════════════════════════════════════════════════════════════════

    /// Pin a city's ceiling and current HP.
    fn set_hp(state: &mut GameState, seat: usize, c: &str, hp: u32) {
        let c = state.players[seat].city_mut(c).unwrap();
        c.hp = hp;
        c.current_hp = hp;
    }

    fn hp_of(state: &GameState, seat: usize, c: &str) -> u32 {
        city(state, seat, c).current_hp
    }

    /// Deploy the seat's weakest non-center cities at the given HP.
    fn field(state: &mut GameState, seat: usize, hps: &[u32]) -> Vec<String> {
        let picks: Vec<String> = state.players[seat]
            .alive_non_center_by_hp()
            .iter()
            .take(hps.len())
            .map(|c| c.name.clone())
            .collect();
        for (c, hp) in picks.iter().zip(hps) {
            set_hp(state, seat, c, *hp);
        }
        turn::deploy(state, seat, &picks).unwrap();
        picks
    }

    #[test]
    fn test_battle_hits_weakest_first_and_pays_kill_gold() {
        let mut state = game(GameMode::TwoPlayer, 40);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let a = field(&mut state, 0, &[10_000]);
        let x = field(&mut state, 1, &[3_000, 20_000]);

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts.len(), 2);
        assert_eq!(report.fronts[0].power, 10_000);
        assert!(!city(&state, 1, &x[0]).is_alive);
        assert_eq!(hp_of(&state, 1, &x[1]), 13_000);
        // both sides strike from their strength before the exchange
        assert_eq!(report.fronts[1].power, 23_000);
        assert!(!city(&state, 0, &a[0]).is_alive);
        assert_eq!(report.gold[&p0], KILL_GOLD);
        assert_eq!(report.gold[&p1], KILL_GOLD);
        assert_eq!(state.players[0].gold, STARTING_GOLD + KILL_GOLD);
    }

    #[test]
    fn test_battle_fought_when_the_round_wraps() {
        let mut state = game(GameMode::TwoPlayer, 41);
        let a = field(&mut state, 0, &[10_000]);
        let first = end_turn(&mut state).unwrap();
        assert!(first.battle.is_none());

        let x = field(&mut state, 1, &[3_000]);
        let report = end_turn(&mut state).unwrap();
        assert!(report.round_advanced);
        assert_eq!(report.battle.unwrap().fronts.len(), 2);
        assert!(!city(&state, 1, &x[0]).is_alive);
        assert_eq!(hp_of(&state, 0, &a[0]), 7_000);
        assert_eq!(state.players[0].gold, STARTING_GOLD + KILL_GOLD + ROUND_INCOME);
        assert_eq!(state.players[1].gold, STARTING_GOLD + ROUND_INCOME);
        assert!(state.journal.contains_public("战斗开始"));
        assert!(state.rosters.is_empty());
    }

    #[test]
    fn test_no_rosters_no_battle() {
        let mut state = game(GameMode::ThreePlayer, 41);
        assert!(resolve_battle(&mut state).is_none());
        assert!(!state.journal.contains_public("战斗开始"));
    }

    #[test]
    fn test_fatigue_halves_cities_deployed_twice_running() {
        let mut state = game(GameMode::TwoPlayer, 42);
        let p0 = name(&state, 0);
        let picks = field(&mut state, 0, &[10_000, 12_000, 14_000]);
        {
            let p = &mut state.players[0];
            p.city_mut(&picks[1]).unwrap().modifiers.push(CityModifier::IgnoreFatigue { rounds_left: 3 });
            p.city_mut(&picks[2]).unwrap().modifiers.push(CityModifier::Settled);
        }

        resolve_battle(&mut state).unwrap();
        assert_eq!(hp_of(&state, 0, &picks[0]), 10_000);
        assert_eq!(state.ledger.fatigue_streak(&p0, &picks[0]), 1);

        // same roster again
        resolve_battle(&mut state).unwrap();
        assert_eq!(hp_of(&state, 0, &picks[0]), 5_000);
        assert_eq!(hp_of(&state, 0, &picks[1]), 12_000);
        assert_eq!(hp_of(&state, 0, &picks[2]), 14_000);
        assert_eq!(state.ledger.fatigue_streak(&p0, &picks[0]), 2);
        assert!(state.journal.contains_public("连续出战"));

        // a round off resets the streak
        state.rosters.clear();
        assert!(resolve_battle(&mut state).is_none());
        assert_eq!(state.ledger.fatigue_streak(&p0, &picks[0]), 0);
    }

    #[test]
    fn test_protection_absorbs_battle_damage() {
        let mut state = game(GameMode::TwoPlayer, 43);
        let p1 = name(&state, 1);
        field(&mut state, 0, &[10_000]);
        let x = field(&mut state, 1, &[3_000, 20_000]);
        state.ledger.protect(&p1, &x[0], PROTECTION_ROUNDS);

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(hp_of(&state, 1, &x[0]), 3_000);
        assert!(!state.ledger.has_protection(&p1, &x[0]));
        // the shield still soaks that city's share of the attack
        assert_eq!(hp_of(&state, 1, &x[1]), 13_000);
        assert!(report.fronts[0].destroyed.is_empty());
    }

    #[test]
    fn test_capture_the_king_goes_for_the_strongest() {
        let mut state = game(GameMode::TwoPlayer, 44);
        state.players[0].gold = GOLD_CAP;
        cast(&mut state, 0, Skill::CaptureTheKing, SkillParams::new()).unwrap();
        field(&mut state, 0, &[10_000]);
        let x = field(&mut state, 1, &[3_000, 20_000]);

        resolve_battle(&mut state).unwrap();
        assert_eq!(hp_of(&state, 1, &x[0]), 3_000);
        assert_eq!(hp_of(&state, 1, &x[1]), 10_000);
    }

    #[test]
    fn test_bronze_wall_and_anchor_keep_damage_out() {
        let mut state = game(GameMode::TwoPlayer, 45);
        let p0 = name(&state, 0);
        let a = field(&mut state, 0, &[4_000, 6_000]);
        field(&mut state, 1, &[50_000]);
        state.ledger.anchored.entry(p0.clone()).or_default().insert(a[0].clone(), ANCHOR_ROUNDS);
        resolve_battle(&mut state).unwrap();
        assert_eq!(hp_of(&state, 0, &a[0]), 4_000);
        assert!(!city(&state, 0, &a[1]).is_alive);

        let mut state = game(GameMode::TwoPlayer, 45);
        let a = field(&mut state, 0, &[4_000]);
        field(&mut state, 1, &[50_000]);
        state.players[0].battle_modifiers.push(BattleModifier::DamageImmunity { rounds_left: 1 });
        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(hp_of(&state, 0, &a[0]), 4_000);
        assert_eq!(report.fronts[1].dealt, 0);
        assert!(state.journal.contains_public("免疫"));
    }

    #[test]
    fn test_fear_every_bush_halves_the_attack() {
        let mut state = game(GameMode::TwoPlayer, 46);
        state.players[0].gold = GOLD_CAP;
        cast_on(&mut state, 0, Skill::FearEveryBush, 1, SkillParams::new()).unwrap();
        let a = field(&mut state, 0, &[30_000]);
        field(&mut state, 1, &[12_000]);

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts[1].power, 6_000);
        assert_eq!(hp_of(&state, 0, &a[0]), 24_000);
    }

    #[test]
    fn test_last_stand_doubles_power_then_falls() {
        let mut state = game(GameMode::TwoPlayer, 47);
        state.players[0].gold = GOLD_CAP;
        let a = field(&mut state, 0, &[10_000]);
        cast_on(&mut state, 0, Skill::LastStand, 1, SkillParams::new().city(&a[0])).unwrap();
        let x = field(&mut state, 1, &[5_000]);

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts[0].power, 20_000);
        assert!(!city(&state, 1, &x[0]).is_alive);
        // survived the exchange at 5000, then falls anyway
        assert!(!city(&state, 0, &a[0]).is_alive);
        assert!(state.journal.contains_public("战后阵亡"));
    }

    #[test]
    fn test_mutual_destruction_takes_the_attacker_down() {
        let mut state = game(GameMode::TwoPlayer, 48);
        let a = field(&mut state, 0, &[40_000, 8_000]);
        let x = field(&mut state, 1, &[5_000]);
        state.players[1]
            .city_mut(&x[0])
            .unwrap()
            .modifiers
            .push(CityModifier::MutualDestruction { rounds_left: 5 });

        resolve_battle(&mut state).unwrap();
        assert!(!city(&state, 1, &x[0]).is_alive);
        assert!(!city(&state, 0, &a[0]).is_alive);
        // the fallen city's attack still lands on what is left
        assert_eq!(hp_of(&state, 0, &a[1]), 3_000);
    }

    #[test]
    fn test_besiege_wei_strikes_the_center() {
        let mut state = game(GameMode::TwoPlayer, 49);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let c = center(&state, 1);
        set_hp(&mut state, 1, &c, 50_000);
        let a = field(&mut state, 0, &[6_000]);
        let x = field(&mut state, 1, &[9_000]);
        state.ledger.add_marker(&p0, BattleMarker::BesiegeWei { target: p1.clone() });

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts.len(), 1);
        assert_eq!(report.fronts[0].landing, Landing::Center { owner: p1 });
        assert_eq!(hp_of(&state, 1, &c), 44_000);
        assert_eq!(hp_of(&state, 1, &x[0]), 9_000);
        assert_eq!(hp_of(&state, 0, &a[0]), 6_000);
    }

    #[test]
    fn test_borrowed_arrows_heal_instead() {
        let mut state = game(GameMode::TwoPlayer, 50);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let a = field(&mut state, 0, &[10_000]);
        state.players[0].city_mut(&a[0]).unwrap().current_hp = 4_000;
        let x = field(&mut state, 1, &[3_000]);
        state.ledger.add_marker(&p0, BattleMarker::BorrowArrows { target: p1 });

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts.len(), 1);
        assert_eq!(report.fronts[0].landing, Landing::Healing);
        assert_eq!(hp_of(&state, 0, &a[0]), 7_000);
        assert_eq!(hp_of(&state, 1, &x[0]), 3_000);
    }

    #[test]
    fn test_counterstrike_turns_the_attack_back() {
        let mut state = game(GameMode::TwoPlayer, 51);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let a = field(&mut state, 0, &[10_000]);
        let x = field(&mut state, 1, &[3_000, 20_000]);
        state.ledger.add_marker(&p0, BattleMarker::Reflect { target: p1.clone() });

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts[1].landing, Landing::Reflected);
        assert_eq!(hp_of(&state, 0, &a[0]), 10_000);
        assert!(!city(&state, 1, &x[1]).is_alive);
        // a city lost to its own attack pays nothing
        assert_eq!(report.gold.get(&p1), None);
        assert_eq!(report.gold[&p0], KILL_GOLD);
    }

    #[test]
    fn test_shattered_city_takes_double() {
        let mut state = game(GameMode::TwoPlayer, 52);
        let p1 = name(&state, 1);
        field(&mut state, 0, &[5_000]);
        let x = field(&mut state, 1, &[10_000]);
        state.ledger.add_marker(&p1, BattleMarker::Shatter { city: x[0].clone() });

        let report = resolve_battle(&mut state).unwrap();
        assert!(!city(&state, 1, &x[0]).is_alive);
        assert_eq!(report.fronts[0].dealt, 10_000);
    }

    #[test]
    fn test_foresight_benches_the_predicted_city() {
        let mut state = game(GameMode::TwoPlayer, 53);
        state.players[0].gold = GOLD_CAP;
        let a = field(&mut state, 0, &[10_000]);
        let x = field(&mut state, 1, &[2_000, 30_000]);
        cast_on(&mut state, 0, Skill::Foresight, 1, SkillParams::new().target_city(&x[1])).unwrap();

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts[1].power, 2_000);
        assert_eq!(hp_of(&state, 0, &a[0]), 8_000);
    }

    #[test]
    fn test_plunder_takes_gold_for_damage_dealt() {
        let mut state = game(GameMode::TwoPlayer, 54);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        state.players[1].gold = 10;
        state.ledger.add_marker(&p0, BattleMarker::Plunder { target: p1.clone() });
        field(&mut state, 0, &[7_000]);
        field(&mut state, 1, &[20_000]);

        let report = resolve_battle(&mut state).unwrap();
        // 7000 damage is four shares of 1500
        assert_eq!(report.gold[&p0], 4);
        assert_eq!(state.players[0].gold, STARTING_GOLD + 4);
        assert_eq!(state.players[1].gold, 10 + KILL_GOLD - 4);
    }

    #[test]
    fn test_wait_at_ease_adds_power_and_takes_new_gold() {
        let mut state = game(GameMode::TwoPlayer, 55);
        state.players[0].gold = GOLD_CAP;
        state.players[1].gold = 4;
        cast_on(&mut state, 0, Skill::WaitAtEase, 1, SkillParams::new()).unwrap();
        state.players[0].gold = 5;
        state.players[1].gold = 9;
        field(&mut state, 0, &[1_000]);
        let x = field(&mut state, 1, &[5_000, 6_000]);

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts[0].power, 5_000);
        assert!(!city(&state, 1, &x[0]).is_alive);
        // p1 earned 5 since the mark, plus one for the kill
        assert_eq!(state.players[1].gold, 4);
        assert_eq!(state.players[0].gold, 5 + KILL_GOLD + 6);
    }

    #[test]
    fn test_feign_retreat_turns_the_trapped_city() {
        let mut state = game(GameMode::TwoPlayer, 56);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let a = field(&mut state, 0, &[10_000]);
        let x = field(&mut state, 1, &[3_000]);
        state.players[0].gold = GOLD_CAP;
        cast_on(&mut state, 0, Skill::FeignRetreat, 1, SkillParams::new().target_city(&x[0])).unwrap();

        let report = resolve_battle(&mut state).unwrap();
        assert!(report.fronts.is_empty());
        assert_eq!(report.defected, vec![(p1, p0, x[0].clone())]);
        assert!(state.players[0].cities.contains_key(&x[0]));
        assert!(!state.players[1].cities.contains_key(&x[0]));
        assert_eq!(hp_of(&state, 0, &a[0]), 10_000);
    }

    #[test]
    fn test_berserk_wears_off_after_battle() {
        let mut state = game(GameMode::TwoPlayer, 57);
        state.players[0].gold = GOLD_CAP;
        let a = field(&mut state, 0, &[10_000]);
        cast(&mut state, 0, Skill::Berserk, SkillParams::new().city(&a[0])).unwrap();
        let raged = hp_of(&state, 0, &a[0]);
        assert_eq!(raged, 50_000);

        resolve_battle(&mut state).unwrap();
        assert_eq!(hp_of(&state, 0, &a[0]), raged / 2);
        assert!(!city(&state, 0, &a[0]).modifiers.contains(&CityModifier::Berserk));
    }

    #[test]
    fn test_center_and_sub_center_hit_harder() {
        let mut state = game(GameMode::TwoPlayer, 58);
        let p0 = name(&state, 0);
        let c = center(&state, 0);
        let sub = weakest(&state, 0);
        set_hp(&mut state, 0, &c, 10_000);
        set_hp(&mut state, 0, &sub, 10_000);
        state.ledger.sub_center.insert(p0, sub.clone());
        turn::deploy(&mut state, 0, &[c, sub]).unwrap();

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts[0].power, 20_000 + 15_000);
    }

    #[test]
    fn test_watcher_sits_out_the_three_way_battle() {
        let mut state = game(GameMode::ThreePlayer, 59);
        let p0 = name(&state, 0);
        let a = field(&mut state, 0, &[10_000]);
        let b = field(&mut state, 1, &[4_000]);
        let c = field(&mut state, 2, &[6_000]);
        state.ledger.watcher = Some(p0);

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts.len(), 2);
        assert_eq!(hp_of(&state, 0, &a[0]), 10_000);
        assert!(!city(&state, 1, &b[0]).is_alive);
        assert_eq!(hp_of(&state, 2, &c[0]), 2_000);
        // kill gold is a two-player rule
        assert!(report.gold.is_empty());
    }

    #[test]
    fn test_three_players_attack_round_the_table() {
        let mut state = game(GameMode::ThreePlayer, 60);
        field(&mut state, 0, &[1_000]);
        field(&mut state, 1, &[2_000]);
        field(&mut state, 2, &[3_000]);

        let report = resolve_battle(&mut state).unwrap();
        let pairs: Vec<(String, String)> = report
            .fronts
            .iter()
            .map(|f| (f.attackers[0].clone(), f.defenders[0].clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (name(&state, 0), name(&state, 1)),
                (name(&state, 1), name(&state, 2)),
                (name(&state, 2), name(&state, 0)),
            ]
        );
    }

    #[test]
    fn test_team_rosters_fight_pooled() {
        let mut state = game(GameMode::TwoVsTwo, 61);
        let a = field(&mut state, 0, &[6_000]);
        let b = field(&mut state, 1, &[6_000]);
        let x = field(&mut state, 2, &[10_000]);

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts[0].attackers, vec![name(&state, 0), name(&state, 1)]);
        assert_eq!(report.fronts[0].power, 12_000);
        assert!(!city(&state, 2, &x[0]).is_alive);
        let left = hp_of(&state, 0, &a[0]) + hp_of(&state, 1, &b[0]);
        assert_eq!(left, 2_000);
    }

    #[test]
    fn test_discord_sets_teammates_on_each_other() {
        let mut state = game(GameMode::TwoVsTwo, 62);
        let (p0, p2) = (name(&state, 0), name(&state, 2));
        let a = field(&mut state, 0, &[10_000]);
        let x = field(&mut state, 2, &[5_000]);
        let y = field(&mut state, 3, &[8_000]);
        state.ledger.add_marker(&p0, BattleMarker::Discord { target: p2 });

        let report = resolve_battle(&mut state).unwrap();
        assert_eq!(report.fronts.len(), 2);
        assert_eq!(hp_of(&state, 0, &a[0]), 10_000);
        assert_eq!(hp_of(&state, 3, &y[0]), 3_000);
        assert!(!city(&state, 2, &x[0]).is_alive);
    }

    // ═════════════════════════════════════════════════════════════════════
    // TRADE TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_preemptive_strike_swaps_cities() {
        let mut state = game(GameMode::TwoPlayer, 35);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let mine = weakest(&state, 0);
        let theirs = weakest(&state, 1);
        cast_on(&mut state, 0, Skill::PreemptiveStrike, 1, SkillParams::new().city(&mine).target_city(&theirs)).unwrap();

        assert!(state.players[0].cities.contains_key(&theirs));
        assert!(state.players[1].cities.contains_key(&mine));
        assert!(!state.players[0].cities.contains_key(&mine));
        assert!(!city(&state, 0, &theirs).is_center);
        assert!(state.is_known(&p0, &p1, &mine));
        assert!(state.is_known(&p1, &p0, &theirs));
        assert_eq!(state.players[0].cities.len(), CITIES_PER_PLAYER);
    }

    #[test]
    fn test_avoidance_keeps_city_out_of_trades() {
        let mut state = game(GameMode::TwoPlayer, 36);
        let mine = weakest(&state, 0);
        let theirs = weakest(&state, 1);
        state.players[1].gold = GOLD_CAP;
        cast(&mut state, 1, Skill::Avoidance, SkillParams::new().city(&theirs)).unwrap();

        let err = cast_on(&mut state, 0, Skill::PreemptiveStrike, 1, SkillParams::new().city(&mine).target_city(&theirs));
        assert!(matches!(err, Err(SkillError::NoEligibleCities(_))));
        assert_eq!(state.players[0].gold, STARTING_GOLD);
        assert!(state.players[1].cities.contains_key(&theirs));
    }

    #[test]
    fn test_center_cannot_be_traded() {
        let mut state = game(GameMode::TwoPlayer, 37);
        let mine = weakest(&state, 0);
        let c = center(&state, 1);
        let err = cast_on(&mut state, 0, Skill::PreemptiveStrike, 1, SkillParams::new().city(&mine).target_city(&c));
        assert!(matches!(err, Err(SkillError::NoEligibleCities(_))));
    }

    #[test]
    fn test_swap_refused_when_the_name_is_taken_on_the_other_side() {
        let mut state = game(GameMode::TwoPlayer, 38);
        let mine = weakest(&state, 0);
        let theirs = weakest(&state, 1);
        let twin = city(&state, 0, &mine).clone();
        state.players[1].cities.insert(mine.clone(), twin);

        let err = cast_on(&mut state, 0, Skill::PreemptiveStrike, 1, SkillParams::new().city(&mine).target_city(&theirs));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        assert_eq!(state.players[0].gold, STARTING_GOLD);
        assert!(state.players[0].cities.contains_key(&mine));
        assert!(state.players[1].cities.contains_key(&theirs));
        assert!(!state.players[0].cities.contains_key(&theirs));
    }

    #[test]
    fn test_swap_charges_once() {
        let mut state = game(GameMode::TwoPlayer, 39);
        let mine = weakest(&state, 0);
        let theirs = weakest(&state, 1);
        let cost = Skill::PreemptiveStrike.def().cost;
        cast_on(&mut state, 0, Skill::PreemptiveStrike, 1, SkillParams::new().city(&mine).target_city(&theirs)).unwrap();
        assert_eq!(state.players[0].gold, STARTING_GOLD - cost);
    }

    // ═════════════════════════════════════════════════════════════════════
    // VISIBILITY TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_view_shows_only_known_cities() {
        let mut state = game(GameMode::TwoPlayer, 38);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let view = player_view(&state, &p0).unwrap();
        assert!(view.is_my_turn());
        assert!(view.opponent(&p1).unwrap().known_cities.is_empty());
        assert_eq!(view.opponent(&p1).unwrap().city_count, CITIES_PER_PLAYER);

        let x = weakest(&state, 1);
        turn::deploy(&mut state, 1, &[x.clone()]).unwrap();
        let hp = city(&state, 1, &x).hp;
        let view = player_view(&state, &p0).unwrap();
        let known = &view.opponent(&p1).unwrap().known_cities;
        assert_eq!(known.len(), 1);
        assert_eq!(known[0].shown_as, x);
        assert_eq!(known[0].hp, Some(hp));

        state.ledger.mirage.insert(p1.clone(), MIRAGE_ROUNDS);
        let view = player_view(&state, &p0).unwrap();
        assert_eq!(view.opponent(&p1).unwrap().known_cities[0].hp, None);
    }

    #[test]
    fn test_disguise_changes_what_opponents_see() {
        let mut state = game(GameMode::TwoPlayer, 39);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let x = weakest(&state, 1);
        state.mark_known(&p0, &p1, &x);
        state
            .ledger
            .disguised
            .entry(p1.clone())
            .or_default()
            .insert(x.clone(), Disguise { rounds_left: DISGUISE_ROUNDS, as_name: "伪装市".into(), as_hp: 1234 });

        let view = player_view(&state, &p0).unwrap();
        let seen = &view.opponent(&p1).unwrap().known_cities[0];
        assert_eq!(seen.shown_as, "伪装市");
        assert_eq!(seen.current_hp, Some(1234));

        // the owner still sees the truth
        let own = player_view(&state, &p1).unwrap();
        assert!(own.me.cities.contains_key(&x));
    }

    #[test]
    fn test_private_logs_stay_private() {
        let mut state = game(GameMode::TwoPlayer, 40);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let goat = weakest(&state, 1);
        state.players[1].gold = GOLD_CAP;
        cast(&mut state, 1, Skill::Scapegoat, SkillParams::new().city(&goat)).unwrap();

        let secret = |v: &crate::visibility::PlayerView| v.logs.iter().any(|l| l.message.contains(&goat));
        assert!(secret(&player_view(&state, &p1).unwrap()));
        assert!(!secret(&player_view(&state, &p0).unwrap()));
    }

    #[test]
    fn test_city_detective_needs_a_sighting() {
        let mut state = game(GameMode::TwoPlayer, 41);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let x = weakest(&state, 1);
        let err = cast_on(&mut state, 0, Skill::CityDetective, 1, SkillParams::new().target_city(&x));
        assert!(matches!(err, Err(SkillError::InvalidTarget(_))));
        assert_eq!(state.players[0].gold, STARTING_GOLD);

        state.mark_known(&p0, &p1, &x);
        let outcome = cast_on(&mut state, 0, Skill::CityDetective, 1, SkillParams::new().target_city(&x)).unwrap();
        assert_eq!(outcome.data["current_hp"], city(&state, 1, &x).current_hp);
    }

    #[test]
    fn test_trackless_erases_sightings() {
        let mut state = game(GameMode::TwoPlayer, 42);
        let (p0, p1) = (name(&state, 0), name(&state, 1));
        let x = weakest(&state, 1);
        state.mark_known(&p0, &p1, &x);
        state.players[1].gold = GOLD_CAP;
        cast(&mut state, 1, Skill::Trackless, SkillParams::new()).unwrap();
        assert!(!state.is_known(&p0, &p1, &x));
    }

    // ═════════════════════════════════════════════════════════════════════
    // FULL GAME TESTS
    // ═════════════════════════════════════════════════════════════════════

    #[test]
    fn test_random_games_keep_invariants() {
        for mode in GameMode::ALL {
            for seed in 0..4 {
                let state = play_full_game_random(seed, mode);
                assert!(state.round > 1, "{mode} seed {seed} never left round 1");
                if let Some(Outcome::Winner(w)) = &state.outcome {
                    assert!(!is_player_defeated(state.player(w).unwrap()));
                }
            }
        }
    }

    #[test]
    fn test_random_game_deterministic() {
        let a = play_full_game_random(77, GameMode::ThreePlayer);
        let b = play_full_game_random(77, GameMode::ThreePlayer);
        assert_eq!(a.players, b.players);
        assert_eq!(a.round, b.round);
        assert_eq!(a.outcome, b.outcome);
        let msgs = |s: &GameState| s.journal.entries().iter().map(|e| e.message.clone()).collect::<Vec<_>>();
        assert_eq!(msgs(&a), msgs(&b));
    }
}
