// ═══════════════════════════════════════════════════════════════════════
// Turn / Round State Machine
//
// Flow of one `end_turn`:
//   1. end-of-turn decay for the acting player (fixed order below)
//   2. inheritance for every player whose center has fallen
//   3. pick the next seat that is still standing
//   4. when play wraps past seat 0: the round's battle, then inheritance
//      again and a fresh pick
//   5. game-over check
//   6. on a wrap: round counter + new-round processing
//
// The machine never calls agents. It reports whether the next seat is
// AI-driven and the caller decides when to ask it.
// ═══════════════════════════════════════════════════════════════════════

use crate::catalog::city_hp_limit;
use crate::combat::{self, BattleReport};
use crate::error::EngineError;
use crate::ledger::bank_interest;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Income paid by a brick-for-jade bench, per own turn.
const BRICK_JADE_INCOME: u8 = 1;
/// Purple chamber growth per turn, percent of base HP.
const PURPLE_CHAMBER_PCT: u32 = 10;
/// 厚积薄发 payout, percent of base HP.
const ACCUMULATE_PCT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub next_player: String,
    pub round_advanced: bool,
    pub outcome: Option<Outcome>,
    /// The next seat is driven by the AI policy.
    pub ai_to_act: bool,
    /// The battle fought when this turn closed the round.
    pub battle: Option<BattleReport>,
}

// ── Defeat / game over ─────────────────────────────────────────────────

/// A player is out once their center is dead. A center name that does
/// not resolve is a broken invariant; it is reported and counts as defeat.
pub fn is_player_defeated(player: &Player) -> bool {
    match player.center() {
        Some(center) => !center.is_alive,
        None => {
            log::error!(
                "{} has no city named {} for a center",
                player.name,
                player.center_city_name
            );
            true
        }
    }
}

/// Evaluate the end condition and record it on the state.
pub fn check_game_over(state: &mut GameState) -> bool {
    if state.outcome.is_some() {
        return true;
    }
    let standing: Vec<&Player> = state.players.iter().filter(|p| !is_player_defeated(p)).collect();

    let outcome = if state.mode.is_team_mode() {
        let teams: BTreeSet<u8> = standing.iter().map(|p| p.team).collect();
        match teams.len() {
            0 => Some(Outcome::Draw),
            1 => teams.first().map(|t| Outcome::TeamWinner(*t)),
            _ => None,
        }
    } else {
        match standing.len() {
            0 => Some(Outcome::Draw),
            1 => Some(Outcome::Winner(standing[0].name.clone())),
            _ => None,
        }
    };

    let Some(outcome) = outcome else {
        return false;
    };
    let message = match &outcome {
        Outcome::Winner(name) => format!("🏆 游戏结束，{name} 获胜！"),
        Outcome::TeamWinner(team) => format!("🏆 游戏结束，队伍 {} 获胜！", team + 1),
        Outcome::Draw => "🏳️ 游戏结束，平局".to_string(),
    };
    state.add_log(message);
    log::info!("game over after {} rounds: {outcome:?}", state.round);
    state.outcome = Some(outcome);
    true
}

// ── End turn ───────────────────────────────────────────────────────────

pub fn end_turn(state: &mut GameState) -> Result<TurnReport, EngineError> {
    if state.is_over() {
        return Err(EngineError::GameOver);
    }
    let current = state.current_player;
    process_end_of_turn(state, current);
    run_inheritance(state);

    let (mut next, wrapped) = next_seat(state, current);
    let mut battle = None;
    if wrapped {
        battle = combat::resolve_battle(state);
        run_inheritance(state);
        // The battle can only knock seats out, so the pick still wraps.
        next = next_seat(state, current).0;
    }
    state.turn_counter += 1;

    if check_game_over(state) {
        return Ok(TurnReport {
            next_player: state.players[next].name.clone(),
            round_advanced: false,
            outcome: state.outcome.clone(),
            ai_to_act: false,
            battle,
        });
    }

    if wrapped {
        state.round += 1;
        state.add_log("─────────────────────");
        state.add_log(format!("第 {} 回合开始", state.round));
        process_new_round(state);
    }

    state.current_player = next;
    let player = &state.players[next];
    let (name, ai) = (player.name.clone(), player.is_ai);
    state.add_log(format!("{name} 的回合"));

    Ok(TurnReport {
        next_player: name,
        round_advanced: wrapped,
        outcome: None,
        ai_to_act: ai,
        battle,
    })
}

/// First standing seat after `current`, and whether the walk passed the
/// last seat. Bounded by seat count so an all-defeated table cannot spin.
fn next_seat(state: &GameState, current: usize) -> (usize, bool) {
    let n = state.players.len();
    let mut next = current;
    let mut wrapped = false;
    for step in 1..=n {
        next = (current + step) % n;
        if current + step >= n {
            wrapped = true;
        }
        if !is_player_defeated(&state.players[next]) {
            break;
        }
    }
    (next, wrapped)
}

// ── End-of-turn decay ──────────────────────────────────────────────────

/// Decrement a countdown map in place and drop entries that reach zero.
/// Returns the keys that expired.
fn tick<K: Ord + Clone>(map: &mut BTreeMap<K, u32>) -> Vec<K> {
    let mut expired = Vec::new();
    map.retain(|k, rounds| {
        *rounds = rounds.saturating_sub(1);
        if *rounds == 0 {
            expired.push(k.clone());
        }
        *rounds > 0
    });
    expired
}

/// Run the acting player's end-of-turn effects in their fixed order.
pub fn process_end_of_turn(state: &mut GameState, seat: usize) {
    let name = state.players[seat].name.clone();
    let round = state.round;

    // 1. protections
    if let Some(cities) = state.ledger.protections.get_mut(&name) {
        tick(cities);
        if cities.is_empty() {
            state.ledger.protections.remove(&name);
        }
    }

    // 2. disguise
    if let Some(cities) = state.ledger.disguised.get_mut(&name) {
        cities.retain(|_, d| {
            d.rounds_left = d.rounds_left.saturating_sub(1);
            d.rounds_left > 0
        });
        if cities.is_empty() {
            state.ledger.disguised.remove(&name);
        }
    }

    // 3. battle modifiers
    let player = &mut state.players[seat];
    for m in player.battle_modifiers.iter_mut() {
        let rounds = m.rounds_left_mut();
        *rounds = rounds.saturating_sub(1);
    }
    player.battle_modifiers.retain_mut(|m| *m.rounds_left_mut() > 0);

    // 4. city countdown modifiers
    let mut returned = Vec::new();
    for city in player.cities.values_mut() {
        let mut back_at = None;
        city.modifiers.retain_mut(|m| {
            let Some(rounds) = m.countdown() else {
                return true;
            };
            *rounds = rounds.saturating_sub(1);
            if *rounds > 0 {
                return true;
            }
            if let CityModifier::HealingOverTime { return_hp, .. } = m {
                back_at = Some(*return_hp);
            }
            false
        });
        if let Some(hp) = back_at {
            if city.is_alive {
                city.set_current_hp(hp.max(city.hp));
                returned.push(city.name.clone());
            }
        }
    }
    for city in returned {
        state.add_log(format!("🏥 {name} 的 {city} 高级治疗完成，满血返回战场"));
    }

    // 5. iron shields on fallen cities
    if let Some(iron) = state.ledger.iron_cities.get_mut(&name) {
        let player = &state.players[seat];
        iron.retain(|city, _| player.city(city).is_some_and(|c| c.is_alive));
        if iron.is_empty() {
            state.ledger.iron_cities.remove(&name);
        }
    }

    // 6. anchors
    if let Some(cities) = state.ledger.anchored.get_mut(&name) {
        tick(cities);
        if cities.is_empty() {
            state.ledger.anchored.remove(&name);
        }
    }

    // 7. purple chamber
    if let Some(chamber) = state.ledger.purple_chamber.get(&name).cloned() {
        let grown = state.players[seat].city_mut(&chamber).filter(|c| c.is_alive).map(|c| {
            let gain = c.base_hp * PURPLE_CHAMBER_PCT / 100;
            let before = c.hp;
            c.grow(gain, city_hp_limit(c.base_hp));
            c.hp - before
        });
        if let Some(gain) = grown {
            state.add_private_log(&name, format!("👑 (生于紫室) {chamber} HP+{gain}"));
        }
    }

    // 8. deep hiding
    if let Some(cities) = state.ledger.deep_hiding.get(&name).cloned() {
        for (city, last) in cities {
            let idle = round.saturating_sub(last);
            if idle == 0 || idle % DEEP_HIDING_PERIOD != 0 {
                continue;
            }
            let grown = state.players[seat].city_mut(&city).filter(|c| c.is_alive).map(|c| {
                c.grow(DEEP_HIDING_BONUS, city_hp_limit(c.base_hp));
            });
            if grown.is_some() {
                state.add_private_log(&name, format!("🤫 {city} 深藏不露，HP+{DEEP_HIDING_BONUS}"));
            }
        }
    }

    // 9. time bombs
    let mut detonated = Vec::new();
    if let Some(bombs) = state.ledger.time_bombs.get_mut(&name) {
        bombs.retain_mut(|b| {
            b.rounds_left = b.rounds_left.saturating_sub(1);
            if b.rounds_left == 0 {
                detonated.push(b.city.clone());
            }
            b.rounds_left > 0
        });
        if bombs.is_empty() {
            state.ledger.time_bombs.remove(&name);
        }
    }
    for city in detonated {
        if let Some(c) = state.players[seat].city_mut(&city).filter(|c| c.is_alive) {
            c.kill();
            state.add_log(format!("💥 {city} 定时爆破引爆！"));
        }
    }

    // 10. brick for jade
    let mut bench_over = None;
    if let Some(bench) = state.ledger.brick_jade.get_mut(&name) {
        state.players[seat].gain_gold(BRICK_JADE_INCOME);
        bench.rounds_left = bench.rounds_left.saturating_sub(1);
        if bench.rounds_left == 0 {
            bench_over = Some(bench.city.clone());
        }
    }
    if let Some(city) = bench_over {
        state.ledger.brick_jade.remove(&name);
        state.add_private_log(&name, format!("🧱 {city} 结束休整"));
    }

    // 11. hp bank interest
    if let Some(balance) = state.ledger.hp_bank.get_mut(&name) {
        let interest = bank_interest(*balance);
        *balance += interest;
        if interest > 0 {
            state.add_private_log(&name, format!("🏦 血量存储获得利息 +{interest}HP"));
        }
    }

    // 12. mirage
    if let Some(rounds) = state.ledger.mirage.get_mut(&name) {
        *rounds = rounds.saturating_sub(1);
        if *rounds == 0 {
            state.ledger.mirage.remove(&name);
        }
    }

    // 13. 厚积薄发
    if let Some(rounds) = state.ledger.hjbf.get_mut(&name) {
        *rounds = rounds.saturating_sub(1);
        if *rounds == 0 {
            state.ledger.hjbf.remove(&name);
            for c in state.players[seat].cities.values_mut().filter(|c| c.is_alive) {
                c.grow(c.base_hp * ACCUMULATE_PCT / 100, city_hp_limit(c.base_hp));
            }
            state.add_log(format!("💪 {name} 厚积薄发，所有城市 HP 大幅提升"));
        }
    }

    // 14. stare-down
    if let Some(rounds) = state.ledger.stare_down.get_mut(&name) {
        *rounds = rounds.saturating_sub(1);
        if *rounds == 0 {
            state.ledger.stare_down.remove(&name);
        }
    }

    // 15. skill protection
    if let Some(rounds) = state.ledger.skill_protection.get_mut(&name) {
        *rounds = rounds.saturating_sub(1);
        if *rounds == 0 {
            state.ledger.skill_protection.remove(&name);
        }
    }

    // 16. overflow
    if let Some(overflow) = state.ledger.overflow.get_mut(&name) {
        overflow.rounds_left = overflow.rounds_left.saturating_sub(1);
        if overflow.rounds_left == 0 {
            state.ledger.overflow.remove(&name);
        }
    }
}

// ── Inheritance ────────────────────────────────────────────────────────

/// A fallen center passes to the purple-chamber city, then to the
/// sub-center. With no living heir every remaining city falls with it.
pub fn run_inheritance(state: &mut GameState) {
    for seat in 0..state.players.len() {
        let player = &state.players[seat];
        let name = player.name.clone();
        if player.center().map_or(true, |c| c.is_alive) {
            continue;
        }
        let alive = |city: &str| player.city(city).is_some_and(|c| c.is_alive);
        let chamber = state.ledger.purple_chamber.get(&name).filter(|c| alive(c.as_str())).cloned();
        let sub = state.ledger.sub_center.get(&name).filter(|c| alive(c.as_str())).cloned();

        let old = player.center_city_name.clone();
        if let Some(heir) = chamber {
            state.ledger.purple_chamber.remove(&name);
            state.players[seat].set_center(&heir);
            state.add_log(format!("👑 {name} 的 {old} 陷落，{heir} 生于紫室，继承为中心城市"));
        } else if let Some(heir) = sub {
            state.ledger.sub_center.remove(&name);
            state.players[seat].set_center(&heir);
            state.add_log(format!("🏛️ {name} 的 {old} 陷落，副中心 {heir} 继承为中心城市"));
        } else {
            let mut fell = false;
            for c in state.players[seat].cities.values_mut().filter(|c| c.is_alive) {
                c.kill();
                fell = true;
            }
            if fell {
                state.add_log(format!("💀 {name} 的中心城市 {old} 陷落，其余城市随之覆灭"));
            }
        }
    }
}

// ── New round ──────────────────────────────────────────────────────────

pub fn process_new_round(state: &mut GameState) {
    // 1. jianbukecui
    for player in tick(&mut state.ledger.jianbukecui) {
        state.add_log(format!("{player} 的坚不可摧效果结束"));
    }

    // 2. financial crisis
    let crisis_over = match state.ledger.financial_crisis.as_mut() {
        Some(crisis) => {
            crisis.rounds_left = crisis.rounds_left.saturating_sub(1);
            crisis.rounds_left == 0
        }
        None => false,
    };
    if crisis_over {
        state.ledger.financial_crisis = None;
        state.add_log("金融危机结束");
    }

    // 3. barriers
    state.ledger.barrier.retain(|_, b| {
        b.hp = (b.hp + BARRIER_REGEN).min(b.max_hp);
        b.rounds_left = b.rounds_left.saturating_sub(1);
        b.rounds_left > 0
    });

    // 4. truces
    state.ledger.truces.retain(|_, t| {
        t.rounds_left = t.rounds_left.saturating_sub(1);
        t.rounds_left > 0
    });

    // 5. round-scoped markers and rosters
    state.ledger.battle_markers.clear();
    state.ledger.watcher = None;
    state.rosters.clear();

    // 6. income
    pay_income(state);
}

/// Flat stipend, or the crisis rule: the richest player (first in seat
/// order on a tie) gets nothing and everyone else gets 1.
fn pay_income(state: &mut GameState) {
    let richest = state.ledger.financial_crisis.as_ref().and_then(|_| {
        state
            .players
            .iter()
            .enumerate()
            .fold(None::<(usize, u8)>, |best, (i, p)| match best {
                Some((_, gold)) if gold >= p.gold => best,
                _ => Some((i, p.gold)),
            })
            .map(|(i, _)| i)
    });
    let crisis = state.ledger.financial_crisis.is_some();

    for seat in 0..state.players.len() {
        if is_player_defeated(&state.players[seat]) {
            continue;
        }
        if !crisis {
            state.players[seat].gain_gold(ROUND_INCOME);
        } else if richest == Some(seat) {
            let name = state.players[seat].name.clone();
            state.add_log(format!("{name} 金币最多，金融危机期间无法获得金币"));
        } else {
            state.players[seat].gain_gold(CRISIS_INCOME);
        }
    }
}

// ── Deployment ─────────────────────────────────────────────────────────

/// Set the acting player's roster for this round.
pub fn deploy(state: &mut GameState, seat: usize, cities: &[String]) -> Result<(), EngineError> {
    let player = &state.players[seat];
    let name = player.name.clone();
    let bad = |msg: String| Err(EngineError::InvalidDeployment(msg));

    if cities.is_empty() || cities.len() > MAX_ROSTER {
        return bad(format!("deploy between 1 and {MAX_ROSTER} cities"));
    }
    if player.battle_modifiers.iter().any(|m| matches!(m, BattleModifier::NoDeploy { .. })) {
        return bad(format!("{name} is holding position this round"));
    }
    let unique: BTreeSet<&String> = cities.iter().collect();
    if unique.len() != cities.len() {
        return bad("the same city was deployed twice".to_string());
    }
    let benched = state.ledger.brick_jade.get(&name).map(|b| b.city.as_str());
    for city in cities {
        let Some(c) = player.city(city) else {
            return bad(format!("{name} has no city named {city}"));
        };
        if !c.is_alive {
            return bad(format!("{city} has fallen"));
        }
        if c.modifiers.iter().any(|m| matches!(m, CityModifier::HealingOverTime { .. })) {
            return bad(format!("{city} is recovering"));
        }
        if benched == Some(city.as_str()) {
            return bad(format!("{city} is sitting out"));
        }
    }

    let round = state.round;
    if let Some(hiding) = state.ledger.deep_hiding.get_mut(&name) {
        for city in cities {
            if let Some(last) = hiding.get_mut(city) {
                *last = round;
            }
        }
    }
    let observers: Vec<String> = state
        .players
        .iter()
        .filter(|p| state.are_opponents(&name, &p.name))
        .map(|p| p.name.clone())
        .collect();
    for observer in &observers {
        for city in cities {
            state.mark_known(observer, &name, city);
        }
    }
    state.rosters.insert(name.clone(), cities.to_vec());
    state.add_log(format!("⚔️ {name} 派出 {}", cities.join("、")));
    Ok(())
}
