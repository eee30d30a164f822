// ═══════════════════════════════════════════════════════════════════════
// Battle Resolution
//
// Runs once per round, after the last seat has ended its turn and before
// the new round begins. Every deployed roster fights:
//   1. fatigue: a city deployed two rounds running halves first
//   2. fronts: who attacks whom (mode rules, feints, watchers, truces,
//      discord), then the markers that reroute or cancel an attack
//   3. power: every front's strength, read before anyone is hit
//   4. landing: fronts land in turn, weakest city first
//   5. aftermath: last stands fall, berserk cities tire, gold changes
//      hands, sprung traps turn cities, fatigue streaks move on
//
// Skills never call in here. Battle skills leave modifiers and markers
// behind and this step is their reader.
// ═══════════════════════════════════════════════════════════════════════

use crate::ledger::{is_tradeable, roster_cities, transfer_city, BattleMarker};
use crate::skills::{strike_city, Harm, StrikeResult};
use crate::turn::is_player_defeated;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gold for each enemy city destroyed in a two-player battle.
pub const KILL_GOLD: u8 = 1;
/// 以逸待劳 bonus per city the target deployed.
const WAIT_AT_EASE_BONUS: u32 = 2_000;
/// 趁火打劫 takes one gold for this much damage dealt to the target.
const PLUNDER_DAMAGE_PER_GOLD: u32 = 1_500;
const PLUNDER_MAX_GOLD: u32 = 10;

/// Alive deployed cities per standing player, fixed when the battle opens.
type Deployed = BTreeMap<String, Vec<String>>;

// ── Reports ────────────────────────────────────────────────────────────

/// Where a front's power ends up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Landing {
    /// Spread over the defenders' deployed cities.
    Roster,
    /// Straight at one player's center (围魏救赵).
    Center { owner: String },
    /// Turned back on the attackers' own deployed cities (反戈一击).
    Reflected,
    /// Heals the defenders' deployed cities instead (草船借箭).
    Healing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Front {
    pub attackers: Vec<String>,
    pub defenders: Vec<String>,
    pub landing: Landing,
    pub power: u32,
    /// HP removed, or restored for a healing front.
    pub dealt: u32,
    /// (owner, city) pairs that fell on this front.
    pub destroyed: Vec<(String, String)>,
}

impl Front {
    fn new(attackers: Vec<String>, defenders: Vec<String>) -> Self {
        Front {
            attackers,
            defenders,
            landing: Landing::Roster,
            power: 0,
            dealt: 0,
            destroyed: Vec::new(),
        }
    }

    fn pits(&self, attacker: &str, defender: &str) -> bool {
        self.attackers.iter().any(|a| a == attacker) && self.defenders.iter().any(|d| d == defender)
    }

    /// Cities lost by the defending side, not by the attackers' own.
    fn enemy_losses(&self) -> usize {
        self.destroyed
            .iter()
            .filter(|(owner, _)| self.defenders.contains(owner))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    pub fronts: Vec<Front>,
    /// Gold each player won in battle, before the round stipend.
    pub gold: BTreeMap<String, u8>,
    /// (from, to, city) for every city a sprung trap turned.
    pub defected: Vec<(String, String, String)>,
}

// ── Entry point ────────────────────────────────────────────────────────

/// Fight out the round. Returns None when no standing player had a city
/// deployed; fatigue streaks still reset in that case.
pub fn resolve_battle(state: &mut GameState) -> Option<BattleReport> {
    let deployed = deployed_cities(state);
    if deployed.values().all(Vec::is_empty) {
        update_streaks(state, &deployed);
        return None;
    }
    state.add_log(format!("⚔️ 第 {} 回合战斗开始", state.round));
    apply_fatigue(state, &deployed);

    let mut fronts = pair_fronts(state, &deployed);
    route_markers(state, &mut fronts);
    for front in fronts.iter_mut() {
        front.power = front_power(state, front, &deployed);
    }
    for front in fronts.iter_mut() {
        land(state, front, &deployed);
    }

    let mut report = BattleReport::default();
    aftermath(state, &deployed, &fronts, &mut report);
    update_streaks(state, &deployed);
    report.fronts = fronts;
    log::debug!(
        "round {} battle: {} fronts, {} cities lost",
        state.round,
        report.fronts.len(),
        report.fronts.iter().map(|f| f.destroyed.len()).sum::<usize>()
    );
    Some(report)
}

fn deployed_cities(state: &GameState) -> Deployed {
    state
        .players
        .iter()
        .filter(|p| !is_player_defeated(p))
        .map(|p| {
            let cities = roster_cities(state, &p.name).into_iter().map(|c| c.name.clone()).collect();
            (p.name.clone(), cities)
        })
        .collect()
}

fn deploys(deployed: &Deployed, player: &str) -> bool {
    deployed.get(player).is_some_and(|c| !c.is_empty())
}

// ── Fatigue ────────────────────────────────────────────────────────────

fn ignores_fatigue(city: &City) -> bool {
    city.modifiers
        .iter()
        .any(|m| matches!(m, CityModifier::IgnoreFatigue { .. } | CityModifier::Settled))
}

fn apply_fatigue(state: &mut GameState, deployed: &Deployed) {
    for (owner, cities) in deployed {
        for name in cities {
            if state.ledger.fatigue_streak(owner, name) == 0 {
                continue;
            }
            let Some(city) = state.player_mut(owner).and_then(|p| p.city_mut(name)) else {
                continue;
            };
            if ignores_fatigue(city) {
                continue;
            }
            let before = city.current_hp;
            city.set_current_hp((before / 2).max(1));
            let after = city.current_hp;
            state.add_log(format!("😓 {owner} 的 {name} 连续出战，HP {before} → {after}"));
        }
    }
}

/// Deployed cities extend their streak; every other streak is dropped.
fn update_streaks(state: &mut GameState, deployed: &Deployed) {
    let mut next: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
    for (owner, cities) in deployed {
        for name in cities {
            if state.player(owner).and_then(|p| p.city(name)).is_none() {
                continue;
            }
            let streak = state.ledger.fatigue_streak(owner, name) + 1;
            next.entry(owner.clone()).or_default().insert(name.clone(), streak);
        }
    }
    state.ledger.fatigue = next;
}

// ── Fronts ─────────────────────────────────────────────────────────────

fn pair_fronts(state: &GameState, deployed: &Deployed) -> Vec<Front> {
    let standing: Vec<String> = state
        .players
        .iter()
        .filter(|p| !is_player_defeated(p))
        .map(|p| p.name.clone())
        .collect();
    match state.mode {
        GameMode::TwoPlayer => standing
            .iter()
            .filter(|a| deploys(deployed, a))
            .filter_map(|a| {
                standing
                    .iter()
                    .find(|d| *d != a)
                    .map(|d| Front::new(vec![a.clone()], vec![d.clone()]))
            })
            .collect(),
        GameMode::ThreePlayer => three_player_fronts(state, &standing, deployed),
        GameMode::TwoVsTwo => team_fronts(state, &standing, deployed),
    }
}

fn feint_target(state: &GameState, player: &str) -> Option<String> {
    state.ledger.markers(player).iter().find_map(|m| match m {
        BattleMarker::Feint { target } => Some(target.clone()),
        _ => None,
    })
}

/// Each player attacks the next standing opponent in seat order. The
/// watcher sits the round out on both sides, truce partners pass each
/// other by, and a feint picks its own mark.
fn three_player_fronts(state: &GameState, standing: &[String], deployed: &Deployed) -> Vec<Front> {
    let watcher = state.ledger.watcher.as_deref();
    let eligible = |a: &str, d: &str| {
        d != a
            && Some(d) != watcher
            && state.ledger.truces.get(a).map_or(true, |t| t.ally != d)
    };
    let n = standing.len();
    let mut fronts = Vec::new();
    for (idx, attacker) in standing.iter().enumerate() {
        if Some(attacker.as_str()) == watcher || !deploys(deployed, attacker) {
            continue;
        }
        let order: Vec<&String> = (1..n).map(|k| &standing[(idx + k) % n]).collect();
        let mut defender = order.iter().find(|d| eligible(attacker.as_str(), d.as_str())).map(|d| (*d).clone());

        let feint = feint_target(state, attacker).filter(|t| standing.contains(t) && eligible(attacker.as_str(), t.as_str()));
        if let Some(target) = feint {
            let other = order
                .iter()
                .find(|d| eligible(attacker.as_str(), d.as_str()) && d.as_str() != target)
                .map(|d| (*d).clone());
            let outmatched = raw_power(state, attacker, deployed) < raw_power(state, &target, deployed);
            defender = match other {
                Some(other) if outmatched => {
                    log::debug!("{attacker} feints away from {target} towards {other}");
                    Some(other)
                }
                _ => Some(target),
            };
        }
        if let Some(d) = defender {
            fronts.push(Front::new(vec![attacker.clone()], vec![d]));
        }
    }
    fronts
}

/// Team rosters fight pooled. A sown discord sends the caster's team
/// home and turns the target on its own teammate.
fn team_fronts(state: &GameState, standing: &[String], deployed: &Deployed) -> Vec<Front> {
    let discord = state.ledger.battle_markers.iter().find_map(|(caster, markers)| {
        markers.iter().find_map(|m| match m {
            BattleMarker::Discord { target } => Some((caster.clone(), target.clone())),
            _ => None,
        })
    });
    if let Some((_, target)) = discord {
        let mate = state
            .teammate_of(&target)
            .map(|p| p.name.clone())
            .filter(|m| standing.contains(m));
        if let Some(mate) = mate.filter(|_| standing.contains(&target)) {
            let mut fronts = Vec::new();
            if deploys(deployed, &target) {
                fronts.push(Front::new(vec![target.clone()], vec![mate.clone()]));
            }
            if deploys(deployed, &mate) {
                fronts.push(Front::new(vec![mate.clone()], vec![target.clone()]));
            }
            return fronts;
        }
    }

    let team_of = |name: &str| state.player(name).map(|p| p.team);
    let mut fronts = Vec::new();
    for team in [0u8, 1] {
        let attackers: Vec<String> = standing
            .iter()
            .filter(|p| team_of(p.as_str()) == Some(team) && deploys(deployed, p))
            .cloned()
            .collect();
        let defenders: Vec<String> = standing
            .iter()
            .filter(|p| team_of(p.as_str()).is_some_and(|t| t != team))
            .cloned()
            .collect();
        if !attackers.is_empty() && !defenders.is_empty() {
            fronts.push(Front::new(attackers, defenders));
        }
    }
    fronts
}

/// Pull `who` out of every front aimed at `from`.
fn withdraw(fronts: &mut Vec<Front>, who: &str, from: &str) {
    for front in fronts.iter_mut() {
        if front.defenders.iter().any(|d| d == from) {
            front.attackers.retain(|a| a != who);
        }
    }
    fronts.retain(|f| !f.attackers.is_empty());
}

fn route_markers(state: &mut GameState, fronts: &mut Vec<Front>) {
    let round = state.round;
    let markers: Vec<(String, BattleMarker)> = state
        .ledger
        .battle_markers
        .iter()
        .flat_map(|(caster, ms)| ms.iter().map(move |m| (caster.clone(), m.clone())))
        .collect();

    for (caster, marker) in markers {
        match marker {
            BattleMarker::Trap { target, round: set_in, .. } if set_in == round => {
                withdraw(fronts, &caster, &target);
                withdraw(fronts, &target, &caster);
                state.add_log(format!("🪤 {caster} 与 {target} 本轮双双退兵"));
            }
            BattleMarker::BesiegeWei { target } => {
                withdraw(fronts, &target, &caster);
                for front in fronts.iter_mut().filter(|f| f.pits(&caster, &target)) {
                    front.landing = Landing::Center { owner: target.clone() };
                }
                state.add_log(format!("🏯 {caster} 围魏救赵，直扑 {target} 的中心城市"));
            }
            BattleMarker::BorrowArrows { target } => {
                withdraw(fronts, &caster, &target);
                for front in fronts.iter_mut().filter(|f| f.pits(&target, &caster)) {
                    front.landing = Landing::Healing;
                }
                state.add_log(format!("🏹 {caster} 草船借箭，{target} 的攻击化为治疗"));
            }
            BattleMarker::Reflect { target } => {
                for front in fronts.iter_mut().filter(|f| f.pits(&target, &caster) && f.landing == Landing::Roster) {
                    front.landing = Landing::Reflected;
                }
            }
            _ => {}
        }
    }
}

// ── Power ──────────────────────────────────────────────────────────────

fn city_power(state: &GameState, owner: &str, name: &str) -> u64 {
    let Some(player) = state.player(owner) else {
        return 0;
    };
    let Some(city) = player.city(name).filter(|c| c.is_alive) else {
        return 0;
    };
    if state.ledger.hjbf.contains_key(owner) {
        return 1;
    }
    let mut power = city.current_hp as u64;
    if player.is_center(name) {
        power *= 2;
    }
    if state.ledger.sub_center.get(owner).is_some_and(|c| c == name) {
        power = power * 3 / 2;
    }
    if state.ledger.purple_chamber.get(owner).is_some_and(|c| c == name) {
        power *= 2;
    }
    for m in &city.modifiers {
        if let CityModifier::PowerMultiplier { factor } = m {
            power *= *factor as u64;
        }
    }
    power
}

/// Roster strength before any marker or modifier on the player.
fn raw_power(state: &GameState, player: &str, deployed: &Deployed) -> u64 {
    deployed
        .get(player)
        .map(|cities| cities.iter().map(|c| city_power(state, player, c)).sum())
        .unwrap_or(0)
}

fn damage_reduction(player: &Player) -> u64 {
    player
        .battle_modifiers
        .iter()
        .filter_map(|m| match m {
            BattleModifier::DamageReduction { pct, .. } => Some(*pct as u64),
            _ => None,
        })
        .max()
        .unwrap_or(0)
        .min(100)
}

fn predicted(state: &GameState, attacker: &str, city: &str, defenders: &[String]) -> bool {
    defenders.iter().any(|d| {
        state.ledger.markers(d).iter().any(|m| {
            matches!(m, BattleMarker::Prediction { target, city: c } if target == attacker && c == city)
        })
    })
}

fn front_power(state: &mut GameState, front: &Front, deployed: &Deployed) -> u32 {
    let mut total: u64 = 0;
    for attacker in &front.attackers {
        let mut power: u64 = 0;
        for city in deployed.get(attacker).into_iter().flatten() {
            if predicted(state, attacker, city, &front.defenders) {
                state.add_log(format!("🔮 {attacker} 的 {city} 被料事如神看穿，未能出手"));
                continue;
            }
            power += city_power(state, attacker, city);
        }
        if let Some(player) = state.player(attacker) {
            power = power * (100 - damage_reduction(player)) / 100;
        }
        for defender in &front.defenders {
            let waits = state
                .ledger
                .markers(attacker)
                .iter()
                .any(|m| matches!(m, BattleMarker::WaitAtEase { target, .. } if target == defender));
            if waits {
                let count = deployed.get(defender).map_or(0, Vec::len) as u64;
                power += WAIT_AT_EASE_BONUS as u64 * count;
            }
        }
        total += power;
    }
    total.min(u32::MAX as u64) as u32
}

// ── Landing ────────────────────────────────────────────────────────────

fn immune(state: &GameState, player: &str) -> bool {
    state.player(player).is_some_and(|p| {
        p.battle_modifiers
            .iter()
            .any(|m| matches!(m, BattleModifier::DamageImmunity { .. }))
    })
}

fn goes_for_strongest(state: &GameState, attackers: &[String]) -> bool {
    attackers.iter().filter_map(|a| state.player(a)).any(|p| {
        p.battle_modifiers.iter().any(|m| {
            matches!(m, BattleModifier::AttackPriority { rule: PriorityRule::HighestHp, .. })
        })
    })
}

fn is_shattered(state: &GameState, owner: &str, city: &str) -> bool {
    state
        .ledger
        .markers(owner)
        .iter()
        .any(|m| matches!(m, BattleMarker::Shatter { city: c } if c == city))
}

/// Deployed cities of `victims` that can be hit, in the order they take
/// damage: cities drawing fire first, then by current HP.
fn ordered_targets(state: &GameState, victims: &[String], deployed: &Deployed, strongest_first: bool) -> Vec<(String, String)> {
    let mut targets: Vec<(String, String)> = victims
        .iter()
        .filter(|v| !immune(state, v))
        .flat_map(|v| {
            deployed
                .get(v)
                .into_iter()
                .flatten()
                .map(move |c| (v.clone(), c.clone()))
        })
        .filter(|(owner, city)| !state.ledger.is_anchored(owner, city))
        .collect();
    let key = |(owner, name): &(String, String)| {
        let city = state.player(owner).and_then(|p| p.city(name));
        let attract = city.is_some_and(|c| c.modifiers.contains(&CityModifier::AttractDamage));
        (attract, city.map_or(0, |c| c.current_hp))
    };
    targets.sort_by(|a, b| {
        let (a_attract, a_hp) = key(a);
        let (b_attract, b_hp) = key(b);
        let by_hp = if strongest_first { b_hp.cmp(&a_hp) } else { a_hp.cmp(&b_hp) };
        b_attract.cmp(&a_attract).then(by_hp).then_with(|| a.cmp(b))
    });
    targets
}

fn alive_hp(state: &GameState, owner: &str, city: &str) -> Option<u32> {
    state
        .player(owner)
        .and_then(|p| p.city(city))
        .filter(|c| c.is_alive)
        .map(|c| c.current_hp)
}

fn land(state: &mut GameState, front: &mut Front, deployed: &Deployed) {
    let attackers = front.attackers.join("、");
    let defenders = front.defenders.join("、");
    match front.landing.clone() {
        Landing::Roster => {
            let walled: Vec<String> = front.defenders.iter().filter(|d| immune(state, d)).cloned().collect();
            for d in walled {
                state.add_log(format!("🧱 {d} 铜墙铁壁，本轮免疫伤害"));
            }
            let strongest_first = goes_for_strongest(state, &front.attackers);
            let victims = front.defenders.clone();
            spread(state, front, &victims, deployed, strongest_first, true);
        }
        Landing::Reflected => {
            let victims = front.attackers.clone();
            spread(state, front, &victims, deployed, false, false);
            state.add_log(format!("🔁 {attackers} 的攻击被反戈一击，伤及自身 {} HP", front.dealt));
        }
        Landing::Center { owner } => {
            let center = state.player(&owner).map(|p| p.center_city_name.clone());
            if let (Some(center), false) = (center, immune(state, &owner)) {
                let before = alive_hp(state, &owner, &center).unwrap_or(0);
                match strike_city(state, &owner, &center, Harm::Damage(front.power)) {
                    StrikeResult::Applied { damage } => front.dealt += damage,
                    StrikeResult::Killed => {
                        front.dealt += before;
                        front.destroyed.push((owner.clone(), center));
                    }
                    StrikeResult::Redirected { to } => front.destroyed.push((owner.clone(), to)),
                    StrikeResult::Absorbed | StrikeResult::Missed => {}
                }
            }
        }
        Landing::Healing => {
            let mut remaining = front.power;
            for (owner, city) in ordered_targets(state, &front.defenders, deployed, false) {
                if remaining == 0 {
                    break;
                }
                if let Some(c) = state.player_mut(&owner).and_then(|p| p.city_mut(&city)) {
                    let healed = c.heal(remaining);
                    remaining -= healed;
                    front.dealt += healed;
                }
            }
            state.add_log(format!("💚 {defenders} 借来 {attackers} 的箭，恢复 {} HP", front.dealt));
            return;
        }
    }
    if front.landing != Landing::Reflected {
        state.add_log(format!(
            "⚔️ {attackers} → {defenders}：战力 {}，造成 {} 伤害",
            front.power, front.dealt
        ));
    }
    if !front.destroyed.is_empty() {
        let names: Vec<&str> = front.destroyed.iter().map(|(_, c)| c.as_str()).collect();
        state.add_log(format!("💀 摧毁城市：{}", names.join("、")));
    }
}

/// Walk the victims' deployed cities, each taking as much of the power
/// as it has HP left. A shattered city takes double.
fn spread(
    state: &mut GameState,
    front: &mut Front,
    victims: &[String],
    deployed: &Deployed,
    strongest_first: bool,
    retaliates: bool,
) {
    let mut remaining = front.power;
    for (owner, city) in ordered_targets(state, victims, deployed, strongest_first) {
        if remaining == 0 {
            break;
        }
        let Some(current) = alive_hp(state, &owner, &city) else {
            continue;
        };
        let shattered = is_shattered(state, &owner, &city);
        let needed = if shattered { current.div_ceil(2) } else { current };
        let chunk = remaining.min(needed);
        remaining -= chunk;
        let damage = if shattered { chunk.saturating_mul(2).min(current) } else { chunk };
        match strike_city(state, &owner, &city, Harm::Damage(damage)) {
            StrikeResult::Applied { damage } => front.dealt += damage,
            StrikeResult::Killed => {
                front.dealt += current;
                front.destroyed.push((owner.clone(), city.clone()));
                if retaliates {
                    retaliate(state, front, &owner, &city, deployed);
                }
            }
            StrikeResult::Redirected { to } => front.destroyed.push((owner.clone(), to)),
            StrikeResult::Absorbed | StrikeResult::Missed => {}
        }
    }
}

fn strongest_attacking(state: &GameState, front: &Front, deployed: &Deployed) -> Option<(String, String)> {
    front
        .attackers
        .iter()
        .flat_map(|a| deployed.get(a).into_iter().flatten().map(move |c| (a.clone(), c.clone())))
        .filter_map(|(a, c)| alive_hp(state, &a, &c).map(|hp| (hp, a, c)))
        .max_by(|x, y| x.0.cmp(&y.0).then_with(|| y.1.cmp(&x.1)).then_with(|| y.2.cmp(&x.2)))
        .map(|(_, a, c)| (a, c))
}

/// A fallen city with 同归于尽 or 背水一战 strikes back at the strongest
/// city that came at it.
fn retaliate(state: &mut GameState, front: &Front, owner: &str, city: &str, deployed: &Deployed) {
    let modifiers = state
        .player(owner)
        .and_then(|p| p.city(city))
        .map(|c| c.modifiers.clone())
        .unwrap_or_default();
    for m in modifiers {
        let Some((a, c)) = strongest_attacking(state, front, deployed) else {
            return;
        };
        match m {
            CityModifier::MutualDestruction { .. } => {
                if let Some(target) = state.player_mut(&a).and_then(|p| p.city_mut(&c)) {
                    target.kill();
                }
                state.add_log(format!("☠️ {owner} 的 {city} 与 {a} 的 {c} 同归于尽"));
            }
            CityModifier::DesperateRetaliation { damage } => {
                let result = strike_city(state, &a, &c, Harm::Damage(damage));
                if result.landed() {
                    state.add_log(format!("⚔️ {owner} 的 {city} 临死反扑，{a} 的 {c} 受到 {damage} 伤害"));
                }
            }
            _ => {}
        }
    }
}

// ── Aftermath ──────────────────────────────────────────────────────────

/// Move up to `amount` gold. Returns what the receiver actually gained.
fn take_gold(state: &mut GameState, from: &str, to: &str, amount: u8) -> u8 {
    let available = state.player(from).map_or(0, |p| p.gold).min(amount);
    if available == 0 {
        return 0;
    }
    if let Some(p) = state.player_mut(from) {
        p.spend_gold(available);
    }
    state.player_mut(to).map_or(0, |p| p.gain_gold(available))
}

fn credit(report: &mut BattleReport, player: &str, gold: u8) {
    if gold > 0 {
        let entry = report.gold.entry(player.to_string()).or_default();
        *entry = entry.saturating_add(gold);
    }
}

fn aftermath(state: &mut GameState, deployed: &Deployed, fronts: &[Front], report: &mut BattleReport) {
    // last stands, berserk fatigue, spent lures
    for (owner, cities) in deployed {
        for name in cities {
            let Some(city) = state.player_mut(owner).and_then(|p| p.city_mut(name)) else {
                continue;
            };
            if !city.is_alive {
                continue;
            }
            let last_stand = city.modifiers.contains(&CityModifier::SuicideAttack);
            let berserk = city.modifiers.contains(&CityModifier::Berserk);
            city.modifiers.retain(|m| *m != CityModifier::AttractDamage && *m != CityModifier::Berserk);
            if last_stand {
                city.kill();
                state.add_log(format!("⚔️ {owner} 的 {name} 背水一战，战后阵亡"));
            } else if berserk {
                let tired = (city.current_hp / 2).max(1);
                city.set_current_hp(tired);
                state.add_log(format!("😮‍💨 {owner} 的 {name} 狂暴退去，HP 降至 {tired}"));
            }
        }
    }

    // kill gold
    if state.mode == GameMode::TwoPlayer {
        for front in fronts.iter().filter(|f| f.landing != Landing::Reflected) {
            let kills = front.enemy_losses().min(u8::MAX as usize) as u8;
            for attacker in &front.attackers {
                let gained = state
                    .player_mut(attacker)
                    .map_or(0, |p| p.gain_gold(kills.saturating_mul(KILL_GOLD)));
                if gained > 0 {
                    state.add_log(format!("💰 {attacker} 摧毁 {kills} 座城市，获得 {gained} 金币"));
                }
                credit(report, attacker, gained);
            }
        }
    }

    let markers: Vec<(String, BattleMarker)> = state
        .ledger
        .battle_markers
        .iter()
        .flat_map(|(caster, ms)| ms.iter().map(move |m| (caster.clone(), m.clone())))
        .collect();
    let round = state.round;
    for (caster, marker) in markers {
        if state.player(&caster).map_or(true, is_player_defeated) {
            continue;
        }
        match marker {
            BattleMarker::Plunder { target } => {
                let dealt: u32 = fronts
                    .iter()
                    .filter(|f| f.pits(&caster, &target) && f.landing != Landing::Healing)
                    .map(|f| f.dealt)
                    .sum();
                let owed = (dealt / PLUNDER_DAMAGE_PER_GOLD).min(PLUNDER_MAX_GOLD) as u8;
                let gained = take_gold(state, &target, &caster, owed);
                if gained > 0 {
                    state.add_log(format!("🔥 {caster} 趁火打劫，从 {target} 处抢得 {gained} 金币"));
                }
                credit(report, &caster, gained);
            }
            BattleMarker::WaitAtEase { target, gold_mark } => {
                let earned = state
                    .player(&target)
                    .map_or(0, |p| p.gold.saturating_sub(gold_mark));
                let gained = take_gold(state, &target, &caster, earned);
                if gained > 0 {
                    state.add_log(format!("🍵 {caster} 以逸待劳，夺走 {target} 本轮所得 {gained} 金币"));
                }
                credit(report, &caster, gained);
            }
            BattleMarker::Trap { target, city, round: set_in } if set_in == round => {
                let clear = is_tradeable(state, &target, &city)
                    && state.player(&caster).is_some_and(|p| !p.cities.contains_key(&city));
                if clear && transfer_city(state, &target, &caster, &city) {
                    state.add_log(format!("🪤 {target} 的 {city} 中了欲擒故纵之计，归顺 {caster}"));
                    report.defected.push((target, caster, city));
                }
            }
            _ => {}
        }
    }
}
