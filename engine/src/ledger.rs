// ═══════════════════════════════════════════════════════════════════════
// Effect Ledger — timed and consumable effects keyed by player/city name
//
// Every map is keyed by player name, and per-city maps nest by city name.
// Nothing here is positional: a city keeps its entries for as long as it
// stays with the same owner, and loses them when it changes hands.
// ═══════════════════════════════════════════════════════════════════════

use crate::catalog::{Skill, SkillDef, PAID_TIER_THRESHOLD};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Entry payloads ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disguise {
    pub rounds_left: u32,
    /// Catalog city shown to opponents instead.
    pub as_name: String,
    pub as_hp: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barrier {
    pub hp: u32,
    pub max_hp: u32,
    pub rounds_left: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBomb {
    pub city: String,
    pub rounds_left: u32,
    pub planted_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialCrisis {
    pub rounds_left: u32,
    pub started_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickJade {
    /// City sitting out while the bonus pays.
    pub city: String,
    pub rounds_left: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overflow {
    pub rounds_left: u32,
    pub rate_pct: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truce {
    pub ally: String,
    pub rounds_left: u32,
}

/// Round-scoped notes left by battle skills, read by battle resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleMarker {
    Prediction { target: String, city: String },
    Feint { target: String },
    WaitAtEase { target: String, gold_mark: u8 },
    BorrowArrows { target: String },
    BesiegeWei { target: String },
    Trap { target: String, city: String, round: u32 },
    Plunder { target: String },
    Reflect { target: String },
    Discord { target: String },
    /// Stored under the owner of the shattered city.
    Shatter { city: String },
    Watching { target: String },
}

/// How a protection reacted to an incoming hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShieldHit {
    /// Normal protection removed.
    Normal,
    /// Iron shield lost a layer.
    IronLayer { remaining: u8 },
    /// Last iron layer became a normal protection.
    IronToNormal,
}

// ── Ledger ─────────────────────────────────────────────────────────────

type PerCity<T> = BTreeMap<String, BTreeMap<String, T>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectLedger {
    pub protections: PerCity<u32>,
    /// Remaining iron layers. Permanent until consumed.
    pub iron_cities: PerCity<u8>,
    pub disguised: PerCity<Disguise>,
    pub anchored: PerCity<u32>,
    pub barrier: BTreeMap<String, Barrier>,
    pub jianbukecui: BTreeMap<String, u32>,
    pub purple_chamber: BTreeMap<String, String>,
    pub sub_center: BTreeMap<String, String>,
    pub hp_bank: BTreeMap<String, u32>,
    pub time_bombs: BTreeMap<String, Vec<TimeBomb>>,
    pub mirage: BTreeMap<String, u32>,
    /// 厚积薄发 countdowns.
    pub hjbf: BTreeMap<String, u32>,
    pub financial_crisis: Option<FinancialCrisis>,
    pub cost_increase: BTreeSet<String>,
    /// banned_skills[player][skill] = who banned it.
    pub banned_skills: BTreeMap<String, BTreeMap<Skill, String>>,
    pub stare_down: BTreeMap<String, u32>,
    pub skill_protection: BTreeMap<String, u32>,
    pub cautious: BTreeMap<String, BTreeSet<String>>,
    /// deep_hiding[player][city] = round the city last fought.
    pub deep_hiding: PerCity<u32>,
    pub brick_jade: BTreeMap<String, BrickJade>,
    pub overflow: BTreeMap<String, Overflow>,
    pub scapegoat: BTreeMap<String, String>,
    /// Province overrides from 拔旗易帜.
    pub change_flag: PerCity<String>,
    pub planned: BTreeMap<String, BTreeSet<String>>,
    pub unrevivable: BTreeMap<String, BTreeSet<String>>,
    pub truces: BTreeMap<String, Truce>,
    pub battle_markers: BTreeMap<String, Vec<BattleMarker>>,
    /// First 隔岸观火 user this round.
    pub watcher: Option<String>,
    /// fatigue[player][city] = consecutive battles the city has fought.
    pub fatigue: PerCity<u32>,
}

fn per_city<'a, T>(map: &'a PerCity<T>, player: &str, city: &str) -> Option<&'a T> {
    map.get(player).and_then(|m| m.get(city))
}

fn remove_per_city<T>(map: &mut PerCity<T>, player: &str, city: &str) -> Option<T> {
    let inner = map.get_mut(player)?;
    let removed = inner.remove(city);
    if inner.is_empty() {
        map.remove(player);
    }
    removed
}

fn insert_per_city<T>(map: &mut PerCity<T>, player: &str, city: &str, value: T) {
    map.entry(player.to_string())
        .or_default()
        .insert(city.to_string(), value);
}

impl EffectLedger {
    // ── Protection ─────────────────────────────────────────────────────

    pub fn protection_rounds(&self, player: &str, city: &str) -> u32 {
        per_city(&self.protections, player, city).copied().unwrap_or(0)
    }

    pub fn iron_layers(&self, player: &str, city: &str) -> u8 {
        per_city(&self.iron_cities, player, city).copied().unwrap_or(0)
    }

    pub fn is_iron(&self, player: &str, city: &str) -> bool {
        self.iron_layers(player, city) > 0
    }

    /// Normal or iron protection is active on the city.
    pub fn has_protection(&self, player: &str, city: &str) -> bool {
        self.protection_rounds(player, city) > 0 || self.is_iron(player, city)
    }

    /// Set a normal protection. Existing rounds are replaced, not added to.
    pub fn protect(&mut self, player: &str, city: &str, rounds: u32) {
        insert_per_city(&mut self.protections, player, city, rounds);
    }

    pub fn set_iron(&mut self, player: &str, city: &str, layers: u8) {
        insert_per_city(&mut self.iron_cities, player, city, layers);
    }

    /// Spend one unit of protection against an incoming hit. Iron goes
    /// first: two layers drop to one, the last layer turns into a
    /// normal protection. A normal protection is removed outright.
    pub fn consume_protection(&mut self, player: &str, city: &str) -> Option<ShieldHit> {
        match self.iron_layers(player, city) {
            0 => {}
            1 => {
                remove_per_city(&mut self.iron_cities, player, city);
                self.protect(player, city, PROTECTION_ROUNDS);
                return Some(ShieldHit::IronToNormal);
            }
            n => {
                let remaining = n - 1;
                self.set_iron(player, city, remaining);
                return Some(ShieldHit::IronLayer { remaining });
            }
        }
        remove_per_city(&mut self.protections, player, city).map(|_| ShieldHit::Normal)
    }

    /// Remove normal and iron protection from a city without a hit.
    pub fn strip_protection(&mut self, player: &str, city: &str) -> bool {
        let normal = remove_per_city(&mut self.protections, player, city).is_some();
        let iron = remove_per_city(&mut self.iron_cities, player, city).is_some();
        normal || iron
    }

    // ── Status gates ───────────────────────────────────────────────────

    pub fn is_blocked_by_jianbukecui(&self, player: &str) -> bool {
        self.jianbukecui.get(player).is_some_and(|r| *r > 0)
    }

    pub fn fatigue_streak(&self, player: &str, city: &str) -> u32 {
        per_city(&self.fatigue, player, city).copied().unwrap_or(0)
    }

    pub fn is_anchored(&self, player: &str, city: &str) -> bool {
        per_city(&self.anchored, player, city).is_some_and(|r| *r > 0)
    }

    pub fn stare_down_rounds(&self, player: &str) -> u32 {
        self.stare_down.get(player).copied().unwrap_or(0)
    }

    pub fn has_skill_protection(&self, player: &str) -> bool {
        self.skill_protection.get(player).is_some_and(|r| *r > 0)
    }

    pub fn banned_by(&self, player: &str, skill: Skill) -> Option<&str> {
        self.banned_skills
            .get(player)
            .and_then(|m| m.get(&skill))
            .map(String::as_str)
    }

    pub fn has_bomb(&self, player: &str, city: &str) -> bool {
        self.time_bombs
            .get(player)
            .is_some_and(|bombs| bombs.iter().any(|b| b.city == city))
    }

    pub fn disguise(&self, player: &str, city: &str) -> Option<&Disguise> {
        per_city(&self.disguised, player, city)
    }

    pub fn is_planned(&self, player: &str, city: &str) -> bool {
        self.planned.get(player).is_some_and(|s| s.contains(city))
    }

    pub fn is_unrevivable(&self, player: &str, city: &str) -> bool {
        self.unrevivable.get(player).is_some_and(|s| s.contains(city))
    }

    // ── Cautious set ───────────────────────────────────────────────────

    pub fn is_in_cautious_set(&self, player: &str, city: &str) -> bool {
        self.cautious.get(player).is_some_and(|s| s.contains(city))
    }

    /// Returns false when the city was already excluded.
    pub fn add_to_cautious_set(&mut self, player: &str, city: &str) -> bool {
        self.cautious
            .entry(player.to_string())
            .or_default()
            .insert(city.to_string())
    }

    // ── Barrier ────────────────────────────────────────────────────────

    /// Soak up as much of `damage` as the barrier holds. Returns what
    /// gets through. An emptied barrier stays up until it expires or
    /// regenerates.
    pub fn absorb_with_barrier(&mut self, player: &str, damage: u32) -> u32 {
        match self.barrier.get_mut(player) {
            Some(b) if b.hp > 0 => {
                let soaked = damage.min(b.hp);
                b.hp -= soaked;
                damage - soaked
            }
            _ => damage,
        }
    }

    // ── Markers ────────────────────────────────────────────────────────

    pub fn add_marker(&mut self, player: &str, marker: BattleMarker) {
        self.battle_markers
            .entry(player.to_string())
            .or_default()
            .push(marker);
    }

    pub fn markers(&self, player: &str) -> &[BattleMarker] {
        self.battle_markers
            .get(player)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ── City lifecycle ─────────────────────────────────────────────────

    /// Drop every per-city entry `player` holds for `city`. Used when the
    /// city leaves its owner.
    pub fn forget_city(&mut self, player: &str, city: &str) {
        remove_per_city(&mut self.protections, player, city);
        remove_per_city(&mut self.iron_cities, player, city);
        remove_per_city(&mut self.disguised, player, city);
        remove_per_city(&mut self.anchored, player, city);
        remove_per_city(&mut self.deep_hiding, player, city);
        remove_per_city(&mut self.change_flag, player, city);
        remove_per_city(&mut self.fatigue, player, city);
        if let Some(bombs) = self.time_bombs.get_mut(player) {
            bombs.retain(|b| b.city != city);
        }
        for named in [&mut self.purple_chamber, &mut self.sub_center, &mut self.scapegoat] {
            if named.get(player).is_some_and(|c| c == city) {
                named.remove(player);
            }
        }
        for set in [&mut self.planned, &mut self.unrevivable, &mut self.cautious] {
            if let Some(s) = set.get_mut(player) {
                s.remove(city);
            }
        }
        if self.brick_jade.get(player).is_some_and(|b| b.city == city) {
            self.brick_jade.remove(player);
        }
    }
}

// ── Interest ───────────────────────────────────────────────────────────

/// Interest paid on an HP-bank balance: 10/8/6/4/2% for each successive
/// 10000-wide band, 1% from 50000 up.
pub fn bank_interest(balance: u32) -> u32 {
    let pct = match balance / 10_000 {
        0 => 10,
        1 => 8,
        2 => 6,
        3 => 4,
        4 => 2,
        _ => 1,
    };
    balance * pct / 100
}

// ── Queries over the whole state ───────────────────────────────────────

pub fn alive_cities<'a>(state: &'a GameState, player: &str) -> Vec<&'a City> {
    state
        .player(player)
        .map(|p| p.alive_cities().collect())
        .unwrap_or_default()
}

/// Alive cities in the player's current roster, in deployment order.
pub fn roster_cities<'a>(state: &'a GameState, player: &str) -> Vec<&'a City> {
    let (Some(p), Some(roster)) = (state.player(player), state.rosters.get(player)) else {
        return Vec::new();
    };
    roster
        .iter()
        .filter_map(|name| p.city(name))
        .filter(|c| c.is_alive)
        .collect()
}

/// Province used by province-based skills. Planned cities have none.
pub fn effective_province(state: &GameState, player: &str, city: &str) -> Option<String> {
    if state.ledger.is_planned(player, city) {
        return None;
    }
    if let Some(flag) = per_city(&state.ledger.change_flag, player, city) {
        return Some(flag.clone());
    }
    state
        .player(player)
        .and_then(|p| p.city(city))
        .map(|c| c.province.clone())
}

/// Whether a trade or theft skill may move the city.
pub fn is_tradeable(state: &GameState, player: &str, city: &str) -> bool {
    let Some(p) = state.player(player) else {
        return false;
    };
    let Some(c) = p.city(city) else {
        return false;
    };
    let ledger = &state.ledger;
    c.is_alive
        && !p.is_center(city)
        && !ledger.is_anchored(player, city)
        && !ledger.is_iron(player, city)
        && ledger.protection_rounds(player, city) == 0
        && !ledger.is_in_cautious_set(player, city)
}

pub fn tradeable_cities(state: &GameState, player: &str) -> Vec<String> {
    alive_cities(state, player)
        .into_iter()
        .filter(|c| is_tradeable(state, player, &c.name))
        .map(|c| c.name.clone())
        .collect()
}

// ── Cost ───────────────────────────────────────────────────────────────

/// Cost before any surcharge. `banned` is the skill a 事半功倍 names.
pub fn base_cost(state: &GameState, def: &SkillDef, banned: Option<Skill>) -> u8 {
    match (def.skill, banned) {
        (Skill::BanSkill, Some(b)) => crate::catalog::ban_cost(b),
        _ => def.cost_in(state.mode),
    }
}

/// Gold the caster actually pays: the base cost, raised by half (rounded
/// up) while the caster carries a cost-increase mark and the base cost
/// reaches the paid tier.
pub fn calculate_actual_cost(state: &GameState, caster: &str, def: &SkillDef, banned: Option<Skill>) -> u8 {
    let base = base_cost(state, def, banned);
    if base >= PAID_TIER_THRESHOLD && state.ledger.cost_increase.contains(caster) {
        (base as u32 * 3).div_ceil(2).min(u8::MAX as u32) as u8
    } else {
        base
    }
}

// ── Ownership transfer ─────────────────────────────────────────────────

/// Move a city between players. Its per-city effects and everyone's
/// knowledge of it are dropped; disguise is gone and the previous owner
/// keeps knowing where it went. Returns false if the move is impossible
/// (missing city, or the receiver already owns one by that name).
pub fn transfer_city(state: &mut GameState, from: &str, to: &str, city: &str) -> bool {
    let receiver_has = state.player(to).map_or(true, |p| p.cities.contains_key(city));
    if receiver_has {
        return false;
    }
    let Some(mut moved) = state.player_mut(from).and_then(|p| p.cities.remove(city)) else {
        return false;
    };
    moved.is_center = false;
    state.ledger.forget_city(from, city);
    state.forget_city(from, city);
    if let Some(roster) = state.rosters.get_mut(from) {
        roster.retain(|c| c != city);
    }
    if let Some(receiver) = state.player_mut(to) {
        receiver.cities.insert(city.to_string(), moved);
    }
    state.mark_known(from, to, city);
    true
}
