// ═══════════════════════════════════════════════════════════════════════
// Core types — players, cities, modifiers and the top-level game state
// ═══════════════════════════════════════════════════════════════════════

use crate::catalog::CityDef;
use crate::config::GameConfig;
use crate::journal::Journal;
use crate::ledger::EffectLedger;
use crate::usage::SkillUsage;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Rule constants ─────────────────────────────────────────────────────

pub const GOLD_CAP: u8 = 24;
pub const STARTING_GOLD: u8 = 2;
pub const CITIES_PER_PLAYER: usize = 10;
pub const ROUND_INCOME: u8 = 3;
pub const CRISIS_INCOME: u8 = 1;
pub const MAX_ROSTER: usize = 3;

pub const PROTECTION_ROUNDS: u32 = 10;
pub const IRON_LAYERS: u8 = 2;
pub const ANCHOR_ROUNDS: u32 = 10;
pub const DISGUISE_ROUNDS: u32 = 3;
pub const JIANBUKECUI_ROUNDS: u32 = 3;
pub const CRISIS_ROUNDS: u32 = 3;
pub const STARE_DOWN_ROUNDS: u32 = 3;
pub const TIME_BOMB_ROUNDS: u32 = 3;
pub const MIRAGE_ROUNDS: u32 = 3;

pub const BARRIER_HP: u32 = 25_000;
pub const BARRIER_ROUNDS: u32 = 5;
pub const BARRIER_REGEN: u32 = 3_000;

pub const SURGE_HP_CAP: u32 = 100_000;
pub const DEEP_HIDING_PERIOD: u32 = 5;
pub const DEEP_HIDING_BONUS: u32 = 10_000;

/// Add a signed delta to a gold balance, clamped to [0, GOLD_CAP].
pub fn clamp_gold(gold: u8, delta: i32) -> u8 {
    (gold as i32 + delta).clamp(0, GOLD_CAP as i32) as u8
}

// ── Game mode ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "2P")]
    TwoPlayer,
    #[serde(rename = "3P")]
    ThreePlayer,
    #[serde(rename = "2v2")]
    TwoVsTwo,
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [GameMode::TwoPlayer, GameMode::ThreePlayer, GameMode::TwoVsTwo];

    pub fn player_count(self) -> usize {
        match self {
            GameMode::TwoPlayer => 2,
            GameMode::ThreePlayer => 3,
            GameMode::TwoVsTwo => 4,
        }
    }

    pub fn is_team_mode(self) -> bool {
        self == GameMode::TwoVsTwo
    }

    /// Team of the seat at `index`. Seats 0-1 form team 0, seats 2-3 team 1.
    pub fn team_for_seat(self, index: usize) -> u8 {
        if self.is_team_mode() && index > 1 {
            1
        } else {
            0
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameMode::TwoPlayer => write!(f, "2P"),
            GameMode::ThreePlayer => write!(f, "3P"),
            GameMode::TwoVsTwo => write!(f, "2v2"),
        }
    }
}

impl std::str::FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2P" | "2p" => Ok(GameMode::TwoPlayer),
            "3P" | "3p" => Ok(GameMode::ThreePlayer),
            "2v2" | "2V2" => Ok(GameMode::TwoVsTwo),
            other => Err(format!("unknown game mode '{other}' (expected 2P, 3P or 2v2)")),
        }
    }
}

// ── Modifiers ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityRule {
    HighestHp,
}

/// Timed effects attached to a player for the battle step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleModifier {
    DamageReduction { pct: u8, rounds_left: u32 },
    DamageImmunity { rounds_left: u32 },
    AttackPriority { rule: PriorityRule, rounds_left: u32 },
    NoDeploy { rounds_left: u32 },
}

impl BattleModifier {
    pub fn rounds_left_mut(&mut self) -> &mut u32 {
        match self {
            BattleModifier::DamageReduction { rounds_left, .. }
            | BattleModifier::DamageImmunity { rounds_left }
            | BattleModifier::AttackPriority { rounds_left, .. }
            | BattleModifier::NoDeploy { rounds_left } => rounds_left,
        }
    }
}

/// Effects attached to a single city. Only some of them count down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CityModifier {
    IgnoreFatigue { rounds_left: u32 },
    AttractDamage,
    PowerMultiplier { factor: u32 },
    SuicideAttack,
    DesperateRetaliation { damage: u32 },
    MutualDestruction { rounds_left: u32 },
    Berserk,
    /// City sits out until the countdown ends, then returns at `return_hp`.
    HealingOverTime { rounds_left: u32, return_hp: u32 },
    Settled,
}

impl CityModifier {
    pub fn countdown(&mut self) -> Option<&mut u32> {
        match self {
            CityModifier::IgnoreFatigue { rounds_left }
            | CityModifier::MutualDestruction { rounds_left }
            | CityModifier::HealingOverTime { rounds_left, .. } => Some(rounds_left),
            _ => None,
        }
    }

    /// Effects that work against the owning city.
    pub fn is_harmful(&self) -> bool {
        matches!(
            self,
            CityModifier::SuicideAttack | CityModifier::MutualDestruction { .. }
        )
    }
}

// ── City ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    /// Current max HP ceiling.
    pub hp: u32,
    pub current_hp: u32,
    /// Max HP when the city entered the game.
    pub base_hp: u32,
    pub is_alive: bool,
    pub is_center: bool,
    pub modifiers: Vec<CityModifier>,
    pub province: String,
}

impl City {
    pub fn from_def(def: &CityDef) -> Self {
        City {
            name: def.name.to_string(),
            hp: def.hp,
            current_hp: def.hp,
            base_hp: def.hp,
            is_alive: true,
            is_center: false,
            modifiers: Vec::new(),
            province: def.province.to_string(),
        }
    }

    pub fn is_injured(&self) -> bool {
        self.is_alive && self.current_hp < self.hp
    }

    /// Set current HP, clamped to [0, hp]. Reaching 0 kills the city.
    /// A dead city stays at 0; only `revive` brings it back.
    pub fn set_current_hp(&mut self, value: u32) {
        if !self.is_alive {
            return;
        }
        self.current_hp = value.min(self.hp);
        if self.current_hp == 0 {
            self.is_alive = false;
        }
    }

    /// Returns the HP actually removed.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let dealt = amount.min(self.current_hp);
        self.set_current_hp(self.current_hp - dealt);
        dealt
    }

    /// Returns the HP actually restored. Dead cities do not heal.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if !self.is_alive {
            return 0;
        }
        let before = self.current_hp;
        self.set_current_hp(self.current_hp.saturating_add(amount));
        self.current_hp - before
    }

    pub fn kill(&mut self) {
        self.current_hp = 0;
        self.is_alive = false;
    }

    pub fn revive(&mut self, hp: u32) {
        self.current_hp = hp.clamp(1, self.hp);
        self.is_alive = true;
    }

    /// Raise both the ceiling and current HP by `extra`, never past `limit`.
    pub fn grow(&mut self, extra: u32, limit: u32) {
        let new_hp = self.hp.saturating_add(extra).min(limit.max(self.hp));
        let gained = new_hp - self.hp;
        self.hp = new_hp;
        self.set_current_hp(self.current_hp.saturating_add(gained));
    }

    /// Lower the ceiling. Current HP follows it down.
    pub fn set_max_hp(&mut self, hp: u32) {
        self.hp = hp.max(1);
        self.set_current_hp(self.current_hp);
    }
}

// ── Player ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub gold: u8,
    /// Keyed by city name. Positions carry no meaning.
    pub cities: BTreeMap<String, City>,
    pub center_city_name: String,
    pub battle_modifiers: Vec<BattleModifier>,
    pub team: u8,
    pub is_ai: bool,
}

impl Player {
    pub fn center(&self) -> Option<&City> {
        self.cities.get(&self.center_city_name)
    }

    pub fn city(&self, name: &str) -> Option<&City> {
        self.cities.get(name)
    }

    pub fn city_mut(&mut self, name: &str) -> Option<&mut City> {
        self.cities.get_mut(name)
    }

    pub fn alive_cities(&self) -> impl Iterator<Item = &City> {
        self.cities.values().filter(|c| c.is_alive)
    }

    pub fn alive_count(&self) -> usize {
        self.alive_cities().count()
    }

    pub fn is_center(&self, city: &str) -> bool {
        self.center_city_name == city
    }

    /// Alive non-center cities, weakest first (ties broken by name).
    pub fn alive_non_center_by_hp(&self) -> Vec<&City> {
        let mut cities: Vec<&City> = self
            .alive_cities()
            .filter(|c| !self.is_center(&c.name))
            .collect();
        cities.sort_by(|a, b| a.current_hp.cmp(&b.current_hp).then_with(|| a.name.cmp(&b.name)));
        cities
    }

    pub fn total_hp(&self) -> u64 {
        self.alive_cities().map(|c| c.current_hp as u64).sum()
    }

    /// Returns the gold actually added after clamping.
    pub fn gain_gold(&mut self, amount: u8) -> u8 {
        let before = self.gold;
        self.gold = clamp_gold(self.gold, amount as i32);
        self.gold - before
    }

    pub fn spend_gold(&mut self, amount: u8) {
        self.gold = clamp_gold(self.gold, -(amount as i32));
    }

    /// Make `city` the center, keeping `is_center` flags in step.
    pub fn set_center(&mut self, city: &str) {
        if let Some(old) = self.cities.get_mut(&self.center_city_name) {
            old.is_center = false;
        }
        if let Some(new) = self.cities.get_mut(city) {
            new.is_center = true;
        }
        self.center_city_name = city.to_string();
    }
}

// ── Game outcome ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Winner(String),
    TeamWinner(u8),
    /// Every player fell on the same turn.
    Draw,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Winner(name) => write!(f, "{} wins", name),
            Outcome::TeamWinner(team) => write!(f, "team {} wins", team),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}

// ── Game State ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub config: GameConfig,
    pub mode: GameMode,
    pub round: u32,
    /// Index into `players` of whoever is acting.
    pub current_player: usize,
    /// Turns ended so far across the whole game.
    pub turn_counter: u64,
    /// Seat order is turn order.
    pub players: Vec<Player>,
    pub ledger: EffectLedger,
    pub usage: SkillUsage,
    pub journal: Journal,
    /// Cities each player deployed for the current round.
    pub rosters: BTreeMap<String, Vec<String>>,
    /// known_cities[observer][owner] = owner's cities the observer has seen.
    pub known_cities: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    /// Catalog cities nobody was dealt.
    pub unused_cities: Vec<String>,

    // Deterministic RNG
    pub seed: u64,
    pub rng_counter: u64,

    pub outcome: Option<Outcome>,
}

impl GameState {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player_index(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.name == name)
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn current(&self) -> &Player {
        &self.players[self.current_player]
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Players on the other side of `name`.
    pub fn are_opponents(&self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        match (self.player(a), self.player(b)) {
            (Some(pa), Some(pb)) => !self.mode.is_team_mode() || pa.team != pb.team,
            _ => false,
        }
    }

    pub fn teammate_of(&self, name: &str) -> Option<&Player> {
        if !self.mode.is_team_mode() {
            return None;
        }
        let team = self.player(name)?.team;
        self.players.iter().find(|p| p.name != name && p.team == team)
    }

    /// Fresh RNG derived from the seed and a per-call counter.
    pub fn next_rng(&mut self) -> ChaCha8Rng {
        self.rng_counter += 1;
        ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(self.rng_counter.wrapping_mul(0x9E37_79B9)))
    }

    pub fn mark_known(&mut self, observer: &str, owner: &str, city: &str) {
        if observer == owner {
            return;
        }
        self.known_cities
            .entry(observer.to_string())
            .or_default()
            .entry(owner.to_string())
            .or_default()
            .insert(city.to_string());
    }

    pub fn is_known(&self, observer: &str, owner: &str, city: &str) -> bool {
        self.known_cities
            .get(observer)
            .and_then(|m| m.get(owner))
            .is_some_and(|s| s.contains(city))
    }

    /// Drop every observer's knowledge of one city of `owner`.
    pub fn forget_city(&mut self, owner: &str, city: &str) {
        for owners in self.known_cities.values_mut() {
            if let Some(set) = owners.get_mut(owner) {
                set.remove(city);
            }
        }
    }

    pub fn add_log(&mut self, message: impl Into<String>) {
        self.journal.add_log(self.round, message);
    }

    pub fn add_private_log(&mut self, player: &str, message: impl Into<String>) {
        self.journal.add_private_log(self.round, player, message);
    }
}
