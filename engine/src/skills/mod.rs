// ═══════════════════════════════════════════════════════════════════════
// Skill Resolution Engine
//
// One entry point, `execute_skill`, runs a fixed precondition pipeline
// and then hands off to the registered handler:
//
//   0a. caster's copy of the skill banned          → SkillBanned
//   0b. caster under stare-down (except 当机立断)   → MovementRestricted
//   1.  mode legality                              → IllegalForMode
//   2.  target player / named cities               → InvalidTarget
//   3.  opponent's jianbukecui vs the blocked set  → ShieldBlocked
//   4.  cooldown, usage caps                       → OnCooldown / UsageLimitReached
//   5.  gold                                       → InsufficientFunds
//   6.  handler: structural checks, one charge, then mutation
//
// Nothing is mutated before step 6 charges, so every error leaves the
// state exactly as it was.
// ═══════════════════════════════════════════════════════════════════════

mod battle;
mod defense;
mod economy;
mod intel;
mod offense;
pub mod registry;
mod trade;

pub use registry::{SkillFn, SkillRegistry};

use crate::catalog::{Arity, CityState, Skill, SkillDef, TargetRule, UsageLimit};
use crate::error::SkillError;
use crate::ledger::{calculate_actual_cost, ShieldHit};
use crate::turn::is_player_defeated;
use crate::types::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

// ── Invocation parameters ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankOp {
    Deposit,
    Withdraw,
}

/// Everything a caller may pass along with a skill name. Which fields a
/// skill reads is fixed by its catalog entry and handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillParams {
    pub target: Option<String>,
    /// The caster's own cities.
    pub cities: Vec<String>,
    /// Cities of the target player.
    pub target_cities: Vec<String>,
    pub amount: Option<u32>,
    /// Skill named by bans, cooldown resets and usage refunds.
    pub skill: Option<Skill>,
    pub province: Option<String>,
    /// Catalog city outside the game (reinforcements).
    pub catalog_city: Option<String>,
    pub bank: Option<BankOp>,
    /// (from, to) radix pair for 进制扭曲.
    pub bases: Option<(u32, u32)>,
    /// Quiz answers right, 0..=3.
    pub correct: Option<u8>,
}

impl SkillParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, player: &str) -> Self {
        self.target = Some(player.to_string());
        self
    }

    pub fn city(mut self, name: &str) -> Self {
        self.cities.push(name.to_string());
        self
    }

    pub fn target_city(mut self, name: &str) -> Self {
        self.target_cities.push(name.to_string());
        self
    }

    pub fn amount(mut self, amount: u32) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn skill(mut self, skill: Skill) -> Self {
        self.skill = Some(skill);
        self
    }

    pub fn province(mut self, province: &str) -> Self {
        self.province = Some(province.to_string());
        self
    }

    pub fn catalog_city(mut self, name: &str) -> Self {
        self.catalog_city = Some(name.to_string());
        self
    }

    pub fn bank(mut self, op: BankOp) -> Self {
        self.bank = Some(op);
        self
    }

    pub fn bases(mut self, from: u32, to: u32) -> Self {
        self.bases = Some((from, to));
        self
    }

    pub fn correct(mut self, answers: u8) -> Self {
        self.correct = Some(answers);
        self
    }
}

// ── Results ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillOutcome {
    pub skill: Skill,
    pub message: String,
    /// Machine-readable details: affected cities, amounts.
    pub data: Value,
}

impl SkillOutcome {
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Flat `{success, message, data}` shape for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillReport {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

impl From<Result<SkillOutcome, SkillError>> for SkillReport {
    fn from(result: Result<SkillOutcome, SkillError>) -> Self {
        match result {
            Ok(outcome) => SkillReport {
                success: true,
                message: outcome.message,
                data: (!outcome.data.is_null()).then_some(outcome.data),
            },
            Err(err) => SkillReport {
                success: false,
                message: err.to_string(),
                data: None,
            },
        }
    }
}

// ── Handler context ────────────────────────────────────────────────────

/// What a handler gets once the shared checks have passed.
pub struct SkillContext<'a> {
    pub state: &'a mut GameState,
    pub skill: Skill,
    pub def: SkillDef,
    pub params: &'a SkillParams,
    /// Index of the caster in `state.players`.
    pub caster: usize,
    pub target: Option<usize>,
    /// Gold the invocation costs, surcharge included.
    pub cost: u8,
    surcharged: bool,
    charged: bool,
}

impl<'a> SkillContext<'a> {
    /// Deduct the cost. Only the first call has any effect.
    pub fn charge(&mut self) {
        if self.charged {
            return;
        }
        self.charged = true;
        let caster = &mut self.state.players[self.caster];
        caster.spend_gold(self.cost);
        if self.surcharged {
            let name = caster.name.clone();
            self.state.ledger.cost_increase.remove(&name);
        }
    }

    pub fn is_charged(&self) -> bool {
        self.charged
    }

    pub fn caster(&self) -> &Player {
        &self.state.players[self.caster]
    }

    pub fn caster_mut(&mut self) -> &mut Player {
        &mut self.state.players[self.caster]
    }

    pub fn caster_name(&self) -> String {
        self.caster().name.clone()
    }

    pub fn target_index(&self) -> Result<usize, SkillError> {
        self.target
            .ok_or_else(|| SkillError::InvalidTarget("this skill needs a target player".into()))
    }

    pub fn target(&self) -> Result<&Player, SkillError> {
        Ok(&self.state.players[self.target_index()?])
    }

    pub fn target_mut(&mut self) -> Result<&mut Player, SkillError> {
        let idx = self.target_index()?;
        Ok(&mut self.state.players[idx])
    }

    pub fn target_name(&self) -> Result<String, SkillError> {
        Ok(self.target()?.name.clone())
    }

    pub fn own_city(&self, i: usize) -> Result<&'a str, SkillError> {
        let params: &'a SkillParams = self.params;
        params
            .cities
            .get(i)
            .map(String::as_str)
            .ok_or_else(|| SkillError::InvalidTarget("missing city argument".into()))
    }

    pub fn their_city(&self, i: usize) -> Result<&'a str, SkillError> {
        let params: &'a SkillParams = self.params;
        params
            .target_cities
            .get(i)
            .map(String::as_str)
            .ok_or_else(|| SkillError::InvalidTarget("missing target city argument".into()))
    }

    pub fn rng(&mut self) -> ChaCha8Rng {
        self.state.next_rng()
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.state.add_log(message);
    }

    /// Private entry for the caster.
    pub fn private_log(&mut self, message: impl Into<String>) {
        let name = self.caster_name();
        self.state.add_private_log(&name, message);
    }

    pub fn done(&self, message: impl Into<String>) -> Result<SkillOutcome, SkillError> {
        Ok(SkillOutcome {
            skill: self.skill,
            message: message.into(),
            data: Value::Null,
        })
    }
}

// ── Harmful-effect helper ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Harm {
    Damage(u32),
    Kill,
    /// Force current HP to a value (clamped by max HP).
    SetCurrent(u32),
    /// Lower the max HP ceiling.
    CapMax(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrikeResult {
    /// A protection or barrier took the hit.
    Absorbed,
    Applied { damage: u32 },
    Killed,
    /// A lethal hit on the center killed the scapegoat instead.
    Redirected { to: String },
    /// City absent or already dead.
    Missed,
}

impl StrikeResult {
    pub fn landed(&self) -> bool {
        matches!(self, StrikeResult::Applied { .. } | StrikeResult::Killed | StrikeResult::Redirected { .. })
    }
}

fn shield_message(city: &str, hit: ShieldHit) -> String {
    match hit {
        ShieldHit::Normal => format!("🛡️ {city} 的城市保护抵挡了攻击并消失"),
        ShieldHit::IronLayer { remaining } => {
            format!("🛡️ {city} 的钢铁护盾抵挡了攻击，剩余 {remaining} 层")
        }
        ShieldHit::IronToNormal => format!("🛡️ {city} 的钢铁护盾破碎，转为普通保护"),
    }
}

/// Apply one harmful sub-effect to one city: a protection takes it
/// first, then the owner's barrier soaks damage, then a lethal hit on
/// the center falls on the scapegoat, and only then does it land.
pub fn strike_city(state: &mut GameState, owner: &str, city: &str, harm: Harm) -> StrikeResult {
    let Some(player) = state.player(owner) else {
        return StrikeResult::Missed;
    };
    let Some(target) = player.city(city).filter(|c| c.is_alive) else {
        return StrikeResult::Missed;
    };
    let current = target.current_hp;
    let is_center = player.is_center(city);

    if let Some(hit) = state.ledger.consume_protection(owner, city) {
        state.add_log(shield_message(city, hit));
        return StrikeResult::Absorbed;
    }

    let harm = match harm {
        Harm::Damage(d) if d > 0 => {
            let through = state.ledger.absorb_with_barrier(owner, d);
            if through < d {
                state.add_log(format!("🔰 {owner} 的屏障吸收了 {} 点伤害", d - through));
            }
            if through == 0 {
                return StrikeResult::Absorbed;
            }
            Harm::Damage(through)
        }
        other => other,
    };

    let lethal = match harm {
        Harm::Damage(d) => d >= current,
        Harm::Kill => true,
        Harm::SetCurrent(v) => v == 0,
        Harm::CapMax(_) => false,
    };
    if lethal && is_center {
        if let Some(goat) = state.ledger.scapegoat.get(owner).cloned() {
            let goat_alive = state
                .player(owner)
                .and_then(|p| p.city(&goat))
                .is_some_and(|c| c.is_alive);
            if goat != city && goat_alive {
                if let Some(c) = state.player_mut(owner).and_then(|p| p.city_mut(&goat)) {
                    c.kill();
                }
                state.ledger.scapegoat.remove(owner);
                state.add_log(format!("🐐 {goat} 代替 {city} 承受了致命一击"));
                return StrikeResult::Redirected { to: goat };
            }
        }
    }

    let Some(c) = state.player_mut(owner).and_then(|p| p.city_mut(city)) else {
        return StrikeResult::Missed;
    };
    let before = c.current_hp;
    match harm {
        Harm::Damage(d) => {
            c.take_damage(d);
        }
        Harm::Kill => c.kill(),
        Harm::SetCurrent(v) => c.set_current_hp(v),
        Harm::CapMax(v) => c.set_max_hp(v),
    }
    if c.is_alive {
        StrikeResult::Applied { damage: before.saturating_sub(c.current_hp) }
    } else {
        StrikeResult::Killed
    }
}

// ── Pipeline ───────────────────────────────────────────────────────────

/// Resolve a skill by its display name.
pub fn execute_skill(
    state: &mut GameState,
    registry: &SkillRegistry,
    caster: &str,
    skill_name: &str,
    params: &SkillParams,
) -> Result<SkillOutcome, SkillError> {
    let skill = Skill::from_name(skill_name)
        .ok_or_else(|| SkillError::UnknownSkill(skill_name.to_string()))?;
    execute(state, registry, caster, skill, params)
}

pub fn execute(
    state: &mut GameState,
    registry: &SkillRegistry,
    caster: &str,
    skill: Skill,
    params: &SkillParams,
) -> Result<SkillOutcome, SkillError> {
    let result = run_pipeline(state, registry, caster, skill, params);
    if let Err(err) = &result {
        log::debug!("{caster} {} rejected: {err}", skill.name());
    }
    result
}

fn run_pipeline(
    state: &mut GameState,
    registry: &SkillRegistry,
    caster: &str,
    skill: Skill,
    params: &SkillParams,
) -> Result<SkillOutcome, SkillError> {
    let handler = registry
        .get(skill)
        .ok_or_else(|| SkillError::UnknownSkill(skill.name().to_string()))?;
    let caster_idx = state
        .player_index(caster)
        .ok_or_else(|| SkillError::InvalidTarget(format!("no player named {caster}")))?;
    let def = skill.def();

    // 0a / 0b: caster status
    if let Some(by) = state.ledger.banned_by(caster, skill) {
        return Err(SkillError::SkillBanned {
            skill: skill.name().to_string(),
            by: by.to_string(),
        });
    }
    let frozen = state.ledger.stare_down_rounds(caster);
    if frozen > 0 && skill != Skill::Decisive {
        return Err(SkillError::MovementRestricted { rounds: frozen });
    }

    // 1: mode legality
    let illegal = || SkillError::IllegalForMode {
        skill: skill.name().to_string(),
        mode: state.mode,
    };
    if !def.legal_in(state.mode) {
        return Err(illegal());
    }
    if def.no_center_in.contains(&state.mode)
        && params.cities.iter().any(|c| state.players[caster_idx].is_center(c))
    {
        return Err(illegal());
    }

    // 2: referential validity
    let target_idx = resolve_target(state, caster_idx, &def, params)?;
    check_cities(&state.players[caster_idx], &params.cities, def.own_cities, def.own_state)?;
    match target_idx {
        Some(t) => check_cities(&state.players[t], &params.target_cities, def.their_cities, def.their_state)?,
        None if !params.target_cities.is_empty() || def.their_cities != Arity::None => {
            return Err(SkillError::InvalidTarget("target cities given without a target player".into()));
        }
        None => {}
    }
    let banned = match skill {
        Skill::BanSkill => Some(
            params
                .skill
                .ok_or_else(|| SkillError::InvalidTarget("name the skill to ban".into()))?,
        ),
        _ => None,
    };

    // 3: jianbukecui
    if let Some(t) = target_idx {
        let target_name = &state.players[t].name;
        if state.are_opponents(caster, target_name)
            && skill.blocked_by_jianbukecui()
            && state.ledger.is_blocked_by_jianbukecui(target_name)
        {
            return Err(SkillError::ShieldBlocked { target: target_name.clone() });
        }
    }

    // 4: cooldown and caps
    if def.cooldown > 0 {
        let rounds = state.usage.cooldown_remaining(caster, skill, def.cooldown, state.round);
        if rounds > 0 {
            return Err(SkillError::OnCooldown { skill: skill.name().to_string(), rounds });
        }
    }
    let limit_hit = match def.usage_limit {
        UsageLimit::Unlimited => false,
        UsageLimit::PerGame(n) => state.usage.count(caster, skill) >= n,
        UsageLimit::PerCity(n) => params
            .cities
            .first()
            .is_some_and(|c| state.usage.city_count(caster, skill, c) >= n),
    };
    if limit_hit {
        return Err(SkillError::UsageLimitReached { skill: skill.name().to_string() });
    }

    // 5: gold
    let cost = calculate_actual_cost(state, caster, &def, banned);
    let surcharged = cost > crate::ledger::base_cost(state, &def, banned);
    let available = state.players[caster_idx].gold;
    if available < cost {
        return Err(SkillError::InsufficientFunds { needed: cost, available });
    }

    // 6: handler
    let mut ctx = SkillContext {
        state,
        skill,
        def,
        params,
        caster: caster_idx,
        target: target_idx,
        cost,
        surcharged,
        charged: false,
    };
    let rng_mark = ctx.state.rng_counter;
    let outcome = match handler(&mut ctx) {
        Ok(outcome) => outcome,
        Err(err) => {
            // Handlers may draw randomness while checking; a rejected
            // invocation leaves the stream where it was.
            ctx.state.rng_counter = rng_mark;
            return Err(err);
        }
    };
    ctx.charge();

    let round = ctx.state.round;
    ctx.state.usage.record(caster, skill, round);
    if let (UsageLimit::PerCity(_), Some(city)) = (def.usage_limit, params.cities.first()) {
        ctx.state.usage.record_city(caster, skill, city);
    }
    log::debug!("{caster} used {} for {cost} gold", skill.name());
    Ok(outcome)
}

fn resolve_target(
    state: &GameState,
    caster_idx: usize,
    def: &SkillDef,
    params: &SkillParams,
) -> Result<Option<usize>, SkillError> {
    let caster = &state.players[caster_idx];
    let named = match params.target.as_deref() {
        Some(name) => Some(
            state
                .player_index(name)
                .ok_or_else(|| SkillError::InvalidTarget(format!("no player named {name}")))?,
        ),
        None => None,
    };
    let idx = match def.target {
        TargetRule::None => return Ok(None),
        TargetRule::Any => named.unwrap_or(caster_idx),
        TargetRule::Teammate => match named {
            Some(i) => i,
            None => state
                .teammate_of(&caster.name)
                .and_then(|p| state.player_index(&p.name))
                .ok_or_else(|| SkillError::InvalidTarget("no teammate".into()))?,
        },
        TargetRule::Opponent | TargetRule::Other => {
            named.ok_or_else(|| SkillError::InvalidTarget("this skill needs a target player".into()))?
        }
    };
    let target = &state.players[idx];
    let ok = match def.target {
        TargetRule::Opponent => state.are_opponents(&caster.name, &target.name),
        TargetRule::Other => idx != caster_idx,
        TargetRule::Teammate => {
            idx != caster_idx && state.mode.is_team_mode() && target.team == caster.team
        }
        TargetRule::Any | TargetRule::None => true,
    };
    if !ok {
        return Err(SkillError::InvalidTarget(format!("{} is not a valid target", target.name)));
    }
    if idx != caster_idx && is_player_defeated(target) {
        return Err(SkillError::InvalidTarget(format!("{} is already defeated", target.name)));
    }
    Ok(Some(idx))
}

fn check_cities(player: &Player, names: &[String], arity: Arity, wanted: CityState) -> Result<(), SkillError> {
    if !arity.accepts(names.len()) {
        return Err(SkillError::InvalidTarget(format!(
            "expected {arity:?} city name(s), got {}",
            names.len()
        )));
    }
    let unique: BTreeSet<&String> = names.iter().collect();
    if unique.len() != names.len() {
        return Err(SkillError::InvalidTarget("the same city was named twice".into()));
    }
    for name in names {
        let city = player
            .city(name)
            .ok_or_else(|| SkillError::InvalidTarget(format!("{} has no city named {name}", player.name)))?;
        match wanted {
            CityState::Alive if !city.is_alive => {
                return Err(SkillError::InvalidTarget(format!("{name} has fallen")));
            }
            CityState::Dead if city.is_alive => {
                return Err(SkillError::InvalidTarget(format!("{name} is still standing")));
            }
            _ => {}
        }
    }
    Ok(())
}

// ── Shared handler helpers ─────────────────────────────────────────────

pub(crate) fn invalid(msg: impl Into<String>) -> SkillError {
    SkillError::InvalidTarget(msg.into())
}

pub(crate) fn none_eligible(msg: impl Into<String>) -> SkillError {
    SkillError::NoEligibleCities(msg.into())
}

/// Raise a city's max and current HP by `pct` percent (of the current
/// values), never past the growth ceiling for its base HP.
pub(crate) fn scale_city(city: &mut City, pct: u32) {
    let limit = crate::catalog::city_hp_limit(city.base_hp).max(city.hp);
    city.hp = ((city.hp as u64 * pct as u64 / 100) as u32).min(limit).max(1);
    let current = (city.current_hp as u64 * pct as u64 / 100) as u32;
    city.set_current_hp(current.max(1));
}
