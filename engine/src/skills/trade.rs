// ═══════════════════════════════════════════════════════════════════════
// Trade and acquisition skills — cities changing hands
// ═══════════════════════════════════════════════════════════════════════

use super::{invalid, none_eligible, SkillContext, SkillOutcome, SkillRegistry};
use crate::catalog::{find_city, Skill};
use crate::error::SkillError;
use crate::ledger::{effective_province, is_tradeable, tradeable_cities, transfer_city};
use crate::types::*;
use rand::seq::SliceRandom;
use serde_json::json;
use std::collections::BTreeSet;

type SkillResult = Result<SkillOutcome, SkillError>;

pub(super) fn register(reg: &mut SkillRegistry) {
    reg.register(Skill::PreemptiveStrike, preemptive_strike);
    reg.register(Skill::HostageExchange, hostage_exchange);
    reg.register(Skill::Recruit, recruit);
    reg.register(Skill::ForcedHaul, forced_haul);
    reg.register(Skill::AmbushRandom, ambush_random);
    reg.register(Skill::AmbushTargeted, ambush_targeted);
    reg.register(Skill::SurroundedBySongs, surrounded_by_songs);
    reg.register(Skill::Surrender, surrender);
    reg.register(Skill::RelocateBasic, relocate_basic);
    reg.register(Skill::RelocateAdvanced, relocate_advanced);
    reg.register(Skill::SomethingFromNothing, something_from_nothing);
    reg.register(Skill::ReinforceBasic, reinforce_basic);
    reg.register(Skill::ReinforceAdvanced, reinforce_advanced);
}

const FROM_NOTHING_MAX_HP: u32 = 5_000;
const REINFORCE_BASIC_MAX_HP: u32 = 20_000;
const REINFORCE_BASIC_DRAWS: usize = 3;
const REINFORCE_ADVANCED_MAX_HP: u32 = 30_000;

// ── Helpers ────────────────────────────────────────────────────────────

fn require_tradeable(ctx: &SkillContext, owner: &str, city: &str) -> Result<(), SkillError> {
    if !is_tradeable(ctx.state, owner, city) {
        return Err(none_eligible(format!("{city} cannot be moved")));
    }
    Ok(())
}

/// The receiver must not already own a city by that name.
fn receivable(ctx: &SkillContext, receiver: &str, city: &str) -> bool {
    ctx.state.player(receiver).is_some_and(|p| !p.cities.contains_key(city))
}

fn hp_of(ctx: &SkillContext, owner: &str, city: &str) -> u32 {
    ctx.state
        .player(owner)
        .and_then(|p| p.city(city))
        .map(|c| c.current_hp)
        .unwrap_or(0)
}

/// Tradeable cities of `owner` that `receiver` could take, weakest first.
fn takeable(ctx: &SkillContext, owner: &str, receiver: &str) -> Vec<String> {
    let mut names: Vec<String> = tradeable_cities(ctx.state, owner)
        .into_iter()
        .filter(|c| receivable(ctx, receiver, c))
        .collect();
    names.sort_by(|a, b| {
        hp_of(ctx, owner, a)
            .cmp(&hp_of(ctx, owner, b))
            .then_with(|| a.cmp(b))
    });
    names
}

/// Trade `mine` for `theirs` and charge. Both moves are checked before
/// either happens, so an error leaves both sides as they were.
fn swap(ctx: &mut SkillContext, mine: &str, theirs: &str) -> Result<(), SkillError> {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let owns_both = ctx.caster().cities.contains_key(mine) && ctx.target()?.cities.contains_key(theirs);
    if !owns_both {
        return Err(invalid(format!("{mine} and {theirs} are not both in play")));
    }
    if !receivable(ctx, &caster, theirs) || !receivable(ctx, &target, mine) {
        return Err(invalid("a city by that name is already on the other side"));
    }
    ctx.charge();
    let taken = transfer_city(ctx.state, &target, &caster, theirs);
    let given = taken && transfer_city(ctx.state, &caster, &target, mine);
    debug_assert!(given, "swap of {mine} for {theirs} was checked before moving");
    if !given {
        log::error!("swap of {mine} for {theirs} left half done");
        return Err(invalid(format!("{mine} cannot change hands")));
    }
    Ok(())
}

fn take(ctx: &mut SkillContext, city: &str) -> Result<(), SkillError> {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    if !transfer_city(ctx.state, &target, &caster, city) {
        return Err(invalid(format!("{city} cannot change hands")));
    }
    Ok(())
}

fn took(ctx: &mut SkillContext, cities: &[String]) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    ctx.log(format!(
        "🏴 {caster} 使用{}，从 {target} 处夺得 {}",
        ctx.skill.name(),
        cities.join("、")
    ));
    ctx.done(format!("took {}", cities.join(", ")))
        .map(|o| o.with_data(json!({ "cities": cities })))
}

// ── Swaps ──────────────────────────────────────────────────────────────

fn preemptive_strike(ctx: &mut SkillContext) -> SkillResult {
    let mine = ctx.own_city(0)?;
    let theirs = ctx.their_city(0)?;
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    require_tradeable(ctx, &caster, mine)?;
    require_tradeable(ctx, &target, theirs)?;
    swap(ctx, mine, theirs)?;
    ctx.log(format!("🔄 {caster} 先声夺人，用 {mine} 换走 {target} 的 {theirs}"));
    ctx.done(format!("swapped {mine} for {theirs}"))
        .map(|o| o.with_data(json!({ "gave": mine, "got": theirs })))
}

fn hostage_exchange(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let mine = takeable(ctx, &caster, &target);
    let theirs = takeable(ctx, &target, &caster);
    let mut rng = ctx.rng();
    let pick = mine
        .choose(&mut rng)
        .cloned()
        .zip(theirs.choose(&mut rng).cloned())
        .ok_or_else(|| none_eligible("both sides need a movable city"))?;
    let (m, t) = pick;
    if m == t {
        return Err(none_eligible("both hostages share a name"));
    }
    swap(ctx, &m, &t)?;
    ctx.log(format!("🤝 {caster} 与 {target} 交换人质：{m} ↔ {t}"));
    ctx.done(format!("swapped {m} for {t}"))
        .map(|o| o.with_data(json!({ "gave": m, "got": t })))
}

fn forced_haul(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let mine = takeable(ctx, &caster, &target);
    let theirs = takeable(ctx, &target, &caster);
    let (Some(m), Some(t)) = (mine.first().cloned(), theirs.last().cloned()) else {
        return Err(none_eligible("both sides need a movable city"));
    };
    if m == t {
        return Err(none_eligible("both cities share a name"));
    }
    swap(ctx, &m, &t)?;
    ctx.log(format!("🚛 {caster} 强制搬运：{m} ↔ {target} 的 {t}"));
    ctx.done(format!("swapped {m} for {t}"))
        .map(|o| o.with_data(json!({ "gave": m, "got": t })))
}

// ── Takes ──────────────────────────────────────────────────────────────

fn recruit(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let city = takeable(ctx, &target, &caster)
        .into_iter()
        .next()
        .ok_or_else(|| none_eligible(format!("{target} has no movable city")))?;
    ctx.charge();
    take(ctx, &city)?;
    took(ctx, &[city])
}

fn ambush_random(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let candidates = takeable(ctx, &target, &caster);
    let mut rng = ctx.rng();
    let city = candidates
        .choose(&mut rng)
        .cloned()
        .ok_or_else(|| none_eligible(format!("{target} has no movable city")))?;
    ctx.charge();
    take(ctx, &city)?;
    took(ctx, &[city])
}

fn ambush_targeted(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.their_city(0)?;
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    require_tradeable(ctx, &target, city)?;
    if !receivable(ctx, &caster, city) {
        return Err(invalid(format!("you already own a city named {city}")));
    }
    ctx.charge();
    take(ctx, city)?;
    took(ctx, &[city.to_string()])
}

fn surrounded_by_songs(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let provinces: BTreeSet<String> = ctx
        .caster()
        .alive_cities()
        .filter_map(|c| effective_province(ctx.state, &caster, &c.name))
        .collect();
    let cities: Vec<String> = takeable(ctx, &target, &caster)
        .into_iter()
        .filter(|c| {
            effective_province(ctx.state, &target, c).is_some_and(|p| provinces.contains(&p))
        })
        .collect();
    if cities.is_empty() {
        return Err(none_eligible("no movable city shares a province with yours"));
    }
    ctx.charge();
    let mut moved = Vec::new();
    for city in cities {
        if take(ctx, &city).is_ok() {
            moved.push(city);
        }
    }
    took(ctx, &moved)
}

fn surrender(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let center = ctx.caster().center_city_name.clone();
    let province = effective_province(ctx.state, &caster, &center)
        .ok_or_else(|| none_eligible("your center has no province to call on"))?;
    let city = takeable(ctx, &target, &caster)
        .into_iter()
        .filter(|c| effective_province(ctx.state, &target, c).as_deref() == Some(province.as_str()))
        .last()
        .ok_or_else(|| none_eligible(format!("no movable city of {target} in {province}")))?;
    ctx.charge();
    take(ctx, &city)?;
    took(ctx, &[city])
}

// ── Center relocation ──────────────────────────────────────────────────

fn relocate(ctx: &mut SkillContext, to: String) -> SkillResult {
    let target = ctx.target_name()?;
    ctx.charge();
    let player = ctx.target_mut()?;
    let old = player.center_city_name.clone();
    player.set_center(&to);
    let ledger = &mut ctx.state.ledger;
    for heir in [&mut ledger.purple_chamber, &mut ledger.sub_center, &mut ledger.scapegoat] {
        if heir.get(&target).is_some_and(|c| *c == to) {
            heir.remove(&target);
        }
    }
    let caster = ctx.caster_name();
    ctx.log(format!("📦 {caster} 对 {target} 使用{}，中心由 {old} 迁至 {to}", ctx.skill.name()));
    ctx.done(format!("{target}'s center moved to {to}"))
        .map(|o| o.with_data(json!({ "from": old, "to": to })))
}

fn relocate_basic(ctx: &mut SkillContext) -> SkillResult {
    let to = ctx
        .target()?
        .alive_non_center_by_hp()
        .first()
        .map(|c| c.name.clone())
        .ok_or_else(|| none_eligible("no other city to move the center to"))?;
    relocate(ctx, to)
}

fn relocate_advanced(ctx: &mut SkillContext) -> SkillResult {
    let to = ctx.their_city(0)?;
    if ctx.target()?.is_center(to) {
        return Err(invalid(format!("{to} is already the center")));
    }
    relocate(ctx, to.to_string())
}

// ── Catalog acquisitions ───────────────────────────────────────────────

fn unused_up_to(ctx: &SkillContext, max_hp: u32) -> Vec<String> {
    let caster = ctx.caster();
    ctx.state
        .unused_cities
        .iter()
        .filter(|n| !caster.cities.contains_key(*n))
        .filter(|n| find_city(n).is_some_and(|d| d.hp <= max_hp))
        .cloned()
        .collect()
}

fn acquire(ctx: &mut SkillContext, name: &str) -> SkillResult {
    let def = find_city(name).ok_or_else(|| invalid(format!("{name} is not in the catalog")))?;
    ctx.charge();
    ctx.state.unused_cities.retain(|n| n != name);
    ctx.caster_mut().cities.insert(name.to_string(), City::from_def(def));
    let caster = ctx.caster_name();
    ctx.log(format!("🏙️ {caster} 使用{}，获得新城市", ctx.skill.name()));
    ctx.private_log(format!("获得 {name} ({} HP)", def.hp));
    ctx.done(format!("{name} joins your side"))
        .map(|o| o.with_data(json!({ "city": name, "hp": def.hp })))
}

fn something_from_nothing(ctx: &mut SkillContext) -> SkillResult {
    let pool = unused_up_to(ctx, FROM_NOTHING_MAX_HP);
    let mut rng = ctx.rng();
    let name = pool
        .choose(&mut rng)
        .cloned()
        .ok_or_else(|| none_eligible("no small city left in the pool"))?;
    acquire(ctx, &name)
}

fn reinforce_basic(ctx: &mut SkillContext) -> SkillResult {
    let pool = unused_up_to(ctx, REINFORCE_BASIC_MAX_HP);
    let mut rng = ctx.rng();
    let name = pool
        .choose_multiple(&mut rng, REINFORCE_BASIC_DRAWS)
        .filter_map(|n| find_city(n))
        .max_by(|a, b| a.hp.cmp(&b.hp).then_with(|| b.name.cmp(a.name)))
        .map(|d| d.name.to_string())
        .ok_or_else(|| none_eligible("no reinforcement left in the pool"))?;
    acquire(ctx, &name)
}

fn reinforce_advanced(ctx: &mut SkillContext) -> SkillResult {
    let params = ctx.params;
    let name = params.catalog_city.as_deref().ok_or_else(|| invalid("name a city to call in"))?;
    if !unused_up_to(ctx, REINFORCE_ADVANCED_MAX_HP).iter().any(|n| n == name) {
        return Err(none_eligible(format!("{name} is not available as a reinforcement")));
    }
    acquire(ctx, name)
}
