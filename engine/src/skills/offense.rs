// ═══════════════════════════════════════════════════════════════════════
// Offensive skills. Every hit on an enemy city goes through
// `strike_city`, so protections, barriers and scapegoats apply.
// ═══════════════════════════════════════════════════════════════════════

use super::{invalid, none_eligible, strike_city, Harm, SkillContext, SkillOutcome, SkillRegistry, StrikeResult};
use crate::catalog::Skill;
use crate::error::SkillError;
use crate::ledger::{effective_province, BattleMarker, TimeBomb};
use crate::types::*;
use rand::seq::SliceRandom;
use serde_json::json;

type SkillResult = Result<SkillOutcome, SkillError>;

pub(super) fn register(reg: &mut SkillRegistry) {
    reg.register(Skill::Fearless, fearless);
    reg.register(Skill::BaseTwist, base_twist);
    reg.register(Skill::Uniformity, uniformity);
    reg.register(Skill::ClearBuffs, clear_buffs);
    reg.register(Skill::Disaster, disaster);
    reg.register(Skill::Plummet, plummet);
    reg.register(Skill::Barrage, barrage);
    reg.register(Skill::Inversion, inversion);
    reg.register(Skill::DigitReverse, digit_reverse);
    reg.register(Skill::Surge, surge);
    reg.register(Skill::Bombard, bombard);
    reg.register(Skill::SweepClean, sweep_clean);
    reg.register(Skill::ArrowVolley, arrow_volley);
    reg.register(Skill::ChainReaction, chain_reaction);
    reg.register(Skill::DimensionStrike, dimension_strike);
    reg.register(Skill::TimeBomb, time_bomb);
    reg.register(Skill::Annihilate, annihilate);
    reg.register(Skill::Raze, raze);
    reg.register(Skill::Merciless, merciless);
    reg.register(Skill::MercilessOrange, merciless_orange);
    reg.register(Skill::Electromagnetic, electromagnetic);
    reg.register(Skill::InFighting, in_fighting);
    reg.register(Skill::GoldenMean, golden_mean);
    reg.register(Skill::SacrificeKin, sacrifice_kin);
    reg.register(Skill::BurnBridges, burn_bridges);
    reg.register(Skill::GraftFlower, graft_flower);
    reg.register(Skill::JadeShatter, jade_shatter);
}

const SURGE_DAMAGE: u32 = 5_000;
const BOMBARD_DAMAGE: u32 = 8_000;
const BOMBARD_HITS: usize = 3;
const SWEEP_THRESHOLD: u32 = 5_000;
const VOLLEY_MAIN: u32 = 10_000;
const VOLLEY_SPLASH: u32 = 2_000;

// ── Helpers ────────────────────────────────────────────────────────────

/// Snapshot of a target city, taken before any mutation.
#[derive(Debug, Clone)]
struct Snap {
    name: String,
    hp: u32,
    current: u32,
}

fn snap(city: &City) -> Snap {
    Snap {
        name: city.name.clone(),
        hp: city.hp,
        current: city.current_hp,
    }
}

fn their(ctx: &SkillContext, name: &str) -> Result<Snap, SkillError> {
    ctx.target()?
        .city(name)
        .map(snap)
        .ok_or_else(|| invalid(format!("no city named {name}")))
}

fn their_alive(ctx: &SkillContext) -> Result<Vec<Snap>, SkillError> {
    Ok(ctx.target()?.alive_cities().map(snap).collect())
}

/// Alive non-center target cities, weakest first.
fn their_non_center(ctx: &SkillContext) -> Result<Vec<Snap>, SkillError> {
    Ok(ctx.target()?.alive_non_center_by_hp().into_iter().map(snap).collect())
}

/// Strike a list of target cities and log the outcome of each.
fn strike_many(ctx: &mut SkillContext, hits: &[(String, Harm)]) -> Result<Vec<(String, StrikeResult)>, SkillError> {
    let target = ctx.target_name()?;
    let mut results = Vec::with_capacity(hits.len());
    for (city, harm) in hits {
        let result = strike_city(ctx.state, &target, city, *harm);
        match &result {
            StrikeResult::Killed => ctx.log(format!("💀 {target} 的 {city} 被摧毁")),
            StrikeResult::Applied { damage } if *damage > 0 => {
                ctx.log(format!("💥 {target} 的 {city} 损失 {damage} HP"));
            }
            _ => {}
        }
        results.push((city.clone(), result));
    }
    Ok(results)
}

fn summary(results: &[(String, StrikeResult)]) -> serde_json::Value {
    json!(results
        .iter()
        .map(|(city, r)| json!({ "city": city, "result": r }))
        .collect::<Vec<_>>())
}

fn finish(ctx: &mut SkillContext, headline: String, hits: Vec<(String, Harm)>) -> SkillResult {
    ctx.charge();
    ctx.log(headline.clone());
    let results = strike_many(ctx, &hits)?;
    let landed = results.iter().filter(|(_, r)| r.landed()).count();
    ctx.done(format!("{landed}/{} hits landed", results.len()))
        .map(|o| o.with_data(summary(&results)))
}

fn pct_of(value: u32, pct: u32) -> u32 {
    (value as u64 * pct as u64 / 100) as u32
}

fn headline(ctx: &SkillContext, text: &str) -> Result<String, SkillError> {
    Ok(format!("⚔️ {} 对 {} 使用{}{}", ctx.caster_name(), ctx.target_name()?, ctx.skill.name(), text))
}

// ── Sacrifices ─────────────────────────────────────────────────────────

fn sacrifice_into_center(ctx: &mut SkillContext, own: String) -> SkillResult {
    let damage = ctx
        .caster()
        .city(&own)
        .map(|c| c.current_hp)
        .ok_or_else(|| invalid(format!("no city named {own}")))?;
    let center = ctx.target()?.center_city_name.clone();
    let head = headline(ctx, &format!("，牺牲 {own}"))?;
    ctx.charge();
    if let Some(c) = ctx.caster_mut().city_mut(&own) {
        c.kill();
    }
    finish(ctx, head, vec![(center, Harm::Damage(damage))])
}

fn fearless(ctx: &mut SkillContext) -> SkillResult {
    let own = ctx
        .caster()
        .alive_non_center_by_hp()
        .first()
        .map(|c| c.name.clone())
        .ok_or_else(|| none_eligible("no city to sacrifice"))?;
    sacrifice_into_center(ctx, own)
}

fn sacrifice_kin(ctx: &mut SkillContext) -> SkillResult {
    let own = ctx.own_city(0)?;
    if ctx.caster().is_center(own) {
        return Err(invalid("the center cannot be sacrificed"));
    }
    sacrifice_into_center(ctx, own.to_string())
}

// ── HP rewrites ────────────────────────────────────────────────────────

fn to_radix(mut n: u32, radix: u32) -> Vec<u32> {
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(n % radix);
        n /= radix;
    }
    digits.reverse();
    digits
}

fn base_twist(ctx: &mut SkillContext) -> SkillResult {
    let (from, to) = ctx.params.bases.ok_or_else(|| invalid("name the two bases"))?;
    if !(2..=10).contains(&from) || !(2..=10).contains(&to) {
        return Err(invalid("bases must be between 2 and 10"));
    }
    let city = their(ctx, ctx.their_city(0)?)?;
    let digits = to_radix(city.current, from);
    if digits.iter().any(|d| *d >= to) {
        return Err(invalid(format!("{} has digits that do not exist in base {to}", city.current)));
    }
    let rewritten = digits
        .iter()
        .fold(0u64, |acc, d| acc * to as u64 + *d as u64)
        .min(u32::MAX as u64) as u32;
    let head = headline(ctx, &format!("，{} 按 {from} 进制读作 {to} 进制", city.name))?;
    finish(ctx, head, vec![(city.name, Harm::SetCurrent(rewritten.min(city.hp)))])
}

fn uniformity(ctx: &mut SkillContext) -> SkillResult {
    let cities = their_alive(ctx)?;
    if cities.is_empty() {
        return Err(none_eligible("no city standing"));
    }
    let avg = (cities.iter().map(|c| c.current as u64).sum::<u64>() / cities.len() as u64) as u32;
    let head = headline(ctx, &format!("，所有城市变为 {avg} HP"))?;
    let target = ctx.target_name()?;
    ctx.charge();
    let mut hits = Vec::new();
    for c in cities {
        if c.current > avg {
            hits.push((c.name, Harm::SetCurrent(avg)));
        } else if let Some(city) = ctx.state.player_mut(&target).and_then(|p| p.city_mut(&c.name)) {
            city.set_current_hp(avg.min(c.hp));
        }
    }
    finish(ctx, head, hits)
}

fn clear_buffs(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.their_city(0)?;
    let target = ctx.target_name()?;
    ctx.charge();
    ctx.state.ledger.strip_protection(&target, name);
    if let Some(city) = ctx.state.player_mut(&target).and_then(|p| p.city_mut(name)) {
        city.modifiers.clear();
        let current = city.current_hp;
        city.set_current_hp(current);
    }
    let caster = ctx.caster_name();
    ctx.log(format!("🧹 {caster} 清除了 {target} 的 {name} 的所有加成"));
    ctx.done(format!("{name} stripped of every buff"))
}

fn disaster(ctx: &mut SkillContext) -> SkillResult {
    let hits = their_alive(ctx)?
        .into_iter()
        .map(|c| (c.name, Harm::Damage(pct_of(c.current, 20).max(1))))
        .collect();
    let head = headline(ctx, "")?;
    finish(ctx, head, hits)
}

fn plummet(ctx: &mut SkillContext) -> SkillResult {
    let city = their(ctx, ctx.their_city(0)?)?;
    let head = headline(ctx, &format!("，{} 生命值骤降", city.name))?;
    finish(ctx, head, vec![(city.name, Harm::SetCurrent((city.current / 3).max(1)))])
}

fn barrage(ctx: &mut SkillContext) -> SkillResult {
    let mut hits = Vec::new();
    for i in 0..2 {
        let city = their(ctx, ctx.their_city(i)?)?;
        hits.push((city.name, Harm::SetCurrent((city.current / 2).max(1))));
    }
    let head = headline(ctx, "")?;
    finish(ctx, head, hits)
}

fn inversion(ctx: &mut SkillContext) -> SkillResult {
    let cities = their_non_center(ctx)?;
    if cities.len() < 2 {
        return Err(none_eligible("needs two non-center cities"));
    }
    let weak = cities[0].clone();
    let strong = cities[cities.len() - 1].clone();
    let head = headline(ctx, &format!("，{} 与 {} 互换生命值", strong.name, weak.name))?;
    let target = ctx.target_name()?;
    ctx.charge();
    ctx.log(head);
    let result = strike_city(ctx.state, &target, &strong.name, Harm::SetCurrent(weak.current));
    if result.landed() {
        if let Some(c) = ctx.state.player_mut(&target).and_then(|p| p.city_mut(&weak.name)) {
            c.set_current_hp(strong.current.min(weak.hp));
        }
    }
    ctx.done(format!("{} and {} traded HP", strong.name, weak.name))
        .map(|o| o.with_data(json!({ "strong": strong.name, "weak": weak.name, "result": result })))
}

fn reverse_digits(n: u32) -> u32 {
    n.to_string()
        .chars()
        .rev()
        .collect::<String>()
        .parse()
        .unwrap_or(n)
}

fn digit_reverse(ctx: &mut SkillContext) -> SkillResult {
    let city = their(ctx, ctx.their_city(0)?)?;
    let reversed = reverse_digits(city.current).clamp(1, city.hp);
    let target = ctx.target_name()?;
    let caster = ctx.caster_name();
    if target == caster {
        ctx.charge();
        if let Some(c) = ctx.caster_mut().city_mut(&city.name) {
            c.set_current_hp(reversed);
        }
        ctx.log(format!("🔢 {caster} 的 {} 数位反转为 {reversed}", city.name));
        return ctx.done(format!("{} is now {reversed}", city.name));
    }
    let head = headline(ctx, &format!("，{} 数位反转", city.name))?;
    finish(ctx, head, vec![(city.name, Harm::SetCurrent(reversed))])
}

// ── Area damage ────────────────────────────────────────────────────────

fn surge(ctx: &mut SkillContext) -> SkillResult {
    let hits = their_alive(ctx)?
        .into_iter()
        .map(|c| (c.name, Harm::Damage(SURGE_DAMAGE)))
        .collect();
    let head = headline(ctx, "")?;
    finish(ctx, head, hits)
}

fn bombard(ctx: &mut SkillContext) -> SkillResult {
    let mut cities = their_alive(ctx)?;
    if cities.is_empty() {
        return Err(none_eligible("no city standing"));
    }
    let mut rng = ctx.rng();
    cities.shuffle(&mut rng);
    let hits = cities
        .into_iter()
        .take(BOMBARD_HITS)
        .map(|c| (c.name, Harm::Damage(BOMBARD_DAMAGE)))
        .collect();
    let head = headline(ctx, "")?;
    finish(ctx, head, hits)
}

fn sweep_clean(ctx: &mut SkillContext) -> SkillResult {
    let hits: Vec<_> = their_non_center(ctx)?
        .into_iter()
        .filter(|c| c.current <= SWEEP_THRESHOLD)
        .map(|c| (c.name, Harm::Kill))
        .collect();
    if hits.is_empty() {
        return Err(none_eligible(format!("no non-center city at or below {SWEEP_THRESHOLD} HP")));
    }
    let head = headline(ctx, "")?;
    finish(ctx, head, hits)
}

fn arrow_volley(ctx: &mut SkillContext) -> SkillResult {
    let main = ctx.their_city(0)?;
    let hits = their_alive(ctx)?
        .into_iter()
        .map(|c| {
            let dmg = if c.name == main { VOLLEY_MAIN } else { VOLLEY_SPLASH };
            (c.name, Harm::Damage(dmg))
        })
        .collect();
    let head = headline(ctx, &format!("，主攻 {main}"))?;
    finish(ctx, head, hits)
}

fn chain_reaction(ctx: &mut SkillContext) -> SkillResult {
    let main = ctx.their_city(0)?;
    let target = ctx.target_name()?;
    let province = effective_province(ctx.state, &target, main);
    let mut hits = Vec::new();
    for c in their_alive(ctx)? {
        if c.name == main {
            hits.push((c.name, Harm::Damage(pct_of(c.current, 30).max(1))));
        } else if province.is_some() && effective_province(ctx.state, &target, &c.name) == province {
            hits.push((c.name, Harm::Damage(pct_of(c.current, 10).max(1))));
        }
    }
    let head = headline(ctx, &format!("，以 {main} 为中心引发连锁"))?;
    finish(ctx, head, hits)
}

fn dimension_strike(ctx: &mut SkillContext) -> SkillResult {
    let city = their(ctx, ctx.their_city(0)?)?;
    let head = headline(ctx, "")?;
    finish(ctx, head, vec![(city.name, Harm::CapMax((city.hp / 2).max(1)))])
}

fn electromagnetic(ctx: &mut SkillContext) -> SkillResult {
    let city = their(ctx, ctx.their_city(0)?)?;
    let strongest = ctx
        .caster()
        .alive_cities()
        .map(|c| c.current_hp)
        .max()
        .ok_or_else(|| none_eligible("no city to channel"))?;
    let head = headline(ctx, "")?;
    finish(ctx, head, vec![(city.name, Harm::Damage((strongest / 2).max(1)))])
}

fn in_fighting(ctx: &mut SkillContext) -> SkillResult {
    let cities = their_non_center(ctx)?;
    if cities.len() < 2 {
        return Err(none_eligible("needs two non-center cities"));
    }
    let a = &cities[cities.len() - 1];
    let b = &cities[cities.len() - 2];
    let hits = vec![
        (a.name.clone(), Harm::Damage((b.current / 2).max(1))),
        (b.name.clone(), Harm::Damage((a.current / 2).max(1))),
    ];
    let head = headline(ctx, &format!("，{} 与 {} 自相残杀", a.name, b.name))?;
    finish(ctx, head, hits)
}

fn golden_mean(ctx: &mut SkillContext) -> SkillResult {
    let cities = their_alive(ctx)?;
    let mut values: Vec<u32> = cities.iter().map(|c| c.current).collect();
    values.sort_unstable();
    let median = match values.len() {
        0 => return Err(none_eligible("no city standing")),
        n if n % 2 == 1 => values[n / 2],
        n => ((values[n / 2 - 1] as u64 + values[n / 2] as u64) / 2) as u32,
    };
    let hits: Vec<_> = cities
        .into_iter()
        .filter(|c| c.current > median)
        .map(|c| (c.name, Harm::SetCurrent(median)))
        .collect();
    if hits.is_empty() {
        return Err(none_eligible("no city above the median"));
    }
    let head = headline(ctx, &format!("，中位数 {median}"))?;
    finish(ctx, head, hits)
}

// ── Kills ──────────────────────────────────────────────────────────────

fn time_bomb(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.their_city(0)?;
    let target = ctx.target_name()?;
    if ctx.state.ledger.has_bomb(&target, name) {
        return Err(invalid(format!("{name} already has a bomb")));
    }
    let caster = ctx.caster_name();
    ctx.charge();
    ctx.state.ledger.time_bombs.entry(target.clone()).or_default().push(TimeBomb {
        city: name.to_string(),
        rounds_left: TIME_BOMB_ROUNDS,
        planted_by: caster.clone(),
    });
    ctx.log(format!("⏰ {caster} 在 {target} 的 {name} 安放了定时炸弹"));
    ctx.done(format!("bomb planted on {name}"))
}

fn annihilate(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.their_city(0)?.to_string();
    let target = ctx.target_name()?;
    let head = headline(ctx, "")?;
    let response = finish(ctx, head, vec![(name.clone(), Harm::Kill)])?;
    let killed = ctx
        .state
        .player(&target)
        .and_then(|p| p.city(&name))
        .is_some_and(|c| !c.is_alive);
    if killed {
        ctx.state
            .ledger
            .unrevivable
            .entry(target)
            .or_default()
            .insert(name);
    }
    Ok(response)
}

fn raze(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.their_city(0)?;
    if ctx.target()?.is_center(name) {
        return Err(invalid("the center cannot be razed"));
    }
    let head = headline(ctx, "")?;
    finish(ctx, head, vec![(name.to_string(), Harm::Kill)])
}

fn kill_weakest(ctx: &mut SkillContext, count: usize) -> SkillResult {
    let hits: Vec<_> = their_non_center(ctx)?
        .into_iter()
        .take(count)
        .map(|c| (c.name, Harm::Kill))
        .collect();
    if hits.is_empty() {
        return Err(none_eligible("no non-center city"));
    }
    let head = headline(ctx, "")?;
    finish(ctx, head, hits)
}

fn merciless(ctx: &mut SkillContext) -> SkillResult {
    kill_weakest(ctx, 1)
}

fn merciless_orange(ctx: &mut SkillContext) -> SkillResult {
    kill_weakest(ctx, 2)
}

// ── Shield stripping and swaps ─────────────────────────────────────────

fn burn_bridges(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    if !ctx.state.ledger.protections.contains_key(&target) {
        return Err(none_eligible(format!("{target} has no protected city")));
    }
    ctx.charge();
    let stripped: Vec<String> = ctx
        .state
        .ledger
        .protections
        .remove(&target)
        .map(|m| m.into_keys().collect())
        .unwrap_or_default();
    let caster = ctx.caster_name();
    ctx.log(format!("🔥 {caster} 过河拆桥，拆除了 {target} 的 {} 个城市保护", stripped.len()));
    ctx.done(format!("stripped {} protections", stripped.len()))
        .map(|o| o.with_data(json!({ "cities": stripped })))
}

fn graft_flower(ctx: &mut SkillContext) -> SkillResult {
    let own = ctx.own_city(0)?;
    let theirs = their(ctx, ctx.their_city(0)?)?;
    let mine = ctx
        .caster()
        .city(own)
        .map(snap)
        .ok_or_else(|| invalid(format!("no city named {own}")))?;
    let head = headline(ctx, &format!("，{own} 与 {} 移花接木", theirs.name))?;
    let target = ctx.target_name()?;
    ctx.charge();
    ctx.log(head);
    let result = strike_city(ctx.state, &target, &theirs.name, Harm::SetCurrent(mine.current));
    if matches!(result, StrikeResult::Applied { .. }) {
        if let Some(c) = ctx.caster_mut().city_mut(own) {
            c.set_current_hp(theirs.current.min(mine.hp));
        }
    }
    ctx.done(format!("{own} and {} traded HP", theirs.name))
        .map(|o| o.with_data(json!({ "result": result })))
}

fn jade_shatter(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.their_city(0)?;
    let target = ctx.target_name()?;
    ctx.charge();
    ctx.state.ledger.strip_protection(&target, name);
    ctx.state
        .ledger
        .add_marker(&target, BattleMarker::Shatter { city: name.to_string() });
    let caster = ctx.caster_name();
    ctx.log(format!("💎 {caster} 对 {target} 的 {name} 使用玉碎瓦全"));
    ctx.done(format!("{name} shattered"))
}
