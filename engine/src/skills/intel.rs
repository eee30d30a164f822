// ═══════════════════════════════════════════════════════════════════════
// Intel and concealment skills
// ═══════════════════════════════════════════════════════════════════════

use super::{invalid, none_eligible, SkillContext, SkillOutcome, SkillRegistry};
use crate::catalog::{find_city, Skill};
use crate::error::SkillError;
use crate::ledger::Disguise;
use crate::types::*;
use rand::seq::{IteratorRandom, SliceRandom};
use serde_json::json;

type SkillResult = Result<SkillOutcome, SkillError>;

pub(super) fn register(reg: &mut SkillRegistry) {
    reg.register(Skill::CityDetective, city_detective);
    reg.register(Skill::Prophecy, prophecy);
    reg.register(Skill::Scrutiny, scrutiny);
    reg.register(Skill::Disguise, disguise);
    reg.register(Skill::Mirage, mirage);
    reg.register(Skill::Trackless, trackless);
}

const PROPHECY_REVEALS: usize = 2;

fn city_detective(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let name = ctx.their_city(0)?;
    if !ctx.state.is_known(&caster, &target, name) {
        return Err(invalid(format!("you have not seen {name} yet")));
    }
    let city = ctx
        .target()?
        .city(name)
        .cloned()
        .ok_or_else(|| invalid(format!("no city named {name}")))?;

    ctx.charge();
    let status = if city.is_alive { "存活" } else { "已阵亡" };
    ctx.private_log(format!(
        "🔍 {target} 的 {name}：原始 HP {}，当前 HP {}/{}（{status}）",
        city.base_hp, city.current_hp, city.hp
    ));
    ctx.done(format!("inspected {name}")).map(|o| {
        o.with_data(json!({
            "city": name,
            "base_hp": city.base_hp,
            "hp": city.hp,
            "current_hp": city.current_hp,
            "alive": city.is_alive,
        }))
    })
}

fn prophecy(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let unknown: Vec<String> = ctx
        .target()?
        .cities
        .keys()
        .filter(|c| !ctx.state.is_known(&caster, &target, c))
        .cloned()
        .collect();
    if unknown.is_empty() {
        return Err(none_eligible(format!("you already know every city of {target}")));
    }

    ctx.charge();
    let mut rng = ctx.rng();
    let mut revealed: Vec<String> = unknown
        .into_iter()
        .choose_multiple(&mut rng, PROPHECY_REVEALS);
    revealed.sort();
    for city in &revealed {
        ctx.state.mark_known(&caster, &target, city);
    }
    ctx.private_log(format!("🔮 城市预言：{target} 拥有 {}", revealed.join("、")));
    ctx.log(format!("🔮 {caster} 对 {target} 使用城市预言"));
    ctx.done(format!("revealed {} cities", revealed.len()))
        .map(|o| o.with_data(json!({ "revealed": revealed })))
}

fn scrutiny(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    let ledger = &ctx.state.ledger;
    let names: Vec<String> = ctx.target()?.cities.keys().cloned().collect();
    let pick = |f: &dyn Fn(&str) -> bool| names.iter().filter(|c| f(c.as_str())).cloned().collect::<Vec<_>>();
    let shielded = pick(&|c| ledger.protection_rounds(&target, c) > 0);
    let iron = pick(&|c| ledger.is_iron(&target, c));
    let anchored = pick(&|c| ledger.is_anchored(&target, c));
    let bombed = pick(&|c| ledger.has_bomb(&target, c));

    ctx.charge();
    ctx.private_log(format!(
        "🧐 {target}：保护 [{}]，钢铁 [{}]，定海神针 [{}]，定时炸弹 [{}]",
        shielded.join("、"),
        iron.join("、"),
        anchored.join("、"),
        bombed.join("、")
    ));
    ctx.done(format!("scrutinized {target}")).map(|o| {
        o.with_data(json!({
            "protected": shielded,
            "iron": iron,
            "anchored": anchored,
            "bombed": bombed,
        }))
    })
}

fn disguise(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    let caster = ctx.caster_name();
    let mut rng = ctx.rng();
    let as_name = ctx
        .state
        .unused_cities
        .choose(&mut rng)
        .cloned()
        .ok_or_else(|| none_eligible("no catalog city left to pose as"))?;
    let as_hp = find_city(&as_name).map(|d| d.hp).unwrap_or_default();

    ctx.charge();
    ctx.state
        .ledger
        .disguised
        .entry(caster.clone())
        .or_default()
        .insert(city.to_string(), Disguise { rounds_left: DISGUISE_ROUNDS, as_name: as_name.clone(), as_hp });
    ctx.private_log(format!("🦊 {city} 伪装成 {as_name}（{as_hp} HP），持续 {DISGUISE_ROUNDS} 回合"));
    ctx.done(format!("{city} poses as {as_name}"))
        .map(|o| o.with_data(json!({ "as": as_name, "hp": as_hp })))
}

fn mirage(ctx: &mut SkillContext) -> SkillResult {
    ctx.charge();
    let caster = ctx.caster_name();
    ctx.state.ledger.mirage.insert(caster.clone(), MIRAGE_ROUNDS);
    ctx.log(format!("🌫️ {caster} 布下海市蜃楼，{MIRAGE_ROUNDS} 回合内城市血量不可见"));
    ctx.done("city HP hidden from opponents")
}

fn trackless(ctx: &mut SkillContext) -> SkillResult {
    ctx.charge();
    let caster = ctx.caster_name();
    let mut forgotten = 0;
    for owners in ctx.state.known_cities.values_mut() {
        if let Some(set) = owners.remove(&caster) {
            forgotten += set.len();
        }
    }
    ctx.log(format!("👣 {caster} 不露踪迹，对手失去了其城市情报"));
    ctx.done(format!("{forgotten} sightings erased"))
}
