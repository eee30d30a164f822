// ═══════════════════════════════════════════════════════════════════════
// Battle skills. These only leave modifiers and markers behind; the
// round's battle in combat.rs reads them.
// ═══════════════════════════════════════════════════════════════════════

use super::{invalid, none_eligible, strike_city, Harm, SkillContext, SkillOutcome, SkillRegistry, StrikeResult};
use crate::catalog::{city_hp_limit, Skill};
use crate::error::SkillError;
use crate::ledger::{Barrier, BattleMarker, Overflow, Truce};
use crate::turn::is_player_defeated;
use crate::types::*;
use rand::seq::SliceRandom;
use serde_json::json;

type SkillResult = Result<SkillOutcome, SkillError>;

pub(super) fn register(reg: &mut SkillRegistry) {
    reg.register(Skill::HoldPosition, hold_position);
    reg.register(Skill::CaptureTheKing, capture_the_king);
    reg.register(Skill::FearEveryBush, fear_every_bush);
    reg.register(Skill::BraveryInBattle, bravery_in_battle);
    reg.register(Skill::AttractFire, attract_fire);
    reg.register(Skill::SettleIn, settle_in);
    reg.register(Skill::BronzeWall, bronze_wall);
    reg.register(Skill::Foresight, foresight);
    reg.register(Skill::SecretPassage, secret_passage);
    reg.register(Skill::LastStand, last_stand);
    reg.register(Skill::MutualDestruction, mutual_destruction);
    reg.register(Skill::RoyalExpedition, royal_expedition);
    reg.register(Skill::FeignRetreat, feign_retreat);
    reg.register(Skill::BorrowArrows, borrow_arrows);
    reg.register(Skill::Berserk, berserk);
    reg.register(Skill::WaitAtEase, wait_at_ease);
    reg.register(Skill::Plunder, plunder);
    reg.register(Skill::Dizzy, dizzy);
    reg.register(Skill::WatchFire, watch_fire);
    reg.register(Skill::SowDiscord, sow_discord);
    reg.register(Skill::Counterstrike, counterstrike);
    reg.register(Skill::BesiegeWei, besiege_wei);
    reg.register(Skill::SetBarrier, set_barrier);
    reg.register(Skill::PotentialSurge, potential_surge);
    reg.register(Skill::Feint, feint);
    reg.register(Skill::Alliance, alliance);
}

/// Battle modifiers tick down at their holder's end of turn, so an
/// effect meant for the coming battle starts at 2.
const BATTLE_ROUNDS: u32 = 2;
const FEAR_REDUCTION_PCT: u8 = 50;
const FATIGUE_ROUNDS: u32 = 3;
const LAST_STAND_FACTOR: u32 = 2;
const LAST_STAND_RETALIATION: u32 = 5_000;
const MUTUAL_DESTRUCTION_ROUNDS: u32 = 5;
const BERSERK_FACTOR: u32 = 5;
const SURGE_OVERFLOW_ROUNDS: u32 = 3;
const SURGE_OVERFLOW_PCT: u8 = 30;
const TRUCE_ROUNDS: u32 = 2;

// ── Helpers ────────────────────────────────────────────────────────────

fn add_battle_modifier(player: &mut Player, modifier: BattleModifier) {
    player.battle_modifiers.push(modifier);
}

fn add_city_modifier(ctx: &mut SkillContext, city: &str, modifier: CityModifier) {
    if let Some(c) = ctx.caster_mut().city_mut(city) {
        c.modifiers.push(modifier);
    }
}

fn mark(ctx: &mut SkillContext, marker: BattleMarker) {
    let caster = ctx.caster_name();
    ctx.state.ledger.add_marker(&caster, marker);
}

fn in_roster(ctx: &SkillContext, owner: &str, city: &str) -> bool {
    ctx.state.rosters.get(owner).is_some_and(|r| r.iter().any(|c| c == city))
}

/// Shared shape of the marker-only skills.
fn marker_skill(ctx: &mut SkillContext, marker: BattleMarker, text: &str) -> SkillResult {
    let target = ctx.target_name()?;
    ctx.charge();
    mark(ctx, marker);
    let caster = ctx.caster_name();
    ctx.log(format!("⚔️ {caster} 对 {target} 使用{}{text}", ctx.skill.name()));
    ctx.done(format!("{} set against {target}", ctx.skill.name()))
}

// ── Player modifiers ───────────────────────────────────────────────────

fn hold_position(ctx: &mut SkillContext) -> SkillResult {
    ctx.charge();
    add_battle_modifier(ctx.caster_mut(), BattleModifier::NoDeploy { rounds_left: BATTLE_ROUNDS });
    ctx.private_log("🏕️ 按兵不动：本回合不出战");
    ctx.done("holding position")
}

fn capture_the_king(ctx: &mut SkillContext) -> SkillResult {
    ctx.charge();
    add_battle_modifier(
        ctx.caster_mut(),
        BattleModifier::AttackPriority { rule: PriorityRule::HighestHp, rounds_left: BATTLE_ROUNDS },
    );
    let caster = ctx.caster_name();
    ctx.log(format!("👑 {caster} 使用擒贼擒王，优先攻击最强城市"));
    ctx.done("attacks go for the strongest city")
}

fn fear_every_bush(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    ctx.charge();
    add_battle_modifier(
        ctx.target_mut()?,
        BattleModifier::DamageReduction { pct: FEAR_REDUCTION_PCT, rounds_left: BATTLE_ROUNDS },
    );
    ctx.private_log(format!("🌿 草木皆兵：{target} 的伤害减少 {FEAR_REDUCTION_PCT}%"));
    ctx.done(format!("{target} deals less damage"))
}

fn bronze_wall(ctx: &mut SkillContext) -> SkillResult {
    ctx.charge();
    add_battle_modifier(ctx.caster_mut(), BattleModifier::DamageImmunity { rounds_left: BATTLE_ROUNDS });
    let caster = ctx.caster_name();
    ctx.log(format!("🧱 {caster} 使用铜墙铁壁，本轮免疫伤害"));
    ctx.done("immune to damage this battle")
}

// ── City modifiers ─────────────────────────────────────────────────────

fn bravery_in_battle(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    ctx.charge();
    if let Some(c) = ctx.caster_mut().city_mut(city) {
        c.modifiers.retain(|m| !matches!(m, CityModifier::IgnoreFatigue { .. }));
        c.modifiers.push(CityModifier::IgnoreFatigue { rounds_left: FATIGUE_ROUNDS });
    }
    let caster = ctx.caster_name();
    ctx.log(format!("🔥 {caster} 的 {city} 越战越勇"));
    ctx.done(format!("{city} ignores fatigue"))
}

fn attract_fire(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    ctx.charge();
    add_city_modifier(ctx, city, CityModifier::AttractDamage);
    ctx.private_log(format!("🎯 {city} 将吸引敌方攻击"));
    ctx.done(format!("{city} draws the attacks"))
}

fn settle_in(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    let settled = ctx
        .caster()
        .city(city)
        .is_some_and(|c| c.modifiers.contains(&CityModifier::Settled));
    if settled {
        return Err(invalid(format!("{city} has already settled in")));
    }
    ctx.charge();
    add_city_modifier(ctx, city, CityModifier::Settled);
    let caster = ctx.caster_name();
    ctx.log(format!("🏠 {caster} 的 {city} 既来则安"));
    ctx.done(format!("{city} settled in"))
}

fn last_stand(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    ctx.charge();
    add_city_modifier(ctx, city, CityModifier::PowerMultiplier { factor: LAST_STAND_FACTOR });
    add_city_modifier(ctx, city, CityModifier::SuicideAttack);
    add_city_modifier(ctx, city, CityModifier::DesperateRetaliation { damage: LAST_STAND_RETALIATION });
    let caster = ctx.caster_name();
    ctx.log(format!("⚔️ {caster} 的 {city} 背水一战"));
    ctx.done(format!("{city} fights to the end"))
}

fn mutual_destruction(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    ctx.charge();
    add_city_modifier(ctx, city, CityModifier::MutualDestruction { rounds_left: MUTUAL_DESTRUCTION_ROUNDS });
    let caster = ctx.caster_name();
    ctx.log(format!("☠️ {caster} 的 {city} 誓与敌同归于尽"));
    ctx.done(format!("{city} takes its attacker down with it"))
}

fn berserk(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    if ctx.caster().alive_count() < 2 {
        return Err(none_eligible("berserk needs at least two standing cities"));
    }
    ctx.charge();
    let mut hp = 0;
    if let Some(c) = ctx.caster_mut().city_mut(city) {
        let limit = city_hp_limit(c.base_hp).max(c.hp);
        c.hp = c.hp.saturating_mul(BERSERK_FACTOR).min(limit);
        c.set_current_hp(c.current_hp.saturating_mul(BERSERK_FACTOR));
        c.modifiers.push(CityModifier::Berserk);
        hp = c.current_hp;
    }
    let caster = ctx.caster_name();
    ctx.log(format!("😡 {caster} 的 {city} 进入狂暴模式，HP {hp}"));
    ctx.done(format!("{city} went berserk")).map(|o| o.with_data(json!({ "hp": hp })))
}

// ── Rosters ────────────────────────────────────────────────────────────

fn secret_passage(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let rostered = ctx.state.rosters.get(&caster).cloned().unwrap_or_default();
    let benched = ctx.state.ledger.brick_jade.get(&caster).map(|b| b.city.clone());
    let candidates: Vec<String> = ctx
        .caster()
        .alive_cities()
        .filter(|c| !rostered.contains(&c.name))
        .filter(|c| benched.as_deref() != Some(c.name.as_str()))
        .filter(|c| !c.modifiers.iter().any(|m| matches!(m, CityModifier::HealingOverTime { .. })))
        .map(|c| c.name.clone())
        .collect();
    let mut rng = ctx.rng();
    let chosen = candidates
        .choose(&mut rng)
        .cloned()
        .ok_or_else(|| none_eligible("every standing city is already deployed"))?;

    ctx.charge();
    ctx.state.rosters.entry(caster.clone()).or_default().push(chosen.clone());
    ctx.private_log(format!("🌙 暗度陈仓：{chosen} 悄然加入出战阵容"));
    ctx.log(format!("🌙 {caster} 使用暗度陈仓"));
    ctx.done("an extra city joins the battle").map(|o| o.with_data(json!({ "city": chosen })))
}

fn foresight(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    let city = ctx.their_city(0)?;
    if !in_roster(ctx, &target, city) {
        return Err(invalid(format!("{city} is not deployed")));
    }
    marker_skill(
        ctx,
        BattleMarker::Prediction { target: target.clone(), city: city.to_string() },
        "，看穿了其部署",
    )
}

fn feign_retreat(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    let city = ctx.their_city(0)?;
    if !in_roster(ctx, &target, city) || ctx.target()?.is_center(city) {
        return Err(invalid(format!("{city} is not a deployed non-center city")));
    }
    let round = ctx.state.round;
    marker_skill(
        ctx,
        BattleMarker::Trap { target: target.clone(), city: city.to_string(), round },
        "，设下圈套",
    )
}

fn dizzy(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    let player = ctx.target()?;
    let roster = ctx.state.rosters.get(&target).cloned().unwrap_or_default();
    let movable: Vec<usize> = roster
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            !player.is_center(c)
                && !ctx.state.ledger.is_iron(&target, c)
                && !ctx.state.ledger.is_anchored(&target, c)
        })
        .map(|(i, _)| i)
        .collect();
    if movable.len() < 2 {
        return Err(none_eligible(format!("{target} has fewer than two movable deployed cities")));
    }

    ctx.charge();
    if let Some(r) = ctx.state.rosters.get_mut(&target) {
        for pair in movable.chunks_exact(2) {
            r.swap(pair[0], pair[1]);
        }
    }
    let caster = ctx.caster_name();
    ctx.log(format!("😵 {caster} 让 {target} 的阵容晕头转向"));
    ctx.done(format!("{target}'s lineup is scrambled"))
}

// ── Markers ────────────────────────────────────────────────────────────

fn borrow_arrows(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    marker_skill(ctx, BattleMarker::BorrowArrows { target }, "，草船借箭")
}

fn wait_at_ease(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    let gold_mark = ctx.target()?.gold;
    marker_skill(ctx, BattleMarker::WaitAtEase { target, gold_mark }, "，以逸待劳")
}

fn plunder(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    marker_skill(ctx, BattleMarker::Plunder { target }, "，伺机趁火打劫")
}

fn besiege_wei(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    marker_skill(ctx, BattleMarker::BesiegeWei { target }, "，围魏救赵")
}

fn counterstrike(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    if ctx.caster().alive_count() < 2 || ctx.target()?.alive_count() < 2 {
        return Err(none_eligible("both sides need at least two standing cities"));
    }
    marker_skill(ctx, BattleMarker::Reflect { target }, "，准备反戈一击")
}

fn watch_fire(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    if let Some(watcher) = &ctx.state.ledger.watcher {
        return Err(invalid(format!("{watcher} is already watching from across the river")));
    }
    let outcome = marker_skill(ctx, BattleMarker::Watching { target }, "，隔岸观火")?;
    ctx.state.ledger.watcher = Some(ctx.caster_name());
    Ok(outcome)
}

fn sow_discord(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    if let Some(mate) = ctx.state.teammate_of(&target) {
        if ctx.state.ledger.is_blocked_by_jianbukecui(&mate.name) {
            return Err(SkillError::ShieldBlocked { target: mate.name.clone() });
        }
    }
    marker_skill(ctx, BattleMarker::Discord { target }, "，挑拨离间")
}

fn feint(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let opponents: Vec<&Player> = ctx
        .state
        .players
        .iter()
        .filter(|p| ctx.state.are_opponents(&caster, &p.name))
        .collect();
    if opponents.len() != 2 || opponents.iter().any(|p| is_player_defeated(p)) {
        return Err(invalid("a feint needs two opponents still standing"));
    }
    marker_skill(ctx, BattleMarker::Feint { target }, "，声东击西")
}

fn alliance(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let target = ctx.target_name()?;
    let ledger = &ctx.state.ledger;
    if ledger.truces.contains_key(&caster) || ledger.truces.contains_key(&target) {
        return Err(invalid("a truce is already in place"));
    }
    ctx.charge();
    ctx.state
        .ledger
        .truces
        .insert(caster.clone(), Truce { ally: target.clone(), rounds_left: TRUCE_ROUNDS });
    ctx.state
        .ledger
        .truces
        .insert(target.clone(), Truce { ally: caster.clone(), rounds_left: TRUCE_ROUNDS });
    ctx.log(format!("🤝 {caster} 与 {target} 合纵连横，{TRUCE_ROUNDS} 回合内互不侵犯"));
    ctx.done(format!("truce with {target}"))
}

// ── Strikes ────────────────────────────────────────────────────────────

fn royal_expedition(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    let city = ctx
        .target()?
        .alive_non_center_by_hp()
        .last()
        .map(|c| c.name.clone())
        .ok_or_else(|| none_eligible(format!("{target} has no non-center city standing")))?;

    ctx.charge();
    let caster = ctx.caster_name();
    ctx.log(format!("🐎 {caster} 御驾亲征，直取 {target} 的 {city}"));
    let result = strike_city(ctx.state, &target, &city, Harm::Kill);
    let message = match &result {
        StrikeResult::Absorbed => format!("the shield on {city} was broken"),
        StrikeResult::Redirected { to } => format!("{to} fell in place of {city}"),
        _ => {
            ctx.log(format!("💀 {target} 的 {city} 被摧毁"));
            format!("{city} destroyed")
        }
    };
    ctx.done(message).map(|o| o.with_data(json!({ "city": city, "result": result })))
}

// ── Barrier and surge ──────────────────────────────────────────────────

fn set_barrier(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    if ctx.state.ledger.barrier.contains_key(&caster) {
        return Err(invalid("a barrier is already up"));
    }
    ctx.charge();
    ctx.state.ledger.barrier.insert(
        caster.clone(),
        Barrier { hp: BARRIER_HP, max_hp: BARRIER_HP, rounds_left: BARRIER_ROUNDS },
    );
    ctx.log(format!("🔰 {caster} 设置了 {BARRIER_HP} HP 的屏障，持续 {BARRIER_ROUNDS} 回合"));
    ctx.done("barrier raised")
}

fn potential_surge(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    if ctx.caster().alive_count() == 0 {
        return Err(none_eligible("no city standing"));
    }
    ctx.charge();
    for city in ctx.caster_mut().cities.values_mut().filter(|c| c.is_alive) {
        let doubled = city.current_hp.saturating_mul(2).min(SURGE_HP_CAP);
        if doubled > city.hp {
            city.hp = doubled;
        }
        city.set_current_hp(doubled);
    }
    ctx.state.ledger.overflow.insert(
        caster.clone(),
        Overflow { rounds_left: SURGE_OVERFLOW_ROUNDS, rate_pct: SURGE_OVERFLOW_PCT },
    );
    ctx.log(format!("⚡ {caster} 潜能激发，所有城市 HP 翻倍"));
    ctx.done("every city doubled")
}
