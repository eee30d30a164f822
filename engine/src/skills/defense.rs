// ═══════════════════════════════════════════════════════════════════════
// Protection and growth skills
// ═══════════════════════════════════════════════════════════════════════

use super::{invalid, none_eligible, scale_city, SkillContext, SkillOutcome, SkillRegistry};
use super::BankOp;
use crate::catalog::{city_hp_limit, Skill, CITIES};
use crate::error::SkillError;
use crate::types::*;
use rand::Rng;
use serde_json::json;

type SkillResult = Result<SkillOutcome, SkillError>;

pub(super) fn register(reg: &mut SkillRegistry) {
    reg.register(Skill::CityProtection, city_protection);
    reg.register(Skill::IronCity, iron_city);
    reg.register(Skill::Anchor, anchor);
    reg.register(Skill::Avoidance, avoidance);
    reg.register(Skill::QuickHeal, quick_heal);
    reg.register(Skill::AdvancedHeal, advanced_heal);
    reg.register(Skill::Revive, revive);
    reg.register(Skill::LastGasp, last_gasp);
    reg.register(Skill::Refresh, refresh);
    reg.register(Skill::UnitedFront, united_front);
    reg.register(Skill::TwoBirds, two_birds);
    reg.register(Skill::Strengthen, strengthen);
    reg.register(Skill::Erudite, erudite);
    reg.register(Skill::CityTrial, city_trial);
    reg.register(Skill::StepUp, step_up);
    reg.register(Skill::Morale, morale);
    reg.register(Skill::AdministrativeCenter, administrative_center);
    reg.register(Skill::PlannedCity, planned_city);
    reg.register(Skill::PurpleChamber, purple_chamber);
    reg.register(Skill::SubCenter, sub_center);
    reg.register(Skill::DeepHiding, deep_hiding);
    reg.register(Skill::Accumulate, accumulate);
    reg.register(Skill::HpBank, hp_bank);
    reg.register(Skill::Midas, midas);
    reg.register(Skill::Scapegoat, scapegoat);
    reg.register(Skill::ChangeCourse, change_course);
    reg.register(Skill::StrategicShift, strategic_shift);
    reg.register(Skill::MutualAid, mutual_aid);
    reg.register(Skill::ChangeFlag, change_flag);
}

const ADVANCED_HEAL_ROUNDS: u32 = 2;
const MUTUAL_AID_ROUNDS: u32 = 3;
const ERUDITE_MIN_BASE_HP: u32 = 25_000;
const BANK_DEPOSIT: u32 = 10_000;
const MIDAS_HP_PER_GOLD: u32 = 5_000;
const MIDAS_MAX_GOLD: u32 = 10;
const STEP_UP_HP: u32 = 10_000;

fn own_city_ref<'c>(ctx: &'c SkillContext, name: &str) -> Result<&'c City, SkillError> {
    ctx.caster()
        .city(name)
        .ok_or_else(|| invalid(format!("no city named {name}")))
}

fn own_city_mut<'c>(ctx: &'c mut SkillContext, name: &str) -> Result<&'c mut City, SkillError> {
    ctx.caster_mut()
        .city_mut(name)
        .ok_or_else(|| invalid(format!("no city named {name}")))
}

fn not_center(ctx: &SkillContext, city: &str) -> Result<(), SkillError> {
    if ctx.caster().is_center(city) {
        return Err(invalid(format!("{city} is the center")));
    }
    Ok(())
}

// ── Shields ────────────────────────────────────────────────────────────

fn city_protection(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    let caster = ctx.caster_name();
    ctx.charge();
    ctx.state.ledger.protect(&caster, city, PROTECTION_ROUNDS);
    ctx.log(format!("🛡️ {caster} 为 {city} 施加城市保护 ({PROTECTION_ROUNDS} 回合)"));
    ctx.done(format!("{city} protected for {PROTECTION_ROUNDS} rounds"))
}

fn iron_city(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    let caster = ctx.caster_name();
    if ctx.state.ledger.is_iron(&caster, city) {
        return Err(invalid(format!("{city} is already an iron city")));
    }
    ctx.charge();
    ctx.state.ledger.set_iron(&caster, city, IRON_LAYERS);
    ctx.log(format!("🏰 {caster} 将 {city} 打造为钢铁城市"));
    ctx.done(format!("{city} gains {IRON_LAYERS} iron layers"))
}

fn anchor(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    let caster = ctx.caster_name();
    ctx.charge();
    ctx.state
        .ledger
        .anchored
        .entry(caster.clone())
        .or_default()
        .insert(city.to_string(), ANCHOR_ROUNDS);
    ctx.log(format!("⚓ {caster} 对 {city} 使用定海神针"));
    ctx.done(format!("{city} anchored"))
}

fn avoidance(ctx: &mut SkillContext) -> SkillResult {
    let city = ctx.own_city(0)?;
    let caster = ctx.caster_name();
    if ctx.state.ledger.is_in_cautious_set(&caster, city) {
        return Err(invalid(format!("{city} is already kept back")));
    }
    ctx.charge();
    ctx.state.ledger.add_to_cautious_set(&caster, city);
    ctx.private_log(format!("🙈 {city} 避而不见，不会被交换或夺取"));
    ctx.done(format!("{city} kept out of trades"))
}

// ── Healing ────────────────────────────────────────────────────────────

fn quick_heal(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    if !own_city_ref(ctx, name)?.is_injured() {
        return Err(invalid(format!("{name} is already at full HP")));
    }
    ctx.charge();
    let city = own_city_mut(ctx, name)?;
    let restored = city.heal(city.hp);
    let caster = ctx.caster_name();
    ctx.log(format!("💚 {caster} 的 {name} 快速治疗，恢复 {restored} HP"));
    ctx.done(format!("{name} healed by {restored}"))
        .map(|o| o.with_data(json!({ "city": name, "restored": restored })))
}

fn advanced_heal(ctx: &mut SkillContext) -> SkillResult {
    let params = ctx.params;
    let names = &params.cities;
    for name in names {
        let city = own_city_ref(ctx, name)?;
        if city
            .modifiers
            .iter()
            .any(|m| matches!(m, CityModifier::HealingOverTime { .. }))
        {
            return Err(invalid(format!("{name} is already recovering")));
        }
    }
    ctx.charge();
    let caster = ctx.caster_name();
    for name in names {
        let city = own_city_mut(ctx, name)?;
        let return_hp = city.hp;
        city.modifiers.push(CityModifier::HealingOverTime {
            rounds_left: ADVANCED_HEAL_ROUNDS,
            return_hp,
        });
        if let Some(roster) = ctx.state.rosters.get_mut(&caster) {
            roster.retain(|c| c != name);
        }
    }
    ctx.log(format!("🏥 {caster} 的 {} 进入高级治疗", names.join("、")));
    ctx.done(format!("{} recovering for {ADVANCED_HEAL_ROUNDS} rounds", names.join(", ")))
}

fn revive(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    let caster = ctx.caster_name();
    not_center(ctx, name)?;
    if ctx.state.ledger.is_unrevivable(&caster, name) {
        return Err(invalid(format!("{name} was wiped out and cannot return")));
    }
    ctx.charge();
    let city = own_city_mut(ctx, name)?;
    let hp = city.hp / 2;
    city.revive(hp);
    let now = city.current_hp;
    ctx.log(format!("👻 {caster} 借尸还魂，{name} 复活 ({now} HP)"));
    ctx.done(format!("{name} revived with {now} HP"))
}

fn heal_pct(city: &mut City, pct: u32) -> u32 {
    city.heal((city.hp as u64 * pct as u64 / 100) as u32)
}

fn heal_all_injured(ctx: &mut SkillContext, pct: u32) -> Result<u32, SkillError> {
    if !ctx.caster().alive_cities().any(|c| c.is_injured()) {
        return Err(none_eligible("no injured city"));
    }
    ctx.charge();
    let total = ctx
        .caster_mut()
        .cities
        .values_mut()
        .filter(|c| c.is_injured())
        .map(|c| heal_pct(c, pct))
        .sum();
    Ok(total)
}

fn last_gasp(ctx: &mut SkillContext) -> SkillResult {
    let total = heal_all_injured(ctx, 20)?;
    let caster = ctx.caster_name();
    ctx.log(format!("🩹 {caster} 苟延残喘，共恢复 {total} HP"));
    ctx.done(format!("restored {total} HP")).map(|o| o.with_data(json!({ "restored": total })))
}

fn morale(ctx: &mut SkillContext) -> SkillResult {
    let total = heal_all_injured(ctx, 10)?;
    let caster = ctx.caster_name();
    ctx.log(format!("📣 {caster} 士气大振，共恢复 {total} HP"));
    ctx.done(format!("restored {total} HP")).map(|o| o.with_data(json!({ "restored": total })))
}

fn refresh(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    let caster = ctx.caster_name();
    let bombed = ctx.state.ledger.has_bomb(&caster, name);
    let harmful = own_city_ref(ctx, name)?.modifiers.iter().any(|m| m.is_harmful());
    if !bombed && !harmful {
        return Err(invalid(format!("{name} has nothing to clear")));
    }
    ctx.charge();
    if let Some(bombs) = ctx.state.ledger.time_bombs.get_mut(&caster) {
        bombs.retain(|b| b.city != name);
    }
    own_city_mut(ctx, name)?.modifiers.retain(|m| !m.is_harmful());
    ctx.log(format!("✨ {caster} 的 {name} 焕然一新"));
    ctx.done(format!("{name} cleansed"))
}

fn united_front(ctx: &mut SkillContext) -> SkillResult {
    let params = ctx.params;
    let names = &params.cities;
    ctx.charge();
    let player = ctx.caster_mut();
    let total: u64 = names
        .iter()
        .filter_map(|n| player.city(n))
        .map(|c| c.current_hp as u64)
        .sum();
    let share = (total / names.len() as u64) as u32;
    for name in names {
        if let Some(c) = player.city_mut(name) {
            c.set_current_hp(share.max(1));
        }
    }
    let caster = ctx.caster_name();
    ctx.log(format!("🤝 {caster} 众志成城：{} 平分生命值", names.join("、")));
    ctx.done(format!("{} now share {share} HP each", names.join(", ")))
        .map(|o| o.with_data(json!({ "share": share })))
}

fn two_birds(ctx: &mut SkillContext) -> SkillResult {
    let params = ctx.params;
    let names = &params.cities;
    ctx.charge();
    let mut total = 0;
    for name in names {
        total += heal_pct(own_city_mut(ctx, name)?, 20);
    }
    let caster = ctx.caster_name();
    ctx.log(format!("🐦 {caster} 一举两得，{} 共恢复 {total} HP", names.join("、")));
    ctx.done(format!("restored {total} HP"))
}

// ── Growth ─────────────────────────────────────────────────────────────

fn strengthen(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    ctx.charge();
    let city = own_city_mut(ctx, name)?;
    scale_city(city, 200);
    let hp = city.hp;
    let caster = ctx.caster_name();
    ctx.log(format!("💪 {caster} 的 {name} 实力增强，上限 {hp}"));
    ctx.done(format!("{name} strengthened to {hp}"))
}

fn erudite(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    let correct = ctx.params.correct.ok_or_else(|| invalid("quiz result missing"))?;
    let pct = match correct {
        0 => 100,
        1 => 120,
        2 => 150,
        3 => 200,
        n => return Err(invalid(format!("{n} correct answers out of 3?"))),
    };
    if own_city_ref(ctx, name)?.base_hp < ERUDITE_MIN_BASE_HP {
        return Err(invalid(format!("{name} is too small for 博学多才")));
    }
    ctx.charge();
    scale_city(own_city_mut(ctx, name)?, pct);
    let caster = ctx.caster_name();
    ctx.log(format!("📚 {caster} 的 {name} 博学多才，答对 {correct} 题"));
    ctx.done(format!("{name} grew by {}%", pct - 100))
}

fn city_trial(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    ctx.charge();
    let passed = ctx.rng().gen_bool(0.5);
    let city = own_city_mut(ctx, name)?;
    if passed {
        scale_city(city, 200);
    } else {
        let halved = (city.current_hp / 2).max(1);
        city.set_current_hp(halved);
    }
    let caster = ctx.caster_name();
    let verdict = if passed { "通过" } else { "失败" };
    ctx.log(format!("⚖️ {caster} 的 {name} 城市试炼{verdict}"));
    ctx.done(format!("trial {}", if passed { "passed" } else { "failed" }))
        .map(|o| o.with_data(json!({ "passed": passed })))
}

fn step_up(ctx: &mut SkillContext) -> SkillResult {
    ctx.charge();
    for city in ctx.caster_mut().cities.values_mut().filter(|c| c.is_alive) {
        let limit = city_hp_limit(city.base_hp);
        city.grow(STEP_UP_HP, limit);
    }
    let caster = ctx.caster_name();
    ctx.log(format!("📈 {caster} 步步高升，所有城市 +{STEP_UP_HP} HP"));
    ctx.done("every city grew")
}

fn administrative_center(ctx: &mut SkillContext) -> SkillResult {
    let center = ctx.caster().center_city_name.clone();
    if !ctx.caster().center().is_some_and(|c| c.is_alive) {
        return Err(invalid("the center has fallen"));
    }
    ctx.charge();
    scale_city(own_city_mut(ctx, &center)?, 150);
    let caster = ctx.caster_name();
    ctx.log(format!("🏛️ {caster} 设立行政中心，{center} 实力提升"));
    ctx.done(format!("{center} grew by half"))
}

fn planned_city(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    let caster = ctx.caster_name();
    if ctx.state.ledger.is_planned(&caster, name) {
        return Err(invalid(format!("{name} is already planned")));
    }
    ctx.charge();
    scale_city(own_city_mut(ctx, name)?, 150);
    ctx.state
        .ledger
        .planned
        .entry(caster.clone())
        .or_default()
        .insert(name.to_string());
    ctx.log(format!("🗺️ {caster} 将 {name} 设为计划单列市"));
    ctx.done(format!("{name} is a planned city"))
}

// ── Succession ─────────────────────────────────────────────────────────

fn purple_chamber(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    not_center(ctx, name)?;
    let caster = ctx.caster_name();
    if ctx.state.ledger.purple_chamber.contains_key(&caster) {
        return Err(invalid("a purple chamber city already exists"));
    }
    ctx.charge();
    ctx.state.ledger.purple_chamber.insert(caster.clone(), name.to_string());
    ctx.private_log(format!("👑 {name} 生于紫室，将逐回合成长并继承中心"));
    ctx.done(format!("{name} is born to the purple"))
}

fn sub_center(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    not_center(ctx, name)?;
    let caster = ctx.caster_name();
    if ctx.state.ledger.purple_chamber.get(&caster).is_some_and(|c| c == name) {
        return Err(invalid(format!("{name} is already the purple chamber heir")));
    }
    ctx.charge();
    ctx.state.ledger.sub_center.insert(caster.clone(), name.to_string());
    ctx.private_log(format!("🏙️ {name} 成为副中心"));
    ctx.done(format!("{name} is the sub-center"))
}

fn deep_hiding(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    let caster = ctx.caster_name();
    let round = ctx.state.round;
    ctx.charge();
    ctx.state
        .ledger
        .deep_hiding
        .entry(caster.clone())
        .or_default()
        .insert(name.to_string(), round);
    ctx.private_log(format!("🤫 {name} 深藏不露"));
    ctx.done(format!("{name} lies low"))
}

fn accumulate(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    if ctx.state.ledger.hjbf.contains_key(&caster) {
        return Err(invalid("厚积薄发 is already building"));
    }
    ctx.charge();
    ctx.state.ledger.hjbf.insert(caster.clone(), 3);
    ctx.log(format!("⏳ {caster} 厚积薄发，3 回合后爆发"));
    ctx.done("accumulating")
}

fn hp_bank(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    let op = ctx.params.bank.ok_or_else(|| invalid("deposit or withdraw?"))?;
    let caster = ctx.caster_name();
    let balance = ctx.state.ledger.hp_bank.get(&caster).copied().unwrap_or(0);
    let city = own_city_ref(ctx, name)?;
    match op {
        BankOp::Deposit => {
            if city.current_hp <= BANK_DEPOSIT {
                return Err(invalid(format!("{name} needs more than {BANK_DEPOSIT} HP to deposit")));
            }
            ctx.charge();
            own_city_mut(ctx, name)?.take_damage(BANK_DEPOSIT);
            let balance = balance + BANK_DEPOSIT;
            ctx.state.ledger.hp_bank.insert(caster, balance);
            ctx.private_log(format!("🏦 {name} 存入 {BANK_DEPOSIT} HP，余额 {balance}"));
            ctx.done(format!("deposited {BANK_DEPOSIT}"))
                .map(|o| o.with_data(json!({ "balance": balance })))
        }
        BankOp::Withdraw => {
            if balance == 0 {
                return Err(invalid("the bank is empty"));
            }
            if !city.is_injured() {
                return Err(invalid(format!("{name} has no room for more HP")));
            }
            ctx.charge();
            let restored = own_city_mut(ctx, name)?.heal(balance);
            let left = balance - restored;
            if left == 0 {
                ctx.state.ledger.hp_bank.remove(&caster);
            } else {
                ctx.state.ledger.hp_bank.insert(caster, left);
            }
            ctx.private_log(format!("🏦 {name} 取出 {restored} HP，余额 {left}"));
            ctx.done(format!("withdrew {restored}"))
                .map(|o| o.with_data(json!({ "balance": left, "restored": restored })))
        }
    }
}

fn midas(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    not_center(ctx, name)?;
    let current = own_city_ref(ctx, name)?.current_hp;
    let gold = (current / MIDAS_HP_PER_GOLD + 1).min(MIDAS_MAX_GOLD) as u8;
    ctx.charge();
    own_city_mut(ctx, name)?.kill();
    let gained = ctx.caster_mut().gain_gold(gold);
    let caster = ctx.caster_name();
    ctx.log(format!("🪙 {caster} 点石成金，献祭 {name} 获得 {gained} 金币"));
    ctx.done(format!("{name} turned into {gained} gold"))
        .map(|o| o.with_data(json!({ "gold": gained })))
}

fn scapegoat(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    not_center(ctx, name)?;
    let caster = ctx.caster_name();
    ctx.charge();
    ctx.state.ledger.scapegoat.insert(caster, name.to_string());
    ctx.private_log(format!("🐐 {name} 将代替中心承受致命一击"));
    ctx.done(format!("{name} stands in for the center"))
}

fn change_course(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    not_center(ctx, name)?;
    let caster = ctx.caster_name();
    ctx.charge();
    let old = ctx.caster().center_city_name.clone();
    ctx.caster_mut().set_center(name);
    let ledger = &mut ctx.state.ledger;
    for heir in [&mut ledger.purple_chamber, &mut ledger.sub_center, &mut ledger.scapegoat] {
        if heir.get(&caster).is_some_and(|c| c == name) {
            heir.remove(&caster);
        }
    }
    ctx.log(format!("🔀 {caster} 改弦更张，中心由 {old} 迁至 {name}"));
    ctx.done(format!("{name} is the new center"))
}

fn strategic_shift(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    not_center(ctx, name)?;
    let center = ctx.caster().center().ok_or_else(|| invalid("no center"))?;
    if !center.is_alive {
        return Err(invalid("the center has fallen"));
    }
    let room = center.hp - center.current_hp;
    let center_name = center.name.clone();
    let spare = own_city_ref(ctx, name)?.current_hp.saturating_sub(1);
    let moved = room.min(spare);
    if moved == 0 {
        return Err(invalid("no HP can be moved"));
    }
    ctx.charge();
    own_city_mut(ctx, name)?.take_damage(moved);
    own_city_mut(ctx, &center_name)?.heal(moved);
    let caster = ctx.caster_name();
    ctx.log(format!("🚚 {caster} 战略转移，{name} 向中心输送 {moved} HP"));
    ctx.done(format!("moved {moved} HP into {center_name}"))
        .map(|o| o.with_data(json!({ "moved": moved })))
}

fn mutual_aid(ctx: &mut SkillContext) -> SkillResult {
    let mate = ctx.target_name()?;
    let center = ctx.target()?.center_city_name.clone();
    ctx.charge();
    let rounds = ctx.state.ledger.protection_rounds(&mate, &center).max(MUTUAL_AID_ROUNDS);
    ctx.state.ledger.protect(&mate, &center, rounds);
    let caster = ctx.caster_name();
    ctx.log(format!("🤲 {caster} 守望相助，保护 {mate} 的中心"));
    ctx.done(format!("{mate}'s center is protected"))
}

fn change_flag(ctx: &mut SkillContext) -> SkillResult {
    let name = ctx.own_city(0)?;
    let params = ctx.params;
    let province = params.province.as_deref().ok_or_else(|| invalid("name a province"))?;
    if !CITIES.iter().any(|c| c.province == province) {
        return Err(invalid(format!("unknown province {province}")));
    }
    let caster = ctx.caster_name();
    ctx.charge();
    ctx.state
        .ledger
        .change_flag
        .entry(caster.clone())
        .or_default()
        .insert(name.to_string(), province.to_string());
    ctx.private_log(format!("🚩 {name} 改旗易帜，归属 {province}"));
    ctx.done(format!("{name} now counts as {province}"))
}
