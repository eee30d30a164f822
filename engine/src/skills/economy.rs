// ═══════════════════════════════════════════════════════════════════════
// Economy and status skills — gold movement, bans, freezes, shields
// ═══════════════════════════════════════════════════════════════════════

use super::{invalid, none_eligible, SkillContext, SkillOutcome, SkillRegistry};
use crate::catalog::{Skill, UsageLimit};
use crate::error::SkillError;
use crate::ledger::{roster_cities, BrickJade, FinancialCrisis};
use crate::types::*;
use serde_json::json;

type SkillResult = Result<SkillOutcome, SkillError>;

pub(super) fn register(reg: &mut SkillRegistry) {
    reg.register(Skill::TransferGold, transfer_gold);
    reg.register(Skill::GoldLoan, gold_loan);
    reg.register(Skill::FinancialCrisis, financial_crisis);
    reg.register(Skill::RobTheRich, rob_the_rich);
    reg.register(Skill::TurnOfFortune, turn_of_fortune);
    reg.register(Skill::CostIncrease, cost_increase);
    reg.register(Skill::BanSkill, ban_skill);
    reg.register(Skill::StareDown, stare_down);
    reg.register(Skill::SkillShield, skill_shield);
    reg.register(Skill::Decisive, decisive);
    reg.register(Skill::Unblock, unblock);
    reg.register(Skill::HairTrigger, hair_trigger);
    reg.register(Skill::Breakthrough, breakthrough);
    reg.register(Skill::Jianbukecui, jianbukecui);
    reg.register(Skill::BrickForJade, brick_for_jade);
}

const LOAN_AMOUNT: u8 = 5;
const BRICK_JADE_ROUNDS: u32 = 5;

fn transfer_gold(ctx: &mut SkillContext) -> SkillResult {
    let amount = ctx.params.amount.ok_or_else(|| invalid("name an amount to transfer"))?;
    if amount == 0 || amount > GOLD_CAP as u32 {
        return Err(invalid(format!("cannot transfer {amount} gold")));
    }
    let amount = amount as u8;
    let available = ctx.caster().gold;
    if available < amount {
        return Err(SkillError::InsufficientFunds { needed: amount, available });
    }
    let target = ctx.target_name()?;
    if ctx.target()?.gold as u32 + amount as u32 > GOLD_CAP as u32 {
        return Err(invalid(format!("{target} cannot hold {amount} more gold")));
    }

    ctx.charge();
    ctx.caster_mut().spend_gold(amount);
    ctx.target_mut()?.gain_gold(amount);
    let caster = ctx.caster_name();
    ctx.log(format!("💰 {caster} 向 {target} 转账 {amount} 金币"));
    ctx.done(format!("transferred {amount} gold to {target}"))
        .map(|o| o.with_data(json!({ "amount": amount, "to": target })))
}

fn gold_loan(ctx: &mut SkillContext) -> SkillResult {
    ctx.charge();
    let gained = ctx.caster_mut().gain_gold(LOAN_AMOUNT);
    let caster = ctx.caster_name();
    ctx.log(format!("🏦 {caster} 使用金币贷款，获得 {gained} 金币"));
    ctx.done(format!("borrowed {gained} gold")).map(|o| o.with_data(json!({ "gained": gained })))
}

fn financial_crisis(ctx: &mut SkillContext) -> SkillResult {
    if ctx.state.ledger.financial_crisis.is_some() {
        return Err(invalid("a financial crisis is already under way"));
    }
    ctx.charge();
    let caster = ctx.caster_name();
    ctx.state.ledger.financial_crisis = Some(FinancialCrisis {
        rounds_left: CRISIS_ROUNDS,
        started_by: caster.clone(),
    });
    ctx.log(format!("📉 {caster} 引发金融危机，持续 {CRISIS_ROUNDS} 回合"));
    ctx.done("financial crisis started")
}

fn rob_the_rich(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    let theirs = ctx.target()?.gold;
    let mine = ctx.caster().gold;
    let moved = theirs.saturating_sub(mine) / 2;
    if moved == 0 {
        return Err(invalid(format!("{target} is not richer than you")));
    }
    ctx.charge();
    ctx.target_mut()?.spend_gold(moved);
    let gained = ctx.caster_mut().gain_gold(moved);
    let caster = ctx.caster_name();
    ctx.log(format!("🗡️ {caster} 劫富济贫，从 {target} 处夺得 {moved} 金币"));
    ctx.done(format!("took {moved} gold from {target}"))
        .map(|o| o.with_data(json!({ "taken": moved, "gained": gained })))
}

fn turn_of_fortune(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    ctx.charge();
    let t = ctx.target_index()?;
    let c = ctx.caster;
    let (mine, theirs) = (ctx.state.players[c].gold, ctx.state.players[t].gold);
    ctx.state.players[c].gold = theirs;
    ctx.state.players[t].gold = mine;
    let caster = ctx.caster_name();
    ctx.log(format!("🔄 {caster} 与 {target} 交换了金币 ({mine} ↔ {theirs})"));
    ctx.done(format!("swapped gold with {target}"))
        .map(|o| o.with_data(json!({ "mine": theirs, "theirs": mine })))
}

fn guard_status(ctx: &SkillContext, target: &str) -> Result<(), SkillError> {
    if ctx.state.ledger.has_skill_protection(target) {
        return Err(invalid(format!("{target} is protected from status effects")));
    }
    Ok(())
}

fn cost_increase(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    guard_status(ctx, &target)?;
    if ctx.state.ledger.cost_increase.contains(&target) {
        return Err(invalid(format!("{target} already pays extra")));
    }
    ctx.charge();
    ctx.state.ledger.cost_increase.insert(target.clone());
    let caster = ctx.caster_name();
    ctx.log(format!("🔥 {caster} 对 {target} 使用釜底抽薪，其下一个高价技能费用增加"));
    ctx.done(format!("{target}'s next paid skill costs more"))
}

fn ban_skill(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    let banned = ctx.params.skill.ok_or_else(|| invalid("name the skill to ban"))?;
    guard_status(ctx, &target)?;
    if ctx.state.ledger.banned_by(&target, banned).is_some() {
        return Err(invalid(format!("{} is already banned for {target}", banned.name())));
    }
    ctx.charge();
    let caster = ctx.caster_name();
    ctx.state
        .ledger
        .banned_skills
        .entry(target.clone())
        .or_default()
        .insert(banned, caster.clone());
    ctx.log(format!("🚫 {caster} 使用事半功倍，禁用了 {target} 的「{}」", banned.name()));
    ctx.done(format!("banned {} for {target}", banned.name()))
        .map(|o| o.with_data(json!({ "banned": banned.name() })))
}

fn stare_down(ctx: &mut SkillContext) -> SkillResult {
    let target = ctx.target_name()?;
    guard_status(ctx, &target)?;
    ctx.charge();
    ctx.state.ledger.stare_down.insert(target.clone(), STARE_DOWN_ROUNDS);
    let caster = ctx.caster_name();
    ctx.log(format!("👁️ {caster} 对 {target} 使用目不转睹，{STARE_DOWN_ROUNDS} 回合内无法行动"));
    ctx.done(format!("{target} is frozen"))
}

fn skill_shield(ctx: &mut SkillContext) -> SkillResult {
    ctx.charge();
    let caster = ctx.caster_name();
    ctx.state.ledger.skill_protection.insert(caster.clone(), STARE_DOWN_ROUNDS);
    ctx.log(format!("✨ {caster} 获得技能保护"));
    ctx.done("status effects cannot touch you")
}

fn decisive(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let ledger = &ctx.state.ledger;
    let anything = ledger.stare_down_rounds(&caster) > 0
        || ledger.banned_skills.contains_key(&caster)
        || ledger.cost_increase.contains(&caster);
    if !anything {
        return Err(invalid("nothing to shake off"));
    }
    ctx.charge();
    let ledger = &mut ctx.state.ledger;
    ledger.stare_down.remove(&caster);
    ledger.banned_skills.remove(&caster);
    ledger.cost_increase.remove(&caster);
    ctx.log(format!("⚡ {caster} 当机立断，解除了所有限制"));
    ctx.done("restrictions cleared")
}

fn unblock(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    let ledger = &ctx.state.ledger;
    if ledger.stare_down_rounds(&caster) == 0 && !ledger.banned_skills.contains_key(&caster) {
        return Err(invalid("nothing to unblock"));
    }
    ctx.charge();
    ctx.state.ledger.stare_down.remove(&caster);
    ctx.state.ledger.banned_skills.remove(&caster);
    ctx.log(format!("🔓 {caster} 解除了封锁"));
    ctx.done("bans lifted")
}

fn hair_trigger(ctx: &mut SkillContext) -> SkillResult {
    let skill = ctx.params.skill.ok_or_else(|| invalid("name the skill to reset"))?;
    let caster = ctx.caster_name();
    let cooldown = skill.def().cooldown;
    let round = ctx.state.round;
    if ctx.state.usage.cooldown_remaining(&caster, skill, cooldown, round) == 0 {
        return Err(invalid(format!("{} is not cooling down", skill.name())));
    }
    ctx.charge();
    ctx.state.usage.clear_cooldown(&caster, skill);
    ctx.private_log(format!("⏱️ 「{}」冷却已重置", skill.name()));
    ctx.done(format!("{} is ready again", skill.name()))
}

fn breakthrough(ctx: &mut SkillContext) -> SkillResult {
    let skill = ctx.params.skill.ok_or_else(|| invalid("name the skill to refund"))?;
    if skill.def().usage_limit == UsageLimit::Unlimited {
        return Err(invalid(format!("{} has no usage cap", skill.name())));
    }
    let caster = ctx.caster_name();
    if ctx.state.usage.count(&caster, skill) == 0 {
        return Err(invalid(format!("{} has not been used yet", skill.name())));
    }
    ctx.charge();
    ctx.state.usage.decrement(&caster, skill);
    ctx.private_log(format!("📈 「{}」使用次数 -1", skill.name()));
    ctx.done(format!("one more use of {}", skill.name()))
}

fn jianbukecui(ctx: &mut SkillContext) -> SkillResult {
    ctx.charge();
    let caster = ctx.caster_name();
    ctx.state.ledger.jianbukecui.insert(caster.clone(), JIANBUKECUI_ROUNDS);
    ctx.log(format!("🛡️ {caster} 发动坚不可摧，{JIANBUKECUI_ROUNDS} 回合内免疫敌方技能"));
    ctx.done("jianbukecui raised")
}

fn brick_for_jade(ctx: &mut SkillContext) -> SkillResult {
    let caster = ctx.caster_name();
    if ctx.state.ledger.brick_jade.contains_key(&caster) {
        return Err(invalid("a city is already sitting out"));
    }
    let player = ctx.caster();
    let benched = roster_cities(ctx.state, &caster)
        .into_iter()
        .filter(|c| !player.is_center(&c.name))
        .min_by(|a, b| a.current_hp.cmp(&b.current_hp).then_with(|| a.name.cmp(&b.name)))
        .map(|c| c.name.clone())
        .ok_or_else(|| none_eligible("no non-center city deployed"))?;

    ctx.charge();
    if let Some(roster) = ctx.state.rosters.get_mut(&caster) {
        roster.retain(|c| c != &benched);
    }
    ctx.state.ledger.brick_jade.insert(
        caster.clone(),
        BrickJade { city: benched.clone(), rounds_left: BRICK_JADE_ROUNDS },
    );
    ctx.log(format!("🧱 {caster} 抛砖引玉，{benched} 暂离战场"));
    ctx.done(format!("{benched} sits out for {BRICK_JADE_ROUNDS} rounds"))
        .map(|o| o.with_data(json!({ "city": benched })))
}
