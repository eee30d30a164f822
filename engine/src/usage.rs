// ═══════════════════════════════════════════════════════════════════════
// Skill usage tracking — per-player, per-skill counts and last-use round
// ═══════════════════════════════════════════════════════════════════════

use crate::catalog::Skill;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub count: u32,
    pub last_round: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillUsage {
    records: BTreeMap<String, BTreeMap<Skill, UsageRecord>>,
    /// Uses of per-city capped skills: player -> skill -> city -> count.
    city_records: BTreeMap<String, BTreeMap<Skill, BTreeMap<String, u32>>>,
}

impl SkillUsage {
    pub fn record(&mut self, player: &str, skill: Skill, round: u32) {
        let rec = self
            .records
            .entry(player.to_string())
            .or_default()
            .entry(skill)
            .or_default();
        rec.count += 1;
        rec.last_round = Some(round);
    }

    pub fn record_city(&mut self, player: &str, skill: Skill, city: &str) {
        *self
            .city_records
            .entry(player.to_string())
            .or_default()
            .entry(skill)
            .or_default()
            .entry(city.to_string())
            .or_default() += 1;
    }

    pub fn city_count(&self, player: &str, skill: Skill, city: &str) -> u32 {
        self.city_records
            .get(player)
            .and_then(|m| m.get(&skill))
            .and_then(|m| m.get(city))
            .copied()
            .unwrap_or(0)
    }

    pub fn get(&self, player: &str, skill: Skill) -> UsageRecord {
        self.records
            .get(player)
            .and_then(|m| m.get(&skill))
            .copied()
            .unwrap_or_default()
    }

    pub fn count(&self, player: &str, skill: Skill) -> u32 {
        self.get(player, skill).count
    }

    /// Rounds still to wait before `skill` is usable again.
    pub fn cooldown_remaining(&self, player: &str, skill: Skill, cooldown: u32, round: u32) -> u32 {
        match self.get(player, skill).last_round {
            Some(last) => cooldown.saturating_sub(round.saturating_sub(last)),
            None => 0,
        }
    }

    /// Forget the last use so the cooldown no longer applies.
    /// Returns false when there was nothing to clear.
    pub fn clear_cooldown(&mut self, player: &str, skill: Skill) -> bool {
        match self.records.get_mut(player).and_then(|m| m.get_mut(&skill)) {
            Some(rec) if rec.last_round.is_some() => {
                rec.last_round = None;
                true
            }
            _ => false,
        }
    }

    /// Returns false when the count was already zero.
    pub fn decrement(&mut self, player: &str, skill: Skill) -> bool {
        match self.records.get_mut(player).and_then(|m| m.get_mut(&skill)) {
            Some(rec) if rec.count > 0 => {
                rec.count -= 1;
                true
            }
            _ => false,
        }
    }

    /// All skills `player` has used at least once.
    pub fn used_by(&self, player: &str) -> Vec<(Skill, UsageRecord)> {
        self.records
            .get(player)
            .map(|m| m.iter().map(|(s, r)| (*s, *r)).collect())
            .unwrap_or_default()
    }

    pub fn total_uses(&self, player: &str) -> u32 {
        self.records
            .get(player)
            .map(|m| m.values().map(|r| r.count).sum())
            .unwrap_or(0)
    }
}
