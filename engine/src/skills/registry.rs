// ═══════════════════════════════════════════════════════════════════════
// Skill registry — explicit mapping from skill to handler
// ═══════════════════════════════════════════════════════════════════════

use super::{SkillContext, SkillOutcome};
use crate::catalog::Skill;
use crate::error::SkillError;
use std::collections::HashMap;

pub type SkillFn = fn(&mut SkillContext<'_>) -> Result<SkillOutcome, SkillError>;

#[derive(Clone, Default)]
pub struct SkillRegistry {
    handlers: HashMap<Skill, SkillFn>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every skill in the catalog with its standard handler.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        super::battle::register(&mut reg);
        super::economy::register(&mut reg);
        super::defense::register(&mut reg);
        super::offense::register(&mut reg);
        super::trade::register(&mut reg);
        super::intel::register(&mut reg);
        reg
    }

    pub fn register(&mut self, skill: Skill, handler: SkillFn) {
        if self.handlers.insert(skill, handler).is_some() {
            log::warn!("handler for {} registered twice", skill.name());
        }
    }

    pub fn get(&self, skill: Skill) -> Option<SkillFn> {
        self.handlers.get(&skill).copied()
    }

    pub fn contains(&self, skill: Skill) -> bool {
        self.handlers.contains_key(&skill)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Catalog skills with no handler.
    pub fn missing(&self) -> Vec<Skill> {
        Skill::ALL.iter().copied().filter(|s| !self.contains(*s)).collect()
    }
}

impl std::fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
