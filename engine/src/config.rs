// ═══════════════════════════════════════════════════════════════════════
// Game configuration
// ═══════════════════════════════════════════════════════════════════════

use crate::catalog::CITIES;
use crate::error::ConfigError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const DEFAULT_NAMES: [&str; 4] = ["Whale", "CRH380BL-3562", "Sirius North", "猎奇凤爱莉"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub mode: GameMode,
    pub seed: u64,
    pub starting_gold: u8,
    pub cities_per_player: usize,
    /// Seat order. Defaults are filled in when left empty.
    pub player_names: Vec<String>,
    /// Seats driven by the AI policy; missing entries mean human.
    pub ai_players: Vec<bool>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            mode: GameMode::TwoPlayer,
            seed: 42,
            starting_gold: STARTING_GOLD,
            cities_per_player: CITIES_PER_PLAYER,
            player_names: Vec::new(),
            ai_players: Vec::new(),
        }
    }
}

impl GameConfig {
    pub fn for_mode(mode: GameMode, seed: u64) -> Self {
        let n = mode.player_count();
        GameConfig {
            mode,
            seed,
            starting_gold: STARTING_GOLD,
            cities_per_player: CITIES_PER_PLAYER,
            player_names: DEFAULT_NAMES.iter().take(n).map(|s| s.to_string()).collect(),
            ai_players: vec![false; n],
        }
    }

    /// Fill in default seat names when a loaded config left them out.
    pub fn normalized(mut self) -> Self {
        if self.player_names.is_empty() {
            self.player_names = DEFAULT_NAMES
                .iter()
                .take(self.mode.player_count())
                .map(|s| s.to_string())
                .collect();
        }
        self
    }

    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.player_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Every seat AI-driven.
    pub fn all_ai(mut self) -> Self {
        self.ai_players = vec![true; self.mode.player_count()];
        self
    }

    pub fn is_ai(&self, seat: usize) -> bool {
        self.ai_players.get(seat).copied().unwrap_or(false)
    }

    /// Check the config can be dealt.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let expected = self.mode.player_count();
        if self.player_names.len() != expected {
            return Err(ConfigError::PlayerCount {
                mode: self.mode,
                expected,
                actual: self.player_names.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for name in &self.player_names {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateName(name.clone()));
            }
        }
        if self.cities_per_player == 0 {
            return Err(ConfigError::NoCities);
        }
        let needed = expected * self.cities_per_player;
        if needed > CITIES.len() {
            return Err(ConfigError::NotEnoughCities { needed, available: CITIES.len() });
        }
        if self.starting_gold > GOLD_CAP {
            return Err(ConfigError::StartingGold(self.starting_gold));
        }
        Ok(())
    }
}
