// ═══════════════════════════════════════════════════════════════════════
// Game setup — deals cities and builds the initial GameState
// ═══════════════════════════════════════════════════════════════════════

use crate::catalog::{CityDef, CITIES};
use crate::config::GameConfig;
use crate::error::ConfigError;
use crate::journal::Journal;
use crate::ledger::EffectLedger;
use crate::types::*;
use crate::usage::SkillUsage;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Create the initial game state. The deal is driven by the config seed:
/// the catalog is shuffled once, each seat takes the next
/// `cities_per_player` cities, and the first city dealt is its center.
pub fn create_initial_state(config: &GameConfig) -> Result<GameState, ConfigError> {
    let config = config.clone().normalized();
    config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut deck: Vec<&CityDef> = CITIES.iter().collect();
    deck.shuffle(&mut rng);

    let per_player = config.cities_per_player;
    let mut dealt = deck.chunks(per_player);
    let mut players = Vec::with_capacity(config.player_names.len());
    for (seat, name) in config.player_names.iter().enumerate() {
        let hand = dealt.next().ok_or(ConfigError::NotEnoughCities {
            needed: per_player * config.player_names.len(),
            available: CITIES.len(),
        })?;
        let cities: BTreeMap<String, City> = hand
            .iter()
            .map(|def| (def.name.to_string(), City::from_def(def)))
            .collect();
        let mut player = Player {
            name: name.clone(),
            gold: config.starting_gold,
            cities,
            center_city_name: String::new(),
            battle_modifiers: Vec::new(),
            team: config.mode.team_for_seat(seat),
            is_ai: config.is_ai(seat),
        };
        player.set_center(hand[0].name);
        players.push(player);
    }

    let taken = per_player * players.len();
    let unused_cities: Vec<String> = deck[taken..].iter().map(|d| d.name.to_string()).collect();

    let mut state = GameState {
        mode: config.mode,
        round: 1,
        current_player: 0,
        turn_counter: 0,
        players,
        ledger: EffectLedger::default(),
        usage: SkillUsage::default(),
        journal: Journal::default(),
        rosters: BTreeMap::new(),
        known_cities: BTreeMap::new(),
        unused_cities,
        seed: config.seed,
        rng_counter: 0,
        outcome: None,
        config,
    };
    state.add_log(format!("游戏开始（{}）", state.mode));
    state.add_log("第 1 回合开始");
    let first = state.players[0].name.clone();
    state.add_log(format!("{first} 的回合"));
    log::debug!(
        "dealt {} cities to {} players, {} left in the pool",
        taken,
        state.players.len(),
        state.unused_cities.len()
    );
    Ok(state)
}

/// Rebuild the initial state from the config the game was started with.
pub fn reset_game(state: &mut GameState) -> Result<(), ConfigError> {
    *state = create_initial_state(&state.config)?;
    Ok(())
}
