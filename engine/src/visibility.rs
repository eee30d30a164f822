// ═══════════════════════════════════════════════════════════════════════
// Visibility / Information Model
//
// What a player may know:
//   OWN      — every field of their own Player, their roster, their
//              protections and their private log entries
//   KNOWN    — opponents' cities they have seen (deployed, swapped,
//              revealed by intel skills), shown through any disguise
//              and with HP hidden under a mirage
//   PUBLIC   — gold, city counts, defeat status, public log entries
//   HIDDEN   — everything else: unseen cities, other players' private
//              logs, the unused city pool
//
// Agents MUST only receive PlayerView, never the raw GameState.
// ═══════════════════════════════════════════════════════════════════════

use crate::journal::LogEntry;
use crate::turn::is_player_defeated;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The view of the game state that a specific player is allowed to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    // ── Public info ────────────────────────────────────────
    pub viewer: String,
    pub mode: GameMode,
    pub round: u32,
    pub current_player: String,
    pub outcome: Option<Outcome>,
    pub opponents: Vec<OpponentView>,
    /// Teammate in 2v2, seen in full.
    pub teammate: Option<Player>,

    // ── Private info (only for the viewer) ─────────────────
    pub me: Player,
    pub my_roster: Vec<String>,
    /// Own cities under normal protection, with rounds left.
    pub my_protections: BTreeMap<String, u32>,
    pub my_iron: BTreeMap<String, u8>,
    /// Next paid skill costs half again as much.
    pub cost_increased: bool,
    pub logs: Vec<LogEntry>,
}

impl PlayerView {
    pub fn is_my_turn(&self) -> bool {
        self.outcome.is_none() && self.current_player == self.viewer
    }

    pub fn opponent(&self, name: &str) -> Option<&OpponentView> {
        self.opponents.iter().find(|o| o.name == name)
    }
}

/// Public information about another player plus whatever of their
/// cities the viewer has seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentView {
    pub name: String,
    pub team: u8,
    pub gold: u8,
    pub city_count: usize,
    pub alive_count: usize,
    pub defeated: bool,
    pub known_cities: Vec<CityView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityView {
    /// Real name, or the disguise name while a disguise holds.
    pub shown_as: String,
    /// None while the owner's mirage is up.
    pub hp: Option<u32>,
    pub current_hp: Option<u32>,
    pub is_alive: bool,
}

fn city_view(state: &GameState, owner: &str, city: &City) -> CityView {
    let hidden = state.ledger.mirage.contains_key(owner);
    let (shown_as, hp, current) = match state.ledger.disguise(owner, &city.name) {
        Some(d) => (d.as_name.clone(), d.as_hp, d.as_hp),
        None => (city.name.clone(), city.hp, city.current_hp),
    };
    CityView {
        shown_as,
        hp: (!hidden).then_some(hp),
        current_hp: (!hidden).then_some(current),
        is_alive: city.is_alive,
    }
}

/// Build the PlayerView for one player.
pub fn player_view(state: &GameState, viewer: &str) -> Option<PlayerView> {
    let me = state.player(viewer)?.clone();
    let teammate = state.teammate_of(viewer).cloned();

    let opponents = state
        .players
        .iter()
        .filter(|p| state.are_opponents(viewer, &p.name))
        .map(|p| {
            let known_cities = state
                .known_cities
                .get(viewer)
                .and_then(|m| m.get(&p.name))
                .map(|names| {
                    names
                        .iter()
                        .filter_map(|n| p.city(n))
                        .map(|c| city_view(state, &p.name, c))
                        .collect()
                })
                .unwrap_or_default();
            OpponentView {
                name: p.name.clone(),
                team: p.team,
                gold: p.gold,
                city_count: p.cities.len(),
                alive_count: p.alive_count(),
                defeated: is_player_defeated(p),
                known_cities,
            }
        })
        .collect();

    Some(PlayerView {
        viewer: viewer.to_string(),
        mode: state.mode,
        round: state.round,
        current_player: state.current().name.clone(),
        outcome: state.outcome.clone(),
        opponents,
        teammate,
        me,
        my_roster: state.rosters.get(viewer).cloned().unwrap_or_default(),
        my_protections: state.ledger.protections.get(viewer).cloned().unwrap_or_default(),
        my_iron: state.ledger.iron_cities.get(viewer).cloned().unwrap_or_default(),
        cost_increased: state.ledger.cost_increase.contains(viewer),
        logs: state.journal.visible_to(viewer).cloned().collect(),
    })
}
