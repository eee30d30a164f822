// ═══════════════════════════════════════════════════════════════════════
// Game Runner — runs complete headless games with agents
//
// The loop is the headless AI hook: whenever the engine hands the turn
// to a seat, that seat's agent is asked straight away. Rejected skills
// and deployments are logged and skipped; agents are expected to end
// their turn within a bounded number of attempts.
// ═══════════════════════════════════════════════════════════════════════

use crate::TournamentError;
use citycard_agents::{Agent, ChaosAgent, RandomAgent};
use citycard_engine::engine::{apply_action, ActionOutcome};
use citycard_engine::error::EngineError;
use citycard_engine::setup::create_initial_state;
use citycard_engine::skills::SkillRegistry;
use citycard_engine::turn::is_player_defeated;
use citycard_engine::types::*;
use citycard_engine::visibility::player_view;
use citycard_engine::GameConfig;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Games still running after this many rounds are recorded unfinished.
pub const MAX_ROUNDS: u32 = 200;

/// Result of a completed game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub seed: u64,
    pub mode: GameMode,
    /// None when the round cap was hit first.
    pub outcome: Option<Outcome>,
    pub rounds_played: u32,
    pub decisions: usize,
    pub player_results: Vec<PlayerResult>,
}

impl GameResult {
    pub fn outcome_label(&self) -> String {
        match &self.outcome {
            Some(o) => o.to_string(),
            None => "unfinished".to_string(),
        }
    }

    pub fn winners(&self) -> impl Iterator<Item = &PlayerResult> {
        self.player_results.iter().filter(|p| p.won)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerResult {
    pub name: String,
    pub agent_name: String,
    pub team: u8,
    pub gold: u8,
    pub alive_cities: usize,
    pub total_hp: u64,
    pub defeated: bool,
    pub won: bool,
}

// ── Agent line-ups ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Random,
    Chaos,
    /// Random and chaos agents on alternating seats.
    Mixed,
}

impl FromStr for AgentKind {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(AgentKind::Random),
            "chaos" => Ok(AgentKind::Chaos),
            "mixed" => Ok(AgentKind::Mixed),
            _ => Err(TournamentError::UnknownAgentKind(s.to_string())),
        }
    }
}

/// One agent per seat, seeded from the game seed and the seat index.
pub fn make_agents(kind: AgentKind, config: &GameConfig) -> BTreeMap<String, Box<dyn Agent>> {
    let config = config.clone().normalized();
    config
        .player_names
        .iter()
        .enumerate()
        .map(|(seat, name)| {
            let seed = config.seed.wrapping_mul(31).wrapping_add(seat as u64);
            let agent: Box<dyn Agent> = match (kind, seat % 2) {
                (AgentKind::Random, _) | (AgentKind::Mixed, 0) => Box::new(RandomAgent::new(seed)),
                _ => Box::new(ChaosAgent::new(seed)),
            };
            (name.clone(), agent)
        })
        .collect()
}

// ── Single game ────────────────────────────────────────────────────────

/// Run a complete game with the given agents, keyed by player name.
pub fn run_game(
    agents: &mut BTreeMap<String, Box<dyn Agent>>,
    config: &GameConfig,
    max_decisions: usize, // safety limit to prevent infinite loops
) -> Result<GameResult, TournamentError> {
    let mut state = create_initial_state(config)?;
    let registry = SkillRegistry::standard();
    let mut decisions = 0;

    while state.outcome.is_none() && state.round <= MAX_ROUNDS {
        let actor = state.current().name.clone();
        let agent = agents
            .get_mut(&actor)
            .ok_or_else(|| TournamentError::MissingAgent(actor.clone()))?;
        let view = player_view(&state, &actor).ok_or_else(|| TournamentError::MissingAgent(actor.clone()))?;
        let action = agent.decide(&view);

        match apply_action(&mut state, &registry, &actor, action) {
            Ok(ActionOutcome::TurnEnded(report)) if report.round_advanced => {
                debug!("round {} begins", state.round);
            }
            Ok(_) => {}
            Err(e @ (EngineError::Skill(_) | EngineError::InvalidDeployment(_))) => {
                debug!("{} ({}) rejected: {}", actor, agent.name(), e);
            }
            Err(e) => return Err(e.into()),
        }

        decisions += 1;
        if decisions > max_decisions {
            return Err(TournamentError::Stuck {
                max_decisions,
                round: state.round,
            });
        }
    }

    let result = build_result(&state, agents, decisions);
    info!(
        "seed {} ({}): {} after {} rounds",
        result.seed,
        result.mode,
        result.outcome_label(),
        result.rounds_played
    );
    Ok(result)
}

fn build_result(state: &GameState, agents: &BTreeMap<String, Box<dyn Agent>>, decisions: usize) -> GameResult {
    let player_results = state
        .players
        .iter()
        .map(|p| {
            let won = match &state.outcome {
                Some(Outcome::Winner(name)) => *name == p.name,
                Some(Outcome::TeamWinner(team)) => *team == p.team,
                Some(Outcome::Draw) | None => false,
            };
            PlayerResult {
                name: p.name.clone(),
                agent_name: agents.get(&p.name).map(|a| a.name().to_string()).unwrap_or_default(),
                team: p.team,
                gold: p.gold,
                alive_cities: p.alive_count(),
                total_hp: p.total_hp(),
                defeated: is_player_defeated(p),
                won,
            }
        })
        .collect();

    GameResult {
        seed: state.seed,
        mode: state.mode,
        outcome: state.outcome.clone(),
        rounds_played: state.round,
        decisions,
        player_results,
    }
}

// ── Batches ────────────────────────────────────────────────────────────

/// Run one game per seed in parallel. Each game gets a fresh line-up.
pub fn run_batch(
    template: &GameConfig,
    seeds: &[u64],
    kind: AgentKind,
    max_decisions: usize,
) -> Vec<Result<GameResult, TournamentError>> {
    seeds
        .par_iter()
        .map(|&seed| {
            let config = GameConfig {
                seed,
                ..template.clone()
            };
            let mut agents = make_agents(kind, &config);
            run_game(&mut agents, &config, max_decisions)
        })
        .collect()
}
