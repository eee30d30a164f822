// ═══════════════════════════════════════════════════════════════════════
// Runner — CLI entry point for running games and tournaments
// ═══════════════════════════════════════════════════════════════════════

use citycard_engine::catalog::{Category, Skill, UsageLimit};
use citycard_engine::types::GameMode;
use citycard_engine::GameConfig;
use citycard_tournament::{make_agents, run_batch, run_game, AgentKind, Database, GameResult};
use clap::{Parser, Subcommand};
use log::{error, LevelFilter};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::error::Error;
use std::process::ExitCode;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "citycard-runner", about = "City card battle lab")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single headless game
    Play {
        /// Game mode: 2P, 3P or 2v2
        #[arg(short, long)]
        mode: Option<GameMode>,
        #[arg(short, long)]
        seed: Option<u64>,
        /// JSON file holding a GameConfig
        #[arg(short, long)]
        config: Option<String>,
        /// Agent line-up: "random", "chaos" or "mixed"
        #[arg(short, long, default_value = "random")]
        agent: AgentKind,
        #[arg(long, default_value_t = 200_000)]
        max_decisions: usize,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a tournament of N games in parallel
    Tournament {
        #[arg(short, long, default_value_t = 100)]
        games: u32,
        #[arg(short, long, default_value = "2P")]
        mode: GameMode,
        /// Base seed the per-game seeds are drawn from
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long, default_value = "results.db")]
        db: String,
        #[arg(short, long, default_value = "mixed")]
        agent: AgentKind,
        /// ELO K-factor
        #[arg(short, long, default_value_t = 32.0)]
        k: f64,
        #[arg(long, default_value_t = 200_000)]
        max_decisions: usize,
    },
    /// Show leaderboard from database
    Leaderboard {
        #[arg(short, long, default_value = "results.db")]
        db: String,
    },
    /// List the skill catalog with prices for one mode
    Skills {
        #[arg(short, long, default_value = "2P")]
        mode: GameMode,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Play { mode, seed, config, agent, max_decisions, json } => {
            cmd_play(mode, seed, config.as_deref(), agent, max_decisions, json)
        }
        Commands::Tournament { games, mode, seed, db, agent, k, max_decisions } => {
            cmd_tournament(games, mode, seed, &db, agent, k, max_decisions)
        }
        Commands::Leaderboard { db } => cmd_leaderboard(&db),
        Commands::Skills { mode } => {
            cmd_skills(mode);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&str>, mode: Option<GameMode>, seed: Option<u64>) -> Result<GameConfig, Box<dyn Error>> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<GameConfig>(&text)?
        }
        None => GameConfig::for_mode(mode.unwrap_or(GameMode::TwoPlayer), seed.unwrap_or(42)),
    };
    if let Some(mode) = mode {
        if mode != config.mode {
            config = GameConfig {
                mode,
                player_names: Vec::new(),
                ai_players: Vec::new(),
                ..config
            };
        }
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let config = config.normalized();
    config.validate()?;
    Ok(config)
}

fn cmd_play(
    mode: Option<GameMode>,
    seed: Option<u64>,
    config_path: Option<&str>,
    kind: AgentKind,
    max_decisions: usize,
    json: bool,
) -> CliResult {
    let config = load_config(config_path, mode, seed)?;
    let mut agents = make_agents(kind, &config);
    let result = run_game(&mut agents, &config, max_decisions)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("=== City Card Battle Lab ===\n");
    println!("Single game: mode={}, seed={}, agents={:?}\n", config.mode, config.seed, kind);
    print_result(&result);
    Ok(())
}

fn print_result(result: &GameResult) {
    println!("  Outcome: {}", result.outcome_label());
    println!("  Rounds played: {}", result.rounds_played);
    println!("  Decisions: {}", result.decisions);
    println!();
    println!("  Final standings:");
    for pr in &result.player_results {
        println!(
            "    {:16} [{:6}] team {} -- gold: {:>2}, alive: {:>2}, hp: {:>7}{}",
            pr.name,
            pr.agent_name,
            pr.team,
            pr.gold,
            pr.alive_cities,
            pr.total_hp,
            if pr.defeated { "  (defeated)" } else { "" },
        );
    }
}

fn cmd_tournament(
    num_games: u32,
    mode: GameMode,
    base_seed: u64,
    db_path: &str,
    kind: AgentKind,
    k: f64,
    max_decisions: usize,
) -> CliResult {
    println!("=== Tournament: {} games, mode={}, agents={:?} ===\n", num_games, mode, kind);

    let db = Database::new(db_path)?;
    let mut rng = ChaCha8Rng::seed_from_u64(base_seed);
    let seeds: Vec<u64> = (0..num_games).map(|_| rng.gen()).collect();
    let template = GameConfig::for_mode(mode, base_seed);

    let mut finished = 0u32;
    let mut unfinished = 0u32;
    let mut errors = 0u32;
    for (g, result) in run_batch(&template, &seeds, kind, max_decisions).into_iter().enumerate() {
        match result {
            Ok(result) => {
                if result.outcome.is_some() {
                    finished += 1;
                } else {
                    unfinished += 1;
                }
                db.store_game(&result)?;
                db.rate_game(&result, k)?;
            }
            Err(e) => {
                errors += 1;
                eprintln!("Game {} (seed {}): ERROR -- {}", g + 1, seeds[g], e);
            }
        }
    }

    println!(
        "--- Summary ({} games: {} finished, {} hit the round cap, {} errors) ---",
        num_games, finished, unfinished, errors
    );
    println!("\nResults saved to: {}", db_path);
    println!("Total games in DB: {}", db.game_count()?);
    Ok(())
}

fn cmd_leaderboard(db_path: &str) -> CliResult {
    let db = Database::new(db_path)?;
    let board = db.leaderboard()?;
    if board.is_empty() {
        println!("No agents found. Run some tournaments first.");
        return Ok(());
    }
    println!("=== Leaderboard ===\n");
    println!("{:<20} {:>8} {:>8} {:>8}", "Agent", "ELO", "Games", "Wins");
    println!("{}", "-".repeat(48));
    for s in &board {
        println!("{:<20} {:>8.1} {:>8} {:>8}", s.name, s.elo, s.games, s.wins);
    }
    Ok(())
}

fn cmd_skills(mode: GameMode) {
    println!("=== Skills ({}) ===\n", mode);
    println!("{:<12} {:>4} {:<10} {:>8} {:<12}", "Skill", "Cost", "Kind", "Cooldown", "Limit");
    println!("{}", "-".repeat(52));
    for skill in Skill::ALL {
        let def = skill.def();
        if !def.legal_in(mode) {
            continue;
        }
        let kind = match def.category {
            Category::Battle => "battle",
            Category::NonBattle => "non-battle",
        };
        let limit = match def.usage_limit {
            UsageLimit::Unlimited => String::new(),
            UsageLimit::PerGame(n) => format!("{}/game", n),
            UsageLimit::PerCity(n) => format!("{}/city", n),
        };
        println!(
            "{:<12} {:>4} {:<10} {:>8} {:<12}",
            skill.name(),
            def.cost_in(mode),
            kind,
            def.cooldown,
            limit
        );
    }
}
