// ═══════════════════════════════════════════════════════════════════════
// Database — SQLite storage for tournament results and ELO ratings
// ═══════════════════════════════════════════════════════════════════════

use crate::runner::GameResult;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeSet;

pub const INITIAL_ELO: f64 = 1500.0;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub name: String,
    pub elo: f64,
    pub games: u32,
    pub wins: u32,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path.
    pub fn new(path: &str) -> rusqlite::Result<Self> {
        let db = Database {
            conn: Connection::open(path)?,
        };
        db.create_schema()?;
        Ok(db)
    }

    /// In-memory database (useful for tests).
    pub fn in_memory() -> rusqlite::Result<Self> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.create_schema()?;
        Ok(db)
    }

    fn create_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS agents (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                elo         REAL NOT NULL DEFAULT 1500.0,
                games       INTEGER NOT NULL DEFAULT 0,
                wins        INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS games (
                id          INTEGER PRIMARY KEY,
                seed        INTEGER NOT NULL,
                mode        TEXT NOT NULL,
                rounds      INTEGER NOT NULL,
                outcome     TEXT NOT NULL,
                played_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS game_players (
                id           INTEGER PRIMARY KEY,
                game_id      INTEGER NOT NULL REFERENCES games(id),
                agent_id     INTEGER NOT NULL REFERENCES agents(id),
                player       TEXT NOT NULL,
                team         INTEGER NOT NULL,
                gold         INTEGER NOT NULL,
                alive_cities INTEGER NOT NULL,
                total_hp     INTEGER NOT NULL,
                defeated     INTEGER NOT NULL,
                won          INTEGER NOT NULL
            );
            ",
        )
    }

    /// Register an agent (or return existing ID).
    pub fn register_agent(&self, name: &str) -> rusqlite::Result<i64> {
        self.conn
            .execute("INSERT OR IGNORE INTO agents (name) VALUES (?1)", params![name])?;
        self.conn
            .query_row("SELECT id FROM agents WHERE name = ?1", params![name], |row| row.get(0))
    }

    /// Store a finished game and bump each agent's game and win counts.
    /// An agent filling several seats is counted once per game.
    pub fn store_game(&self, result: &GameResult) -> rusqlite::Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO games (seed, mode, rounds, outcome) VALUES (?1, ?2, ?3, ?4)",
            params![
                result.seed as i64,
                result.mode.to_string(),
                result.rounds_played,
                result.outcome_label()
            ],
        )?;
        let game_id = tx.last_insert_rowid();

        for pr in &result.player_results {
            let agent_id = self.register_agent(&pr.agent_name)?;
            tx.execute(
                "INSERT INTO game_players (game_id, agent_id, player, team, gold, alive_cities, total_hp, defeated, won)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    game_id,
                    agent_id,
                    pr.name,
                    pr.team,
                    pr.gold,
                    pr.alive_cities as i64,
                    pr.total_hp as i64,
                    pr.defeated,
                    pr.won,
                ],
            )?;
        }

        let agents: BTreeSet<&str> = result.player_results.iter().map(|p| p.agent_name.as_str()).collect();
        let winners: BTreeSet<&str> = result.winners().map(|p| p.agent_name.as_str()).collect();
        for name in agents {
            tx.execute(
                "UPDATE agents SET games = games + 1, wins = wins + ?1 WHERE name = ?2",
                params![winners.contains(name) as i64, name],
            )?;
        }

        tx.commit()?;
        Ok(game_id)
    }

    fn elo_of(&self, id: i64) -> rusqlite::Result<f64> {
        let elo = self
            .conn
            .query_row("SELECT elo FROM agents WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(elo.unwrap_or(INITIAL_ELO))
    }

    /// Update ELO ratings for a set of agents after a game.
    /// Simple multiplayer ELO: winner gains K points from each loser.
    pub fn update_elo(&self, winner_id: i64, loser_ids: &[i64], k: f64) -> rusqlite::Result<()> {
        let winner_elo = self.elo_of(winner_id)?;

        for &loser_id in loser_ids {
            let loser_elo = self.elo_of(loser_id)?;

            let expected_winner = 1.0 / (1.0 + 10f64.powf((loser_elo - winner_elo) / 400.0));
            let expected_loser = 1.0 - expected_winner;

            let delta_w = k * (1.0 - expected_winner);
            let delta_l = k * (0.0 - expected_loser);

            self.conn.execute(
                "UPDATE agents SET elo = elo + ?1 WHERE id = ?2",
                params![delta_w, winner_id],
            )?;
            self.conn.execute(
                "UPDATE agents SET elo = elo + ?1 WHERE id = ?2",
                params![delta_l, loser_id],
            )?;
        }
        Ok(())
    }

    /// Rate a finished game: every winning agent takes points from every
    /// losing agent. Draws, unfinished games and mirror matches leave
    /// ratings alone.
    pub fn rate_game(&self, result: &GameResult, k: f64) -> rusqlite::Result<()> {
        let winners: BTreeSet<&str> = result.winners().map(|p| p.agent_name.as_str()).collect();
        let losers: BTreeSet<&str> = result
            .player_results
            .iter()
            .filter(|p| !p.won)
            .map(|p| p.agent_name.as_str())
            .filter(|name| !winners.contains(name))
            .collect();
        if winners.is_empty() || losers.is_empty() {
            return Ok(());
        }

        let loser_ids = losers
            .iter()
            .map(|name| self.register_agent(name))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for name in winners {
            let id = self.register_agent(name)?;
            self.update_elo(id, &loser_ids, k)?;
        }
        Ok(())
    }

    /// Get ELO leaderboard.
    pub fn leaderboard(&self) -> rusqlite::Result<Vec<Standing>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, elo, games, wins FROM agents ORDER BY elo DESC, name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Standing {
                name: row.get(0)?,
                elo: row.get(1)?,
                games: row.get(2)?,
                wins: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    /// Get total number of games stored.
    pub fn game_count(&self) -> rusqlite::Result<u32> {
        self.conn.query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))
    }
}
