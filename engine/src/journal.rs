// ═══════════════════════════════════════════════════════════════════════
// Journal — append-only game log with public and private entries
//
// Public entries are visible to every seat; private entries only to the
// named player. Every entry is mirrored to the `log` facade so a headless
// run can be followed from stderr.
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the journal, strictly increasing.
    pub seq: u64,
    pub round: u32,
    /// Wall-clock milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub visibility: Visibility,
    pub message: String,
}

impl LogEntry {
    pub fn is_private(&self) -> bool {
        matches!(self.visibility, Visibility::Private(_))
    }

    pub fn visible_to(&self, player: &str) -> bool {
        match &self.visibility {
            Visibility::Public => true,
            Visibility::Private(owner) => owner == player,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<LogEntry>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Journal {
    pub fn add_log(&mut self, round: u32, message: impl Into<String>) {
        let message = message.into();
        log::info!("[R{round}] {message}");
        self.push(round, Visibility::Public, message);
    }

    pub fn add_private_log(&mut self, round: u32, player: &str, message: impl Into<String>) {
        let message = message.into();
        log::debug!("[R{round}] ({player}) {message}");
        self.push(round, Visibility::Private(player.to_string()), message);
    }

    fn push(&mut self, round: u32, visibility: Visibility, message: String) {
        let seq = self.entries.len() as u64;
        self.entries.push(LogEntry {
            seq,
            round,
            timestamp_ms: now_ms(),
            visibility,
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn public(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| !e.is_private())
    }

    pub fn private_for<'a>(&'a self, player: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| matches!(&e.visibility, Visibility::Private(p) if p == player))
    }

    pub fn visible_to<'a>(&'a self, player: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| e.visible_to(player))
    }

    /// Any public entry containing `needle`.
    pub fn contains_public(&self, needle: &str) -> bool {
        self.public().any(|e| e.message.contains(needle))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
