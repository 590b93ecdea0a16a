//! Per-player statistics kept in memory for the lifetime of the process.

use std::collections::HashMap;

use crate::driver::GameSummary;
use crate::SessionId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub games_played: u32,
    pub best_score: u32,
    pub best_level: u32,
    pub total_lines: u32,
}

impl PlayerStats {
    fn record(&mut self, summary: &GameSummary) {
        self.games_played = self.games_played.saturating_add(1);
        self.best_score = self.best_score.max(summary.score);
        self.best_level = self.best_level.max(summary.level);
        self.total_lines = self.total_lines.saturating_add(summary.lines);
    }
}

#[derive(Debug, Default)]
pub struct StatsBook {
    players: HashMap<SessionId, PlayerStats>,
}

impl StatsBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, summary: &GameSummary) {
        self.players
            .entry(summary.session)
            .or_default()
            .record(summary);
    }

    /// Stats for a player; all zeros if they never finished a game
    pub fn get(&self, id: SessionId) -> PlayerStats {
        self.players.get(&id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
