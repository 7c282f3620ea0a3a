//! High score leaderboard system
//!
//! Persisted as a JSON file, tracks the top 10 scores plus running totals
//! across every recorded game.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::Difficulty;

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

#[derive(Error, Debug)]
pub enum HighScoreError {
    #[error("Leaderboard I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Leaderboard file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub team: String,
    /// Final score, perfect bonus included (may be negative)
    pub score: i64,
    pub landmarks_saved: u32,
    pub difficulty: Difficulty,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

/// Totals over every recorded game, not just the kept entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardStats {
    pub games_played: u64,
    pub total_score: i64,
    pub best_score: Option<i64>,
    pub games_by_difficulty: BTreeMap<String, u64>,
}

impl LeaderboardStats {
    pub fn average_score(&self) -> Option<f64> {
        if self.games_played == 0 {
            None
        } else {
            Some(self.total_score as f64 / self.games_played as f64)
        }
    }
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
    #[serde(default)]
    pub stats: LeaderboardStats,
}

impl HighScores {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: i64) -> bool {
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        // A tie with the lowest entry displaces it (newer first)
        self.entries.last().map(|e| score >= e.score).unwrap_or(true)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: i64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score >= e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Record a finished game. Every game counts toward the stats; the entry
    /// is kept only if it qualifies.
    ///
    /// Returns the rank achieved (1-indexed) or None if it didn't qualify.
    pub fn record(&mut self, entry: HighScoreEntry) -> Option<usize> {
        self.stats.games_played += 1;
        self.stats.total_score += entry.score;
        self.stats.best_score = Some(self.stats.best_score.map_or(entry.score, |b| b.max(entry.score)));
        *self
            .stats
            .games_by_difficulty
            .entry(entry.difficulty.as_str().to_string())
            .or_insert(0) += 1;

        if !self.qualifies(entry.score) {
            return None;
        }

        // Find insertion point (sorted descending by score, newest first on ties)
        let pos = self.entries.iter().position(|e| entry.score >= e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        // Trim to max size
        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<i64> {
        self.entries.first().map(|e| e.score)
    }

    /// Kept entries for one difficulty, best first
    pub fn for_difficulty(&self, difficulty: Difficulty) -> impl Iterator<Item = &HighScoreEntry> {
        self.entries.iter().filter(move |e| e.difficulty == difficulty)
    }

    /// Load high scores from a JSON file
    pub fn load(path: &Path) -> Result<Self, HighScoreError> {
        let json = std::fs::read_to_string(path)?;
        let scores: HighScores = serde_json::from_str(&json)?;
        log::info!("Loaded {} high scores", scores.entries.len());
        Ok(scores)
    }

    /// Load, starting fresh when the file is missing or unreadable
    pub fn load_or_new(path: &Path) -> Self {
        match Self::load(path) {
            Ok(scores) => scores,
            Err(HighScoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No high scores found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("{}, starting fresh", e);
                Self::new()
            }
        }
    }

    /// Save high scores to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), HighScoreError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// Format a timestamp as a relative date string
pub fn format_age(timestamp: f64, now: f64) -> String {
    let diff_secs = (now - timestamp) / 1000.0;
    let diff_mins = diff_secs / 60.0;
    let diff_hours = diff_mins / 60.0;
    let diff_days = diff_hours / 24.0;

    if diff_days >= 1.0 {
        let days = diff_days.floor() as i64;
        if days == 1 {
            "Yesterday".to_string()
        } else {
            format!("{} days ago", days)
        }
    } else if diff_hours >= 1.0 {
        let hours = diff_hours.floor() as i64;
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else if diff_mins >= 1.0 {
        let mins = diff_mins.floor() as i64;
        if mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{} mins ago", mins)
        }
    } else {
        "Just now".to_string()
    }
}
