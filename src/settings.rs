//! Game settings and preferences
//!
//! Persisted as JSON next to the leaderboard.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted team name, in characters
pub const MAX_TEAM_NAME_LEN: usize = 20;

/// Name recorded when the player leaves the field empty
pub const DEFAULT_TEAM_NAME: &str = "Anonymous Team";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Team name must be 1-20 characters, got {0}")]
    InvalidTeamName(usize),

    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Seconds between disaster spawns
    pub fn disaster_spawn_secs(&self) -> f64 {
        match self {
            Difficulty::Easy => 3.0,
            Difficulty::Medium => 2.0,
            Difficulty::Hard => 1.2,
        }
    }

    /// Multiplier on disaster speed
    pub fn disaster_speed(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.6,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    /// Multiplier on power-up spawn intervals (below 1 = more often)
    pub fn power_up_interval(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.7,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.3,
        }
    }
}

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,
    pub team_name: String,
    /// Let the autopilot play (attract mode)
    pub idle_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            team_name: DEFAULT_TEAM_NAME.to_string(),
            idle_mode: false,
        }
    }
}

impl Settings {
    /// Check a team name, trimming surrounding whitespace
    pub fn validate_team_name(name: &str) -> Result<String, SettingsError> {
        let trimmed = name.trim();
        let len = trimmed.chars().count();
        if len == 0 || len > MAX_TEAM_NAME_LEN {
            return Err(SettingsError::InvalidTeamName(len));
        }
        Ok(trimmed.to_string())
    }

    pub fn set_team_name(&mut self, name: &str) -> Result<(), SettingsError> {
        self.team_name = Self::validate_team_name(name)?;
        Ok(())
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<Settings>(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring malformed settings {}: {}", path.display(), e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not read settings {}: {}", path.display(), e),
        }

        log::info!("Using default settings");
        Self::default()
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved");
        Ok(())
    }
}
