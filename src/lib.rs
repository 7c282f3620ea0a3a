//! Landmark Guard - A time-boxed map defense arcade game
//!
//! Core modules:
//! - `layout`: Map-to-screen transform and responsive layout engine
//! - `sim`: Gameplay simulation in logical (map) coordinates
//! - `scene`: Rendering/collision collaborator seam
//! - `platform`: Viewport and device signal seam
//! - `session`: Fixed timestep frame loop wiring layout and gameplay
//! - `tuning`: Data-driven layout and game constants
//! - `settings` / `highscores`: Persisted player settings and local leaderboard

pub mod highscores;
pub mod layout;
pub mod platform;
pub mod scene;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use highscores::HighScores;
pub use session::GameSession;
pub use settings::{Difficulty, Settings};
pub use tuning::Tuning;

use glam::DVec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f64 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Map image size used until the real asset size is known
    pub const DEFAULT_MAP_WIDTH: f64 = 1200.0;
    pub const DEFAULT_MAP_HEIGHT: f64 = 800.0;

    /// Player start position (logical units)
    pub const PLAYER_START_X: f64 = 200.0;
    pub const PLAYER_START_Y: f64 = 300.0;

    /// Native sprite sizes in texture pixels
    pub const PLAYER_SPRITE_SIZE: f64 = 256.0;
    pub const DISASTER_SPRITE_SIZE: f64 = 200.0;
    pub const POWER_UP_SPRITE_SIZE: f64 = 180.0;
}

/// Smallest component of a vector (the binding axis of a fit)
#[inline]
pub fn min_axis(v: DVec2) -> f64 {
    v.x.min(v.y)
}

/// True if every component is finite
#[inline]
pub fn is_finite_vec(v: DVec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

/// Euclidean distance between two points.
///
/// The formula is the same in logical and screen space, but the results are
/// only comparable when both points live in the same space.
#[inline]
pub fn distance(a: DVec2, b: DVec2) -> f64 {
    (b - a).length()
}
