//! Gameplay simulation
//!
//! Everything here works in logical map units and never reads the screen:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - Screen-space radii come back through the current scale

pub mod collision;
pub mod state;
pub mod tick;

pub use collision::{circles_overlap, logical_radius, resolve_collisions};
pub use state::{GameEvent, GamePhase, GameState, LANDMARKS, ResultTier, RoundResult, SpawnTimers};
pub use tick::{TickInput, tick};
