//! Responsive layout engine
//!
//! Gameplay reasons about positions in logical map units. This module owns the
//! single transform that maps them to the screen, picks its scale from the
//! device context, and keeps every tracked entity's screen attributes in step
//! with it across resizes, rotations and fullscreen toggles.

pub mod coordinator;
pub mod error;
pub mod history;
pub mod solver;
pub mod tracker;
pub mod transform;

pub use coordinator::{
    LayoutCoordinator, RelayoutOutcome, RelayoutReport, RelayoutStage, RelayoutTrigger, sprite_factor,
};
pub use error::LayoutError;
pub use history::{DEFAULT_HISTORY_CAPACITY, TransformHistory, TransformSnapshot};
pub use solver::{ScaleChoice, SolvedLayout, centered_offset, solve, solve_scale};
pub use tracker::{
    DerivedLayout, DisasterKind, DisasterState, EntityClass, EntityData, EntityId, EntityTracker,
    LandmarkState, PowerUpKind, PowerUpState, TrackedEntity,
};
pub use transform::{CoordinateTransform, ScreenBounds};
