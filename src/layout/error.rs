//! Layout failure taxonomy
//!
//! None of these are fatal. Every failure degrades to keeping the last good
//! layout on screen.

use glam::DVec2;
use thiserror::Error;

use super::tracker::EntityId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// The solver produced a non-finite, zero or negative scale
    #[error("scale solver failed for viewport {viewport}: scale {scale}")]
    SolverFailure { viewport: DVec2, scale: f64 },

    /// Screen to map conversion attempted before the transform is ready
    #[error("transform not ready: scale must be positive")]
    ConversionFailure,

    /// A tracked entity lost its render object before the pass reached it
    #[error("entity {id} has no live render object")]
    TrackingInconsistency { id: EntityId },

    /// Rollback requested with nothing recorded
    #[error("nothing to restore")]
    HistoryUnderflow,

    /// Base map size must be finite and positive
    #[error("invalid base map size {0}")]
    InvalidBaseSize(DVec2),

    /// Explicit rollback requested while a relayout pass is in flight
    #[error("relayout in progress")]
    RelayoutInProgress,

    /// Base map size is fixed after the first initialization
    #[error("base map size already initialized")]
    BaseSizeLocked,
}
