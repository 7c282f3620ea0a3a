//! Platform abstraction layer
//!
//! The layout engine pulls viewport and device facts on demand through
//! [`ViewportSource`]. A host (browser shell, native window, test) owns the
//! real event subscriptions and forwards triggers to the layout coordinator.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Orientation of the physical viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Viewport and device facts, recomputed on every viewport change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub is_touch: bool,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub is_fullscreen: bool,
}

impl DeviceContext {
    pub fn desktop(width: f64, height: f64) -> Self {
        Self {
            is_touch: false,
            viewport_width: width,
            viewport_height: height,
            is_fullscreen: false,
        }
    }

    pub fn touch(width: f64, height: f64) -> Self {
        Self {
            is_touch: true,
            viewport_width: width,
            viewport_height: height,
            is_fullscreen: false,
        }
    }

    pub fn fullscreen(mut self, on: bool) -> Self {
        self.is_fullscreen = on;
        self
    }

    #[inline]
    pub fn viewport(&self) -> DVec2 {
        DVec2::new(self.viewport_width, self.viewport_height)
    }

    /// Portrait when strictly taller than wide
    pub fn orientation(&self) -> Orientation {
        if self.viewport_height > self.viewport_width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }

    pub fn is_portrait(&self) -> bool {
        self.orientation() == Orientation::Portrait
    }

    /// Sprite reductions only apply to touch devices held upright
    pub fn wants_portrait_reduction(&self) -> bool {
        self.is_touch && self.is_portrait()
    }
}

/// Pull-on-demand source of the current device context
pub trait ViewportSource {
    fn device_context(&self) -> DeviceContext;
}

/// A viewport whose facts are set directly by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedViewport {
    pub context: DeviceContext,
}

impl FixedViewport {
    pub fn new(context: DeviceContext) -> Self {
        Self { context }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.context.viewport_width = width;
        self.context.viewport_height = height;
    }

    /// Swap width and height, as a device rotation does
    pub fn rotate(&mut self) {
        let ctx = &mut self.context;
        std::mem::swap(&mut ctx.viewport_width, &mut ctx.viewport_height);
    }

    pub fn set_fullscreen(&mut self, on: bool) {
        self.context.is_fullscreen = on;
    }
}

impl ViewportSource for FixedViewport {
    fn device_context(&self) -> DeviceContext {
        self.context
    }
}
