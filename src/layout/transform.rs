//! Logical (map) to screen coordinate transform
//!
//! The transform is a uniform scale plus a translation:
//! `screen = offset + logical * scale`. It carries the logical base map size
//! so bounds queries need no other context.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::error::LayoutError;
use crate::consts::{DEFAULT_MAP_HEIGHT, DEFAULT_MAP_WIDTH};
use crate::{distance, is_finite_vec};

/// Screen-space rectangle occupied by the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl ScreenBounds {
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn min(&self) -> DVec2 {
        DVec2::new(self.left, self.top)
    }

    pub fn max(&self) -> DVec2 {
        DVec2::new(self.right, self.bottom)
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Clamp a screen point into the rectangle
    pub fn clamp(&self, p: DVec2) -> DVec2 {
        DVec2::new(
            p.x.max(self.left).min(self.right),
            p.y.max(self.top).min(self.bottom),
        )
    }

    /// Check that the rectangle lies within `[0, viewport]`, allowing
    /// `tolerance` units of rounding slack on every edge.
    pub fn fits_within(&self, viewport: DVec2, tolerance: f64) -> bool {
        self.left >= -tolerance
            && self.top >= -tolerance
            && self.right <= viewport.x + tolerance
            && self.bottom <= viewport.y + tolerance
    }
}

/// Uniform scale + offset mapping logical map units to screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    scale: f64,
    offset: DVec2,
    base_size: DVec2,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::provisional()
    }
}

impl CoordinateTransform {
    /// Placeholder used before the map asset's real size is known.
    ///
    /// Scale is zero, so `screen_to_map` reports "not ready" until the first
    /// relayout applies a real scale.
    pub fn provisional() -> Self {
        Self {
            scale: 0.0,
            offset: DVec2::ZERO,
            base_size: DVec2::new(DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT),
        }
    }

    pub fn new(base_size: DVec2, scale: f64, offset: DVec2) -> Self {
        Self {
            scale,
            offset,
            base_size,
        }
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn offset(&self) -> DVec2 {
        self.offset
    }

    #[inline]
    pub fn base_size(&self) -> DVec2 {
        self.base_size
    }

    /// True once a positive, finite scale and finite offsets are in place
    pub fn is_ready(&self) -> bool {
        self.scale > 0.0 && self.scale.is_finite() && is_finite_vec(self.offset)
    }

    /// Layout-only mutation: replace scale and offset
    pub(super) fn update(&mut self, scale: f64, offset: DVec2) {
        self.scale = scale;
        self.offset = offset;
    }

    /// Layout-only mutation: set the real base map size
    pub(super) fn set_base_size(&mut self, base_size: DVec2) {
        self.base_size = base_size;
    }

    #[inline]
    pub fn map_to_screen(&self, logical: DVec2) -> DVec2 {
        self.offset + logical * self.scale
    }

    /// Inverse of [`map_to_screen`](Self::map_to_screen).
    ///
    /// Fails with [`LayoutError::ConversionFailure`] while the scale is not
    /// positive; callers should treat that as "not ready" and defer.
    pub fn screen_to_map(&self, screen: DVec2) -> Result<DVec2, LayoutError> {
        if !(self.scale > 0.0) {
            return Err(LayoutError::ConversionFailure);
        }
        Ok((screen - self.offset) / self.scale)
    }

    /// Convert a screen-space length (radius, speed) to logical units
    pub fn screen_len_to_map(&self, len: f64) -> Result<f64, LayoutError> {
        if !(self.scale > 0.0) {
            return Err(LayoutError::ConversionFailure);
        }
        Ok(len / self.scale)
    }

    pub fn is_within_bounds(&self, logical: DVec2) -> bool {
        logical.x >= 0.0
            && logical.x <= self.base_size.x
            && logical.y >= 0.0
            && logical.y <= self.base_size.y
    }

    /// Clamp each axis independently to the map
    pub fn clamp_to_bounds(&self, logical: DVec2) -> DVec2 {
        DVec2::new(
            logical.x.max(0.0).min(self.base_size.x),
            logical.y.max(0.0).min(self.base_size.y),
        )
    }

    pub fn screen_bounds(&self) -> ScreenBounds {
        ScreenBounds {
            left: self.offset.x,
            top: self.offset.y,
            right: self.offset.x + self.base_size.x * self.scale,
            bottom: self.offset.y + self.base_size.y * self.scale,
        }
    }

    /// Distance between two logical points, in logical units
    pub fn map_distance(&self, a: DVec2, b: DVec2) -> f64 {
        distance(a, b)
    }

    /// Distance between two screen points, in pixels.
    ///
    /// Not comparable with [`map_distance`](Self::map_distance) unless one
    /// side is converted first.
    pub fn screen_distance(&self, a: DVec2, b: DVec2) -> f64 {
        distance(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn desktop() -> CoordinateTransform {
        CoordinateTransform::new(DVec2::new(1200.0, 800.0), 0.98, DVec2::new(52.0, 8.0))
    }

    #[test]
    fn test_map_to_screen_landmark() {
        let t = desktop();
        let p = t.map_to_screen(DVec2::new(139.0, 207.0));
        assert!((p.x - (52.0 + 139.0 * 0.98)).abs() < 1e-9);
        assert!((p.y - (8.0 + 207.0 * 0.98)).abs() < 1e-9);
        assert!((p.x - 188.22).abs() < 0.01);
        assert!((p.y - 210.86).abs() < 0.01);
    }

    #[test]
    fn test_screen_to_map_not_ready() {
        let t = CoordinateTransform::provisional();
        assert!(!t.is_ready());
        assert_eq!(
            t.screen_to_map(DVec2::new(10.0, 10.0)),
            Err(LayoutError::ConversionFailure)
        );
    }

    #[test]
    fn test_bounds_and_clamp() {
        let t = desktop();
        assert!(t.is_within_bounds(DVec2::new(0.0, 0.0)));
        assert!(t.is_within_bounds(DVec2::new(1200.0, 800.0)));
        assert!(!t.is_within_bounds(DVec2::new(-0.1, 10.0)));
        assert!(!t.is_within_bounds(DVec2::new(10.0, 800.5)));

        let c = t.clamp_to_bounds(DVec2::new(-50.0, 900.0));
        assert_eq!(c, DVec2::new(0.0, 800.0));
        let c = t.clamp_to_bounds(DVec2::new(600.0, -1.0));
        assert_eq!(c, DVec2::new(600.0, 0.0));
    }

    #[test]
    fn test_screen_bounds() {
        let b = desktop().screen_bounds();
        assert_eq!(b.left, 52.0);
        assert_eq!(b.top, 8.0);
        assert!((b.right - (52.0 + 1176.0)).abs() < 1e-9);
        assert!((b.bottom - (8.0 + 784.0)).abs() < 1e-9);
        assert!(b.fits_within(DVec2::new(1280.0, 800.0), 1.0));
        assert!(!b.fits_within(DVec2::new(1200.0, 800.0), 1.0));
    }

    #[test]
    fn test_distances_same_formula() {
        let t = desktop();
        let a = DVec2::new(0.0, 0.0);
        let b = DVec2::new(3.0, 4.0);
        assert_eq!(t.map_distance(a, b), 5.0);
        assert_eq!(t.screen_distance(a, b), 5.0);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            scale in 0.01f64..4.0,
            ox in -500.0f64..500.0,
            oy in -500.0f64..500.0,
            fx in 0.0f64..=1.0,
            fy in 0.0f64..=1.0,
        ) {
            let base = DVec2::new(1200.0, 800.0);
            let t = CoordinateTransform::new(base, scale, DVec2::new(ox, oy));
            let logical = DVec2::new(fx * base.x, fy * base.y);
            let back = t.screen_to_map(t.map_to_screen(logical)).unwrap();
            prop_assert!((back.x - logical.x).abs() < 1e-6);
            prop_assert!((back.y - logical.y).abs() < 1e-6);
        }

        #[test]
        fn prop_clamped_points_are_within_bounds(x in -5000.0f64..5000.0, y in -5000.0f64..5000.0) {
            let t = desktop();
            prop_assert!(t.is_within_bounds(t.clamp_to_bounds(DVec2::new(x, y))));
        }
    }
}
