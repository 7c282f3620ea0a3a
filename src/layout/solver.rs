//! Optimal map scale for a viewport
//!
//! Pure functions. The fit constraint `min(vw / bw, vh / bh)` keeps the whole
//! map visible; a device/orientation policy then adjusts it. Only the touch
//! floors may push the scale above the fit (a phone held upright is far
//! narrower than the landscape map), and the result says so.

use glam::DVec2;

use super::error::LayoutError;
use crate::platform::DeviceContext;
use crate::tuning::ScalePolicy;
use crate::{is_finite_vec, min_axis};

/// Outcome of the scale policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleChoice {
    pub scale: f64,
    /// Largest scale at which the map fits the viewport
    pub fit_scale: f64,
    /// A device floor raised the scale above the fit (the map overflows)
    pub floor_overrides_fit: bool,
}

/// A full solution: scale plus centering offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolvedLayout {
    pub scale: f64,
    pub offset: DVec2,
    pub floor_overrides_fit: bool,
}

fn failure(viewport: DVec2, scale: f64) -> LayoutError {
    LayoutError::SolverFailure { viewport, scale }
}

/// Pick the map scale for a device context
pub fn solve_scale(
    device: &DeviceContext,
    base: DVec2,
    policy: &ScalePolicy,
) -> Result<ScaleChoice, LayoutError> {
    let viewport = device.viewport();
    if !is_finite_vec(viewport) || viewport.x <= 0.0 || viewport.y <= 0.0 {
        return Err(failure(viewport, f64::NAN));
    }
    if !is_finite_vec(base) || base.x <= 0.0 || base.y <= 0.0 {
        return Err(failure(viewport, f64::NAN));
    }

    let axis = viewport / base;
    let fit_scale = min_axis(axis);

    let scale = if device.is_fullscreen {
        let ceiling = if device.is_touch {
            policy.fullscreen_touch_ceiling
        } else {
            policy.fullscreen_desktop_ceiling
        };
        fit_scale.min(ceiling)
    } else if !device.is_touch {
        fit_scale.min(policy.desktop_ceiling)
    } else if device.is_portrait() {
        policy.portrait_range.clamp(fit_scale)
    } else {
        let shrunk = (axis.x * policy.landscape_factor_x).min(axis.y * policy.landscape_factor_y);
        policy.landscape_range.clamp(shrunk)
    };

    if !scale.is_finite() || scale <= 0.0 {
        return Err(failure(viewport, scale));
    }

    Ok(ScaleChoice {
        scale,
        fit_scale,
        floor_overrides_fit: scale > fit_scale,
    })
}

/// Offset that centers the scaled map in the viewport
#[inline]
pub fn centered_offset(scale: f64, viewport: DVec2, base: DVec2) -> DVec2 {
    DVec2::new(
        (viewport.x - base.x * scale) / 2.0,
        (viewport.y - base.y * scale) / 2.0,
    )
}

/// Solve scale and centering offset together
pub fn solve(
    device: &DeviceContext,
    base: DVec2,
    policy: &ScalePolicy,
) -> Result<SolvedLayout, LayoutError> {
    let choice = solve_scale(device, base, policy)?;
    let offset = centered_offset(choice.scale, device.viewport(), base);
    if !is_finite_vec(offset) {
        return Err(failure(device.viewport(), choice.scale));
    }
    Ok(SolvedLayout {
        scale: choice.scale,
        offset,
        floor_overrides_fit: choice.floor_overrides_fit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CoordinateTransform;
    use proptest::prelude::*;

    const BASE: DVec2 = DVec2::new(1200.0, 800.0);

    fn policy() -> ScalePolicy {
        ScalePolicy::default()
    }

    #[test]
    fn test_desktop_scenario() {
        let solved = solve(&DeviceContext::desktop(1280.0, 800.0), BASE, &policy()).unwrap();
        assert_eq!(solved.scale, 0.98);
        assert!((solved.offset.x - 52.0).abs() < 1e-9);
        assert!((solved.offset.y - 8.0).abs() < 1e-9);
        assert!(!solved.floor_overrides_fit);
    }

    #[test]
    fn test_desktop_below_ceiling_is_uncapped() {
        let solved = solve(&DeviceContext::desktop(600.0, 800.0), BASE, &policy()).unwrap();
        assert_eq!(solved.scale, 0.5);
        assert_eq!(solved.offset, DVec2::new(0.0, 200.0));
    }

    #[test]
    fn test_touch_portrait_clamp() {
        let choice = solve_scale(&DeviceContext::touch(390.0, 844.0), BASE, &policy()).unwrap();
        assert!(choice.scale >= 0.4 && choice.scale <= 0.8);
        assert_eq!(choice.scale, 0.4);
        assert!(choice.floor_overrides_fit);
    }

    #[test]
    fn test_touch_landscape_clamp() {
        let choice = solve_scale(&DeviceContext::touch(844.0, 390.0), BASE, &policy()).unwrap();
        assert!(choice.scale >= 0.5 && choice.scale <= 1.0);
    }

    #[test]
    fn test_touch_landscape_uses_axis_factors() {
        // Tablet: 1600x1000, axis 1.333/1.25 -> min(1.2667, 1.125) = 1.125 -> clamped to 1.0
        let choice = solve_scale(&DeviceContext::touch(1600.0, 1000.0), BASE, &policy()).unwrap();
        assert_eq!(choice.scale, 1.0);
        // 1000x700: axis 0.8333/0.875 -> min(0.7917, 0.7875) = 0.7875
        let choice = solve_scale(&DeviceContext::touch(1000.0, 700.0), BASE, &policy()).unwrap();
        assert!((choice.scale - 0.7875).abs() < 1e-12);
    }

    #[test]
    fn test_fullscreen_overrides_orientation() {
        let ctx = DeviceContext::touch(390.0, 844.0).fullscreen(true);
        let choice = solve_scale(&ctx, BASE, &policy()).unwrap();
        assert!((choice.scale - 0.325).abs() < 1e-12);
        assert!(!choice.floor_overrides_fit);

        let ctx = DeviceContext::desktop(2400.0, 1600.0).fullscreen(true);
        assert_eq!(solve_scale(&ctx, BASE, &policy()).unwrap().scale, 1.0);

        let ctx = DeviceContext::touch(2400.0, 1600.0).fullscreen(true);
        assert_eq!(solve_scale(&ctx, BASE, &policy()).unwrap().scale, 0.98);
    }

    #[test]
    fn test_very_small_viewport_stays_positive() {
        for ctx in [
            DeviceContext::touch(20.0, 40.0),
            DeviceContext::touch(40.0, 20.0),
            DeviceContext::desktop(3.0, 2.0),
            DeviceContext::desktop(1.0, 1.0).fullscreen(true),
        ] {
            let solved = solve(&ctx, BASE, &policy()).unwrap();
            assert!(solved.scale > 0.0, "{:?}", ctx);
        }
        // Floors win on touch
        let choice = solve_scale(&DeviceContext::touch(20.0, 40.0), BASE, &policy()).unwrap();
        assert_eq!(choice.scale, 0.4);
    }

    #[test]
    fn test_degenerate_viewport_fails() {
        for ctx in [
            DeviceContext::desktop(0.0, 800.0),
            DeviceContext::touch(0.0, 0.0),
            DeviceContext::desktop(f64::NAN, 800.0),
            DeviceContext::desktop(-10.0, 800.0),
        ] {
            assert!(matches!(
                solve(&ctx, BASE, &policy()),
                Err(LayoutError::SolverFailure { .. })
            ));
        }
    }

    #[test]
    fn test_zero_ceiling_fails() {
        let mut p = policy();
        p.desktop_ceiling = 0.0;
        assert!(matches!(
            solve_scale(&DeviceContext::desktop(800.0, 600.0), BASE, &p),
            Err(LayoutError::SolverFailure { .. })
        ));
    }

    fn any_device() -> impl Strategy<Value = DeviceContext> {
        (1.0f64..4000.0, 1.0f64..4000.0, any::<bool>(), any::<bool>()).prop_map(|(w, h, touch, full)| {
            DeviceContext {
                is_touch: touch,
                viewport_width: w,
                viewport_height: h,
                is_fullscreen: full,
            }
        })
    }

    proptest! {
        #[test]
        fn prop_containment(device in any_device()) {
            let solved = solve(&device, BASE, &policy()).unwrap();
            prop_assert!(solved.scale > 0.0);
            let t = CoordinateTransform::new(BASE, solved.scale, solved.offset);
            let fits = t.screen_bounds().fits_within(device.viewport(), 1.0);
            // Only a touch floor may overflow the viewport
            prop_assert!(fits || solved.floor_overrides_fit);
            if !device.is_touch || device.is_fullscreen {
                prop_assert!(fits);
            }
        }

        #[test]
        fn prop_centering_exact(device in any_device()) {
            let solved = solve(&device, BASE, &policy()).unwrap();
            prop_assert_eq!(solved.offset.x, (device.viewport_width - BASE.x * solved.scale) / 2.0);
            prop_assert_eq!(solved.offset.y, (device.viewport_height - BASE.y * solved.scale) / 2.0);
        }

        #[test]
        fn prop_touch_ranges(w in 1.0f64..4000.0, h in 1.0f64..4000.0) {
            let ctx = DeviceContext::touch(w, h);
            let scale = solve_scale(&ctx, BASE, &policy()).unwrap().scale;
            if ctx.is_portrait() {
                prop_assert!(policy().portrait_range.contains(scale));
            } else {
                prop_assert!(policy().landscape_range.contains(scale));
            }
        }
    }
}
