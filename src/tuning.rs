//! Data-driven layout and game constants
//!
//! Every value here is a named, overridable constant. Defaults reproduce the
//! shipped game; tests override single fields with struct update syntax and
//! deployments can ship a JSON file (missing fields fall back to defaults).

use serde::{Deserialize, Deserializer, Serialize};

/// Closed range used for scale clamps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl ScaleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp into the range; the floor wins if the range is inverted
    pub fn clamp(&self, value: f64) -> f64 {
        value.min(self.max).max(self.min)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Device and orientation policy table applied on top of the raw fit scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalePolicy {
    /// Ceiling for windowed non-touch displays (avoids edge clipping)
    pub desktop_ceiling: f64,
    /// Fullscreen ceiling on touch devices
    pub fullscreen_touch_ceiling: f64,
    /// Fullscreen ceiling on non-touch devices
    pub fullscreen_desktop_ceiling: f64,
    /// Per-axis shrink applied before taking the min in touch landscape
    pub landscape_factor_x: f64,
    pub landscape_factor_y: f64,
    pub landscape_range: ScaleRange,
    pub portrait_range: ScaleRange,
}

impl Default for ScalePolicy {
    fn default() -> Self {
        Self {
            desktop_ceiling: 0.98,
            fullscreen_touch_ceiling: 0.98,
            fullscreen_desktop_ceiling: 1.0,
            landscape_factor_x: 0.95,
            landscape_factor_y: 0.90,
            landscape_range: ScaleRange::new(0.5, 1.0),
            portrait_range: ScaleRange::new(0.4, 0.8),
        }
    }
}

/// Per-class sprite scaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScaling {
    /// Lower bound applied to the map scale before sizing the sprite
    pub scale_floor: f64,
    /// Multiplier applied on touch devices held in portrait
    pub portrait_reduction: f64,
    /// Fraction of the displayed sprite covered by the collision circle
    pub body_fraction: f64,
}

impl ClassScaling {
    pub const PLAYER: Self = Self::new(0.6, 0.5, 0.8);
    pub const DISASTER: Self = Self::new(0.7, 0.7, 0.8);
    pub const POWER_UP: Self = Self::new(0.7, 0.6, 1.0);

    pub const fn new(scale_floor: f64, portrait_reduction: f64, body_fraction: f64) -> Self {
        Self {
            scale_floor,
            portrait_reduction,
            body_fraction,
        }
    }
}

/// Partial per-class override; missing fields keep that class's defaults
#[derive(Deserialize)]
struct ClassScalingOverride {
    scale_floor: Option<f64>,
    portrait_reduction: Option<f64>,
    body_fraction: Option<f64>,
}

fn class_scaling_over<'de, D: Deserializer<'de>>(
    deserializer: D,
    base: ClassScaling,
) -> Result<ClassScaling, D::Error> {
    let o = ClassScalingOverride::deserialize(deserializer)?;
    Ok(ClassScaling {
        scale_floor: o.scale_floor.unwrap_or(base.scale_floor),
        portrait_reduction: o.portrait_reduction.unwrap_or(base.portrait_reduction),
        body_fraction: o.body_fraction.unwrap_or(base.body_fraction),
    })
}

fn player_scaling<'de, D: Deserializer<'de>>(d: D) -> Result<ClassScaling, D::Error> {
    class_scaling_over(d, ClassScaling::PLAYER)
}

fn disaster_scaling<'de, D: Deserializer<'de>>(d: D) -> Result<ClassScaling, D::Error> {
    class_scaling_over(d, ClassScaling::DISASTER)
}

fn power_up_scaling<'de, D: Deserializer<'de>>(d: D) -> Result<ClassScaling, D::Error> {
    class_scaling_over(d, ClassScaling::POWER_UP)
}

/// Base display factors per sprite (texture pixels to display pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteFactors {
    pub player: f64,
    pub meteor: f64,
    pub storm: f64,
    pub flood: f64,
    pub freeze: f64,
    pub shield: f64,
}

impl Default for SpriteFactors {
    fn default() -> Self {
        Self {
            player: 0.15,
            meteor: 0.2,
            storm: 0.15,
            flood: 0.2,
            freeze: 0.12,
            shield: 0.1,
        }
    }
}

/// Constants consumed by the layout engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutTuning {
    pub policy: ScalePolicy,
    #[serde(deserialize_with = "player_scaling")]
    pub player: ClassScaling,
    #[serde(deserialize_with = "disaster_scaling")]
    pub disaster: ClassScaling,
    #[serde(deserialize_with = "power_up_scaling")]
    pub power_up: ClassScaling,
    pub sprites: SpriteFactors,
    /// Landmark hitbox radius at scale 1.0 (screen pixels)
    pub landmark_radius: f64,
    /// Landmark hitbox never shrinks below this (screen pixels)
    pub landmark_min_radius: f64,
    /// Landmark dot overlay radius at scale 1.0
    pub dot_radius: f64,
    /// Smallest collision circle any sprite may get (screen pixels)
    pub min_body_radius: f64,
    /// Debounce window for viewport events (milliseconds)
    pub debounce_ms: f64,
    /// Number of previous transforms kept for rollback
    pub history_capacity: usize,
    /// Rounding slack allowed when checking the map fits the viewport
    pub bounds_tolerance: f64,
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self {
            policy: ScalePolicy::default(),
            player: ClassScaling::PLAYER,
            disaster: ClassScaling::DISASTER,
            power_up: ClassScaling::POWER_UP,
            sprites: SpriteFactors::default(),
            landmark_radius: 40.0,
            landmark_min_radius: 20.0,
            dot_radius: 4.0,
            min_body_radius: 4.0,
            debounce_ms: 300.0,
            history_capacity: 10,
            bounds_tolerance: 1.0,
        }
    }
}

/// Gameplay constants (logical units and seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    pub round_secs: f64,
    /// Player speed in logical units per second
    pub player_speed: f64,
    /// Disaster speed range before the difficulty multiplier
    pub disaster_speed_min: f64,
    pub disaster_speed_max: f64,
    /// Disasters spawn this far outside the map edge
    pub spawn_margin: f64,
    /// Disasters further than this outside the map are removed
    pub despawn_margin: f64,
    /// Freeze power-ups keep this far from the map edge
    pub power_up_margin: f64,
    pub power_up_lifetime_secs: f64,
    pub freeze_duration_secs: f64,
    pub freeze_interval_secs: f64,
    pub freeze_cooldown_secs: f64,
    pub shield_interval_secs: f64,
    pub shield_cooldown_secs: f64,
    /// Max distance of a shield power-up from its landmark, per axis
    pub shield_offset: f64,
    pub score_save: i64,
    pub score_block: i64,
    pub penalty_destroyed: i64,
    pub perfect_bonus: i64,
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            round_secs: 60.0,
            player_speed: 200.0,
            disaster_speed_min: 80.0,
            disaster_speed_max: 200.0,
            spawn_margin: 50.0,
            despawn_margin: 60.0,
            power_up_margin: 100.0,
            power_up_lifetime_secs: 15.0,
            freeze_duration_secs: 5.0,
            freeze_interval_secs: 8.0,
            freeze_cooldown_secs: 10.0,
            shield_interval_secs: 6.0,
            shield_cooldown_secs: 8.0,
            shield_offset: 50.0,
            score_save: 50,
            score_block: 10,
            penalty_destroyed: 20,
            perfect_bonus: 100,
        }
    }
}

/// All tunables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub layout: LayoutTuning,
    pub game: GameTuning,
}

impl Tuning {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from a JSON file, falling back to defaults
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path.display());
                    tuning
                }
                Err(e) => {
                    log::warn!("Ignoring malformed tuning file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default tuning");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning =
            Tuning::from_json(r#"{ "layout": { "debounce_ms": 200.0 }, "game": { "round_secs": 30.0 } }"#)
                .unwrap();
        assert_eq!(tuning.layout.debounce_ms, 200.0);
        assert_eq!(tuning.layout.history_capacity, 10);
        assert_eq!(tuning.layout.policy.desktop_ceiling, 0.98);
        assert_eq!(tuning.game.round_secs, 30.0);
        assert_eq!(tuning.game.score_save, 50);
    }

    #[test]
    fn test_partial_class_scaling_keeps_class_defaults() {
        let tuning = Tuning::from_json(
            r#"{ "layout": { "player": { "scale_floor": 0.5 }, "power_up": { "body_fraction": 0.9 } } }"#,
        )
        .unwrap();
        assert_eq!(tuning.layout.player, ClassScaling::new(0.5, 0.5, 0.8));
        assert_eq!(tuning.layout.power_up, ClassScaling::new(0.7, 0.6, 0.9));
        assert_eq!(tuning.layout.disaster, ClassScaling::DISASTER);
    }

    #[test]
    fn test_scale_range_clamp() {
        let r = ScaleRange::new(0.4, 0.8);
        assert_eq!(r.clamp(0.1), 0.4);
        assert_eq!(r.clamp(0.9), 0.8);
        assert_eq!(r.clamp(0.5), 0.5);
        assert!(r.contains(0.4));
        assert!(!r.contains(0.81));
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(Tuning::from_json("{}").unwrap(), Tuning::default());
    }
}
