//! Rendering/collision collaborator seam
//!
//! The layout engine drives the scene graph only through the primitives on
//! [`SceneBackend`]. [`HeadlessScene`] keeps the last value pushed through
//! each primitive, which is all the headless driver and the tests need.

use std::collections::BTreeMap;

use glam::DVec2;

use crate::layout::{CoordinateTransform, EntityClass, EntityId, ScreenBounds};

pub trait SceneBackend {
    /// Create the render object backing a newly tracked entity
    fn create_sprite(&mut self, id: EntityId, class: EntityClass);
    fn destroy_sprite(&mut self, id: EntityId);
    /// False once the render object is gone (destroyed out of band)
    fn is_alive(&self, id: EntityId) -> bool;

    fn set_position(&mut self, id: EntityId, pos: DVec2);
    fn set_display_scale(&mut self, id: EntityId, scale: f64);
    /// Circular body; `offset` is the circle's bounding box offset from the
    /// sprite's top-left corner
    fn set_circle_body(&mut self, id: EntityId, radius: f64, offset: DVec2);
    fn set_world_bounds(&mut self, bounds: ScreenBounds);

    /// Reflow any chrome laid out against the map (controls, HUD)
    fn refresh_ui(&mut self, _transform: &CoordinateTransform) {}
}

/// Last state pushed to a sprite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteState {
    pub class: EntityClass,
    pub position: DVec2,
    pub scale: f64,
    pub body_radius: f64,
    pub body_offset: DVec2,
}

impl SpriteState {
    fn new(class: EntityClass) -> Self {
        Self {
            class,
            position: DVec2::ZERO,
            scale: 1.0,
            body_radius: 0.0,
            body_offset: DVec2::ZERO,
        }
    }
}

/// In-memory scene with no rendering
#[derive(Debug, Clone, Default)]
pub struct HeadlessScene {
    sprites: BTreeMap<EntityId, SpriteState>,
    world_bounds: Option<ScreenBounds>,
    ui_refreshes: u32,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sprite(&self, id: EntityId) -> Option<&SpriteState> {
        self.sprites.get(&id)
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn world_bounds(&self) -> Option<ScreenBounds> {
        self.world_bounds
    }

    pub fn ui_refreshes(&self) -> u32 {
        self.ui_refreshes
    }

    /// Drop a render object without telling the tracker
    pub fn destroy_out_of_band(&mut self, id: EntityId) {
        self.sprites.remove(&id);
    }
}

impl SceneBackend for HeadlessScene {
    fn create_sprite(&mut self, id: EntityId, class: EntityClass) {
        self.sprites.insert(id, SpriteState::new(class));
    }

    fn destroy_sprite(&mut self, id: EntityId) {
        self.sprites.remove(&id);
    }

    fn is_alive(&self, id: EntityId) -> bool {
        self.sprites.contains_key(&id)
    }

    fn set_position(&mut self, id: EntityId, pos: DVec2) {
        if let Some(sprite) = self.sprites.get_mut(&id) {
            sprite.position = pos;
        }
    }

    fn set_display_scale(&mut self, id: EntityId, scale: f64) {
        if let Some(sprite) = self.sprites.get_mut(&id) {
            sprite.scale = scale;
        }
    }

    fn set_circle_body(&mut self, id: EntityId, radius: f64, offset: DVec2) {
        if let Some(sprite) = self.sprites.get_mut(&id) {
            sprite.body_radius = radius;
            sprite.body_offset = offset;
        }
    }

    fn set_world_bounds(&mut self, bounds: ScreenBounds) {
        self.world_bounds = Some(bounds);
    }

    fn refresh_ui(&mut self, _transform: &CoordinateTransform) {
        self.ui_refreshes += 1;
    }
}
