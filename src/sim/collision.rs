//! Collision detection and response
//!
//! Every body is a circle centered on the entity's position. Overlaps are
//! tested in logical space; the screen radii written by the layout engine
//! are converted back with the current scale.

use glam::DVec2;

use super::state::{GameEvent, GameState};
use crate::distance;
use crate::layout::{EntityClass, EntityId, PowerUpKind, TrackedEntity};

/// Circle overlap test (touching counts)
#[inline]
pub fn circles_overlap(a: DVec2, ra: f64, b: DVec2, rb: f64) -> bool {
    distance(a, b) <= ra + rb
}

/// Body radius of a laid out entity in logical units.
///
/// None until the entity has screen attributes or while the scale is not
/// usable; such entities cannot collide yet.
pub fn logical_radius(entry: &TrackedEntity, scale: f64) -> Option<f64> {
    let derived = entry.derived();
    if !derived.laid_out || !(scale > 0.0) || derived.body_radius <= 0.0 {
        return None;
    }
    Some(derived.body_radius / scale)
}

#[derive(Debug, Clone, Copy)]
struct Body {
    id: EntityId,
    pos: DVec2,
    radius: f64,
}

fn bodies(state: &GameState, class: EntityClass, scale: f64) -> Vec<Body> {
    state
        .tracker
        .iter_class(class)
        .filter_map(|e| {
            logical_radius(e, scale).map(|radius| Body {
                id: e.id,
                pos: e.logical,
                radius,
            })
        })
        .collect()
}

fn overlaps(a: &Body, b: &Body) -> bool {
    circles_overlap(a.pos, a.radius, b.pos, b.radius)
}

/// Resolve every overlap for this tick, in order: player saves landmarks,
/// disasters hit landmarks, player blocks disasters, player collects power-ups.
pub fn resolve_collisions(state: &mut GameState, scale: f64) {
    let player = state
        .tracker
        .get(state.player)
        .and_then(|e| logical_radius(e, scale).map(|radius| Body { id: e.id, pos: e.logical, radius }));
    let landmarks = bodies(state, EntityClass::Landmark, scale);

    if let Some(player) = &player {
        for landmark in landmarks.iter().filter(|l| overlaps(player, l)) {
            save_landmark(state, landmark);
        }
    }

    let mut consumed = Vec::new();
    for disaster in bodies(state, EntityClass::Disaster, scale) {
        if let Some(landmark) = landmarks.iter().find(|l| overlaps(&disaster, l)) {
            hit_landmark(state, landmark);
            consumed.push(disaster.id);
        } else if player.as_ref().is_some_and(|p| overlaps(p, &disaster)) {
            state.score += state.tuning.score_block;
            state.events.push(GameEvent::DisasterBlocked { pos: disaster.pos });
            consumed.push(disaster.id);
        }
    }
    for id in consumed {
        state.tracker.untrack(id);
    }

    if let Some(player) = &player {
        for power_up in bodies(state, EntityClass::PowerUp, scale) {
            if overlaps(player, &power_up) {
                collect_power_up(state, &power_up);
            }
        }
    }
}

fn save_landmark(state: &mut GameState, landmark: &Body) {
    let Some(data) = state.tracker.get_mut(landmark.id).and_then(|e| e.landmark_mut()) else {
        return;
    };
    if data.saved {
        return;
    }
    data.saved = true;
    data.destroyed = false;
    state.score += state.tuning.score_save;
    state.events.push(GameEvent::LandmarkSaved {
        landmark: landmark.id,
        pos: landmark.pos,
    });
}

fn hit_landmark(state: &mut GameState, landmark: &Body) {
    let Some(data) = state.tracker.get_mut(landmark.id).and_then(|e| e.landmark_mut()) else {
        return;
    };
    if data.destroyed {
        return;
    }
    if data.has_shield {
        data.has_shield = false;
        state.events.push(GameEvent::ShieldAbsorbed {
            landmark: landmark.id,
            pos: landmark.pos,
        });
        return;
    }

    let penalized = !data.saved;
    data.destroyed = true;
    data.saved = false;
    if penalized {
        state.score -= state.tuning.penalty_destroyed;
    }
    state.events.push(GameEvent::LandmarkDestroyed {
        landmark: landmark.id,
        pos: landmark.pos,
        penalized,
    });
}

fn collect_power_up(state: &mut GameState, body: &Body) {
    let Some(power_up) = state.tracker.untrack(body.id).and_then(|e| e.power_up().copied()) else {
        return;
    };
    match power_up.kind {
        PowerUpKind::Freeze => {
            state.freeze_left = state.tuning.freeze_duration_secs;
        }
        PowerUpKind::Shield => {
            let target = power_up
                .target_landmark
                .and_then(|id| state.tracker.get_mut(id))
                .and_then(|e| e.landmark_mut());
            if let Some(landmark) = target {
                landmark.has_shield = true;
            }
        }
    }
    state.events.push(GameEvent::PowerUpCollected {
        kind: power_up.kind,
        pos: body.pos,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DerivedLayout, DisasterKind, LayoutCoordinator, RelayoutTrigger};
    use crate::platform::{DeviceContext, FixedViewport};
    use crate::scene::{HeadlessScene, SceneBackend};
    use crate::settings::Difficulty;
    use crate::tuning::{GameTuning, LayoutTuning};

    /// Game state with every entity laid out at 1280x800 (scale 0.98)
    struct World {
        state: GameState,
        coordinator: LayoutCoordinator,
        scene: HeadlessScene,
    }

    impl World {
        fn new() -> Self {
            let mut state = GameState::new(3, Difficulty::Medium, GameTuning::default(), DVec2::new(1200.0, 800.0));
            state.start_round();
            let mut coordinator = LayoutCoordinator::new(LayoutTuning::default());
            coordinator.initialize_map(1200.0, 800.0).unwrap();
            let mut world = Self {
                state,
                coordinator,
                scene: HeadlessScene::new(),
            };
            world.sync();
            let viewport = FixedViewport::new(DeviceContext::desktop(1280.0, 800.0));
            world.coordinator.relayout_now(
                RelayoutTrigger::InitialLoad,
                0.0,
                &viewport,
                &mut world.state.tracker,
                &mut world.scene,
            );
            world
        }

        fn sync(&mut self) {
            for id in self.state.tracker.drain_spawned() {
                if let Some(e) = self.state.tracker.get(id) {
                    self.scene.create_sprite(id, e.class());
                }
            }
            for id in self.state.tracker.drain_removed() {
                self.scene.destroy_sprite(id);
            }
            self.coordinator.sync_entities(&mut self.state.tracker, &mut self.scene);
        }

        fn scale(&self) -> f64 {
            self.coordinator.transform().scale()
        }

        fn move_player(&mut self, pos: DVec2) {
            self.state.tracker.get_mut(self.state.player).unwrap().logical = pos;
        }
    }

    #[test]
    fn test_circles_overlap() {
        assert!(circles_overlap(DVec2::ZERO, 1.0, DVec2::new(2.0, 0.0), 1.0));
        assert!(!circles_overlap(DVec2::ZERO, 1.0, DVec2::new(2.1, 0.0), 1.0));
    }

    #[test]
    fn test_unlaid_entity_has_no_radius() {
        let mut state = GameState::new(1, Difficulty::Easy, GameTuning::default(), DVec2::new(1200.0, 800.0));
        let id = state.spawn_disaster(DisasterKind::Meteor, DVec2::ZERO, DVec2::X);
        let entry = state.tracker.get(id).unwrap();
        assert_eq!(*entry.derived(), DerivedLayout::default());
        assert_eq!(logical_radius(entry, 1.0), None);
    }

    #[test]
    fn test_player_saves_landmark_once() {
        let mut world = World::new();
        let lm = world.state.landmarks[0];
        world.move_player(DVec2::new(139.0, 207.0));
        let scale = world.scale();
        resolve_collisions(&mut world.state, scale);
        resolve_collisions(&mut world.state, scale);
        assert_eq!(world.state.score, 50);
        assert!(world.state.landmark(lm).unwrap().saved);
        assert_eq!(world.state.saved_count(), 1);
    }

    #[test]
    fn test_disaster_destroys_unsaved_landmark() {
        let mut world = World::new();
        let lm = world.state.landmarks[12];
        let d = world
            .state
            .spawn_disaster(DisasterKind::Flood, DVec2::new(859.0, 378.0), DVec2::X);
        world.sync();
        let scale = world.scale();
        resolve_collisions(&mut world.state, scale);
        assert_eq!(world.state.score, -20);
        assert!(world.state.landmark(lm).unwrap().destroyed);
        assert!(!world.state.tracker.contains(d));

        // Already destroyed: the disaster is consumed without another penalty
        world
            .state
            .spawn_disaster(DisasterKind::Flood, DVec2::new(859.0, 378.0), DVec2::X);
        world.sync();
        resolve_collisions(&mut world.state, scale);
        assert_eq!(world.state.score, -20);
        assert_eq!(world.state.tracker.count_of_class(EntityClass::Disaster), 0);
    }

    #[test]
    fn test_saved_landmark_loses_saved_flag_without_penalty() {
        let mut world = World::new();
        let lm = world.state.landmarks[5];
        world.state.tracker.get_mut(lm).unwrap().landmark_mut().unwrap().saved = true;
        world
            .state
            .spawn_disaster(DisasterKind::Storm, DVec2::new(399.0, 445.0), DVec2::Y);
        world.sync();
        let scale = world.scale();
        resolve_collisions(&mut world.state, scale);
        let data = world.state.landmark(lm).unwrap();
        assert!(data.destroyed);
        assert!(!data.saved);
        assert_eq!(world.state.score, 0);
    }

    #[test]
    fn test_shield_absorbs_one_hit() {
        let mut world = World::new();
        let lm = world.state.landmarks[1];
        world.state.tracker.get_mut(lm).unwrap().landmark_mut().unwrap().has_shield = true;
        world
            .state
            .spawn_disaster(DisasterKind::Meteor, DVec2::new(413.0, 132.0), DVec2::X);
        world.sync();
        let scale = world.scale();
        resolve_collisions(&mut world.state, scale);
        let data = world.state.landmark(lm).unwrap();
        assert!(!data.has_shield);
        assert!(!data.destroyed);
        assert_eq!(world.state.score, 0);
        assert!(world
            .state
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::ShieldAbsorbed { .. })));
    }

    #[test]
    fn test_player_blocks_disaster() {
        let mut world = World::new();
        // Far from every landmark
        world.move_player(DVec2::new(1100.0, 700.0));
        world
            .state
            .spawn_disaster(DisasterKind::Meteor, DVec2::new(1110.0, 700.0), DVec2::X);
        world.sync();
        let scale = world.scale();
        resolve_collisions(&mut world.state, scale);
        assert_eq!(world.state.score, 10);
        assert_eq!(world.state.tracker.count_of_class(EntityClass::Disaster), 0);
    }

    #[test]
    fn test_collect_freeze_and_shield() {
        let mut world = World::new();
        let lm = world.state.landmarks[2];
        world.move_player(DVec2::new(1100.0, 700.0));
        world
            .state
            .spawn_power_up(PowerUpKind::Freeze, DVec2::new(1100.0, 705.0), None);
        world
            .state
            .spawn_power_up(PowerUpKind::Shield, DVec2::new(1095.0, 700.0), Some(lm));
        world.sync();
        let scale = world.scale();
        resolve_collisions(&mut world.state, scale);
        assert_eq!(world.state.freeze_left, 5.0);
        assert!(world.state.landmark(lm).unwrap().has_shield);
        assert_eq!(world.state.tracker.count_of_class(EntityClass::PowerUp), 0);
    }

    #[test]
    fn test_block_at_two_scales() {
        let mut results = Vec::new();
        for (w, h) in [(1280.0, 800.0), (600.0, 400.0)] {
            let mut world = World::new();
            let viewport = FixedViewport::new(DeviceContext::desktop(w, h));
            world.coordinator.relayout_now(
                RelayoutTrigger::Resize,
                1000.0,
                &viewport,
                &mut world.state.tracker,
                &mut world.scene,
            );
            world.move_player(DVec2::new(1100.0, 700.0));
            world
                .state
                .spawn_disaster(DisasterKind::Meteor, DVec2::new(1125.0, 700.0), DVec2::X);
            world.sync();
            let scale = world.scale();
            resolve_collisions(&mut world.state, scale);
            results.push(world.state.score);
        }
        assert_eq!(results[0], results[1]);
    }
}
