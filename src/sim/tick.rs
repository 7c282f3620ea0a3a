//! Fixed timestep simulation tick
//!
//! Advances the round by one step in logical space: clocks, movement,
//! spawning, expiry and collisions.

use glam::DVec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::collision::resolve_collisions;
use super::state::{GameEvent, GamePhase, GameState};
use crate::distance;
use crate::layout::{DisasterKind, EntityClass, EntityId, PowerUpKind};

/// Autopilot only chases disasters this close to the player (logical units)
const AUTOPILOT_INTERCEPT_RANGE: f64 = 250.0;

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Desired movement direction; any length, normalized here
    pub intent: DVec2,
    /// Idle/demo mode - the autopilot steers
    pub idle_mode: bool,
}

/// Advance the game state by one fixed timestep.
///
/// `scale` is the current map scale; collision radii are read through it.
pub fn tick(state: &mut GameState, input: &TickInput, dt: f64, scale: f64) {
    if state.phase != GamePhase::Playing {
        return;
    }

    state.elapsed += dt;
    state.time_left -= dt;

    if state.freeze_left > 0.0 {
        state.freeze_left -= dt;
        if state.freeze_left <= 0.0 {
            state.freeze_left = 0.0;
            state.events.push(GameEvent::FreezeEnded);
        }
    }

    let intent = if input.idle_mode {
        autopilot_intent(state)
    } else {
        input.intent
    };
    move_player(state, intent, dt);
    move_disasters(state, dt);
    expire_power_ups(state);
    update_spawns(state, dt);
    resolve_collisions(state, scale);

    if state.time_left <= 0.0 {
        state.end_round();
    }
}

fn move_player(state: &mut GameState, intent: DVec2, dt: f64) {
    let step = intent.normalize_or_zero() * state.tuning.player_speed * dt;
    let map_size = state.map_size;
    if let Some(player) = state.tracker.get_mut(state.player) {
        player.logical = (player.logical + step).clamp(DVec2::ZERO, map_size);
    }
}

fn move_disasters(state: &mut GameState, dt: f64) {
    if !state.is_frozen() {
        state.tracker.for_each_of_class_mut(EntityClass::Disaster, |disaster| {
            if let Some(velocity) = disaster.data.logical_velocity() {
                disaster.logical += velocity * dt;
            }
        });
    }

    let margin = state.tuning.despawn_margin;
    let max = state.map_size + DVec2::splat(margin);
    let gone: Vec<EntityId> = state
        .tracker
        .iter_class(EntityClass::Disaster)
        .filter(|d| {
            let p = d.logical;
            p.x < -margin || p.y < -margin || p.x > max.x || p.y > max.y
        })
        .map(|d| d.id)
        .collect();
    for id in gone {
        state.tracker.untrack(id);
    }
}

fn expire_power_ups(state: &mut GameState) {
    let now = state.elapsed;
    let lifetime = state.tuning.power_up_lifetime_secs;
    let expired: Vec<EntityId> = state
        .tracker
        .iter_class(EntityClass::PowerUp)
        .filter(|e| e.power_up().is_some_and(|p| now - p.spawn_time > lifetime))
        .map(|e| e.id)
        .collect();
    for id in expired {
        state.tracker.untrack(id);
    }
}

fn update_spawns(state: &mut GameState, dt: f64) {
    let spawn_secs = state.difficulty.disaster_spawn_secs();
    state.timers.disaster += dt;
    while state.timers.disaster >= spawn_secs {
        state.timers.disaster -= spawn_secs;
        // Nothing spawns during a freeze
        if !state.is_frozen() {
            spawn_random_disaster(state);
        }
    }

    let multiplier = state.difficulty.power_up_interval();
    let freeze_interval = state.tuning.freeze_interval_secs * multiplier;
    state.timers.freeze += dt;
    while state.timers.freeze >= freeze_interval {
        state.timers.freeze -= freeze_interval;
        try_spawn_freeze(state);
    }

    let shield_interval = state.tuning.shield_interval_secs * multiplier;
    state.timers.shield += dt;
    while state.timers.shield >= shield_interval {
        state.timers.shield -= shield_interval;
        try_spawn_shield(state);
    }
}

/// Uniform in `[lo, hi]`, or the midpoint when the range is empty
fn random_between(rng: &mut Pcg32, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        (lo + hi) / 2.0
    }
}

fn cooled_down(last: Option<f64>, now: f64, cooldown: f64) -> bool {
    last.is_none_or(|t| now - t >= cooldown)
}

/// Spawn just outside a random map edge, heading inward
fn spawn_random_disaster(state: &mut GameState) {
    let kind = DisasterKind::ALL[state.rng.random_range(0..DisasterKind::ALL.len())];
    let tuning = &state.tuning;
    let speed = random_between(&mut state.rng, tuning.disaster_speed_min, tuning.disaster_speed_max)
        * state.difficulty.disaster_speed();
    let margin = tuning.spawn_margin;
    let size = state.map_size;

    let (pos, velocity) = match state.rng.random_range(0..4) {
        // Top
        0 => (
            DVec2::new(random_between(&mut state.rng, 0.0, size.x), -margin),
            DVec2::new(0.0, speed),
        ),
        // Right
        1 => (
            DVec2::new(size.x + margin, random_between(&mut state.rng, 0.0, size.y)),
            DVec2::new(-speed, 0.0),
        ),
        // Bottom
        2 => (
            DVec2::new(random_between(&mut state.rng, 0.0, size.x), size.y + margin),
            DVec2::new(0.0, -speed),
        ),
        // Left
        _ => (
            DVec2::new(-margin, random_between(&mut state.rng, 0.0, size.y)),
            DVec2::new(speed, 0.0),
        ),
    };
    state.spawn_disaster(kind, pos, velocity);
}

fn try_spawn_freeze(state: &mut GameState) {
    if !cooled_down(state.timers.last_freeze, state.elapsed, state.tuning.freeze_cooldown_secs) {
        return;
    }
    state.timers.last_freeze = Some(state.elapsed);

    let margin = state.tuning.power_up_margin;
    let size = state.map_size;
    let pos = DVec2::new(
        random_between(&mut state.rng, margin, size.x - margin),
        random_between(&mut state.rng, margin, size.y - margin),
    );
    state.spawn_power_up(PowerUpKind::Freeze, pos, None);
}

/// Spawn next to a saved landmark that has no shield yet
fn try_spawn_shield(state: &mut GameState) {
    if !cooled_down(state.timers.last_shield, state.elapsed, state.tuning.shield_cooldown_secs) {
        return;
    }
    state.timers.last_shield = Some(state.elapsed);

    let candidates: Vec<(EntityId, DVec2)> = state
        .landmarks
        .iter()
        .filter_map(|&id| state.tracker.get(id))
        .filter(|e| e.landmark().is_some_and(|l| l.saved && !l.destroyed && !l.has_shield))
        .map(|e| (e.id, e.logical))
        .collect();
    if candidates.is_empty() {
        return;
    }

    let (target, anchor) = candidates[state.rng.random_range(0..candidates.len())];
    let offset = state.tuning.shield_offset;
    let jitter = DVec2::new(
        random_between(&mut state.rng, -offset, offset),
        random_between(&mut state.rng, -offset, offset),
    );
    let pos = (anchor + jitter).clamp(DVec2::ZERO, state.map_size);
    state.spawn_power_up(PowerUpKind::Shield, pos, Some(target));
}

fn nearest(from: DVec2, points: impl Iterator<Item = DVec2>) -> Option<DVec2> {
    points.min_by(|a, b| {
        distance(from, *a)
            .partial_cmp(&distance(from, *b))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Idle/demo steering: intercept nearby threats, then save (or rebuild)
/// landmarks, then grab power-ups, then chase whatever is left
fn autopilot_intent(state: &GameState) -> DVec2 {
    let player = state.player_pos();
    let frozen = state.is_frozen();

    let threats = || {
        state.tracker.iter_class(EntityClass::Disaster).map(move |d| {
            let lead = if frozen {
                DVec2::ZERO
            } else {
                d.data.logical_velocity().unwrap_or_default() * 0.3
            };
            d.logical + lead
        })
    };
    let close_threat = nearest(
        player,
        threats().filter(|p| distance(player, *p) < AUTOPILOT_INTERCEPT_RANGE),
    );
    let unsaved = || {
        state
            .tracker
            .iter_class(EntityClass::Landmark)
            .filter(|e| e.landmark().is_some_and(|l| !l.saved))
            .map(|e| e.logical)
    };
    let power_ups = || state.tracker.iter_class(EntityClass::PowerUp).map(|e| e.logical);

    let target = close_threat
        .or_else(|| nearest(player, unsaved()))
        .or_else(|| nearest(player, power_ups()))
        .or_else(|| nearest(player, threats()));

    match target {
        Some(target) if distance(player, target) > 2.0 => target - player,
        _ => DVec2::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::settings::Difficulty;
    use crate::tuning::GameTuning;

    fn playing(seed: u64, difficulty: Difficulty) -> GameState {
        let mut state = GameState::new(seed, difficulty, GameTuning::default(), DVec2::new(1200.0, 800.0));
        state.start_round();
        state.drain_events();
        state
    }

    /// Tick without collisions (scale 0 leaves every radius undefined)
    fn run(state: &mut GameState, input: &TickInput, secs: f64) {
        let steps = (secs / SIM_DT).round() as usize;
        for _ in 0..steps {
            tick(state, input, SIM_DT, 0.0);
        }
    }

    fn count_spawned(events: &[GameEvent], f: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|e| f(e)).count()
    }

    #[test]
    fn test_ready_phase_does_not_tick() {
        let mut state = GameState::new(1, Difficulty::Medium, GameTuning::default(), DVec2::new(1200.0, 800.0));
        run(&mut state, &TickInput::default(), 5.0);
        assert_eq!(state.elapsed, 0.0);
        assert_eq!(state.tracker.count_of_class(EntityClass::Disaster), 0);
    }

    #[test]
    fn test_player_moves_and_clamps() {
        let mut state = playing(1, Difficulty::Medium);
        let input = TickInput {
            intent: DVec2::new(1.0, 0.0),
            ..Default::default()
        };
        run(&mut state, &input, 1.0);
        assert!((state.player_pos().x - 400.0).abs() < 1e-6);

        let input = TickInput {
            intent: DVec2::new(-3.0, -3.0),
            ..Default::default()
        };
        run(&mut state, &input, 10.0);
        assert_eq!(state.player_pos(), DVec2::ZERO);
    }

    #[test]
    fn test_disaster_spawn_rate() {
        let mut state = playing(42, Difficulty::Medium);
        run(&mut state, &TickInput::default(), 7.0);
        let events = state.drain_events();
        assert_eq!(
            count_spawned(&events, |e| matches!(e, GameEvent::DisasterSpawned { .. })),
            3
        );
    }

    #[test]
    fn test_disasters_spawn_outside_and_head_inward() {
        let mut state = playing(9, Difficulty::Hard);
        for _ in 0..20 {
            spawn_random_disaster(&mut state);
        }
        for d in state.tracker.iter_class(EntityClass::Disaster) {
            let p = d.logical;
            let v = d.data.logical_velocity().unwrap();
            let speed = v.length();
            assert!((80.0 * 1.5..=200.0 * 1.5).contains(&speed));
            let outside = p.x < 0.0 || p.y < 0.0 || p.x > 1200.0 || p.y > 800.0;
            assert!(outside);
            let center = DVec2::new(600.0, 400.0);
            // One axis of motion, pointing back toward the map
            assert!(v.dot(center - p) > 0.0);
        }
    }

    #[test]
    fn test_disasters_move_in_logical_space_and_despawn() {
        let mut state = playing(1, Difficulty::Medium);
        let id = state.spawn_disaster(DisasterKind::Meteor, DVec2::new(1150.0, 400.0), DVec2::new(100.0, 0.0));
        tick(&mut state, &TickInput::default(), 0.5, 0.0);
        assert!((state.tracker.get(id).unwrap().logical.x - 1200.0).abs() < 1e-9);
        tick(&mut state, &TickInput::default(), 0.61, 0.0);
        assert!(!state.tracker.contains(id));
    }

    #[test]
    fn test_freeze_stops_motion_and_spawning() {
        let mut state = playing(5, Difficulty::Hard);
        let id = state.spawn_disaster(DisasterKind::Storm, DVec2::new(600.0, -40.0), DVec2::new(0.0, 100.0));
        state.drain_events();
        state.freeze_left = 5.0;

        run(&mut state, &TickInput::default(), 4.0);
        let entry = state.tracker.get(id).unwrap();
        assert_eq!(entry.logical, DVec2::new(600.0, -40.0));
        // Velocity is kept for when the freeze ends
        assert_eq!(entry.data.logical_velocity(), Some(DVec2::new(0.0, 100.0)));
        let events = state.drain_events();
        assert_eq!(
            count_spawned(&events, |e| matches!(e, GameEvent::DisasterSpawned { .. })),
            0
        );

        run(&mut state, &TickInput::default(), 2.0);
        assert!(state.drain_events().contains(&GameEvent::FreezeEnded));
        assert!(state.tracker.get(id).unwrap().logical.y > -40.0);
    }

    #[test]
    fn test_freeze_power_up_respects_cooldown() {
        let mut state = playing(11, Difficulty::Medium);
        run(&mut state, &TickInput::default(), 17.0);
        let events = state.drain_events();
        let freezes = count_spawned(&events, |e| {
            matches!(e, GameEvent::PowerUpSpawned { kind: PowerUpKind::Freeze, .. })
        });
        // Attempts at 8 s and 16 s; the second is inside the 10 s cooldown
        assert_eq!(freezes, 1);
        // No saved landmark, no shield
        assert_eq!(
            count_spawned(&events, |e| {
                matches!(e, GameEvent::PowerUpSpawned { kind: PowerUpKind::Shield, .. })
            }),
            0
        );
    }

    #[test]
    fn test_shield_spawns_near_saved_landmark() {
        let mut state = playing(12, Difficulty::Medium);
        let lm = state.landmarks[4];
        state.tracker.get_mut(lm).unwrap().landmark_mut().unwrap().saved = true;
        run(&mut state, &TickInput::default(), 6.5);

        let shield = state
            .tracker
            .iter_class(EntityClass::PowerUp)
            .find(|e| e.power_up().is_some_and(|p| p.kind == PowerUpKind::Shield))
            .unwrap();
        assert_eq!(shield.power_up().unwrap().target_landmark, Some(lm));
        let anchor = DVec2::new(506.0, 312.0);
        assert!((shield.logical - anchor).abs().max_element() <= 50.0);
    }

    #[test]
    fn test_power_up_expires() {
        let mut state = playing(2, Difficulty::Medium);
        let id = state.spawn_power_up(PowerUpKind::Freeze, DVec2::new(600.0, 400.0), None);
        run(&mut state, &TickInput::default(), 14.9);
        assert!(state.tracker.contains(id));
        run(&mut state, &TickInput::default(), 0.2);
        assert!(!state.tracker.contains(id));
    }

    #[test]
    fn test_round_ends_after_clock() {
        let mut state = playing(3, Difficulty::Easy);
        let mut steps = 0;
        while state.phase == GamePhase::Playing && steps < 10_000 {
            tick(&mut state, &TickInput::default(), SIM_DT, 0.0);
            steps += 1;
        }
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!((state.elapsed - 60.0).abs() < 0.05);
        assert!(state.result.is_some());
        assert_eq!(state.seconds_left(), 0);
    }

    #[test]
    fn test_autopilot_heads_for_nearest_unsaved_landmark() {
        let mut state = playing(4, Difficulty::Medium);
        let before = state.player_pos();
        let target = DVec2::new(272.0, 315.0);
        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT, 0.0);
        let after = state.player_pos();
        assert!(distance(after, target) < distance(before, target));
        let dir = (after - before).normalize();
        assert!((dir - (target - before).normalize()).length() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_round() {
        let mut a = playing(77, Difficulty::Hard);
        let mut b = playing(77, Difficulty::Hard);
        run(&mut a, &TickInput::default(), 10.0);
        run(&mut b, &TickInput::default(), 10.0);
        let pa: Vec<DVec2> = a.tracker.iter_class(EntityClass::Disaster).map(|e| e.logical).collect();
        let pb: Vec<DVec2> = b.tracker.iter_class(EntityClass::Disaster).map(|e| e.logical).collect();
        assert!(!pa.is_empty());
        assert_eq!(pa, pb);
    }
}
