//! Game state and core simulation types
//!
//! Everything here is in logical map units. Entities live in the layout
//! tracker so relayouts can rederive their screen attributes; gameplay only
//! ever touches the logical fields.

use glam::DVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::layout::{
    DisasterKind, DisasterState, EntityClass, EntityData, EntityId, EntityTracker, LandmarkState,
    PowerUpKind, PowerUpState,
};
use crate::settings::Difficulty;
use crate::tuning::GameTuning;

/// Landmarks on the default map: name and logical position
pub const LANDMARKS: [(&str, f64, f64); 13] = [
    ("Mikkelin Tuomiokirkko", 139.0, 207.0),
    ("Kivisakasti", 413.0, 132.0),
    ("Stone Sacisty", 532.0, 115.0),
    ("Jalkaväkimuseo", 679.0, 91.0),
    ("Mikkeli Market Square", 506.0, 312.0),
    ("Kenkävero Vickage Garden", 399.0, 445.0),
    ("Mikkelin Tori", 272.0, 315.0),
    ("Saimaa Island", 276.0, 412.0),
    ("Mikkeli City", 161.0, 394.0),
    ("Cultural Center", 629.0, 307.0),
    ("South District", 624.0, 463.0),
    ("East Quarter", 804.0, 253.0),
    ("Harbor Area", 859.0, 378.0),
];

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Waiting for the round to start
    Ready,
    /// Round clock running
    Playing,
    /// Round ended
    GameOver,
}

/// Game events for the feedback layer (floating text, sounds)
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    RoundStarted,
    LandmarkSaved { landmark: EntityId, pos: DVec2 },
    /// `penalized` is false when the landmark had been saved
    LandmarkDestroyed { landmark: EntityId, pos: DVec2, penalized: bool },
    ShieldAbsorbed { landmark: EntityId, pos: DVec2 },
    DisasterBlocked { pos: DVec2 },
    DisasterSpawned { id: EntityId, kind: DisasterKind },
    PowerUpSpawned { id: EntityId, kind: PowerUpKind },
    PowerUpCollected { kind: PowerUpKind, pos: DVec2 },
    FreezeEnded,
    RoundEnded(RoundResult),
}

/// End of round rating by the fraction of landmarks saved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTier {
    Perfect,
    Excellent,
    Good,
    Partial,
    Disaster,
}

impl ResultTier {
    pub fn from_saved(saved: usize, total: usize) -> Self {
        let fraction = if total == 0 { 0.0 } else { saved as f64 / total as f64 };
        if total > 0 && saved == total {
            ResultTier::Perfect
        } else if fraction >= 0.8 {
            ResultTier::Excellent
        } else if fraction >= 0.5 {
            ResultTier::Good
        } else if saved > 0 {
            ResultTier::Partial
        } else {
            ResultTier::Disaster
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ResultTier::Perfect => "Perfect! You saved all of Mikkeli! +100 bonus!",
            ResultTier::Excellent => "Excellent work! Mikkeli is mostly safe!",
            ResultTier::Good => "Good job! You saved half of Mikkeli!",
            ResultTier::Partial => "Some landmarks saved, but Mikkeli needs more help!",
            ResultTier::Disaster => "Disaster! All landmarks were destroyed!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundResult {
    pub final_score: i64,
    pub landmarks_saved: usize,
    pub tier: ResultTier,
}

/// Spawn clocks (seconds)
#[derive(Debug, Clone, Default)]
pub struct SpawnTimers {
    pub disaster: f64,
    pub freeze: f64,
    pub shield: f64,
    /// Round time of the last accepted spawn, for cooldowns
    pub last_freeze: Option<f64>,
    pub last_shield: Option<f64>,
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub difficulty: Difficulty,
    pub tuning: GameTuning,
    /// Logical map size
    pub map_size: DVec2,
    pub phase: GamePhase,
    /// Seconds since the round started
    pub elapsed: f64,
    pub time_left: f64,
    pub score: i64,
    /// Seconds of freeze remaining (0 = not frozen)
    pub freeze_left: f64,
    pub timers: SpawnTimers,
    /// All entities, keyed by stable id
    pub tracker: EntityTracker,
    pub player: EntityId,
    /// Landmark ids in table order
    pub landmarks: Vec<EntityId>,
    /// Events since the last drain
    pub events: Vec<GameEvent>,
    pub result: Option<RoundResult>,
}

impl GameState {
    /// Create the world: player, landmarks and their dot overlays
    pub fn new(seed: u64, difficulty: Difficulty, tuning: GameTuning, map_size: DVec2) -> Self {
        let mut tracker = EntityTracker::new();
        let player = tracker.track(
            EntityData::Player,
            DVec2::new(PLAYER_START_X, PLAYER_START_Y),
            DVec2::splat(PLAYER_SPRITE_SIZE),
        );

        let mut landmarks = Vec::with_capacity(LANDMARKS.len());
        for (name, x, y) in LANDMARKS {
            let pos = DVec2::new(x, y);
            let id = tracker.track(EntityData::Landmark(LandmarkState::new(name)), pos, DVec2::ZERO);
            let dot = tracker.track(EntityData::DotOverlay { landmark: id }, pos, DVec2::ZERO);
            if let Some(state) = tracker.get_mut(id).and_then(|e| e.landmark_mut()) {
                state.dot = Some(dot);
            }
            landmarks.push(id);
        }

        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            difficulty,
            time_left: tuning.round_secs,
            tuning,
            map_size,
            phase: GamePhase::Ready,
            elapsed: 0.0,
            score: 0,
            freeze_left: 0.0,
            timers: SpawnTimers::default(),
            tracker,
            player,
            landmarks,
            events: Vec::new(),
            result: None,
        }
    }

    /// Reset everything round-scoped and start the clock
    pub fn start_round(&mut self) {
        for class in [EntityClass::Disaster, EntityClass::PowerUp] {
            for id in self.tracker.ids_of_class(class) {
                self.tracker.untrack(id);
            }
        }
        for &id in &self.landmarks {
            if let Some(state) = self.tracker.get_mut(id).and_then(|e| e.landmark_mut()) {
                state.saved = false;
                state.destroyed = false;
                state.has_shield = false;
            }
        }
        if let Some(player) = self.tracker.get_mut(self.player) {
            player.logical = DVec2::new(PLAYER_START_X, PLAYER_START_Y);
        }

        self.phase = GamePhase::Playing;
        self.elapsed = 0.0;
        self.time_left = self.tuning.round_secs;
        self.score = 0;
        self.freeze_left = 0.0;
        self.timers = SpawnTimers::default();
        self.result = None;
        self.events.push(GameEvent::RoundStarted);
        log::info!(
            "Round started: {} landmarks, difficulty {}",
            self.landmarks.len(),
            self.difficulty.as_str()
        );
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_left > 0.0
    }

    pub fn player_pos(&self) -> DVec2 {
        self.tracker.get(self.player).map(|e| e.logical).unwrap_or_default()
    }

    pub fn landmark(&self, id: EntityId) -> Option<&LandmarkState> {
        self.tracker.get(id).and_then(|e| e.landmark())
    }

    /// Landmarks currently saved
    pub fn saved_count(&self) -> usize {
        self.landmarks
            .iter()
            .filter(|&&id| self.landmark(id).is_some_and(|l| l.saved))
            .count()
    }

    pub fn destroyed_count(&self) -> usize {
        self.landmarks
            .iter()
            .filter(|&&id| self.landmark(id).is_some_and(|l| l.destroyed))
            .count()
    }

    /// Whole seconds left on the round clock
    pub fn seconds_left(&self) -> u32 {
        self.time_left.max(0.0).ceil() as u32
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(super) fn spawn_disaster(&mut self, kind: DisasterKind, pos: DVec2, velocity: DVec2) -> EntityId {
        let id = self.tracker.track(
            EntityData::Disaster(DisasterState {
                kind,
                logical_velocity: velocity,
            }),
            pos,
            DVec2::splat(DISASTER_SPRITE_SIZE),
        );
        self.events.push(GameEvent::DisasterSpawned { id, kind });
        id
    }

    pub(super) fn spawn_power_up(&mut self, kind: PowerUpKind, pos: DVec2, target: Option<EntityId>) -> EntityId {
        let id = self.tracker.track(
            EntityData::PowerUp(PowerUpState {
                kind,
                spawn_time: self.elapsed,
                target_landmark: target,
            }),
            pos,
            DVec2::splat(POWER_UP_SPRITE_SIZE),
        );
        self.events.push(GameEvent::PowerUpSpawned { id, kind });
        id
    }

    /// Close the round: apply the perfect bonus and rate the result
    pub fn end_round(&mut self) {
        let saved = self.saved_count();
        let tier = ResultTier::from_saved(saved, self.landmarks.len());
        let bonus = if tier == ResultTier::Perfect {
            self.tuning.perfect_bonus
        } else {
            0
        };
        let result = RoundResult {
            final_score: self.score + bonus,
            landmarks_saved: saved,
            tier,
        };
        self.phase = GamePhase::GameOver;
        self.time_left = 0.0;
        self.result = Some(result);
        self.events.push(GameEvent::RoundEnded(result));
        log::info!(
            "Round over: score {}, {}/{} landmarks saved",
            result.final_score,
            saved,
            self.landmarks.len()
        );
    }
}
