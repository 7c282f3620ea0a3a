//! Frame loop
//!
//! Owns the game state, the layout coordinator and the scene. Each frame it
//! polls the coordinator, runs fixed-step gameplay ticks while no relayout is
//! in flight, then mirrors spawns/removals into the scene and syncs positions.

use glam::DVec2;

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::layout::{EntityId, LayoutCoordinator, LayoutError, RelayoutOutcome, RelayoutTrigger};
use crate::platform::ViewportSource;
use crate::scene::SceneBackend;
use crate::settings::Settings;
use crate::sim::{GameEvent, GamePhase, GameState, RoundResult, TickInput, tick};
use crate::tuning::Tuning;

/// Longest frame delta fed to the accumulator (seconds)
const MAX_FRAME_DT: f64 = 0.1;

/// Pointer steering stops this close to the target (logical units)
const POINTER_ARRIVE_DISTANCE: f64 = 4.0;

/// What happened during one frame
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub ticks: u32,
    /// Set when a relayout pass finished this frame
    pub relayout: Option<RelayoutOutcome>,
    pub events: Vec<GameEvent>,
    /// Entities untracked because their render object disappeared
    pub dropped: Vec<EntityId>,
}

pub struct GameSession<S: SceneBackend> {
    state: GameState,
    layout: LayoutCoordinator,
    scene: S,
    input: TickInput,
    /// Logical point the player is steering toward (pointer input)
    pointer_target: Option<DVec2>,
    accumulator: f64,
    /// Host clock of the previous frame (ms)
    last_time: Option<f64>,
}

impl<S: SceneBackend> GameSession<S> {
    pub fn new(tuning: &Tuning, settings: &Settings, seed: u64, scene: S) -> Self {
        let layout = LayoutCoordinator::new(tuning.layout.clone());
        let map_size = layout.transform().base_size();
        let state = GameState::new(seed, settings.difficulty, tuning.game.clone(), map_size);
        let mut session = Self {
            state,
            layout,
            scene,
            input: TickInput {
                idle_mode: settings.idle_mode,
                ..Default::default()
            },
            pointer_target: None,
            accumulator: 0.0,
            last_time: None,
        };
        session.sync_scene();
        session
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn layout(&self) -> &LayoutCoordinator {
        &self.layout
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Record the real map asset size; call before the first layout
    pub fn initialize_map(&mut self, width: f64, height: f64) -> Result<(), LayoutError> {
        self.layout.initialize_map(width, height)?;
        self.state.map_size = self.layout.transform().base_size();
        Ok(())
    }

    /// First layout, applied immediately
    pub fn start(&mut self, now: f64, viewport: &dyn ViewportSource) -> RelayoutOutcome {
        let outcome = self.layout.relayout_now(
            RelayoutTrigger::InitialLoad,
            now,
            viewport,
            &mut self.state.tracker,
            &mut self.scene,
        );
        self.sync_scene();
        self.last_time = Some(now);
        outcome
    }

    pub fn start_round(&mut self) {
        self.state.start_round();
        self.accumulator = 0.0;
        self.sync_scene();
    }

    /// Keyboard/touch-pad input; cancels pointer steering
    pub fn set_input(&mut self, input: TickInput) {
        self.input = input;
        self.pointer_target = None;
    }

    pub fn set_idle_mode(&mut self, idle: bool) {
        self.input.idle_mode = idle;
    }

    /// Forward a resize / orientation / fullscreen signal
    pub fn on_viewport_event(&mut self, trigger: RelayoutTrigger, now: f64) -> bool {
        self.layout.request_relayout(trigger, now)
    }

    /// Steer the player toward a pointer position (desktop click/drag).
    ///
    /// Before the first layout the conversion fails and the pointer is ignored.
    pub fn point_at(&mut self, screen: DVec2) -> Result<DVec2, LayoutError> {
        let target = self.layout.transform().screen_to_map(screen)?;
        let target = self.layout.transform().clamp_to_bounds(target);
        self.pointer_target = Some(target);
        Ok(target)
    }

    pub fn round_result(&self) -> Option<RoundResult> {
        self.state.result
    }

    pub fn is_round_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    /// Run one host frame at `now` (ms)
    pub fn frame(&mut self, now: f64, viewport: &dyn ViewportSource) -> FrameReport {
        let dt = match self.last_time {
            Some(last) => ((now - last) / 1000.0).clamp(0.0, MAX_FRAME_DT),
            None => 0.0,
        };
        self.last_time = Some(now);

        let mut report = FrameReport {
            relayout: self
                .layout
                .poll(now, viewport, &mut self.state.tracker, &mut self.scene),
            ..Default::default()
        };

        // Gameplay waits for the pass to finish; the skipped time is dropped
        if self.layout.is_idle() {
            self.accumulator += dt;
            let scale = self.layout.transform().scale();
            while self.accumulator >= SIM_DT && report.ticks < MAX_SUBSTEPS {
                let input = self.tick_input();
                tick(&mut self.state, &input, SIM_DT, scale);
                self.accumulator -= SIM_DT;
                report.ticks += 1;
            }
        }

        report.dropped = self.sync_scene();
        report.events = self.state.drain_events();
        report
    }

    fn tick_input(&mut self) -> TickInput {
        let Some(target) = self.pointer_target else {
            return self.input;
        };
        let delta = target - self.state.player_pos();
        // Close enough: stop instead of jittering around the target
        if delta.length() < POINTER_ARRIVE_DISTANCE {
            self.pointer_target = None;
            self.input.intent = DVec2::ZERO;
        } else {
            self.input.intent = delta;
        }
        self.input
    }

    /// Mirror tracker spawns/removals into the scene, then sync positions
    fn sync_scene(&mut self) -> Vec<EntityId> {
        for id in self.state.tracker.drain_removed() {
            self.scene.destroy_sprite(id);
        }
        for id in self.state.tracker.drain_spawned() {
            if let Some(entry) = self.state.tracker.get(id) {
                self.scene.create_sprite(id, entry.class());
            }
        }
        let dropped = self.layout.sync_entities(&mut self.state.tracker, &mut self.scene);
        for id in self.state.tracker.drain_removed() {
            self.scene.destroy_sprite(id);
        }
        dropped
    }
}
