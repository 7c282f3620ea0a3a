//! Relayout orchestration
//!
//! The coordinator is the only writer of the transform and of every tracked
//! entity's derived fields. Viewport events are debounced into a single pass;
//! a pass runs one stage per [`poll`](LayoutCoordinator::poll) and triggers
//! arriving while it is in flight are ignored. Gameplay must not tick while
//! [`is_idle`](LayoutCoordinator::is_idle) is false.

use glam::DVec2;

use super::error::LayoutError;
use super::history::{TransformHistory, TransformSnapshot};
use super::solver;
use super::tracker::{
    DerivedLayout, DisasterKind, EntityClass, EntityData, EntityId, EntityTracker, PowerUpKind,
    TrackedEntity,
};
use super::transform::CoordinateTransform;
use crate::consts::{DEFAULT_MAP_HEIGHT, DEFAULT_MAP_WIDTH};
use crate::min_axis;
use crate::platform::{DeviceContext, ViewportSource};
use crate::scene::SceneBackend;
use crate::tuning::{ClassScaling, LayoutTuning, SpriteFactors};

/// Why a relayout was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayoutTrigger {
    InitialLoad,
    Resize,
    OrientationChange,
    FullscreenToggle,
}

/// Stages of a pass, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayoutStage {
    UpdateViewport,
    Rescale,
    RefreshCollision,
    RefreshUi,
}

/// Entity classes in the order a pass visits them
const LAYOUT_ORDER: [EntityClass; 5] = [
    EntityClass::Player,
    EntityClass::Landmark,
    EntityClass::DotOverlay,
    EntityClass::Disaster,
    EntityClass::PowerUp,
];

/// Summary of an applied pass
#[derive(Debug, Clone, PartialEq)]
pub struct RelayoutReport {
    pub trigger: RelayoutTrigger,
    pub device: DeviceContext,
    pub previous_scale: f64,
    pub scale: f64,
    pub offset: DVec2,
    pub entities_updated: usize,
    /// Entities whose render object was already gone; they were untracked
    pub entities_dropped: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelayoutOutcome {
    Applied(RelayoutReport),
    /// Transform left unchanged; the next debounced trigger retries
    Failed {
        trigger: RelayoutTrigger,
        error: LayoutError,
    },
}

#[derive(Debug, Clone, Copy)]
struct PendingRelayout {
    trigger: RelayoutTrigger,
    deadline: f64,
}

#[derive(Debug, Clone)]
struct RelayoutPass {
    trigger: RelayoutTrigger,
    stage: RelayoutStage,
    device: Option<DeviceContext>,
    report: Option<RelayoutReport>,
}

#[derive(Debug, Clone)]
enum CoordinatorState {
    Idle { pending: Option<PendingRelayout> },
    Relayouting(RelayoutPass),
}

pub struct LayoutCoordinator {
    tuning: LayoutTuning,
    transform: CoordinateTransform,
    history: TransformHistory,
    base_locked: bool,
    /// Device context used by the most recent pass
    device: DeviceContext,
    state: CoordinatorState,
}

impl LayoutCoordinator {
    pub fn new(tuning: LayoutTuning) -> Self {
        let history = TransformHistory::new(tuning.history_capacity);
        Self {
            tuning,
            transform: CoordinateTransform::provisional(),
            history,
            base_locked: false,
            device: DeviceContext::desktop(DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT),
            state: CoordinatorState::Idle { pending: None },
        }
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    pub fn history(&self) -> &TransformHistory {
        &self.history
    }

    pub fn tuning(&self) -> &LayoutTuning {
        &self.tuning
    }

    pub fn device(&self) -> &DeviceContext {
        &self.device
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, CoordinatorState::Idle { .. })
    }

    pub fn current_stage(&self) -> Option<RelayoutStage> {
        match &self.state {
            CoordinatorState::Relayouting(pass) => Some(pass.stage),
            CoordinatorState::Idle { .. } => None,
        }
    }

    /// Deadline of the armed debounce window, if any
    pub fn pending_deadline(&self) -> Option<f64> {
        match &self.state {
            CoordinatorState::Idle { pending } => pending.map(|p| p.deadline),
            CoordinatorState::Relayouting(_) => None,
        }
    }

    /// Set the real base map size. Allowed once.
    pub fn initialize_map(&mut self, width: f64, height: f64) -> Result<(), LayoutError> {
        let size = DVec2::new(width, height);
        if self.base_locked {
            return Err(LayoutError::BaseSizeLocked);
        }
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(LayoutError::InvalidBaseSize(size));
        }
        self.transform.set_base_size(size);
        self.base_locked = true;
        log::info!("Map initialized at {}x{}", width, height);
        Ok(())
    }

    /// Arm (or restart) the debounce window.
    ///
    /// Returns false when a pass is in flight; the trigger is dropped and the
    /// end-of-pass viewport check picks up whatever changed.
    pub fn request_relayout(&mut self, trigger: RelayoutTrigger, now: f64) -> bool {
        match &mut self.state {
            CoordinatorState::Relayouting(pass) => {
                log::debug!(
                    "Ignoring {:?} during {:?} relayout ({:?})",
                    trigger,
                    pass.trigger,
                    pass.stage
                );
                false
            }
            CoordinatorState::Idle { pending } => {
                *pending = Some(PendingRelayout {
                    trigger,
                    deadline: now + self.tuning.debounce_ms,
                });
                true
            }
        }
    }

    /// Advance the state machine: start a due pass or run its next stage.
    ///
    /// Returns the outcome when a pass finishes.
    pub fn poll(
        &mut self,
        now: f64,
        viewport: &dyn ViewportSource,
        tracker: &mut EntityTracker,
        scene: &mut dyn SceneBackend,
    ) -> Option<RelayoutOutcome> {
        let state = std::mem::replace(&mut self.state, CoordinatorState::Idle { pending: None });
        match state {
            CoordinatorState::Idle { pending: Some(p) } if now >= p.deadline => {
                let pass = RelayoutPass {
                    trigger: p.trigger,
                    stage: RelayoutStage::UpdateViewport,
                    device: None,
                    report: None,
                };
                self.run_stage(pass, now, viewport, tracker, scene)
            }
            CoordinatorState::Idle { pending } => {
                self.state = CoordinatorState::Idle { pending };
                None
            }
            CoordinatorState::Relayouting(pass) => self.run_stage(pass, now, viewport, tracker, scene),
        }
    }

    /// Run a pass to completion right now, skipping the debounce window.
    ///
    /// If a pass is already in flight it is finished instead.
    pub fn relayout_now(
        &mut self,
        trigger: RelayoutTrigger,
        now: f64,
        viewport: &dyn ViewportSource,
        tracker: &mut EntityTracker,
        scene: &mut dyn SceneBackend,
    ) -> RelayoutOutcome {
        if let CoordinatorState::Idle { pending } = &mut self.state {
            *pending = Some(PendingRelayout {
                trigger,
                deadline: now,
            });
        }
        loop {
            if let Some(outcome) = self.poll(now, viewport, tracker, scene) {
                return outcome;
            }
        }
    }

    fn run_stage(
        &mut self,
        mut pass: RelayoutPass,
        now: f64,
        viewport: &dyn ViewportSource,
        tracker: &mut EntityTracker,
        scene: &mut dyn SceneBackend,
    ) -> Option<RelayoutOutcome> {
        match pass.stage {
            RelayoutStage::UpdateViewport => {
                let device = viewport.device_context();
                log::debug!(
                    "{:?}: viewport {}x{} touch={} fullscreen={}",
                    pass.trigger,
                    device.viewport_width,
                    device.viewport_height,
                    device.is_touch,
                    device.is_fullscreen
                );
                pass.device = Some(device);
                pass.stage = RelayoutStage::Rescale;
            }
            RelayoutStage::Rescale => {
                let device = pass.device.unwrap_or(self.device);
                let previous_scale = match self.apply_solution(&device, now) {
                    Ok(previous_scale) => previous_scale,
                    Err(error) => {
                        log::warn!("Relayout ({:?}) aborted: {}", pass.trigger, error);
                        return Some(RelayoutOutcome::Failed {
                            trigger: pass.trigger,
                            error,
                        });
                    }
                };
                self.device = device;
                let (entities_updated, entities_dropped) =
                    self.rederive_all(Some(previous_scale), tracker, scene);
                pass.report = Some(RelayoutReport {
                    trigger: pass.trigger,
                    device,
                    previous_scale,
                    scale: self.transform.scale(),
                    offset: self.transform.offset(),
                    entities_updated,
                    entities_dropped,
                });
                pass.stage = RelayoutStage::RefreshCollision;
            }
            RelayoutStage::RefreshCollision => {
                self.refresh_collision(tracker, scene);
                pass.stage = RelayoutStage::RefreshUi;
            }
            RelayoutStage::RefreshUi => {
                scene.refresh_ui(&self.transform);

                // Triggers ignored during the pass are recovered here
                let latest = viewport.device_context();
                let pending = if pass.device.is_some_and(|used| used != latest) {
                    log::debug!("Viewport changed during relayout, scheduling another");
                    Some(PendingRelayout {
                        trigger: RelayoutTrigger::Resize,
                        deadline: now + self.tuning.debounce_ms,
                    })
                } else {
                    None
                };
                self.state = CoordinatorState::Idle { pending };

                return pass.report.map(|report| {
                    log::info!(
                        "Relayout ({:?}): scale {:.4} -> {:.4}, offset ({:.1}, {:.1}), {} entities",
                        report.trigger,
                        report.previous_scale,
                        report.scale,
                        report.offset.x,
                        report.offset.y,
                        report.entities_updated
                    );
                    RelayoutOutcome::Applied(report)
                });
            }
        }
        self.state = CoordinatorState::Relayouting(pass);
        None
    }

    /// Solve, record history and write the transform.
    ///
    /// Returns the scale that was replaced. Leaves the transform untouched on
    /// failure.
    fn apply_solution(&mut self, device: &DeviceContext, now: f64) -> Result<f64, LayoutError> {
        let solved = solver::solve(device, self.transform.base_size(), &self.tuning.policy)?;
        let previous = self.transform;

        // The provisional placeholder is never a rollback target
        if previous.is_ready() {
            self.history.push(TransformSnapshot {
                scale: previous.scale(),
                offset: previous.offset(),
                captured_at: now,
            });
        }
        self.transform.update(solved.scale, solved.offset);

        if !self.transform.is_ready() {
            if previous.is_ready() {
                self.history.pop_last();
            }
            self.transform = previous;
            log::info!("Degenerate transform rolled back to scale {}", previous.scale());
            return Err(LayoutError::SolverFailure {
                viewport: device.viewport(),
                scale: solved.scale,
            });
        }
        Ok(previous.scale())
    }

    /// Roll back to the most recent recorded transform and rederive everything.
    ///
    /// Refused while a pass is in flight; the history is left untouched.
    pub fn restore_previous(
        &mut self,
        tracker: &mut EntityTracker,
        scene: &mut dyn SceneBackend,
    ) -> Result<TransformSnapshot, LayoutError> {
        if let CoordinatorState::Relayouting(pass) = &self.state {
            log::debug!("Restore refused during {:?} relayout ({:?})", pass.trigger, pass.stage);
            return Err(LayoutError::RelayoutInProgress);
        }
        let Some(snapshot) = self.history.pop_last() else {
            log::info!("Nothing to restore");
            return Err(LayoutError::HistoryUnderflow);
        };
        let previous_scale = self.transform.scale();
        self.transform.update(snapshot.scale, snapshot.offset);
        self.rederive_all(Some(previous_scale), tracker, scene);
        self.refresh_collision(tracker, scene);
        scene.refresh_ui(&self.transform);
        log::info!("Transform restored to scale {:.4}", snapshot.scale);
        Ok(snapshot)
    }

    /// Per-frame sync: lay out fresh entities and move the moving ones.
    /// The player stays clamped to the map bounds.
    ///
    /// Returns entities dropped because their render object was gone.
    pub fn sync_entities(
        &mut self,
        tracker: &mut EntityTracker,
        scene: &mut dyn SceneBackend,
    ) -> Vec<EntityId> {
        if !self.transform.is_ready() {
            return Vec::new();
        }
        let bounds = self.transform.screen_bounds();
        let mut dropped = Vec::new();
        let ids: Vec<EntityId> = tracker.iter().map(|e| e.id).collect();
        for id in ids {
            if !scene.is_alive(id) {
                self.drop_entity(id, tracker, &mut dropped);
                continue;
            }
            let Some(entry) = tracker.get_mut(id) else {
                continue;
            };
            if !entry.derived().laid_out {
                let mut derived = derive_layout(&self.tuning, &self.transform, &self.device, entry, None);
                if entry.class() == EntityClass::Player {
                    derived.screen_pos = bounds.clamp(derived.screen_pos);
                }
                *entry.derived_mut() = derived;
                push_to_scene(entry, scene);
            } else {
                let pos = self.transform.map_to_screen(entry.logical);
                let pos = match entry.class() {
                    EntityClass::Player => bounds.clamp(pos),
                    EntityClass::Disaster | EntityClass::PowerUp => pos,
                    EntityClass::Landmark | EntityClass::DotOverlay => continue,
                };
                entry.derived_mut().screen_pos = pos;
                scene.set_position(id, pos);
            }
        }
        dropped
    }

    fn rederive_all(
        &mut self,
        previous_scale: Option<f64>,
        tracker: &mut EntityTracker,
        scene: &mut dyn SceneBackend,
    ) -> (usize, Vec<EntityId>) {
        let mut updated = 0;
        let mut dropped = Vec::new();
        for class in LAYOUT_ORDER {
            for id in tracker.ids_of_class(class) {
                if !scene.is_alive(id) {
                    self.drop_entity(id, tracker, &mut dropped);
                    continue;
                }
                let Some(entry) = tracker.get_mut(id) else {
                    continue;
                };
                let derived =
                    derive_layout(&self.tuning, &self.transform, &self.device, entry, previous_scale);
                *entry.derived_mut() = derived;
                push_to_scene(entry, scene);
                updated += 1;
            }
        }
        (updated, dropped)
    }

    fn drop_entity(&self, id: EntityId, tracker: &mut EntityTracker, dropped: &mut Vec<EntityId>) {
        let error = LayoutError::TrackingInconsistency { id };
        log::debug!("Skipping entity: {}", error);
        tracker.untrack(id);
        dropped.push(id);
    }

    /// World bounds follow the map; the player is pulled back inside
    fn refresh_collision(&self, tracker: &mut EntityTracker, scene: &mut dyn SceneBackend) {
        let bounds = self.transform.screen_bounds();
        scene.set_world_bounds(bounds);
        tracker.for_each_of_class_mut(EntityClass::Player, |player| {
            let pos = player.derived().screen_pos;
            let clamped = bounds.clamp(pos);
            if clamped != pos {
                log::debug!("Player clamped into map bounds");
                player.derived_mut().screen_pos = clamped;
                scene.set_position(player.id, clamped);
            }
        });
    }
}

fn class_scaling(tuning: &LayoutTuning, class: EntityClass) -> Option<&ClassScaling> {
    match class {
        EntityClass::Player => Some(&tuning.player),
        EntityClass::Disaster => Some(&tuning.disaster),
        EntityClass::PowerUp => Some(&tuning.power_up),
        EntityClass::Landmark | EntityClass::DotOverlay => None,
    }
}

/// Base display factor for a sprite
pub fn sprite_factor(data: &EntityData, sprites: &SpriteFactors) -> f64 {
    match data {
        EntityData::Player => sprites.player,
        EntityData::Disaster(d) => match d.kind {
            DisasterKind::Meteor => sprites.meteor,
            DisasterKind::Storm => sprites.storm,
            DisasterKind::Flood => sprites.flood,
        },
        EntityData::PowerUp(p) => match p.kind {
            PowerUpKind::Freeze => sprites.freeze,
            PowerUpKind::Shield => sprites.shield,
        },
        EntityData::Landmark(_) | EntityData::DotOverlay { .. } => 1.0,
    }
}

/// Derive every screen attribute of one entity from its logical fields.
///
/// With `previous_scale` set, an already laid out entity's screen velocity is
/// rescaled by `new / previous` so its logical speed is unchanged.
fn derive_layout(
    tuning: &LayoutTuning,
    transform: &CoordinateTransform,
    device: &DeviceContext,
    entry: &TrackedEntity,
    previous_scale: Option<f64>,
) -> DerivedLayout {
    let scale = transform.scale();
    let mut derived = *entry.derived();
    derived.screen_pos = transform.map_to_screen(entry.logical);

    match entry.class() {
        EntityClass::Landmark => {
            let radius = (tuning.landmark_radius * scale).max(tuning.landmark_min_radius);
            derived.display_scale = 1.0;
            derived.body_radius = radius;
            derived.body_offset = DVec2::splat(-radius);
        }
        EntityClass::DotOverlay => {
            // No collision body; the radius is the drawn one
            let radius = tuning.dot_radius * scale;
            derived.display_scale = scale;
            derived.body_radius = radius;
            derived.body_offset = DVec2::splat(-radius);
        }
        class => {
            if let Some(scaling) = class_scaling(tuning, class) {
                let reduction = if device.wants_portrait_reduction() {
                    scaling.portrait_reduction
                } else {
                    1.0
                };
                let display =
                    sprite_factor(&entry.data, &tuning.sprites) * scale.max(scaling.scale_floor) * reduction;
                let displayed = entry.sprite_size * display;
                let radius = (min_axis(displayed) * scaling.body_fraction / 2.0).max(tuning.min_body_radius);
                derived.display_scale = display;
                derived.body_radius = radius;
                derived.body_offset = displayed / 2.0 - DVec2::splat(radius);
            }
        }
    }

    if let Some(velocity) = entry.data.logical_velocity() {
        derived.screen_velocity = match previous_scale {
            Some(previous) if derived.laid_out && previous > 0.0 => {
                derived.screen_velocity * (scale / previous)
            }
            _ => velocity * scale,
        };
    }
    derived.laid_out = true;
    derived
}

fn push_to_scene(entry: &TrackedEntity, scene: &mut dyn SceneBackend) {
    let derived = entry.derived();
    scene.set_position(entry.id, derived.screen_pos);
    match entry.class() {
        EntityClass::Landmark => {
            scene.set_circle_body(entry.id, derived.body_radius, derived.body_offset);
        }
        EntityClass::DotOverlay => {
            scene.set_display_scale(entry.id, derived.display_scale);
        }
        _ => {
            scene.set_display_scale(entry.id, derived.display_scale);
            scene.set_circle_body(entry.id, derived.body_radius, derived.body_offset);
        }
    }
}
