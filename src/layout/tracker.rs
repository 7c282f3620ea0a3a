//! Registry of live entities and their authoritative logical coordinates
//!
//! Entries are keyed by a stable [`EntityId`], never by a live render object,
//! so a render object destroyed out of band cannot leave a dangling reference.
//! Logical fields are owned by gameplay. Derived fields (screen position,
//! display scale, collision circle, screen velocity) are written only by the
//! layout coordinator.

use std::collections::BTreeMap;
use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Stable entity handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    Player,
    Landmark,
    Disaster,
    PowerUp,
    DotOverlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisasterKind {
    Meteor,
    Storm,
    Flood,
}

impl DisasterKind {
    pub const ALL: [DisasterKind; 3] = [DisasterKind::Meteor, DisasterKind::Storm, DisasterKind::Flood];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisasterKind::Meteor => "meteor",
            DisasterKind::Storm => "storm",
            DisasterKind::Flood => "flood",
        }
    }

    /// Spin applied by the renderer (degrees per second)
    pub fn angular_velocity(&self) -> f64 {
        match self {
            DisasterKind::Meteor => 0.0,
            DisasterKind::Storm => 100.0,
            DisasterKind::Flood => 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    Freeze,
    Shield,
}

impl PowerUpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerUpKind::Freeze => "freeze",
            PowerUpKind::Shield => "shield",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkState {
    pub name: String,
    pub saved: bool,
    pub destroyed: bool,
    pub has_shield: bool,
    /// Decorative dot drawn on top of the landmark
    pub dot: Option<EntityId>,
}

impl LandmarkState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            saved: false,
            destroyed: false,
            has_shield: false,
            dot: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisasterState {
    pub kind: DisasterKind,
    /// Logical units per second; unaffected by relayouts
    pub logical_velocity: DVec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUpState {
    pub kind: PowerUpKind,
    /// Game clock seconds at spawn
    pub spawn_time: f64,
    pub target_landmark: Option<EntityId>,
}

/// Class-specific state with a fixed field set per class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityData {
    Player,
    Landmark(LandmarkState),
    Disaster(DisasterState),
    PowerUp(PowerUpState),
    DotOverlay { landmark: EntityId },
}

impl EntityData {
    pub fn class(&self) -> EntityClass {
        match self {
            EntityData::Player => EntityClass::Player,
            EntityData::Landmark(_) => EntityClass::Landmark,
            EntityData::Disaster(_) => EntityClass::Disaster,
            EntityData::PowerUp(_) => EntityClass::PowerUp,
            EntityData::DotOverlay { .. } => EntityClass::DotOverlay,
        }
    }

    pub fn logical_velocity(&self) -> Option<DVec2> {
        match self {
            EntityData::Disaster(d) => Some(d.logical_velocity),
            _ => None,
        }
    }
}

/// Screen-space attributes rederived from the logical fields
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedLayout {
    pub screen_pos: DVec2,
    pub display_scale: f64,
    /// Collision circle radius in screen pixels (drawn radius for dot overlays)
    pub body_radius: f64,
    /// Circle bounding box offset from the sprite's top-left corner
    pub body_offset: DVec2,
    /// Screen pixels per second, kept proportional to the map scale
    pub screen_velocity: DVec2,
    /// Set once the entity has been laid out at least once
    pub laid_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub id: EntityId,
    /// Position in base map units
    pub logical: DVec2,
    /// Native sprite size in texture pixels (zero for invisible entities)
    pub sprite_size: DVec2,
    pub data: EntityData,
    derived: DerivedLayout,
}

impl TrackedEntity {
    #[inline]
    pub fn class(&self) -> EntityClass {
        self.data.class()
    }

    #[inline]
    pub fn derived(&self) -> &DerivedLayout {
        &self.derived
    }

    pub(in crate::layout) fn derived_mut(&mut self) -> &mut DerivedLayout {
        &mut self.derived
    }

    pub fn landmark(&self) -> Option<&LandmarkState> {
        match &self.data {
            EntityData::Landmark(l) => Some(l),
            _ => None,
        }
    }

    pub fn landmark_mut(&mut self) -> Option<&mut LandmarkState> {
        match &mut self.data {
            EntityData::Landmark(l) => Some(l),
            _ => None,
        }
    }

    pub fn disaster(&self) -> Option<&DisasterState> {
        match &self.data {
            EntityData::Disaster(d) => Some(d),
            _ => None,
        }
    }

    pub fn power_up(&self) -> Option<&PowerUpState> {
        match &self.data {
            EntityData::PowerUp(p) => Some(p),
            _ => None,
        }
    }
}

/// Arena of tracked entities, iterated in id order
#[derive(Debug, Clone, Default)]
pub struct EntityTracker {
    entries: BTreeMap<EntityId, TrackedEntity>,
    next_id: u32,
    spawned: Vec<EntityId>,
    removed: Vec<EntityId>,
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity; its logical position becomes the rescale source of truth
    pub fn track(&mut self, data: EntityData, logical: DVec2, sprite_size: DVec2) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.entries.insert(
            id,
            TrackedEntity {
                id,
                logical,
                sprite_size,
                data,
                derived: DerivedLayout::default(),
            },
        );
        self.spawned.push(id);
        id
    }

    pub fn untrack(&mut self, id: EntityId) -> Option<TrackedEntity> {
        let entry = self.entries.remove(&id)?;
        self.removed.push(id);
        Some(entry)
    }

    pub fn get(&self, id: EntityId) -> Option<&TrackedEntity> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut TrackedEntity> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedEntity> {
        self.entries.values_mut()
    }

    pub fn iter_class(&self, class: EntityClass) -> impl Iterator<Item = &TrackedEntity> {
        self.entries.values().filter(move |e| e.class() == class)
    }

    pub fn for_each_of_class(&self, class: EntityClass, mut f: impl FnMut(&TrackedEntity)) {
        for entry in self.iter_class(class) {
            f(entry);
        }
    }

    pub fn for_each_of_class_mut(&mut self, class: EntityClass, mut f: impl FnMut(&mut TrackedEntity)) {
        for entry in self.entries.values_mut().filter(|e| e.class() == class) {
            f(entry);
        }
    }

    pub fn ids_of_class(&self, class: EntityClass) -> Vec<EntityId> {
        self.iter_class(class).map(|e| e.id).collect()
    }

    pub fn count_of_class(&self, class: EntityClass) -> usize {
        self.iter_class(class).count()
    }

    /// Entities tracked since the last drain that are still alive
    pub fn drain_spawned(&mut self) -> Vec<EntityId> {
        let entries = &self.entries;
        let mut spawned = std::mem::take(&mut self.spawned);
        spawned.retain(|id| entries.contains_key(id));
        spawned
    }

    /// Entities untracked since the last drain
    pub fn drain_removed(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.removed)
    }
}
