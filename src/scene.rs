//! In-memory scene implementing every collaborator trait.
//!
//! Games with their own component storage implement the traits in
//! [`crate::api`] directly; this store backs tests, tools and small demos.

use std::collections::{HashMap, HashSet};

use glam::Vec2;

use crate::api::{Forces, Gameplay, Motions, Transforms};
use crate::gameplay::{Collectible, Health, Inventory, Status, Unlockable};
use crate::types::EntityId;

/// A force handed to the physics integrator.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedForce {
    pub entity: EntityId,
    pub tag: String,
    pub duration: f32,
    pub vector: Vec2,
}

#[derive(Copy, Clone, Debug)]
struct Transform {
    position: Vec2,
    /// World-space scale applied to the raw position for collision boxes.
    scale: f32,
}

#[derive(Default)]
pub struct SceneStore {
    transforms: HashMap<EntityId, Transform>,
    velocities: HashMap<EntityId, Vec2>,
    health: HashMap<EntityId, Health>,
    status: HashMap<EntityId, Status>,
    inventory: HashMap<EntityId, Inventory>,
    unlockable: HashMap<EntityId, Unlockable>,
    collectible: HashMap<EntityId, Collectible>,
    logic: HashMap<EntityId, String>,
    inactive: HashSet<EntityId>,
    forces: Vec<AppliedForce>,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or move) an entity with unit scale.
    pub fn spawn(&mut self, entity: EntityId, position: Vec2) {
        self.transforms.insert(entity, Transform { position, scale: 1.0 });
    }

    pub fn spawn_scaled(&mut self, entity: EntityId, position: Vec2, scale: f32) {
        self.transforms.insert(entity, Transform { position, scale });
    }

    pub fn despawn(&mut self, entity: EntityId) {
        self.transforms.remove(&entity);
        self.velocities.remove(&entity);
        self.health.remove(&entity);
        self.status.remove(&entity);
        self.inventory.remove(&entity);
        self.unlockable.remove(&entity);
        self.collectible.remove(&entity);
        self.logic.remove(&entity);
        self.inactive.remove(&entity);
    }

    pub fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.transforms.get(&entity).map(|t| t.position)
    }

    pub fn set_velocity(&mut self, entity: EntityId, velocity: Vec2) {
        self.velocities.insert(entity, velocity);
    }

    pub fn set_health(&mut self, entity: EntityId, health: Health) {
        self.health.insert(entity, health);
    }

    pub fn health(&self, entity: EntityId) -> Option<Health> {
        self.health.get(&entity).copied()
    }

    pub fn set_status(&mut self, entity: EntityId, status: Status) {
        self.status.insert(entity, status);
    }

    pub fn status(&self, entity: EntityId) -> Option<Status> {
        self.status.get(&entity).copied()
    }

    pub fn set_inventory(&mut self, entity: EntityId, inventory: Inventory) {
        self.inventory.insert(entity, inventory);
    }

    pub fn inventory(&self, entity: EntityId) -> Option<&Inventory> {
        self.inventory.get(&entity)
    }

    pub fn set_unlockable(&mut self, entity: EntityId, unlockable: Unlockable) {
        self.unlockable.insert(entity, unlockable);
    }

    pub fn set_collectible(&mut self, entity: EntityId, collectible: Collectible) {
        self.collectible.insert(entity, collectible);
    }

    pub fn set_logic(&mut self, entity: EntityId, callback: impl Into<String>) {
        self.logic.insert(entity, callback.into());
    }

    pub fn is_active(&self, entity: EntityId) -> bool {
        !self.inactive.contains(&entity)
    }

    pub fn forces(&self) -> &[AppliedForce] {
        &self.forces
    }

    pub fn drain_forces(&mut self) -> Vec<AppliedForce> {
        std::mem::take(&mut self.forces)
    }

    /// Advance status timers; an expired hit returns the entity to `Status::None`.
    pub fn tick(&mut self, dt: f32) {
        for status in self.status.values_mut() {
            if let Status::Hit { timer } = *status {
                let left = timer - dt;
                *status = if left > 0.0 { Status::Hit { timer: left } } else { Status::None };
            }
        }
    }

    /// Move every entity with a velocity by `velocity * dt`.
    pub fn integrate(&mut self, dt: f32) {
        for (entity, v) in &self.velocities {
            if let Some(t) = self.transforms.get_mut(entity) {
                t.position += *v * dt;
            }
        }
    }
}

impl Transforms for SceneStore {
    fn world_position(&self, entity: EntityId) -> Option<Vec2> {
        self.transforms.get(&entity).map(|t| t.position * t.scale)
    }

    fn raw_position(&self, entity: EntityId) -> Option<Vec2> {
        self.position(entity)
    }

    fn translate(&mut self, entity: EntityId, delta: Vec2) {
        // `delta` is in world space; stored positions are unscaled.
        if let Some(t) = self.transforms.get_mut(&entity) {
            t.position += if t.scale != 0.0 { delta / t.scale } else { delta };
        }
    }
}

impl Motions for SceneStore {
    fn velocity(&self, entity: EntityId) -> Option<Vec2> {
        self.velocities.get(&entity).copied()
    }
}

impl Forces for SceneStore {
    fn apply_force(&mut self, entity: EntityId, tag: &str, duration: f32, vector: Vec2) {
        self.forces.push(AppliedForce { entity, tag: tag.to_owned(), duration, vector });
    }
}

impl Gameplay for SceneStore {
    fn health_mut(&mut self, entity: EntityId) -> Option<&mut Health> {
        self.health.get_mut(&entity)
    }

    fn status_mut(&mut self, entity: EntityId) -> Option<&mut Status> {
        self.status.get_mut(&entity)
    }

    fn inventory_mut(&mut self, entity: EntityId) -> Option<&mut Inventory> {
        self.inventory.get_mut(&entity)
    }

    fn unlockable(&self, entity: EntityId) -> Option<&Unlockable> {
        self.unlockable.get(&entity)
    }

    fn collectible(&self, entity: EntityId) -> Option<&Collectible> {
        self.collectible.get(&entity)
    }

    fn logic(&self, entity: EntityId) -> Option<&str> {
        self.logic.get(&entity).map(String::as_str)
    }

    fn set_active(&mut self, entity: EntityId, active: bool) {
        if active {
            self.inactive.remove(&entity);
        } else {
            self.inactive.insert(entity);
        }
    }
}
