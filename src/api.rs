use glam::Vec2;

use crate::boxes::BoxStore;
use crate::gameplay::{Collectible, Health, Inventory, Status, Unlockable};
use crate::types::*;

/// Broadphase contract consumed by the engine.
pub trait Partitioner {
    /// Re-bucket every live box for this frame.
    fn rebuild(&mut self, boxes: &BoxStore);

    /// Grid dimensions as `(cols, rows)`.
    fn axis_sizes(&self) -> (usize, usize);

    /// Cheap pre-filter: true iff the cell holds at least two candidates.
    fn cell_has_candidates(&self, col: usize, row: usize) -> bool;

    /// Boxes bucketed into the given cell, in insertion order.
    fn candidates_in_cell(&self, col: usize, row: usize) -> &[BoxHandle];
}

/// Primitive geometric tests used by the engine and response handlers.
pub trait NarrowphaseApi {
    /// Swept AABB test over one frame of length `dt`. Velocities are per second.
    fn sweep_aabb_aabb(
        a_min: Vec2,
        a_max: Vec2,
        vel_a: Vec2,
        b_min: Vec2,
        b_max: Vec2,
        vel_b: Vec2,
        dt: f32,
        eps: f32,
    ) -> Option<SweepHit>;

    /// Minimum translation vector between two centered boxes.
    fn overlap_aabb_aabb(c0: Vec2, h0: Vec2, c1: Vec2, h1: Vec2) -> Option<Overlap>;

    /// Inclusive containment of `p` in `[min, max]`.
    fn overlap_point_aabb(p: Vec2, min: Vec2, max: Vec2) -> bool;
}

// --- Collaborators ---------------------------------------------------------

/// World transform access.
pub trait Transforms {
    /// Scaled world position used for collision boxes.
    fn world_position(&self, entity: EntityId) -> Option<Vec2>;

    /// Raw transform position used for UI click boxes.
    fn raw_position(&self, entity: EntityId) -> Option<Vec2>;

    /// Shift the owner by `delta`. Unknown entities are ignored.
    fn translate(&mut self, entity: EntityId, delta: Vec2);
}

pub trait Motions {
    /// Velocity in world units per second; `None` for entities without motion.
    fn velocity(&self, entity: EntityId) -> Option<Vec2>;
}

pub trait Forces {
    /// Queue a tagged force on `entity` for `duration` seconds.
    fn apply_force(&mut self, entity: EntityId, tag: &str, duration: f32, vector: Vec2);
}

/// Gameplay component accessors used only inside specific response handlers.
pub trait Gameplay {
    fn health_mut(&mut self, entity: EntityId) -> Option<&mut Health>;
    fn status_mut(&mut self, entity: EntityId) -> Option<&mut Status>;
    fn inventory_mut(&mut self, entity: EntityId) -> Option<&mut Inventory>;
    fn unlockable(&self, entity: EntityId) -> Option<&Unlockable>;
    fn collectible(&self, entity: EntityId) -> Option<&Collectible>;
    /// Named logic callback attached to an interactable or trigger.
    fn logic(&self, entity: EntityId) -> Option<&str>;
    /// Enable or disable the owning entity.
    fn set_active(&mut self, entity: EntityId, active: bool);
}

/// Everything the engine needs from the surrounding game for one update.
pub trait Scene: Transforms + Motions + Forces + Gameplay {}

impl<T: Transforms + Motions + Forces + Gameplay> Scene for T {}

/// Debug renderer hook.
pub trait DebugDraw {
    fn draw_box(&mut self, min: Vec2, max: Vec2, color: DebugColor);
}
