//! Dense, generation-counted storage for registered collision boxes.
//!
//! Handles stay valid across frames and are never reused for a different box
//! without bumping the generation, so a handle held past deregistration is
//! detected instead of silently aliasing a newer box.

use std::collections::HashMap;

use glam::Vec2;

use crate::error::{CollisionError, Result};
use crate::types::*;

#[derive(Debug)]
struct Slot {
    generation: u32,
    bbox: Option<BoundingBox>,
    /// Owner had a transform during the last refresh.
    present: bool,
}

#[derive(Debug, Default)]
pub struct BoxStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_entity: HashMap<EntityId, BoxHandle>,
}

impl BoxStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: EntityId, desc: BoxDesc) -> Result<BoxHandle> {
        if self.by_entity.contains_key(&entity) {
            return Err(CollisionError::AlreadyRegistered(entity));
        }
        let bbox = BoundingBox::new(entity, desc);
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.bbox = Some(bbox);
                slot.present = false;
                BoxHandle { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, bbox: Some(bbox), present: false });
                BoxHandle { index, generation: 0 }
            }
        };
        self.by_entity.insert(entity, handle);
        Ok(handle)
    }

    pub fn remove(&mut self, handle: BoxHandle) -> Result<BoundingBox> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .ok_or(CollisionError::StaleHandle(handle))?;
        let bbox = slot.bbox.take().ok_or(CollisionError::StaleHandle(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.present = false;
        self.free.push(handle.index);
        self.by_entity.remove(&bbox.entity);
        Ok(bbox)
    }

    pub fn handle_of(&self, entity: EntityId) -> Option<BoxHandle> {
        self.by_entity.get(&entity).copied()
    }

    pub fn get(&self, handle: BoxHandle) -> Option<&BoundingBox> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.bbox.as_ref())
    }

    pub fn get_mut(&mut self, handle: BoxHandle) -> Option<&mut BoundingBox> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.bbox.as_mut())
    }

    /// Live and positioned this frame: the only boxes that take part in testing.
    pub fn is_active(&self, handle: BoxHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.present)
            .and_then(|s| s.bbox.as_ref())
            .is_some_and(|b| b.alive)
    }

    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }

    /// All registered boxes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BoxHandle, &BoundingBox)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.bbox
                .as_ref()
                .map(|b| (BoxHandle { index: i as u32, generation: s.generation }, b))
        })
    }

    /// Boxes that are live and were positioned by the last refresh, in slot order.
    pub fn iter_active(&self) -> impl Iterator<Item = (BoxHandle, &BoundingBox)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| match &s.bbox {
            Some(b) if s.present && b.alive => Some((BoxHandle { index: i as u32, generation: s.generation }, b)),
            _ => None,
        })
    }

    /// Recompute every box from its owner's position and clear `collided`.
    /// Returns how many boxes were positioned.
    pub fn refresh(&mut self, position_of: impl Fn(EntityId) -> Option<Vec2>) -> usize {
        let mut positioned = 0;
        for slot in &mut self.slots {
            let Some(bbox) = slot.bbox.as_mut() else { continue };
            bbox.collided = false;
            match position_of(bbox.entity) {
                Some(p) => {
                    bbox.refresh(p);
                    slot.present = true;
                    positioned += 1;
                }
                None => {
                    log::debug!("no transform for {:?}; box skipped this frame", bbox.entity);
                    slot.present = false;
                }
            }
        }
        positioned
    }
}
