use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::narrowphase::Narrowphase;
use crate::types::{ClickBox, EntityId};

/// Static point-in-box query for UI picking. Edges count as inside.
pub fn cursor_hit(point: Vec2, bbox: &ClickBox) -> bool {
    bbox.alive && Narrowphase::overlap_point_aabb(point, bbox.bottom_left, bbox.top_right)
}

/// Topmost element under the cursor.
///
/// `layers` are ordered back to front as they are drawn, and elements inside a
/// layer likewise, so the scan runs in reverse and the first hit wins.
pub fn pick_topmost(point: Vec2, layers: &[&[ClickBox]]) -> Option<EntityId> {
    layers
        .iter()
        .rev()
        .flat_map(|layer| layer.iter().rev())
        .find(|b| cursor_hit(point, b))
        .map(|b| b.entity)
}
