use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::types::*;

/// Narrowphase primitive tests for axis-aligned boxes.
pub struct Narrowphase;

/// Contact window along one axis, in seconds from the start of the frame.
#[derive(Copy, Clone, Debug)]
struct AxisWindow {
    first: f32,
    last: f32,
    /// Sign of the entry normal on this axis (0 when the axis was already overlapping).
    normal: f32,
}

impl Narrowphase {
    /// Inclusive interval overlap on both axes; touching edges count.
    #[inline]
    pub fn boxes_overlap(a_min: Vec2, a_max: Vec2, b_min: Vec2, b_max: Vec2) -> bool {
        a_min.x <= b_max.x && b_min.x <= a_max.x && a_min.y <= b_max.y && b_min.y <= a_max.y
    }

    /// Minimum translation vector for A out of B, also defined for boxes that
    /// are not yet overlapping (swept hits): depth is then clamped to zero and
    /// the normal still names the separating axis.
    pub fn min_translation(c0: Vec2, h0: Vec2, c1: Vec2, h1: Vec2) -> Overlap {
        let d = c1 - c0;
        let ox = (h0.x + h1.x) - d.x.abs();
        let oy = (h0.y + h1.y) - d.y.abs();

        // Axis of minimum penetration; normal points from B into A.
        let (depth, normal) = if ox <= oy {
            let nx = if d.x >= 0.0 { -1.0 } else { 1.0 };
            (ox, Vec2::new(nx, 0.0))
        } else {
            let ny = if d.y >= 0.0 { -1.0 } else { 1.0 };
            (oy, Vec2::new(0.0, ny))
        };
        Overlap { normal, depth: depth.max(0.0) }
    }

    /// A is held still and B moves with the relative velocity `v`.
    fn axis_window(a_lo: f32, a_hi: f32, b_lo: f32, b_hi: f32, v: f32, dt: f32, eps: f32) -> Option<AxisWindow> {
        let separated = b_hi < a_lo || a_hi < b_lo;
        if v.abs() < eps {
            // No motion on this axis: it only rules out contact, never times it.
            if separated {
                return None;
            }
            return Some(AxisWindow { first: 0.0, last: f32::INFINITY, normal: 0.0 });
        }

        let mut first = 0.0f32;
        let mut normal = 0.0f32;
        let last;
        if v < 0.0 {
            if b_hi < a_lo {
                return None; // moving apart
            }
            if a_hi < b_lo {
                first = (a_hi - b_lo) / v;
                normal = -1.0;
            }
            last = (a_lo - b_hi) / v;
        } else {
            if b_lo > a_hi {
                return None;
            }
            if b_hi < a_lo {
                first = (a_lo - b_hi) / v;
                normal = 1.0;
            }
            last = (a_hi - b_lo) / v;
        }

        if first > dt {
            return None;
        }
        Some(AxisWindow { first: first.max(0.0), last: last.min(dt), normal })
    }
}

impl NarrowphaseApi for Narrowphase {
    fn sweep_aabb_aabb(
        a_min: Vec2,
        a_max: Vec2,
        vel_a: Vec2,
        b_min: Vec2,
        b_max: Vec2,
        vel_b: Vec2,
        dt: f32,
        eps: f32,
    ) -> Option<SweepHit> {
        // Spawn overlap or unresolved penetration from the previous frame.
        if Self::boxes_overlap(a_min, a_max, b_min, b_max) {
            return Some(SweepHit { toi: 0.0, normal: Vec2::ZERO });
        }

        let vb = vel_b - vel_a;
        if vb.x.abs() < eps && vb.y.abs() < eps {
            return None;
        }

        let x = Self::axis_window(a_min.x, a_max.x, b_min.x, b_max.x, vb.x, dt, eps)?;
        let y = Self::axis_window(a_min.y, a_max.y, b_min.y, b_max.y, vb.y, dt, eps)?;

        let first = x.first.max(y.first);
        let last = x.last.min(y.last);
        if first > last {
            return None;
        }

        let normal = if x.first >= y.first && x.normal != 0.0 {
            Vec2::new(x.normal, 0.0)
        } else {
            Vec2::new(0.0, y.normal)
        };
        Some(SweepHit { toi: first, normal })
    }

    fn overlap_aabb_aabb(c0: Vec2, h0: Vec2, c1: Vec2, h1: Vec2) -> Option<Overlap> {
        let d = c1 - c0;
        let ox = (h0.x + h1.x) - d.x.abs();
        let oy = (h0.y + h1.y) - d.y.abs();
        if ox < 0.0 || oy < 0.0 {
            return None;
        }
        Some(Self::min_translation(c0, h0, c1, h1))
    }

    fn overlap_point_aabb(p: Vec2, min: Vec2, max: Vec2) -> bool {
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }
}
