//! Table-driven collision responses.
//!
//! Each entry is keyed by an ordered `(subject, other)` layer pair. A pair of
//! layers has at most one entry in either order, so a colliding box pair is
//! resolved exactly once no matter which way round the engine visits it.

use std::collections::HashMap;
use std::fmt;

use glam::Vec2;
use log::warn;

use crate::api::Scene;
use crate::effects;
use crate::error::Result;
use crate::gameplay::GameEvent;
use crate::narrowphase::Narrowphase;
use crate::types::*;

/// One side of a confirmed collision, snapshotted when the pair was tested.
#[derive(Copy, Clone, Debug)]
pub struct ContactBox {
    pub handle: BoxHandle,
    pub entity: EntityId,
    pub layer: LayerId,
    pub center: Vec2,
    pub half_extent: Vec2,
    pub velocity: Vec2,
}

impl ContactBox {
    pub fn from_box(handle: BoxHandle, bbox: &BoundingBox, velocity: Vec2) -> Self {
        Self {
            handle,
            entity: bbox.entity,
            layer: bbox.layer,
            center: bbox.center(),
            half_extent: bbox.half_extent,
            velocity,
        }
    }

    pub fn movable(&self) -> bool {
        !self.layer.is_static()
    }
}

/// Confirmed collision between the two layers of a table entry, in key order.
#[derive(Copy, Clone, Debug)]
pub struct Contact {
    pub subject: ContactBox,
    pub other: ContactBox,
    /// First contact time within the frame.
    pub toi: f32,
    pub dt: f32,
}

impl Contact {
    pub fn swapped(self) -> Self {
        Self { subject: self.other, other: self.subject, ..self }
    }

    /// Frame time left after first contact.
    pub fn remaining(&self) -> f32 {
        (self.dt - self.toi).max(0.0)
    }

    /// The box physics separation repositions: the movable box closing in
    /// faster along the contact normal, the subject on ties. `None` when both
    /// sides are static.
    pub fn mover(&self) -> Option<(&ContactBox, &ContactBox)> {
        match (self.subject.movable(), self.other.movable()) {
            (true, true) => {
                let (s, o) = (&self.subject, &self.other);
                // Points from the other box into the subject.
                let n = Narrowphase::min_translation(s.center, s.half_extent, o.center, o.half_extent).normal;
                if o.velocity.dot(n) > -s.velocity.dot(n) {
                    Some((o, s))
                } else {
                    Some((s, o))
                }
            }
            (true, false) => Some((&self.subject, &self.other)),
            (false, true) => Some((&self.other, &self.subject)),
            (false, false) => None,
        }
    }
}

/// What a gameplay handler wants done after it ran.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing happened; the boxes are not flagged.
    Ignore,
    /// Handled without geometric correction.
    Resolved,
    /// Handled, and physics separation should run as well.
    Separate,
}

/// Mutable state a response may touch while resolving one contact.
pub struct EffectCtx<'a> {
    pub scene: &'a mut dyn Scene,
    pub cfg: &'a EngineConfig,
    events: &'a mut Vec<GameEvent>,
    deactivated: Vec<BoxHandle>,
}

impl<'a> EffectCtx<'a> {
    pub fn new(scene: &'a mut dyn Scene, cfg: &'a EngineConfig, events: &'a mut Vec<GameEvent>) -> Self {
        Self { scene, cfg, events, deactivated: Vec::new() }
    }

    pub fn emit(&mut self, event: GameEvent) {
        if self.events.len() < self.cfg.max_events {
            self.events.push(event);
        } else {
            warn!("event buffer full ({}), dropping {event:?}", self.cfg.max_events);
        }
    }

    /// Mark a box dead; the engine applies this before testing the next pair.
    pub fn deactivate(&mut self, handle: BoxHandle) {
        self.deactivated.push(handle);
    }

    pub fn take_deactivated(&mut self) -> Vec<BoxHandle> {
        std::mem::take(&mut self.deactivated)
    }
}

/// Gameplay handler invoked for a contact.
pub type EffectFn = fn(&mut EffectCtx<'_>, &Contact) -> Result<Resolution>;

#[derive(Copy, Clone)]
pub enum Response {
    /// Push the boxes apart along the minimum translation axis.
    Separate,
    /// Hand a force to the other box instead of repositioning it.
    Push { tag: &'static str },
    Effect(EffectFn),
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Separate => f.write_str("Separate"),
            Response::Push { tag } => f.debug_struct("Push").field("tag", tag).finish(),
            Response::Effect(_) => f.write_str("Effect(..)"),
        }
    }
}

impl Response {
    /// Run the response. Returns whether the contact counts as resolved.
    pub fn apply(self, ctx: &mut EffectCtx<'_>, contact: &Contact) -> Result<bool> {
        match self {
            Response::Separate => Ok(separate(ctx, contact)),
            Response::Push { tag } => Ok(push(ctx, contact, tag)),
            Response::Effect(handler) => match handler(ctx, contact)? {
                Resolution::Ignore => Ok(false),
                Resolution::Resolved => Ok(true),
                Resolution::Separate => {
                    separate(ctx, contact);
                    Ok(true)
                }
            },
        }
    }
}

/// Move the mover back by the unconsumed part of its approach and push the
/// pair apart by a damped share of the penetration. Returns whether anything moved.
pub fn separate(ctx: &mut EffectCtx<'_>, contact: &Contact) -> bool {
    let Some((mover, other)) = contact.mover() else { return false };
    let mtv = Narrowphase::min_translation(mover.center, mover.half_extent, other.center, other.half_extent);
    let n = mtv.normal;

    let approach = (-mover.velocity.dot(n)).max(0.0);
    let back = n * approach * contact.remaining();
    let push = n * mtv.depth * ctx.cfg.separation_damping;
    if back == Vec2::ZERO && push == Vec2::ZERO {
        return false;
    }

    if other.movable() {
        ctx.scene.translate(mover.entity, back);
        ctx.scene.translate(other.entity, -push);
    } else {
        ctx.scene.translate(mover.entity, back + push);
    }
    true
}

/// Force injection: the subject shoves the other along the contact normal.
/// Returns false when the pair is not closing, in which case no force is queued.
pub fn push(ctx: &mut EffectCtx<'_>, contact: &Contact, tag: &str) -> bool {
    let s = &contact.subject;
    let o = &contact.other;
    let mtv = Narrowphase::min_translation(s.center, s.half_extent, o.center, o.half_extent);
    let dir = -mtv.normal;
    let approach = (s.velocity - o.velocity).dot(dir);
    if approach <= 0.0 {
        return false;
    }
    let force = dir * approach * ctx.cfg.push_strength;
    ctx.scene.apply_force(o.entity, tag, contact.remaining(), force);
    true
}

/// Ordered layer-pair → response lookup, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct ResponseTable {
    entries: HashMap<(LayerId, LayerId), Response>,
}

impl ResponseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The game's default interactions.
    pub fn standard() -> Self {
        use LayerId::*;
        let mut t = Self::new();
        t.insert(Player, Tiles, Response::Separate);
        t.insert(Player, SolidEnvironment, Response::Separate);
        t.insert(Player, Gate, Response::Effect(effects::unlock_gate));
        t.insert(Player, Collectible, Response::Effect(effects::collect_item));
        t.insert(Player, Goal, Response::Effect(effects::reach_goal));
        t.insert(Player, Pushable, Response::Push { tag: "push" });
        t.insert(Player, Interactable, Response::Effect(effects::interact));
        t.insert(Player, DecorativeTrigger, Response::Effect(effects::trigger));
        t.insert(Enemy, Player, Response::Effect(effects::damage_player));
        t.insert(Enemy, Enemy, Response::Separate);
        t.insert(Enemy, Tiles, Response::Separate);
        t.insert(Enemy, SolidEnvironment, Response::Separate);
        t.insert(Enemy, Gate, Response::Separate);
        t.insert(Pushable, Tiles, Response::Separate);
        t.insert(Pushable, SolidEnvironment, Response::Separate);
        t
    }

    /// Declare the response for `subject` hitting `other`. A previously
    /// declared `(other, subject)` entry is dropped.
    pub fn insert(&mut self, subject: LayerId, other: LayerId, response: Response) {
        if subject != other && self.entries.remove(&(other, subject)).is_some() {
            warn!("response for ({other:?}, {subject:?}) replaced by ({subject:?}, {other:?})");
        }
        self.entries.insert((subject, other), response);
    }

    pub fn remove(&mut self, subject: LayerId, other: LayerId) -> Option<Response> {
        self.entries.remove(&(subject, other))
    }

    /// Look up the response for boxes on layers `a` and `b`. The flag is true
    /// when the entry is declared as `(b, a)`, meaning the caller must swap.
    pub fn lookup(&self, a: LayerId, b: LayerId) -> Option<(Response, bool)> {
        if let Some(r) = self.entries.get(&(a, b)) {
            return Some((*r, false));
        }
        self.entries.get(&(b, a)).map(|r| (*r, true))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneStore;
    use approx::assert_relative_eq;

    fn cbox(id: u64, layer: LayerId, center: Vec2, velocity: Vec2) -> ContactBox {
        ContactBox {
            handle: BoxHandle { index: id as u32, generation: 0 },
            entity: EntityId(id),
            layer,
            center,
            half_extent: Vec2::splat(0.5),
            velocity,
        }
    }

    #[test]
    fn test_lookup_finds_either_order() {
        let t = ResponseTable::standard();
        let (r, swapped) = t.lookup(LayerId::Enemy, LayerId::Player).unwrap();
        assert!(matches!(r, Response::Effect(_)));
        assert!(!swapped);
        let (_, swapped) = t.lookup(LayerId::Player, LayerId::Enemy).unwrap();
        assert!(swapped);
        assert!(t.lookup(LayerId::Player, LayerId::Burrowable).is_none());
    }

    #[test]
    fn test_insert_replaces_reverse_entry() {
        let mut t = ResponseTable::new();
        t.insert(LayerId::Player, LayerId::Pushable, Response::Separate);
        t.insert(LayerId::Pushable, LayerId::Player, Response::Push { tag: "shove" });
        assert_eq!(t.len(), 1);
        let (r, swapped) = t.lookup(LayerId::Player, LayerId::Pushable).unwrap();
        assert!(swapped);
        assert!(matches!(r, Response::Push { tag: "shove" }));
    }

    #[test]
    fn test_mover_is_faster_movable_box() {
        let c = Contact {
            subject: cbox(1, LayerId::Enemy, Vec2::ZERO, Vec2::new(1.0, 0.0)),
            other: cbox(2, LayerId::Player, Vec2::new(0.9, 0.0), Vec2::new(-3.0, 0.0)),
            toi: 0.0,
            dt: 1.0,
        };
        assert_eq!(c.mover().unwrap().0.entity, EntityId(2));

        let c = Contact { other: cbox(2, LayerId::Tiles, Vec2::new(0.9, 0.0), Vec2::new(-3.0, 0.0)), ..c };
        assert_eq!(c.mover().unwrap().0.entity, EntityId(1));

        let c = Contact { subject: cbox(1, LayerId::Gate, Vec2::ZERO, Vec2::ZERO), ..c };
        assert!(c.mover().is_none());
    }

    #[test]
    fn test_mover_ignores_sideways_speed() {
        let c = Contact {
            subject: cbox(1, LayerId::Enemy, Vec2::ZERO, Vec2::new(0.0, 30.0)),
            other: cbox(2, LayerId::Enemy, Vec2::new(1.01, 0.0), Vec2::new(-3.0, 0.0)),
            toi: 0.0,
            dt: 1.0 / 60.0,
        };
        assert_eq!(c.mover().unwrap().0.entity, EntityId(2));
    }

    #[test]
    fn test_idle_responses_do_not_count_as_resolved() {
        let mut scene = SceneStore::new();
        let cfg = EngineConfig::default();
        let mut events = Vec::new();
        let mut ctx = EffectCtx::new(&mut scene, &cfg, &mut events);

        // Resting contact against a pushable: not closing, so no force.
        let resting = Contact {
            subject: cbox(1, LayerId::Player, Vec2::ZERO, Vec2::ZERO),
            other: cbox(2, LayerId::Pushable, Vec2::new(1.0, 0.0), Vec2::ZERO),
            toi: 0.0,
            dt: 0.1,
        };
        assert_eq!(Response::Push { tag: "push" }.apply(&mut ctx, &resting), Ok(false));
        assert_eq!(Response::Separate.apply(&mut ctx, &resting), Ok(false));

        let both_static = Contact {
            subject: cbox(1, LayerId::Gate, Vec2::ZERO, Vec2::ZERO),
            other: cbox(2, LayerId::Tiles, Vec2::new(0.5, 0.0), Vec2::ZERO),
            ..resting
        };
        assert_eq!(Response::Separate.apply(&mut ctx, &both_static), Ok(false));
        assert!(scene.forces().is_empty());
    }

    #[test]
    fn test_separate_against_static_moves_only_mover() {
        let mut scene = SceneStore::new();
        scene.spawn(EntityId(1), Vec2::ZERO);
        scene.spawn(EntityId(2), Vec2::new(0.9, 0.0));
        let cfg = EngineConfig::default();
        let mut events = Vec::new();
        let c = Contact {
            subject: cbox(1, LayerId::Player, Vec2::ZERO, Vec2::new(5.0, 0.0)),
            other: cbox(2, LayerId::Tiles, Vec2::new(0.9, 0.0), Vec2::ZERO),
            toi: 0.0,
            dt: 0.1,
        };
        let mut ctx = EffectCtx::new(&mut scene, &cfg, &mut events);
        assert!(Response::Separate.apply(&mut ctx, &c).unwrap());

        // back-off 5 * 0.1 plus damped 0.1 penetration, along -x
        let p = scene.position(EntityId(1)).unwrap();
        assert_relative_eq!(p.x, -(0.5 + 0.1 * 0.7), epsilon = 1e-5);
        assert_eq!(scene.position(EntityId(2)).unwrap(), Vec2::new(0.9, 0.0));
    }

    #[test]
    fn test_separate_between_movables_splits_correction() {
        let mut scene = SceneStore::new();
        scene.spawn(EntityId(1), Vec2::ZERO);
        scene.spawn(EntityId(2), Vec2::new(0.9, 0.0));
        let cfg = EngineConfig::default();
        let mut events = Vec::new();
        let c = Contact {
            subject: cbox(1, LayerId::Enemy, Vec2::ZERO, Vec2::new(2.0, 0.0)),
            other: cbox(2, LayerId::Enemy, Vec2::new(0.9, 0.0), Vec2::ZERO),
            toi: 0.05,
            dt: 0.1,
        };
        let mut ctx = EffectCtx::new(&mut scene, &cfg, &mut events);
        assert!(separate(&mut ctx, &c));

        assert_relative_eq!(scene.position(EntityId(1)).unwrap().x, -2.0 * 0.05, epsilon = 1e-5);
        assert_relative_eq!(scene.position(EntityId(2)).unwrap().x, 0.9 + 0.1 * 0.7, epsilon = 1e-5);
    }

    #[test]
    fn test_push_hands_force_to_other() {
        let mut scene = SceneStore::new();
        let cfg = EngineConfig::default();
        let mut events = Vec::new();
        let c = Contact {
            subject: cbox(1, LayerId::Player, Vec2::ZERO, Vec2::new(3.0, 0.0)),
            other: cbox(2, LayerId::Pushable, Vec2::new(0.95, 0.0), Vec2::ZERO),
            toi: 0.0,
            dt: 0.1,
        };
        let mut ctx = EffectCtx::new(&mut scene, &cfg, &mut events);
        assert!(Response::Push { tag: "push" }.apply(&mut ctx, &c).unwrap());

        let forces = scene.forces();
        assert_eq!(forces.len(), 1);
        assert_eq!(forces[0].entity, EntityId(2));
        assert_eq!(forces[0].tag, "push");
        assert_relative_eq!(forces[0].duration, 0.1);
        assert_eq!(forces[0].vector, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_event_buffer_is_capped() {
        let mut scene = SceneStore::new();
        let cfg = EngineConfig { max_events: 1, ..EngineConfig::default() };
        let mut events = Vec::new();
        let mut ctx = EffectCtx::new(&mut scene, &cfg, &mut events);
        ctx.emit(GameEvent::Defeated { entity: EntityId(1) });
        ctx.emit(GameEvent::Defeated { entity: EntityId(2) });
        assert_eq!(events.len(), 1);
    }
}
