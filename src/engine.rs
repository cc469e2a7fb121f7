use glam::Vec2;
use log::{debug, trace, warn};

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::api::{DebugDraw, NarrowphaseApi, Partitioner, Scene};
use crate::boxes::BoxStore;
use crate::cursor;
use crate::error::{CollisionError, Result};
use crate::gameplay::GameEvent;
use crate::grid::UniformGrid;
use crate::layers::LayerMatrix;
use crate::narrowphase::Narrowphase;
use crate::response::{Contact, ContactBox, EffectCtx, ResponseTable};
use crate::types::*;

/// Layer → entity → box grouping for one grid cell. Rebuilt per cell, per frame.
type Cell = BTreeMap<LayerId, BTreeMap<EntityId, BoxHandle>>;

/// Per-frame collision pass: refresh, broadphase, layer filtering, swept
/// narrowphase and table-driven responses.
pub struct CollisionEngine<P: Partitioner = UniformGrid> {
    pub cfg: EngineConfig,
    frame: u64,

    boxes: BoxStore,
    /// UI boxes in registration order, with whether they were positioned this frame.
    clicks: Vec<(ClickBox, bool)>,
    partitioner: P,
    matrix: LayerMatrix,
    responses: ResponseTable,

    // Frame-local results
    contacts: HashSet<(EntityId, LayerId)>,
    events: Vec<GameEvent>,
    stats: FrameStats,
    last_timing: Option<EngineTiming>,
}

impl CollisionEngine<UniformGrid> {
    /// Engine with the standard layer matrix and response table over a default grid.
    pub fn new(cfg: EngineConfig) -> Self {
        Self::with_parts(cfg, UniformGrid::default(), LayerMatrix::standard(), ResponseTable::standard())
    }

    pub fn with_grid(cfg: EngineConfig, grid: GridConfig) -> Self {
        Self::with_parts(cfg, UniformGrid::new(grid), LayerMatrix::standard(), ResponseTable::standard())
    }
}

impl<P: Partitioner> CollisionEngine<P> {
    pub fn with_parts(cfg: EngineConfig, partitioner: P, mut matrix: LayerMatrix, responses: ResponseTable) -> Self {
        matrix.set_mutual_consent(cfg.require_mutual_consent);
        Self {
            cfg,
            frame: 0,
            boxes: BoxStore::new(),
            clicks: Vec::new(),
            partitioner,
            matrix,
            responses,
            contacts: HashSet::new(),
            events: Vec::new(),
            stats: FrameStats::default(),
            last_timing: None,
        }
    }

    pub fn matrix(&self) -> &LayerMatrix {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut LayerMatrix {
        &mut self.matrix
    }

    pub fn responses_mut(&mut self) -> &mut ResponseTable {
        &mut self.responses
    }

    pub fn boxes(&self) -> &BoxStore {
        &self.boxes
    }

    // --- Lifecycle ---------------------------------------------------------

    /// Called when a collider component initialises.
    pub fn register_box(&mut self, entity: EntityId, desc: BoxDesc) -> Result<BoxHandle> {
        let handle = self.boxes.insert(entity, desc)?;
        debug!("registered {:?} box for {entity:?} as {handle:?}", desc.layer);
        Ok(handle)
    }

    /// Called when the collider component (or its entity) is destroyed.
    pub fn deregister_box(&mut self, handle: BoxHandle) -> Result<BoundingBox> {
        let bbox = self.boxes.remove(handle)?;
        debug!("deregistered box {handle:?} of {:?}", bbox.entity);
        Ok(bbox)
    }

    pub fn deregister_entity(&mut self, entity: EntityId) -> Option<BoundingBox> {
        self.deregister_click_box(entity);
        let handle = self.boxes.handle_of(entity)?;
        self.deregister_box(handle).ok()
    }

    pub fn set_alive(&mut self, handle: BoxHandle, alive: bool) -> Result<()> {
        let bbox = self.boxes.get_mut(handle).ok_or(CollisionError::StaleHandle(handle))?;
        bbox.alive = alive;
        Ok(())
    }

    pub fn get(&self, handle: BoxHandle) -> Option<&BoundingBox> {
        self.boxes.get(handle)
    }

    pub fn handle_of(&self, entity: EntityId) -> Option<BoxHandle> {
        self.boxes.handle_of(entity)
    }

    /// Register (or replace) the UI box of `entity`.
    pub fn register_click_box(&mut self, entity: EntityId, half_extent: Vec2, depth: u16) {
        let bbox = ClickBox::new(entity, half_extent, depth);
        match self.clicks.iter_mut().find(|(c, _)| c.entity == entity) {
            Some(slot) => *slot = (bbox, false),
            None => self.clicks.push((bbox, false)),
        }
    }

    pub fn deregister_click_box(&mut self, entity: EntityId) -> bool {
        let before = self.clicks.len();
        self.clicks.retain(|(c, _)| c.entity != entity);
        self.clicks.len() != before
    }

    // --- Frame -------------------------------------------------------------

    /// Run one collision pass over a frame of `dt` seconds.
    pub fn update(&mut self, dt: f32, scene: &mut dyn Scene) {
        let timing = self.cfg.enable_timing;
        let t_all = timing.then(Instant::now);
        self.frame = self.frame.wrapping_add(1);
        self.contacts.clear();
        self.stats = FrameStats { frame: self.frame, ..FrameStats::default() };
        self.last_timing = None;

        // Every box is refreshed before any pair is tested.
        let t0 = timing.then(Instant::now);
        self.stats.boxes = self.boxes.refresh(|e| scene.world_position(e));
        for (click, present) in &mut self.clicks {
            let raw = scene.raw_position(click.entity);
            if let Some(p) = raw {
                click.refresh(p);
            }
            *present = raw.is_some();
        }
        let refresh_ms = elapsed_ms(t0);

        let t1 = timing.then(Instant::now);
        self.partitioner.rebuild(&self.boxes);
        let partition_ms = elapsed_ms(t1);

        let t2 = timing.then(Instant::now);
        let mut seen: HashSet<(BoxHandle, BoxHandle)> = HashSet::new();
        let mut cell = Cell::new();
        let (cols, rows) = self.partitioner.axis_sizes();
        for row in 0..rows {
            for col in 0..cols {
                if !self.partitioner.cell_has_candidates(col, row) {
                    continue;
                }
                self.stats.cells_scanned += 1;
                self.fill_cell(&mut cell, col, row);
                self.test_cell(&cell, dt, scene, &mut seen);
            }
        }
        let pairs_ms = elapsed_ms(t2);
        trace!("frame {}: {:?}", self.frame, self.stats);

        if let Some(t_all) = t_all {
            self.last_timing = Some(EngineTiming {
                refresh_ms,
                partition_ms,
                pairs_ms,
                total_ms: t_all.elapsed().as_secs_f64() * 1000.0,
            });
        }
    }

    fn fill_cell(&self, cell: &mut Cell, col: usize, row: usize) {
        cell.clear();
        for &h in self.partitioner.candidates_in_cell(col, row) {
            if !self.boxes.is_active(h) {
                continue;
            }
            if let Some(b) = self.boxes.get(h) {
                cell.entry(b.layer).or_default().insert(b.entity, h);
            }
        }
    }

    /// Visit every unordered layer pair of the cell once.
    fn test_cell(&mut self, cell: &Cell, dt: f32, scene: &mut dyn Scene, seen: &mut HashSet<(BoxHandle, BoxHandle)>) {
        let groups: Vec<(LayerId, Vec<BoxHandle>)> =
            cell.iter().map(|(l, members)| (*l, members.values().copied().collect())).collect();

        for (i, (la, ga)) in groups.iter().enumerate() {
            for (lb, gb) in &groups[i..] {
                self.stats.layer_pairs_considered += 1;
                if !self.matrix.allows(*la, *lb) {
                    self.stats.layer_pairs_rejected += 1;
                    continue;
                }
                if la == lb {
                    for (x, &a) in ga.iter().enumerate() {
                        for &b in &ga[x + 1..] {
                            self.test_pair(a, b, dt, scene, seen);
                        }
                    }
                } else {
                    for &a in ga {
                        for &b in gb {
                            self.test_pair(a, b, dt, scene, seen);
                        }
                    }
                }
            }
        }
    }

    fn test_pair(
        &mut self,
        a: BoxHandle,
        b: BoxHandle,
        dt: f32,
        scene: &mut dyn Scene,
        seen: &mut HashSet<(BoxHandle, BoxHandle)>,
    ) {
        // Boxes spanning several cells meet more than once.
        let key = if a < b { (a, b) } else { (b, a) };
        if !seen.insert(key) {
            return;
        }
        // An earlier response this frame may have switched one of them off.
        if !self.boxes.is_active(a) || !self.boxes.is_active(b) {
            return;
        }
        let (Some(ba), Some(bb)) = (self.boxes.get(a).copied(), self.boxes.get(b).copied()) else {
            return;
        };

        let va = scene.velocity(ba.entity).unwrap_or(Vec2::ZERO);
        let vb = scene.velocity(bb.entity).unwrap_or(Vec2::ZERO);
        self.stats.narrowphase_tests += 1;
        let Some(hit) = Narrowphase::sweep_aabb_aabb(
            ba.bottom_left,
            ba.top_right,
            va,
            bb.bottom_left,
            bb.top_right,
            vb,
            dt,
            self.cfg.epsilon,
        ) else {
            return;
        };

        self.stats.collisions += 1;
        trace!("frame {}: {:?}({:?}) x {:?}({:?}) toi={:.5}", self.frame, ba.entity, ba.layer, bb.entity, bb.layer, hit.toi);
        self.contacts.insert((ba.entity, bb.layer));
        self.contacts.insert((bb.entity, ba.layer));

        let Some((response, swapped)) = self.responses.lookup(ba.layer, bb.layer) else {
            return;
        };
        let mut contact = Contact {
            subject: ContactBox::from_box(a, &ba, va),
            other: ContactBox::from_box(b, &bb, vb),
            toi: hit.toi,
            dt,
        };
        if swapped {
            contact = contact.swapped();
        }

        let mut ctx = EffectCtx::new(scene, &self.cfg, &mut self.events);
        let outcome = response.apply(&mut ctx, &contact);
        let dead = ctx.take_deactivated();
        for h in dead {
            if let Some(bbox) = self.boxes.get_mut(h) {
                bbox.alive = false;
            }
        }

        match outcome {
            Ok(true) => {
                self.stats.responses += 1;
                for h in [a, b] {
                    if let Some(bbox) = self.boxes.get_mut(h) {
                        bbox.collided = true;
                    }
                }
            }
            Ok(false) => {}
            Err(e) => {
                self.stats.aborted_responses += 1;
                warn!("frame {}: response {response:?} for {:?} x {:?} aborted: {e}", self.frame, ba.entity, bb.entity);
            }
        }
    }

    // --- Queries -----------------------------------------------------------

    /// Whether `entity` touched a box on `layer` during the last update.
    pub fn is_over_layer(&self, entity: EntityId, layer: LayerId) -> bool {
        self.contacts.contains(&(entity, layer))
    }

    /// Every layer `entity` touched during the last update.
    pub fn layers_touching(&self, entity: EntityId) -> LayerSet {
        self.contacts.iter().filter(|(e, _)| *e == entity).map(|(_, l)| *l).collect()
    }

    pub fn cursor_hit(&self, point: Vec2, bbox: &ClickBox) -> bool {
        cursor::cursor_hit(point, bbox)
    }

    /// Topmost registered UI box under `point`: highest depth, then latest registered.
    pub fn pick(&self, point: Vec2) -> Option<EntityId> {
        self.clicks
            .iter()
            .enumerate()
            .filter(|(_, (c, present))| *present && cursor::cursor_hit(point, c))
            .max_by_key(|(i, (c, _))| (c.depth, *i))
            .map(|(_, (c, _))| c.entity)
    }

    /// Draw every active box: red if it resolved a collision this frame, green otherwise.
    pub fn debug_draw(&self, draw: &mut dyn DebugDraw) {
        for (_, b) in self.boxes.iter_active() {
            let color = if b.collided { DebugColor::Red } else { DebugColor::Green };
            draw.draw_box(b.bottom_left, b.top_right, color);
        }
    }

    /// Drain and return the gameplay events raised during the last update.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Timing breakdown for the last update, when `enable_timing` is set.
    pub fn timing(&self) -> Option<EngineTiming> {
        self.last_timing
    }
}

fn elapsed_ms(t: Option<Instant>) -> f64 {
    t.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Transforms;
    use crate::gameplay::{Health, Status};
    use crate::scene::SceneStore;

    const DT: f32 = 1.0 / 60.0;

    fn engine() -> CollisionEngine {
        CollisionEngine::with_grid(
            EngineConfig::default(),
            GridConfig { origin: Vec2::splat(-8.0), cell_size: 2.0, cols: 8, rows: 8 },
        )
    }

    fn spawn(e: &mut CollisionEngine, s: &mut SceneStore, id: u64, at: Vec2, layer: LayerId) -> BoxHandle {
        s.spawn(EntityId(id), at);
        e.register_box(EntityId(id), BoxDesc::new(Vec2::splat(0.5), layer)).unwrap()
    }

    #[derive(Default)]
    struct Recorder(Vec<(Vec2, Vec2, DebugColor)>);

    impl DebugDraw for Recorder {
        fn draw_box(&mut self, min: Vec2, max: Vec2, color: DebugColor) {
            self.0.push((min, max, color));
        }
    }

    #[test]
    fn test_refresh_keeps_corner_invariant() {
        let mut e = engine();
        let mut s = SceneStore::new();
        let h = spawn(&mut e, &mut s, 1, Vec2::new(1.25, -3.0), LayerId::Player);
        e.update(DT, &mut s);
        let b = e.get(h).unwrap();
        assert!(b.bottom_left.cmple(b.top_right).all());
        assert_eq!(b.top_right - b.bottom_left, 2.0 * b.half_extent);
        assert_eq!(e.stats().boxes, 1);
    }

    #[test]
    fn test_unset_matrix_bit_skips_geometry() {
        let mut e = engine();
        let mut s = SceneStore::new();
        spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Player);
        spawn(&mut e, &mut s, 2, Vec2::ZERO, LayerId::Ui);
        e.update(DT, &mut s);
        let st = e.stats();
        assert_eq!(st.narrowphase_tests, 0);
        assert_eq!(st.layer_pairs_rejected, st.layer_pairs_considered);
        assert!(st.layer_pairs_considered > 0);
    }

    #[test]
    fn test_self_collide_flag() {
        let mut e = engine();
        let mut s = SceneStore::new();
        spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Player);
        spawn(&mut e, &mut s, 2, Vec2::new(0.2, 0.0), LayerId::Player);
        e.update(DT, &mut s);
        assert_eq!(e.stats().narrowphase_tests, 0);

        let mut e = engine();
        let mut s = SceneStore::new();
        let a = spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Enemy);
        let b = spawn(&mut e, &mut s, 2, Vec2::new(0.2, 0.0), LayerId::Enemy);
        e.update(DT, &mut s);
        assert_eq!(e.stats().narrowphase_tests, 1);
        assert_eq!(e.stats().responses, 1);
        assert!(e.get(a).unwrap().collided && e.get(b).unwrap().collided);
    }

    #[test]
    fn test_pair_spanning_many_cells_is_resolved_once() {
        let mut e = engine();
        let mut s = SceneStore::new();
        // Both straddle the cell corner at the origin, so they share four cells.
        spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Enemy);
        spawn(&mut e, &mut s, 2, Vec2::new(0.1, 0.1), LayerId::Enemy);
        e.update(DT, &mut s);
        assert_eq!(e.stats().cells_scanned, 4);
        assert_eq!(e.stats().narrowphase_tests, 1);
        assert_eq!(e.stats().responses, 1);
    }

    #[test]
    fn test_player_enemy_damage_applies_once_per_frame() {
        let mut e = engine();
        let mut s = SceneStore::new();
        spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Player);
        spawn(&mut e, &mut s, 2, Vec2::new(0.1, 0.1), LayerId::Enemy);
        s.set_health(EntityId(1), Health(3));
        s.set_status(EntityId(1), Status::None);
        e.update(DT, &mut s);
        assert_eq!(s.health(EntityId(1)), Some(Health(2)));
        assert_eq!(e.drain_events().len(), 1);
        assert!(e.drain_events().is_empty());
    }

    #[test]
    fn test_missing_component_aborts_only_that_pair() {
        let mut e = engine();
        let mut s = SceneStore::new();
        // Player without a Status next to an enemy, and next to a wall.
        let p = spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Player);
        spawn(&mut e, &mut s, 2, Vec2::new(0.3, 0.0), LayerId::Enemy);
        let w = spawn(&mut e, &mut s, 3, Vec2::new(-0.8, 0.0), LayerId::Tiles);
        e.update(DT, &mut s);
        let st = e.stats();
        assert_eq!(st.aborted_responses, 1);
        assert_eq!(st.responses, 1);
        assert!(e.get(p).unwrap().collided && e.get(w).unwrap().collided);
    }

    #[test]
    fn test_boxes_without_transform_are_skipped() {
        let mut e = engine();
        let mut s = SceneStore::new();
        spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Enemy);
        e.register_box(EntityId(2), BoxDesc::new(Vec2::splat(0.5), LayerId::Enemy)).unwrap();
        e.update(DT, &mut s);
        assert_eq!(e.stats().boxes, 1);
        assert_eq!(e.stats().narrowphase_tests, 0);
    }

    #[test]
    fn test_dead_boxes_are_skipped() {
        let mut e = engine();
        let mut s = SceneStore::new();
        let a = spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Enemy);
        spawn(&mut e, &mut s, 2, Vec2::ZERO, LayerId::Enemy);
        e.set_alive(a, false).unwrap();
        e.update(DT, &mut s);
        assert_eq!(e.stats().narrowphase_tests, 0);
    }

    #[test]
    fn test_readiness_reports_touched_layers() {
        let mut e = engine();
        let mut s = SceneStore::new();
        spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Player);
        spawn(&mut e, &mut s, 2, Vec2::new(0.0, -0.6), LayerId::Burrowable);
        e.update(DT, &mut s);
        assert!(e.is_over_layer(EntityId(1), LayerId::Burrowable));
        assert!(e.is_over_layer(EntityId(2), LayerId::Player));
        assert!(!e.is_over_layer(EntityId(1), LayerId::Goal));
        assert_eq!(e.layers_touching(EntityId(1)), LayerSet::from_layers(&[LayerId::Burrowable]));
        // No response is declared, so nothing is flagged.
        assert_eq!(e.stats().responses, 0);

        s.translate(EntityId(1), Vec2::new(5.0, 5.0));
        e.update(DT, &mut s);
        assert!(!e.is_over_layer(EntityId(1), LayerId::Burrowable));
    }

    #[test]
    fn test_debug_draw_colours_resolved_boxes_red() {
        let mut e = engine();
        let mut s = SceneStore::new();
        spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Player);
        spawn(&mut e, &mut s, 2, Vec2::new(0.9, 0.0), LayerId::Tiles);
        spawn(&mut e, &mut s, 3, Vec2::new(6.0, 6.0), LayerId::Tiles);
        e.update(DT, &mut s);
        let mut rec = Recorder::default();
        e.debug_draw(&mut rec);
        assert_eq!(rec.0.len(), 3);
        assert_eq!(rec.0.iter().filter(|(_, _, c)| *c == DebugColor::Red).count(), 2);
    }

    #[test]
    fn test_deregister_entity_removes_box_and_click() {
        let mut e = engine();
        let mut s = SceneStore::new();
        let h = spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Player);
        e.register_click_box(EntityId(1), Vec2::ONE, 0);
        assert!(e.deregister_entity(EntityId(1)).is_some());
        assert!(e.get(h).is_none());
        assert_eq!(e.deregister_box(h).unwrap_err(), CollisionError::StaleHandle(h));
        e.update(DT, &mut s);
        assert_eq!(e.pick(Vec2::ZERO), None);
    }

    #[test]
    fn test_pick_uses_raw_position_and_depth() {
        let mut e = engine();
        let mut s = SceneStore::new();
        s.spawn_scaled(EntityId(10), Vec2::new(1.0, 1.0), 4.0);
        s.spawn(EntityId(11), Vec2::new(1.0, 1.0));
        s.spawn(EntityId(12), Vec2::new(1.0, 1.0));
        e.register_click_box(EntityId(10), Vec2::splat(0.5), 2);
        e.register_click_box(EntityId(11), Vec2::splat(0.5), 1);
        e.register_click_box(EntityId(12), Vec2::splat(0.5), 1);
        e.register_click_box(EntityId(13), Vec2::splat(100.0), 9); // never positioned
        e.update(DT, &mut s);
        assert_eq!(e.pick(Vec2::new(1.2, 0.8)), Some(EntityId(10)));
        e.register_click_box(EntityId(10), Vec2::splat(0.5), 0);
        e.update(DT, &mut s);
        assert_eq!(e.pick(Vec2::new(1.2, 0.8)), Some(EntityId(12)));
        assert_eq!(e.pick(Vec2::new(3.0, 3.0)), None);
    }

    #[test]
    fn test_tables_can_be_extended_after_construction() {
        let mut e = engine();
        let mut s = SceneStore::new();
        spawn(&mut e, &mut s, 1, Vec2::ZERO, LayerId::Player);
        spawn(&mut e, &mut s, 2, Vec2::ZERO, LayerId::Ui);
        e.matrix_mut().register_layer(LayerId::Player, LayerSet::from_layers(&[LayerId::Ui]), false);
        e.matrix_mut().register_layer(LayerId::Ui, LayerSet::from_layers(&[LayerId::Player]), false);
        e.responses_mut().insert(LayerId::Ui, LayerId::Player, crate::response::Response::Push { tag: "ui" });
        e.update(DT, &mut s);
        assert_eq!(e.stats().narrowphase_tests, 1);
        assert_eq!(e.stats().collisions, 1);
        // Nothing closing, so the push is idle and the pair stays unflagged.
        assert_eq!(e.stats().responses, 0);

        s.set_velocity(EntityId(1), Vec2::new(-2.0, 0.0));
        e.update(DT, &mut s);
        assert_eq!(e.stats().responses, 1);
        assert_eq!(s.forces().len(), 1);
        assert_eq!(s.forces()[0].tag, "ui");
        assert!(e.matrix().allows(LayerId::Ui, LayerId::Player));
    }

    #[test]
    fn test_timing_only_when_enabled() {
        let mut e = engine();
        let mut s = SceneStore::new();
        e.update(DT, &mut s);
        assert!(e.timing().is_none());
        e.cfg.enable_timing = true;
        e.update(DT, &mut s);
        assert!(e.timing().is_some());
        assert_eq!(e.stats().frame, 2);
    }
}
