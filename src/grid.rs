use glam::Vec2;

use crate::api::Partitioner;
use crate::boxes::BoxStore;
use crate::types::*;

/// Bounded uniform grid, rebuilt from scratch every frame.
///
/// Boxes reaching past the grid bounds are clamped into the border cells so
/// nothing falls out of the broadphase.
pub struct UniformGrid {
    cfg: GridConfig,
    cells: Vec<Vec<BoxHandle>>,
}

impl UniformGrid {
    pub fn new(cfg: GridConfig) -> Self {
        let cols = cfg.cols.max(1);
        let rows = cfg.rows.max(1);
        Self {
            cfg: GridConfig { cols, rows, ..cfg },
            cells: vec![Vec::new(); cols * rows],
        }
    }

    /// Layout fixed at construction; `cells` is sized from it.
    pub fn config(&self) -> &GridConfig {
        &self.cfg
    }

    /// Cell containing `p`, clamped to the grid.
    pub fn world_to_cell(&self, p: Vec2) -> (usize, usize) {
        let cs = self.cfg.cell_size.max(1e-5);
        let local = (p - self.cfg.origin) / cs;
        let clamp = |v: f32, n: usize| -> usize {
            let i = v.floor();
            if i <= 0.0 { 0 } else { (i as usize).min(n - 1) }
        };
        (clamp(local.x, self.cfg.cols), clamp(local.y, self.cfg.rows))
    }

    #[inline]
    fn cell_index(&self, col: usize, row: usize) -> Option<usize> {
        (col < self.cfg.cols && row < self.cfg.rows).then(|| row * self.cfg.cols + col)
    }

    fn insert(&mut self, handle: BoxHandle, min: Vec2, max: Vec2) {
        let (ix0, iy0) = self.world_to_cell(min);
        let (ix1, iy1) = self.world_to_cell(max);
        for iy in iy0..=iy1 {
            for ix in ix0..=ix1 {
                let idx = iy * self.cfg.cols + ix;
                self.cells[idx].push(handle);
            }
        }
    }

    /// Number of cells currently holding at least one box.
    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }
}

impl Default for UniformGrid {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl Partitioner for UniformGrid {
    fn rebuild(&mut self, boxes: &BoxStore) {
        for cell in &mut self.cells {
            cell.clear();
        }
        for (handle, bbox) in boxes.iter_active() {
            self.insert(handle, bbox.bottom_left, bbox.top_right);
        }
    }

    fn axis_sizes(&self) -> (usize, usize) {
        (self.cfg.cols, self.cfg.rows)
    }

    fn cell_has_candidates(&self, col: usize, row: usize) -> bool {
        self.cell_index(col, row).is_some_and(|i| self.cells[i].len() >= 2)
    }

    fn candidates_in_cell(&self, col: usize, row: usize) -> &[BoxHandle] {
        match self.cell_index(col, row) {
            Some(i) => &self.cells[i],
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> UniformGrid {
        UniformGrid::new(GridConfig { origin: Vec2::new(-4.0, -4.0), cell_size: 1.0, cols: 8, rows: 8 })
    }

    fn store_with(boxes: &[(u64, Vec2, Vec2)]) -> BoxStore {
        let mut s = BoxStore::new();
        for &(id, _, h) in boxes {
            s.insert(EntityId(id), BoxDesc::new(h, LayerId::Enemy)).unwrap();
        }
        s.refresh(|e| boxes.iter().find(|b| EntityId(b.0) == e).map(|b| b.1));
        s
    }

    #[test]
    fn test_box_straddling_origin_covers_four_cells() {
        let mut g = grid();
        let s = store_with(&[(1, Vec2::ZERO, Vec2::splat(0.5))]);
        g.rebuild(&s);
        assert_eq!(g.occupied_cells(), 4);
        for (c, r) in [(3, 3), (3, 4), (4, 3), (4, 4)] {
            assert_eq!(g.candidates_in_cell(c, r).len(), 1);
            assert!(!g.cell_has_candidates(c, r));
        }
    }

    #[test]
    fn test_cell_has_candidates_needs_two() {
        let mut g = grid();
        let s = store_with(&[(1, Vec2::new(0.5, 0.5), Vec2::splat(0.2)), (2, Vec2::new(0.6, 0.4), Vec2::splat(0.2))]);
        g.rebuild(&s);
        assert!(g.cell_has_candidates(4, 4));
        assert_eq!(g.candidates_in_cell(4, 4).len(), 2);
        assert!(!g.cell_has_candidates(0, 0));
    }

    #[test]
    fn test_out_of_bounds_boxes_clamp_to_border() {
        let mut g = grid();
        let s = store_with(&[(1, Vec2::new(100.0, -100.0), Vec2::splat(0.5))]);
        g.rebuild(&s);
        assert_eq!(g.candidates_in_cell(7, 0).len(), 1);
        assert_eq!(g.occupied_cells(), 1);
    }

    #[test]
    fn test_out_of_range_queries_are_empty() {
        let g = grid();
        assert_eq!(g.axis_sizes(), (8, 8));
        assert!(g.candidates_in_cell(8, 0).is_empty());
        assert!(!g.cell_has_candidates(0, 99));
    }

    #[test]
    fn test_degenerate_config_is_clamped_and_matches_cells() {
        let g = UniformGrid::new(GridConfig { origin: Vec2::ZERO, cell_size: 1.0, cols: 0, rows: 3 });
        assert_eq!((g.config().cols, g.config().rows), (1, 3));
        assert_eq!(g.axis_sizes(), (1, 3));
        assert_eq!(g.world_to_cell(Vec2::new(50.0, 50.0)), (0, 2));
    }

    #[test]
    fn test_rebuild_clears_previous_frame() {
        let mut g = grid();
        let mut s = store_with(&[(1, Vec2::new(0.5, 0.5), Vec2::splat(0.2))]);
        g.rebuild(&s);
        assert_eq!(g.occupied_cells(), 1);
        let h = s.handle_of(EntityId(1)).unwrap();
        s.get_mut(h).unwrap().alive = false;
        g.rebuild(&s);
        assert_eq!(g.occupied_cells(), 0);
    }
}
