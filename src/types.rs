use glam::Vec2;

/// Opaque entity key supplied by the owning entity system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

/// Generation-counted handle into the engine's dense box storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxHandle {
    pub index: u32,
    pub generation: u32,
}

/// Closed set of collision layers a designer can assign to a collider.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerId {
    Background,
    Tiles,
    Enemy,
    Player,
    Goal,
    Gate,
    Collectible,
    Burrowable,
    SolidEnvironment,
    Pushable,
    Interactable,
    DecorativeTrigger,
    Ui,
}

impl LayerId {
    pub const COUNT: usize = 13;

    pub const ALL: [LayerId; Self::COUNT] = [
        LayerId::Background,
        LayerId::Tiles,
        LayerId::Enemy,
        LayerId::Player,
        LayerId::Goal,
        LayerId::Gate,
        LayerId::Collectible,
        LayerId::Burrowable,
        LayerId::SolidEnvironment,
        LayerId::Pushable,
        LayerId::Interactable,
        LayerId::DecorativeTrigger,
        LayerId::Ui,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Owners on static layers are never repositioned by physics separation.
    pub const fn is_static(self) -> bool {
        !matches!(self, LayerId::Enemy | LayerId::Player | LayerId::Pushable)
    }
}

/// Fixed bitset with one bit per [`LayerId`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerSet(u16);

impl LayerSet {
    pub const EMPTY: LayerSet = LayerSet(0);

    pub fn from_layers(layers: &[LayerId]) -> Self {
        let mut set = Self::EMPTY;
        for &l in layers {
            set.insert(l);
        }
        set
    }

    pub fn insert(&mut self, layer: LayerId) {
        self.0 |= 1 << layer.index();
    }

    pub fn remove(&mut self, layer: LayerId) {
        self.0 &= !(1 << layer.index());
    }

    #[inline]
    pub const fn contains(self, layer: LayerId) -> bool {
        self.0 & (1 << layer.index()) != 0
    }

    #[inline]
    pub const fn intersects(self, other: LayerSet) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = LayerId> {
        LayerId::ALL.into_iter().filter(move |l| self.contains(*l))
    }
}

impl FromIterator<LayerId> for LayerSet {
    fn from_iter<I: IntoIterator<Item = LayerId>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for l in iter {
            set.insert(l);
        }
        set
    }
}

/// Registration payload for a collider.
#[derive(Copy, Clone, Debug)]
pub struct BoxDesc {
    pub half_extent: Vec2,
    /// Local offset added to the owner's world position.
    pub offset: Vec2,
    pub layer: LayerId,
}

impl BoxDesc {
    pub fn new(half_extent: Vec2, layer: LayerId) -> Self {
        Self { half_extent, offset: Vec2::ZERO, layer }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }
}

/// Per-entity axis-aligned box, recomputed from the owner's transform every frame.
#[derive(Copy, Clone, Debug)]
pub struct BoundingBox {
    pub entity: EntityId,
    pub bottom_left: Vec2,
    pub top_right: Vec2,
    pub half_extent: Vec2,
    pub offset: Vec2,
    pub layer: LayerId,
    pub alive: bool,
    /// Set when this box took part in a resolved response during the last update.
    pub collided: bool,
}

impl BoundingBox {
    pub fn new(entity: EntityId, desc: BoxDesc) -> Self {
        Self {
            entity,
            bottom_left: Vec2::ZERO,
            top_right: Vec2::ZERO,
            half_extent: desc.half_extent.abs(),
            offset: desc.offset,
            layer: desc.layer,
            alive: true,
            collided: false,
        }
    }

    /// Recompute corners around `position + offset`.
    #[inline]
    pub fn refresh(&mut self, position: Vec2) {
        let c = position + self.offset;
        self.bottom_left = c - self.half_extent;
        self.top_right = c + self.half_extent;
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.bottom_left + self.top_right) * 0.5
    }
}

/// UI-only box used for cursor picking.
#[derive(Copy, Clone, Debug)]
pub struct ClickBox {
    pub entity: EntityId,
    pub bottom_left: Vec2,
    pub top_right: Vec2,
    pub half_extent: Vec2,
    /// Draw order; higher values are drawn later and sit on top.
    pub depth: u16,
    pub alive: bool,
}

impl ClickBox {
    pub fn new(entity: EntityId, half_extent: Vec2, depth: u16) -> Self {
        Self {
            entity,
            bottom_left: Vec2::ZERO,
            top_right: Vec2::ZERO,
            half_extent: half_extent.abs(),
            depth,
            alive: true,
        }
    }

    /// Place the box around a raw (unscaled) transform position.
    pub fn refresh(&mut self, raw_position: Vec2) {
        self.bottom_left = raw_position - self.half_extent;
        self.top_right = raw_position + self.half_extent;
    }
}

/// Discrete overlap result (minimum translation vector).
#[derive(Copy, Clone, Debug)]
pub struct Overlap {
    /// Axis-aligned unit normal pointing from B into A.
    pub normal: Vec2,
    /// Penetration depth along `normal` (≥ 0).
    pub depth: f32,
}

/// Time-of-impact result for the swept test.
#[derive(Copy, Clone, Debug)]
pub struct SweepHit {
    /// First contact time in `[0, dt]`; zero when the boxes already overlap.
    pub toi: f32,
    /// Entry-axis normal pointing from B into A ((0,0) for the overlap fast path).
    pub normal: Vec2,
}

/// Engine-level configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Threshold for zero and sign tests on relative velocity.
    pub epsilon: f32,
    /// Fraction of penetration depth applied when pushing the non-mover out.
    pub separation_damping: f32,
    /// Invulnerability window (seconds) started when the player takes a hit.
    pub hit_invulnerability: f32,
    /// Scale applied to injected push forces.
    pub push_strength: f32,
    /// Require both layers to list each other before a pair is tested.
    pub require_mutual_consent: bool,
    /// Maximum number of gameplay events buffered per frame; extra are dropped.
    pub max_events: usize,
    /// Enable internal timing instrumentation.
    pub enable_timing: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-3,
            separation_damping: 0.7,
            hit_invulnerability: 2.0,
            push_strength: 1.0,
            require_mutual_consent: true,
            max_events: 1024,
            enable_timing: false,
        }
    }
}

/// Bounded uniform grid layout.
#[derive(Clone, Debug)]
pub struct GridConfig {
    /// World position of the bottom-left corner of cell (0, 0).
    pub origin: Vec2,
    pub cell_size: f32,
    pub cols: usize,
    pub rows: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { origin: Vec2::ZERO, cell_size: 4.0, cols: 32, rows: 32 }
    }
}

/// Counters for the last completed update.
#[derive(Copy, Clone, Debug, Default)]
pub struct FrameStats {
    /// Sequence number of the update these counters belong to, starting at 1.
    pub frame: u64,
    pub boxes: usize,
    pub cells_scanned: usize,
    pub layer_pairs_considered: usize,
    /// Layer pairs skipped by the interaction matrix.
    pub layer_pairs_rejected: usize,
    pub narrowphase_tests: usize,
    pub collisions: usize,
    pub responses: usize,
    /// Responses abandoned because a companion component was missing.
    pub aborted_responses: usize,
}

/// Timing breakdown for the last update.
#[derive(Copy, Clone, Debug, Default)]
pub struct EngineTiming {
    pub refresh_ms: f64,
    pub partition_ms: f64,
    pub pairs_ms: f64,
    pub total_ms: f64,
}

/// Colour used by the debug-draw hook.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DebugColor {
    Green,
    Red,
}
