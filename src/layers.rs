use crate::types::{LayerId, LayerSet};

/// Which layers a source layer is willing to test against.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayerInteraction {
    pub source_layer: LayerId,
    pub mask: LayerSet,
    /// Whether two boxes on `source_layer` test each other.
    pub self_collide: bool,
}

/// Enum-indexed interaction matrix, populated once at startup.
#[derive(Clone, Debug)]
pub struct LayerMatrix {
    entries: [LayerInteraction; LayerId::COUNT],
    require_mutual_consent: bool,
}

/// Declarative row: `(source, layers it tests against, self_collide)`.
pub type LayerRow<'a> = (LayerId, &'a [LayerId], bool);

use LayerId::*;

const STANDARD_ROWS: &[LayerRow<'static>] = &[
    (
        Player,
        &[Tiles, SolidEnvironment, Enemy, Goal, Gate, Collectible, Burrowable, Pushable, Interactable, DecorativeTrigger],
        false,
    ),
    (Enemy, &[Player, Enemy, Tiles, SolidEnvironment, Gate], true),
    (Pushable, &[Player, Tiles, SolidEnvironment], false),
    (Tiles, &[Player, Enemy, Pushable], false),
    (SolidEnvironment, &[Player, Enemy, Pushable], false),
    (Gate, &[Player, Enemy], false),
    (Goal, &[Player], false),
    (Collectible, &[Player], false),
    (Burrowable, &[Player], false),
    (Interactable, &[Player], false),
    (DecorativeTrigger, &[Player], false),
];

impl LayerMatrix {
    /// Matrix with every layer masked off.
    pub fn empty() -> Self {
        let entries = LayerId::ALL.map(|l| LayerInteraction {
            source_layer: l,
            mask: LayerSet::EMPTY,
            self_collide: false,
        });
        Self { entries, require_mutual_consent: true }
    }

    pub fn from_table(rows: &[LayerRow<'_>]) -> Self {
        let mut m = Self::empty();
        for &(layer, targets, self_collide) in rows {
            m.register_layer(layer, LayerSet::from_layers(targets), self_collide);
        }
        m
    }

    /// The game's default interaction table.
    pub fn standard() -> Self {
        Self::from_table(STANDARD_ROWS)
    }

    /// Declare the mask for `layer`, replacing any previous declaration.
    pub fn register_layer(&mut self, layer: LayerId, mask: LayerSet, self_collide: bool) {
        self.entries[layer.index()] = LayerInteraction { source_layer: layer, mask, self_collide };
    }

    /// Builder form of [`register_layer`](Self::register_layer) with self-collision on.
    pub fn with_layer(mut self, layer: LayerId, targets: &[LayerId]) -> Self {
        self.register_layer(layer, LayerSet::from_layers(targets), true);
        self
    }

    pub fn with_mutual_consent(mut self, required: bool) -> Self {
        self.require_mutual_consent = required;
        self
    }

    pub fn set_mutual_consent(&mut self, required: bool) {
        self.require_mutual_consent = required;
    }

    pub fn interaction(&self, layer: LayerId) -> &LayerInteraction {
        &self.entries[layer.index()]
    }

    /// Whether boxes on `a` and `b` are eligible for the geometry test.
    pub fn allows(&self, a: LayerId, b: LayerId) -> bool {
        let ea = self.interaction(a);
        if a == b {
            return ea.self_collide && ea.mask.contains(a);
        }
        let eb = self.interaction(b);
        let ab = ea.mask.contains(b);
        let ba = eb.mask.contains(a);
        if self.require_mutual_consent { ab && ba } else { ab || ba }
    }
}

impl Default for LayerMatrix {
    fn default() -> Self {
        Self::standard()
    }
}
