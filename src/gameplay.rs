//! Gameplay component data read and mutated by response handlers.
//!
//! The engine never owns these; they live in whatever the embedding game uses
//! for component storage and are reached through [`crate::api::Gameplay`].

use std::collections::BTreeSet;

use crate::types::EntityId;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Health(pub i32);

/// Player condition consulted before applying damage.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum Status {
    #[default]
    None,
    /// Recently hit; invulnerable until the timer (seconds) runs out.
    Hit { timer: f32 },
    /// Underground; enemies pass over without contact.
    Burrow,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    items: BTreeSet<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: impl Into<String>) -> bool {
        self.items.insert(item.into())
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.contains(item)
    }

    pub fn contains_all<'a>(&self, mut required: impl Iterator<Item = &'a str>) -> bool {
        required.all(|i| self.contains(i))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Inventory {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { items: iter.into_iter().map(Into::into).collect() }
    }
}

/// Items an obstacle needs to see in the player's inventory before it opens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Unlockable {
    pub requires: Vec<String>,
}

impl Unlockable {
    pub fn requiring<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { requires: items.into_iter().map(Into::into).collect() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collectible {
    pub item: String,
}

/// Events raised by gameplay handlers, drained by the game each frame.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Damaged { entity: EntityId, remaining: i32 },
    Defeated { entity: EntityId },
    GateOpened { gate: EntityId, by: EntityId },
    Pickup { collector: EntityId, item: String, source: EntityId },
    GoalReached { player: EntityId, goal: EntityId },
    InteractionAvailable { player: EntityId, target: EntityId, callback: String },
    Triggered { player: EntityId, trigger: EntityId, callback: String },
}
