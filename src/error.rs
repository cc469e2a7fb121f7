use thiserror::Error;

use crate::types::{BoxHandle, EntityId};

/// Recoverable conditions surfaced by the collision engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollisionError {
    /// A response handler needed a companion component the entity does not have.
    /// Aborts that one pair's response; the frame carries on.
    #[error("entity {entity:?} is missing its {component} component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },
    #[error("entity {0:?} already owns a collision box")]
    AlreadyRegistered(EntityId),
    #[error("box handle {0:?} does not refer to a live box")]
    StaleHandle(BoxHandle),
}

impl CollisionError {
    pub fn missing(entity: EntityId, component: &'static str) -> Self {
        Self::MissingComponent { entity, component }
    }
}

pub type Result<T, E = CollisionError> = std::result::Result<T, E>;
