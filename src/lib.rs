//! boxbonk: layered swept-AABB collision engine (grid broadphase, table-driven responses)

pub mod types;
pub mod error;
pub mod api;
pub mod boxes;
pub mod grid;
pub mod layers;
pub mod narrowphase;
pub mod response;
pub mod effects;
pub mod gameplay;
pub mod cursor;
pub mod scene;
pub mod engine;
pub mod logging;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::engine::CollisionEngine;
pub use crate::error::CollisionError;
pub use crate::gameplay::{Collectible, GameEvent, Health, Inventory, Status, Unlockable};
pub use crate::grid::UniformGrid;
pub use crate::layers::LayerMatrix;
pub use crate::response::{Contact, EffectCtx, Resolution, Response, ResponseTable};
pub use crate::scene::SceneStore;
pub use crate::logging::{init as init_logging, Verbosity};
