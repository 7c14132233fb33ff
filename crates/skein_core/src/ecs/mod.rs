//! # Entities and Component Stores
//!
//! Entities are opaque generational ids; all state lives in component
//! stores owned by a world or context object and passed explicitly - no
//! module-scoped registries, so multiple worlds coexist in one process and
//! tests stay deterministic.

mod entity;
mod store;
mod world;

pub use entity::EntityId;
pub use store::{DenseStore, SparseStore};
pub use world::World;
