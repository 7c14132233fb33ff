//! # SKEIN Scene
//!
//! An intrusive scene graph: every node carries its own
//! parent/first-child/sibling links as generational indices into one arena.
//! No node allocations per edge, no pointer chasing across heaps.
//!
//! The per-frame pass recomputes effective visibility and world transforms
//! top-down in deterministic pre-order (first-child, then next-sibling) -
//! every pass, with no dirty-flag short-circuiting, so the output depends
//! only on the current tree.

mod graph;

pub use graph::{NodeId, PreOrder, SceneError, SceneGraph};
