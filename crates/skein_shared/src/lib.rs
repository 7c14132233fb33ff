//! # Skein Shared
//!
//! Value types every execution context agrees on: math primitives that cross
//! byte views unchanged, and the engine-wide tuning constants.
//!
//! Nothing in this crate owns a thread, a channel or a buffer.

pub mod constants;
pub mod math;

pub use constants::{
    CONTROL_TICK_RATE, INPUT_HISTORY_CAP, LIFECYCLE_CHANNEL_CAPACITY, MAX_SNAPSHOT_BYTES,
    MAX_SNAPSHOT_READERS, PRESENTATION_TICK_RATE, SIMULATION_TICK_RATE,
};
pub use math::{Quaternion, Transform, Vec2, Vec3};

/// One discrete step of a scheduled loop.
pub type Tick = u64;
