//! # Engine Constants
//!
//! Default cadences and buffer sizes. All of these can be overridden through
//! the TOML config layer; the constants are the fallback the engine boots
//! with when no config file is present.

// =============================================================================
// LOOP CADENCES
// =============================================================================

/// Simulation ticks per second (authoritative state).
pub const SIMULATION_TICK_RATE: u32 = 60;

/// Presentation ticks per second. Deliberately higher than the simulation
/// rate: the presentation loop tolerates stale snapshots.
pub const PRESENTATION_TICK_RATE: u32 = 120;

/// Control ticks per second (resource lifecycle application).
pub const CONTROL_TICK_RATE: u32 = 30;

// =============================================================================
// CHANNEL SIZING
// =============================================================================

/// Byte capacity of each triple-buffer snapshot region.
pub const MAX_SNAPSHOT_BYTES: usize = 64 * 1024;

/// Maximum consumer contexts registered on one snapshot channel.
pub const MAX_SNAPSHOT_READERS: usize = 4;

/// Bounded capacity of each resource lifecycle queue.
pub const LIFECYCLE_CHANNEL_CAPACITY: usize = 256;

/// Default cap on retained input history entries (~2s at 60Hz).
pub const INPUT_HISTORY_CAP: usize = 128;
