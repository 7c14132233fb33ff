//! # SKEIN
//!
//! A synchronization substrate for real-time simulations split across
//! independently scheduled execution contexts.
//!
//! ## The three loops
//!
//! ```text
//!   simulation ──snapshots──▶ presentation
//!       │ ▲
//!  create│ │ready                 (each loop runs at its own cadence;
//!       ▼ │                        none ever blocks on another)
//!     control
//! ```
//!
//! - **simulation** owns authoritative state: the world, component stores,
//!   the scene graph, the input recorder and the resource directory. Once
//!   per tick it publishes a schema-addressed snapshot into a triple
//!   buffer.
//! - **presentation** reads the latest committed snapshot, tolerating
//!   staleness, never observing a partial write.
//! - **control** applies resource lifecycle messages in send order and
//!   realizes mirrors through an opaque async capability.
//!
//! The [`Engine`] constructor wires the channels; each context struct is
//! then moved onto its own thread (see the `headless_demo` binary).

pub mod config;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod snapshot;

pub use config::{keys, EngineConfig};
pub use engine::{Control, Engine, Presentation, Simulation, SnapshotView};
pub use error::EngineError;
pub use schedule::{run_at_rate, StopFlag};
pub use snapshot::MAX_SNAPSHOT_ENTITIES;
