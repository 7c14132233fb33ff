//! # Cross-Context Synchronization
//!
//! Lock-free snapshot handoff between independently scheduled loops.

mod triple_buffer;

pub use triple_buffer::{ReadGuard, SnapshotReader, TripleBuffer, WriteGuard};

use thiserror::Error;

/// Errors raised by the snapshot channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Every slot is either committed or pinned by a consumer.
    ///
    /// Only reachable with two or more consumers holding distinct stale
    /// snapshots. The producer skips this publish and retries next tick;
    /// it never blocks and never writes over a reader.
    #[error("no free snapshot slot: all three are committed or held by readers")]
    AllSlotsInUse,

    /// The channel's fixed consumer table is full.
    #[error("cannot register reader: {limit} readers already registered")]
    TooManyReaders {
        /// Maximum simultaneous readers per channel.
        limit: usize,
    },
}
