//! # SKEIN Core
//!
//! The synchronization kernel under the skein engine: everything needed to
//! hand per-tick state between independently scheduled execution contexts
//! without locks.
//!
//! ## Architecture Rules
//!
//! 1. **Fixed buffers** - snapshot regions are sized once, never resized mid-run
//! 2. **Index-based references** - entities, fields and nodes are indices plus
//!    generations, never pointers
//! 3. **Staleness over blocking** - a consumer that is behind reads the last
//!    committed snapshot again; it never waits for the producer
//!
//! ## Example
//!
//! ```rust,ignore
//! use skein_core::{TripleBuffer, CursorWriter};
//!
//! let channel = TripleBuffer::new(64 * 1024);
//! let mut writer = channel.acquire_write()?;
//! CursorWriter::new(&mut writer).write_u32(tick)?;
//! writer.commit();
//! ```

pub mod codec;
pub mod ecs;
pub mod sync;

pub use codec::{
    CodecError, CodecResult, CursorReader, CursorWriter, FieldDef, FieldId, FieldKind, ObjectView,
    ObjectViewMut, Schema, SharedObjectError, TripleBufferedObject, TripleBufferedObjectReader,
};
pub use ecs::{DenseStore, EntityId, SparseStore, World};
pub use sync::{ChannelError, ReadGuard, SnapshotReader, TripleBuffer, WriteGuard};
