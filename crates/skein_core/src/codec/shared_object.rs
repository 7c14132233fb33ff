//! # Triple-Buffered Shared Objects
//!
//! One logical record, schema-addressed, committed across contexts.
//!
//! The producer context writes named fields through an [`ObjectViewMut`]
//! over the channel's write region and publishes the whole record at once;
//! consumer contexts read the latest committed record through an
//! [`ObjectView`]. The region carries a 4-byte schema checksum header so a
//! decoder built against a different layout rejects the record instead of
//! silently misreading bytes.

use std::sync::Arc;

use thiserror::Error;

use super::{CodecError, CodecResult, CursorReader, ObjectView, ObjectViewMut, Schema};
use crate::sync::{ChannelError, SnapshotReader, TripleBuffer};

/// Bytes reserved at the start of each region for the schema checksum.
const HEADER_LEN: usize = 4;

/// Errors raised by the shared-object layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SharedObjectError {
    /// No record has been published on this channel yet.
    #[error("no record committed on this channel yet")]
    NotYetPublished,

    /// Snapshot channel failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Record encode/decode failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A schema-driven record shared through a triple buffer.
///
/// Owned by the producer context; consumers hold a
/// [`TripleBufferedObjectReader`] each.
pub struct TripleBufferedObject {
    schema: Arc<Schema>,
    channel: Arc<TripleBuffer>,
}

impl TripleBufferedObject {
    /// Creates a shared record channel sized for `schema` plus its header.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        let channel = TripleBuffer::new(HEADER_LEN + schema.byte_len());
        Self { schema, channel }
    }

    /// The record schema.
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Registers a consumer of this record.
    pub fn reader(&self) -> Result<TripleBufferedObjectReader, ChannelError> {
        Ok(TripleBufferedObjectReader {
            schema: Arc::clone(&self.schema),
            reader: self.channel.register_reader()?,
        })
    }

    /// Writes one record and publishes it.
    ///
    /// The closure fills named fields through the view; if it (or the
    /// channel) fails, nothing is published and consumers keep the previous
    /// committed record.
    pub fn publish<T>(
        &self,
        fill: impl FnOnce(&mut ObjectViewMut<'_>) -> CodecResult<T>,
    ) -> Result<(T, u64), SharedObjectError> {
        let mut guard = self.channel.acquire_write()?;

        let value = {
            let (header, record) = guard.split_at_mut(HEADER_LEN);
            header.copy_from_slice(&self.schema.checksum().to_le_bytes());
            let mut view = ObjectViewMut::new(&self.schema, record)?;
            fill(&mut view)?
        };

        let version = guard.commit();
        Ok((value, version))
    }
}

/// Consumer handle on a [`TripleBufferedObject`].
pub struct TripleBufferedObjectReader {
    schema: Arc<Schema>,
    reader: SnapshotReader,
}

impl TripleBufferedObjectReader {
    /// Version of the record this reader last observed (0 = none yet).
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.reader.version()
    }

    /// Reads the latest committed record.
    ///
    /// Returns the closure's result together with the record version. A
    /// consumer that is ahead of the producer sees the same version again -
    /// staleness is the caller's signal, never a failure.
    pub fn read<T>(
        &mut self,
        decode: impl FnOnce(&ObjectView<'_>) -> T,
    ) -> Result<(T, u64), SharedObjectError> {
        let guard = self.reader.acquire();
        if guard.version() == 0 {
            return Err(SharedObjectError::NotYetPublished);
        }

        let mut header = CursorReader::new(&guard);
        let encoded = header.read_u32()?;
        if encoded != self.schema.checksum() {
            return Err(SharedObjectError::Codec(CodecError::SchemaMismatch {
                encoded,
                expected: self.schema.checksum(),
            }));
        }

        let view = ObjectView::new(&self.schema, &guard[HEADER_LEN..])?;
        let version = guard.version();
        Ok((decode(&view), version))
    }
}
