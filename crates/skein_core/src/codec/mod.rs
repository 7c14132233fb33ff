//! # Byte Codecs
//!
//! Sequential cursor primitives and schema-driven record views.
//!
//! The same two layers back both purely local shared views and the wire:
//! a [`CursorWriter`]/[`CursorReader`] pair for order-and-width implicit
//! streams, and [`Schema`]/[`ObjectView`] for named fixed-offset access to
//! one flat record. Neither layer frames its own data - the schema (or the
//! field order) is a contract shared out-of-band by both ends.

mod cursor;
mod object_view;
mod shared_object;

pub use cursor::{CursorReader, CursorWriter};
pub use object_view::{FieldDef, FieldId, FieldKind, ObjectView, ObjectViewMut, Schema};
pub use shared_object::{SharedObjectError, TripleBufferedObject, TripleBufferedObjectReader};

use thiserror::Error;

/// Errors raised by the codec layer.
///
/// Every failure is local to the read or write that detected it; the buffer
/// is left exactly as it was before the failing operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A write would run past the end of the fixed buffer.
    #[error("write of {width} bytes at offset {offset} exceeds capacity {capacity}")]
    Overflow {
        /// Cursor offset at the time of the write.
        offset: usize,
        /// Width of the rejected write.
        width: usize,
        /// Total capacity of the backing buffer.
        capacity: usize,
    },

    /// A read would run past the end of the buffer.
    #[error("read of {width} bytes at offset {offset} runs past end of buffer ({len} bytes)")]
    Underflow {
        /// Cursor offset at the time of the read.
        offset: usize,
        /// Width of the rejected read.
        width: usize,
        /// Length of the backing buffer.
        len: usize,
    },

    /// Element index out of range for a field's declared arity.
    #[error("element {index} out of range for field of arity {arity}")]
    ElementOutOfRange {
        /// Requested element index.
        index: usize,
        /// Declared arity of the field.
        arity: usize,
    },

    /// A backing buffer is smaller than the schema's record length.
    #[error("backing buffer of {len} bytes cannot hold a {record_len} byte record")]
    BufferTooSmall {
        /// Length of the supplied buffer.
        len: usize,
        /// Byte length the schema requires.
        record_len: usize,
    },

    /// A typed accessor was used on a field declared with another kind.
    #[error("field kind mismatch: accessed as {accessed:?}, declared {declared:?}")]
    KindMismatch {
        /// Kind implied by the accessor.
        accessed: FieldKind,
        /// Kind the schema declares.
        declared: FieldKind,
    },

    /// The encoder and decoder disagree on the record schema.
    #[error("schema checksum mismatch: encoded {encoded:#010x}, expected {expected:#010x}")]
    SchemaMismatch {
        /// Checksum found in the record header.
        encoded: u32,
        /// Checksum of the decoder's schema.
        expected: u32,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
