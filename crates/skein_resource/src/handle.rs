//! # Resource Handles
//!
//! Opaque cross-context references. A handle is an index plus a generation,
//! never a dereferenceable pointer; a stale handle is detected, not reused.

/// Unique identifier for a cross-context resource.
///
/// Same packing as entity ids: lower 32 bits index, upper 32 bits
/// generation. Allocated by the creating context's directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Creates an ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the packed 64-bit representation (for wire encoding).
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Reconstructs an ID from its packed representation.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Null/invalid resource ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::NULL
    }
}

/// Opaque resource type tag, agreed out-of-band by both contexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ResourceKind(pub u16);

/// Opaque handle to the realized mirror on the owning context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MirrorHandle(pub u64);

/// Lifecycle state of a resource as seen by the creating context.
///
/// A handle is usable the moment `create` returns, even though the remote
/// mirror does not exist yet - that is what [`LoadState::Pending`] means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Creation enqueued; the mirror does not exist yet.
    Pending,
    /// The owning context realized the mirror.
    Ready(MirrorHandle),
    /// The owning context could not realize the mirror.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_roundtrip() {
        let id = ResourceId::new(77, 3);
        assert_eq!(id.index(), 77);
        assert_eq!(id.generation(), 3);
        assert_eq!(ResourceId::from_bits(id.to_bits()), id);
        assert!(ResourceId::NULL.is_null());
    }
}
