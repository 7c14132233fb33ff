//! # Component Stores
//!
//! Two storage strategies behind one membership contract: an id is present
//! in a store **iff** the store's membership set contains it.
//!
//! - [`DenseStore`] - pre-allocated flat buffer keyed by entity index, for
//!   hot components touched every tick
//! - [`SparseStore`] - associative storage for cold or rare components
//!
//! Both record the generation they were written with, so access through a
//! stale id is a logged no-op, never a read of the slot's new occupant.

use std::collections::HashMap;

use super::EntityId;

/// Pre-allocated, flat storage for a single component type.
///
/// Capacity is fixed at creation; inserting past it is rejected rather than
/// grown, keeping the store allocation-free during normal operation.
pub struct DenseStore<C> {
    data: Box<[C]>,
    generations: Box<[u32]>,
    present: Box<[bool]>,
    len: usize,
}

impl<C: Clone + Default> DenseStore<C> {
    /// Creates a store with the specified entity capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        Self {
            data: vec![C::default(); capacity].into_boxed_slice(),
            generations: vec![0u32; capacity].into_boxed_slice(),
            present: vec![false; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Returns the capacity of this store.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of present components.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no components are present.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(&self, entity: EntityId) -> Option<usize> {
        if entity.is_null() {
            return None;
        }
        let idx = entity.index() as usize;
        if idx >= self.data.len() {
            return None;
        }
        (self.present[idx] && self.generations[idx] == entity.generation()).then_some(idx)
    }

    /// Returns true iff `entity` is in the membership set.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.slot(entity).is_some()
    }

    /// Inserts or overwrites the component for `entity`.
    ///
    /// Returns `false` (logged) if the index is outside the fixed capacity.
    pub fn insert(&mut self, entity: EntityId, component: C) -> bool {
        if entity.is_null() {
            return false;
        }
        let idx = entity.index() as usize;
        if idx >= self.data.len() {
            tracing::warn!(
                index = idx,
                capacity = self.data.len(),
                "dense store insert out of capacity, dropped"
            );
            return false;
        }
        if !self.present[idx] {
            self.present[idx] = true;
            self.len += 1;
        }
        self.generations[idx] = entity.generation();
        self.data[idx] = component;
        true
    }

    /// Gets the component for `entity`, if present and not stale.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&C> {
        self.slot(entity).map(|idx| &self.data[idx])
    }

    /// Gets the component mutably, if present and not stale.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut C> {
        self.slot(entity).map(|idx| &mut self.data[idx])
    }

    /// Removes and returns the component for `entity`.
    ///
    /// Removing through a stale or absent id is a soft no-op.
    pub fn remove(&mut self, entity: EntityId) -> Option<C> {
        let Some(idx) = self.slot(entity) else {
            tracing::debug!(?entity, "dense store remove on absent or stale id, ignored");
            return None;
        };
        self.present[idx] = false;
        self.len -= 1;
        Some(std::mem::take(&mut self.data[idx]))
    }

    /// Iterates over all present components with their entity ids.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.data
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.present[*idx])
            .map(|(idx, component)| {
                (EntityId::new(idx as u32, self.generations[idx]), component)
            })
    }
}

/// Associative storage for a single component type.
///
/// Membership is exactly the key set, generation included: a stale id is a
/// different key and therefore absent.
pub struct SparseStore<C> {
    data: HashMap<EntityId, C>,
}

impl<C> SparseStore<C> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { data: HashMap::new() }
    }

    /// Returns the number of present components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no components are present.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true iff `entity` is in the membership set.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.data.contains_key(&entity)
    }

    /// Inserts or overwrites the component for `entity`.
    pub fn insert(&mut self, entity: EntityId, component: C) {
        self.data.insert(entity, component);
    }

    /// Gets the component for `entity`.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&C> {
        self.data.get(&entity)
    }

    /// Gets the component mutably.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut C> {
        self.data.get_mut(&entity)
    }

    /// Removes and returns the component for `entity`.
    pub fn remove(&mut self, entity: EntityId) -> Option<C> {
        self.data.remove(&entity)
    }

    /// Iterates over all present components with their entity ids.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.data.iter().map(|(id, component)| (*id, component))
    }
}

impl<C> Default for SparseStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_membership_invariant() {
        let mut store: DenseStore<u32> = DenseStore::new(8);
        let id = EntityId::new(3, 1);

        assert!(!store.contains(id));
        assert!(store.insert(id, 42));
        assert!(store.contains(id));
        assert_eq!(store.get(id), Some(&42));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove(id), Some(42));
        assert!(!store.contains(id));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_dense_stale_generation_is_noop() {
        let mut store: DenseStore<u32> = DenseStore::new(8);
        let old = EntityId::new(3, 1);
        let new = EntityId::new(3, 2);

        store.insert(new, 7);
        // The stale id addresses the same slot but a dead generation.
        assert!(!store.contains(old));
        assert_eq!(store.get(old), None);
        assert_eq!(store.remove(old), None);
        assert_eq!(store.get(new), Some(&7));
    }

    #[test]
    fn test_dense_out_of_capacity_rejected() {
        let mut store: DenseStore<u32> = DenseStore::new(4);
        assert!(!store.insert(EntityId::new(4, 0), 1));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_dense_iter_yields_live_ids() {
        let mut store: DenseStore<u32> = DenseStore::new(8);
        store.insert(EntityId::new(1, 5), 10);
        store.insert(EntityId::new(6, 2), 60);

        let mut seen: Vec<_> = store.iter().map(|(id, v)| (id.index(), *v)).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![(1, 10), (6, 60)]);
    }

    #[test]
    fn test_sparse_membership_invariant() {
        let mut store: SparseStore<String> = SparseStore::new();
        let id = EntityId::new(9, 4);

        store.insert(id, "hello".to_string());
        assert!(store.contains(id));
        // A different generation of the same index is a different key.
        assert!(!store.contains(EntityId::new(9, 5)));

        assert_eq!(store.remove(id).as_deref(), Some("hello"));
        assert!(store.is_empty());
    }
}
