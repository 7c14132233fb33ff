//! # World
//!
//! The entity allocator for one simulation context.
//!
//! The world hands out generational ids and tracks liveness; component
//! stores live next to it in whatever context struct owns them and are
//! passed explicitly. Nothing here is global - two worlds in one process
//! never observe each other.

use super::EntityId;

/// Entity allocator with a fixed capacity and slot recycling.
///
/// All slots are pre-allocated at creation. Despawning bumps the slot's
/// generation so every previously handed out id for that slot turns stale.
pub struct World {
    generations: Box<[u32]>,
    alive: Box<[bool]>,
    free_indices: Vec<u32>,
    alive_count: usize,
}

impl World {
    /// Creates a world with the specified entity capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        assert!(capacity <= u32::MAX as usize, "capacity cannot exceed u32::MAX");

        Self {
            generations: vec![0u32; capacity].into_boxed_slice(),
            alive: vec![false; capacity].into_boxed_slice(),
            free_indices: (0..capacity as u32).rev().collect(),
            alive_count: 0,
        }
    }

    /// Returns the maximum capacity of this world.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Spawns a new entity, returning its ID.
    ///
    /// Returns [`EntityId::NULL`] if capacity is reached.
    #[inline]
    pub fn spawn(&mut self) -> EntityId {
        let Some(index) = self.free_indices.pop() else {
            tracing::warn!(capacity = self.capacity(), "world capacity reached, spawn dropped");
            return EntityId::NULL;
        };

        let idx = index as usize;
        // Bump the generation so every id from the slot's previous life is stale.
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.alive[idx] = true;
        self.alive_count += 1;

        EntityId::new(index, self.generations[idx])
    }

    /// Despawns an entity, freeing its slot for reuse.
    ///
    /// Returns `true` if the entity was despawned, `false` if the id was
    /// null, stale or already dead (soft no-op).
    #[inline]
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            tracing::debug!(?id, "despawn of dead or stale entity, ignored");
            return false;
        }

        let idx = id.index() as usize;
        self.alive[idx] = false;
        self.alive_count -= 1;
        self.free_indices.push(id.index());
        true
    }

    /// Checks if an entity is alive (index valid, slot alive, generation
    /// matching).
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        if id.is_null() {
            return false;
        }
        let idx = id.index() as usize;
        idx < self.generations.len() && self.alive[idx] && self.generations[idx] == id.generation()
    }

    /// Iterates over all alive entity ids.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(idx, _)| EntityId::new(idx as u32, self.generations[idx]))
    }
}
