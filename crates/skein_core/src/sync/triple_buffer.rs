//! # Triple-Buffered Snapshot Channel
//!
//! Lock-free handoff of per-tick snapshots from one producer context to
//! consumer contexts running at their own cadence.
//!
//! ## Safety Note
//!
//! This module requires unsafe code for lock-free buffer rotation.
//! All unsafe blocks are carefully reviewed and documented.

#![allow(unsafe_code)]
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────────────────────────┐
//!                 │            TripleBuffer            │
//!                 │                                    │
//!                 │   ┌──────┐  ┌──────┐  ┌──────┐    │
//!                 │   │ Slot │  │ Slot │  │ Slot │    │
//!                 │   │  A   │  │  B   │  │  C   │    │
//!                 │   └──┬───┘  └──┬───┘  └──┬───┘    │
//!                 │      │         │         │        │
//!                 │   ┌──┴─────────┴─────────┴───┐    │
//!                 │   │ control: committed+version│    │
//!                 │   │ readers: announced slots  │    │
//!                 │   └───────────────────────────┘    │
//!                 └────────────────────────────────────┘
//!                          │                │
//!                          ▼                ▼
//!                 ┌──────────────┐  ┌────────────────┐
//!                 │  WriteGuard  │  │ SnapshotReader │
//!                 │ (simulation) │  │ (presentation, │
//!                 │              │  │  control, ...) │
//!                 └──────────────┘  └────────────────┘
//! ```
//!
//! ## Rotation
//!
//! - The producer writes the one slot that is neither last-committed nor
//!   announced by any reader, then publishes it with a single control-word
//!   store. Committed versions are strictly monotonic.
//! - A consumer acquires the most recent committed slot; if nothing newer
//!   has been committed it gets the same slot again - staleness, never
//!   corruption, and never a partially written region.
//! - Neither side ever waits on the other.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::ChannelError;

/// Number of buffer slots. The rotation invariant needs exactly three:
/// one committed, one being written, one potentially pinned by a reader.
const SLOT_COUNT: usize = 3;

/// Maximum consumer contexts per channel.
const MAX_READERS: usize = 8;

/// Sentinel for a reader slot that holds nothing.
const NO_SLOT: usize = usize::MAX;

/// Control word layout: `version << 2 | committed_index`.
///
/// Version 0 means nothing has been committed yet.
#[inline]
const fn pack(index: usize, version: u64) -> u64 {
    (version << 2) | index as u64
}

#[inline]
const fn unpack(control: u64) -> (usize, u64) {
    ((control & 0b11) as usize, control >> 2)
}

/// Lock-free triple-buffered snapshot channel.
///
/// One producer, up to [`MAX_READERS`] consumers. All three regions have the
/// same fixed capacity; a snapshot that does not fit is rejected by the
/// codec layer writing into the region, before anything is committed.
pub struct TripleBuffer {
    /// The three byte regions.
    /// `UnsafeCell` because access is guaranteed exclusive by the rotation.
    slots: [UnsafeCell<Box<[u8]>>; SLOT_COUNT],

    /// Committed slot index + monotonic version, published atomically.
    control: AtomicU64,

    /// Slot currently announced (pinned) by each registered reader.
    readers: [AtomicUsize; MAX_READERS],

    /// Registration table guard (cold path only).
    registry: Mutex<ReaderRegistry>,

    /// Whether a write guard is currently held.
    write_locked: AtomicBool,

    /// Byte capacity of each region.
    capacity: usize,
}

struct ReaderRegistry {
    registered: [bool; MAX_READERS],
}

impl TripleBuffer {
    /// Creates a channel whose three regions each hold `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        assert!(capacity > 0, "snapshot capacity must be greater than zero");

        Arc::new(Self {
            slots: [
                UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
                UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
                UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
            ],
            control: AtomicU64::new(pack(0, 0)),
            readers: std::array::from_fn(|_| AtomicUsize::new(NO_SLOT)),
            registry: Mutex::new(ReaderRegistry { registered: [false; MAX_READERS] }),
            write_locked: AtomicBool::new(false),
            capacity,
        })
    }

    /// Byte capacity of each snapshot region.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Version of the most recently committed snapshot (0 = none yet).
    #[inline]
    #[must_use]
    pub fn committed_version(&self) -> u64 {
        unpack(self.control.load(Ordering::SeqCst)).1
    }

    /// Registers a consumer context on this channel.
    ///
    /// Registration is a cold-path operation; the returned reader's
    /// acquire path is lock-free.
    pub fn register_reader(self: &Arc<Self>) -> Result<SnapshotReader, ChannelError> {
        let mut registry = self.registry.lock();
        let Some(index) = registry.registered.iter().position(|taken| !taken) else {
            return Err(ChannelError::TooManyReaders { limit: MAX_READERS });
        };
        registry.registered[index] = true;
        self.readers[index].store(NO_SLOT, Ordering::SeqCst);

        Ok(SnapshotReader {
            channel: Arc::clone(self),
            index,
            version: 0,
        })
    }

    /// Acquires the one slot that is neither last-committed nor announced
    /// by any reader, in O(1).
    ///
    /// # Errors
    ///
    /// [`ChannelError::AllSlotsInUse`] when two or more readers pin distinct
    /// stale slots and the committed slot excludes the third. The producer
    /// should skip this publish and retry next tick.
    ///
    /// # Panics
    ///
    /// Panics if a write guard is already held - there is exactly one
    /// producer per channel.
    pub fn acquire_write(self: &Arc<Self>) -> Result<WriteGuard, ChannelError> {
        let was_locked = self.write_locked.swap(true, Ordering::AcqRel);
        assert!(!was_locked, "double write acquire: one producer per channel");

        let (committed, _) = unpack(self.control.load(Ordering::SeqCst));

        // Readers announce before validating against the control word, so a
        // SeqCst scan here sees every pin that could overlap this write.
        let mut excluded = [false; SLOT_COUNT];
        excluded[committed] = true;
        for reader in &self.readers {
            let slot = reader.load(Ordering::SeqCst);
            if slot < SLOT_COUNT {
                excluded[slot] = true;
            }
        }

        let Some(slot) = (0..SLOT_COUNT).find(|i| !excluded[*i]) else {
            self.write_locked.store(false, Ordering::Release);
            return Err(ChannelError::AllSlotsInUse);
        };

        Ok(WriteGuard { channel: Arc::clone(self), slot })
    }
}

// SAFETY: all region access is mediated by the rotation protocol - the
// producer only writes a slot excluded from the committed index and every
// announced reader slot, and readers only dereference a slot they have
// announced and validated. The atomics make those exclusions visible.
unsafe impl Send for TripleBuffer {}
// SAFETY: see above.
unsafe impl Sync for TripleBuffer {}

/// Exclusive write access to one snapshot region.
///
/// Dereferences to the raw region bytes. [`commit`](Self::commit) publishes
/// the region with a single control-word store; dropping the guard without
/// committing abandons the write and publishes nothing.
pub struct WriteGuard {
    channel: Arc<TripleBuffer>,
    slot: usize,
}

impl WriteGuard {
    /// Slot index this guard writes to (for diagnostics).
    #[inline]
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Atomically publishes this region and returns the new version.
    ///
    /// Never blocks: publication is one store. Consumers acquiring after
    /// this call observe the fully written region.
    pub fn commit(self) -> u64 {
        let (_, version) = unpack(self.channel.control.load(Ordering::SeqCst));
        let next = version + 1;
        self.channel.control.store(pack(self.slot, next), Ordering::SeqCst);
        next
        // Drop releases the write lock.
    }
}

impl Deref for WriteGuard {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: this guard holds the producer lock and its slot is neither
        // committed nor announced by any reader, so no other context touches
        // these bytes.
        unsafe { &*self.channel.slots[self.slot].get() }
    }
}

impl DerefMut for WriteGuard {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as above - exclusive by rotation.
        unsafe { &mut *self.channel.slots[self.slot].get() }
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.channel.write_locked.store(false, Ordering::Release);
    }
}

/// A registered consumer of one snapshot channel.
///
/// The reader keeps its acquired slot pinned (announced) until the next
/// [`acquire`](Self::acquire) call, so a context may keep using a snapshot
/// across its whole tick.
pub struct SnapshotReader {
    channel: Arc<TripleBuffer>,
    index: usize,
    version: u64,
}

impl SnapshotReader {
    /// Version of the snapshot this reader last acquired (0 = none yet).
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Acquires the most recent committed snapshot.
    ///
    /// Returns the same region again when nothing newer has been committed -
    /// staleness, not corruption. [`ReadGuard::is_fresh`] tells the two
    /// cases apart.
    pub fn acquire(&mut self) -> ReadGuard<'_> {
        // Announce-then-validate: pin the slot we intend to read, then
        // confirm it is still the committed one. If a commit raced us the
        // loop re-announces the newer slot. The producer scans announced
        // slots after its own commit, so a validated pin is never handed
        // out for writing.
        let (slot, version) = loop {
            let control = self.channel.control.load(Ordering::SeqCst);
            let (slot, version) = unpack(control);
            self.channel.readers[self.index].store(slot, Ordering::SeqCst);
            if self.channel.control.load(Ordering::SeqCst) == control {
                break (slot, version);
            }
        };

        let fresh = version > self.version;
        self.version = version;

        ReadGuard { channel: &self.channel, slot, version, fresh }
    }
}

impl Drop for SnapshotReader {
    fn drop(&mut self) {
        self.channel.readers[self.index].store(NO_SLOT, Ordering::SeqCst);
        self.channel.registry.lock().registered[self.index] = false;
    }
}

/// Shared read access to the committed snapshot region.
pub struct ReadGuard<'a> {
    channel: &'a TripleBuffer,
    slot: usize,
    version: u64,
    fresh: bool,
}

impl ReadGuard<'_> {
    /// Version of the snapshot behind this guard.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// True if this acquire observed a newer version than the previous one.
    #[inline]
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Slot index this guard reads from (for diagnostics).
    #[inline]
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }
}

impl Deref for ReadGuard<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: the owning reader announced this slot and validated it
        // against the control word; the producer excludes announced slots,
        // and the reader cannot re-announce while this guard borrows it.
        unsafe { &*self.channel.slots[self.slot].get() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(region: &mut [u8], value: u8) {
        for byte in region.iter_mut() {
            *byte = value;
        }
    }

    #[test]
    fn test_channel_creation() {
        let channel = TripleBuffer::new(128);
        assert_eq!(channel.capacity(), 128);
        assert_eq!(channel.committed_version(), 0);
    }

    #[test]
    fn test_commit_publishes_monotonic_versions() {
        let channel = TripleBuffer::new(16);

        let writer = channel.acquire_write().unwrap();
        assert_eq!(writer.commit(), 1);

        let writer = channel.acquire_write().unwrap();
        assert_eq!(writer.commit(), 2);

        assert_eq!(channel.committed_version(), 2);
    }

    #[test]
    fn test_abandoned_write_publishes_nothing() {
        let channel = TripleBuffer::new(16);
        let writer = channel.acquire_write().unwrap();
        drop(writer);
        assert_eq!(channel.committed_version(), 0);

        // The producer lock is released by the drop.
        let writer = channel.acquire_write().unwrap();
        writer.commit();
    }

    #[test]
    fn test_reader_sees_committed_bytes() {
        let channel = TripleBuffer::new(8);
        let mut reader = channel.register_reader().unwrap();

        let mut writer = channel.acquire_write().unwrap();
        fill(&mut writer, 7);
        writer.commit();

        let guard = reader.acquire();
        assert!(guard.is_fresh());
        assert_eq!(guard.version(), 1);
        assert!(guard.iter().all(|b| *b == 7));
    }

    #[test]
    fn test_stale_reader_gets_same_region_again() {
        let channel = TripleBuffer::new(8);
        let mut reader = channel.register_reader().unwrap();

        let mut writer = channel.acquire_write().unwrap();
        fill(&mut writer, 1);
        writer.commit();

        let first_slot = reader.acquire().slot();
        let guard = reader.acquire();
        assert_eq!(guard.slot(), first_slot);
        assert!(!guard.is_fresh());
        assert_eq!(guard.version(), 1);
    }

    #[test]
    fn test_writer_never_takes_committed_or_pinned_slot() {
        let channel = TripleBuffer::new(8);
        let mut reader = channel.register_reader().unwrap();

        let writer = channel.acquire_write().unwrap();
        let first = writer.slot();
        writer.commit();

        let pinned = reader.acquire().slot();
        assert_eq!(pinned, first);

        for _ in 0..16 {
            let writer = channel.acquire_write().unwrap();
            assert_ne!(writer.slot(), pinned, "producer handed out a pinned slot");
            writer.commit();
        }
    }

    #[test]
    fn test_two_readers_same_version_share_region() {
        // Two consumers acquiring at the same committed version receive the
        // same region, and the producer cannot reclaim it until both moved on.
        let channel = TripleBuffer::new(8);
        let mut reader_a = channel.register_reader().unwrap();
        let mut reader_b = channel.register_reader().unwrap();

        let writer = channel.acquire_write().unwrap();
        writer.commit(); // version 1

        let slot_a = reader_a.acquire().slot();
        let slot_b = reader_b.acquire().slot();
        assert_eq!(slot_a, slot_b);

        for _ in 0..8 {
            let writer = channel.acquire_write().unwrap();
            assert_ne!(writer.slot(), slot_a);
            writer.commit();
        }

        // Both readers advance past version 1; the old region becomes
        // reclaimable again (though not necessarily the next pick).
        let new_a = reader_a.acquire().slot();
        let new_b = reader_b.acquire().slot();
        assert_eq!(new_a, new_b);
        assert_ne!(new_a, slot_a);
    }

    #[test]
    fn test_all_slots_in_use_reported_not_blocked() {
        let channel = TripleBuffer::new(8);
        let mut reader_a = channel.register_reader().unwrap();
        let mut reader_b = channel.register_reader().unwrap();

        // Reader A pins version 1's slot.
        channel.acquire_write().unwrap().commit();
        let slot_a = reader_a.acquire().slot();

        // Producer commits version 2 into another slot; reader B pins it.
        channel.acquire_write().unwrap().commit();
        let slot_b = reader_b.acquire().slot();
        assert_ne!(slot_a, slot_b);

        // Producer commits version 3 into the third slot. Now every slot is
        // committed or pinned: the next acquire must fail fast, not alias.
        channel.acquire_write().unwrap().commit();
        assert!(matches!(
            channel.acquire_write(),
            Err(ChannelError::AllSlotsInUse)
        ));

        // Reader A catching up releases its pin and unblocks the producer.
        let _ = reader_a.acquire();
        assert!(channel.acquire_write().is_ok());
    }

    #[test]
    #[should_panic(expected = "double write acquire")]
    fn test_double_write_panics() {
        let channel = TripleBuffer::new(8);
        let _first = channel.acquire_write().unwrap();
        let _second = channel.acquire_write().unwrap();
    }

    #[test]
    fn test_reader_registration_limit() {
        let channel = TripleBuffer::new(8);
        let readers: Vec<_> = (0..MAX_READERS)
            .map(|_| channel.register_reader().unwrap())
            .collect();
        assert!(matches!(
            channel.register_reader(),
            Err(ChannelError::TooManyReaders { .. })
        ));
        drop(readers);
        assert!(channel.register_reader().is_ok());
    }

    #[test]
    fn test_interleaved_threads_never_alias() {
        use rand::{Rng, SeedableRng};

        // Producer fills each snapshot with a single byte derived from its
        // version; consumers assert every region they observe is uniform.
        // A torn or aliased read would surface as a mixed region.
        let channel = TripleBuffer::new(256);
        let mut handles = Vec::new();

        for seed in 0..2u64 {
            let mut reader = channel.register_reader().unwrap();
            handles.push(std::thread::spawn(move || {
                let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
                let mut last_version = 0;
                for _ in 0..20_000 {
                    let guard = reader.acquire();
                    let first = guard[0];
                    assert!(
                        guard.iter().all(|b| *b == first),
                        "observed a torn snapshot region"
                    );
                    assert!(guard.version() >= last_version, "version went backwards");
                    last_version = guard.version();
                    if rng.gen_bool(0.1) {
                        std::thread::yield_now();
                    }
                }
            }));
        }

        let producer = {
            let channel = Arc::clone(&channel);
            std::thread::spawn(move || {
                let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(99);
                let mut committed = 0u32;
                while committed < 40_000 {
                    match channel.acquire_write() {
                        Ok(mut writer) => {
                            let value = (committed % 251) as u8;
                            for byte in writer.iter_mut() {
                                *byte = value;
                            }
                            writer.commit();
                            committed += 1;
                        }
                        Err(ChannelError::AllSlotsInUse) => std::thread::yield_now(),
                        Err(err) => panic!("unexpected channel error: {err}"),
                    }
                    if rng.gen_bool(0.05) {
                        std::thread::yield_now();
                    }
                }
            })
        };

        producer.join().unwrap();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
