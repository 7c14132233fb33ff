//! # Resource Directory (creating context)
//!
//! Allocates resource ids, tracks refcounts and dependency edges, and
//! enqueues lifecycle messages toward the owning context.
//!
//! ## Destruction protocol
//!
//! `remove_ref` reaching zero only *queues* the id. [`flush_destroys`]
//! (called once per tick) re-validates each queued id against the live
//! refcount before anything is sent: an `add_ref` that raced the queue
//! cancels the destroy. This is what makes reordered create/addref/destroy
//! traffic safe - the decision is made at apply time, not enqueue time.
//!
//! Resources form a DAG: creating a resource add-refs each dependency, and
//! those refs are only released when the dependent resource is actually
//! destroyed. A dependency can therefore never be destroyed while a
//! dependent is alive.

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::error::ResourceError;
use crate::handle::{LoadState, MirrorHandle, ResourceId, ResourceKind};
use crate::messages::LifecycleMessage;

struct Slot {
    generation: u32,
    live: bool,
    refcount: u32,
    kind: ResourceKind,
    state: LoadState,
    deps: Vec<ResourceId>,
}

/// Ref-counted resource directory owned by the creating context.
pub struct ResourceDirectory {
    slots: Vec<Slot>,
    free: Vec<u32>,
    pending_destroys: Vec<ResourceId>,
    deferred_outbound: Vec<LifecycleMessage>,
    outbound: Sender<LifecycleMessage>,
}

impl ResourceDirectory {
    /// Creates a directory sending lifecycle messages on `outbound`.
    #[must_use]
    pub fn new(outbound: Sender<LifecycleMessage>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            pending_destroys: Vec::new(),
            deferred_outbound: Vec::new(),
            outbound,
        }
    }

    fn slot(&self, id: ResourceId) -> Option<&Slot> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get(id.index() as usize)?;
        (slot.live && slot.generation == id.generation()).then_some(slot)
    }

    fn slot_mut(&mut self, id: ResourceId) -> Option<&mut Slot> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get_mut(id.index() as usize)?;
        (slot.live && slot.generation == id.generation()).then_some(slot)
    }

    /// Creates a resource with refcount 1 and enqueues its creation toward
    /// the owning context.
    ///
    /// The returned handle is usable immediately - the mirror does not exist
    /// yet ([`LoadState::Pending`]) but references, dependencies and even
    /// destruction already work against it.
    ///
    /// Dependencies are add-ref'd; a stale dependency id is skipped with a
    /// warning rather than failing the create.
    pub fn create(
        &mut self,
        kind: ResourceKind,
        props: Vec<u8>,
        deps: &[ResourceId],
    ) -> Result<ResourceId, ResourceError> {
        let mut held_deps = Vec::with_capacity(deps.len());
        for dep in deps {
            if self.add_ref(*dep) {
                held_deps.push(*dep);
            } else {
                tracing::warn!(?dep, "create references a dead dependency, skipped");
            }
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    live: false,
                    refcount: 0,
                    kind,
                    state: LoadState::Pending,
                    deps: Vec::new(),
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.live = true;
        slot.refcount = 1;
        slot.kind = kind;
        slot.state = LoadState::Pending;
        slot.deps = held_deps;

        let id = ResourceId::new(index, slot.generation);
        let message = LifecycleMessage::Create { id, kind, props };
        if let Err(err) = self.outbound.try_send(message) {
            // Roll back: release the slot and the dependency refs.
            let deps = std::mem::take(&mut self.slots[index as usize].deps);
            self.slots[index as usize].live = false;
            self.slots[index as usize].refcount = 0;
            self.free.push(index);
            for dep in deps {
                self.remove_ref(dep);
            }
            return Err(match err {
                TrySendError::Full(_) => ResourceError::QueueFull,
                TrySendError::Disconnected(_) => ResourceError::QueueDisconnected,
            });
        }

        Ok(id)
    }

    /// Increments the refcount. Returns `false` (logged) for a stale or
    /// destroyed id.
    pub fn add_ref(&mut self, id: ResourceId) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.refcount += 1;
                true
            }
            None => {
                tracing::warn!(?id, "add_ref on dead or stale resource, ignored");
                false
            }
        }
    }

    /// Decrements the refcount; reaching zero queues the id for destruction.
    ///
    /// The refcount can never go negative: a remove on an id whose count is
    /// already zero (or that is dead) is a logged no-op.
    pub fn remove_ref(&mut self, id: ResourceId) {
        let Some(slot) = self.slot_mut(id) else {
            tracing::warn!(?id, "remove_ref on dead or stale resource, ignored");
            return;
        };
        if slot.refcount == 0 {
            tracing::warn!(?id, "remove_ref on refcount already at zero, ignored");
            return;
        }
        slot.refcount -= 1;
        if slot.refcount == 0 {
            self.pending_destroys.push(id);
        }
    }

    /// Applies queued destroys, re-validating each against the live
    /// refcount. Call once per tick.
    ///
    /// Returns the number of resources actually destroyed. Destroying an id
    /// twice is idempotent; releasing a destroyed resource's dependencies
    /// may cascade into further destroys within the same flush.
    pub fn flush_destroys(&mut self) -> usize {
        // Retry messages that did not fit in the queue last tick.
        self.deferred_outbound.retain(|message| match self.outbound.try_send(message.clone()) {
            Ok(()) => false,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("lifecycle queue disconnected, dropping deferred message");
                false
            }
        });

        let mut destroyed = 0;
        while !self.pending_destroys.is_empty() {
            let batch: Vec<ResourceId> = self.pending_destroys.drain(..).collect();
            for id in batch {
                let Some(slot) = self.slot_mut(id) else {
                    // Already destroyed via an earlier queue entry.
                    tracing::debug!(?id, "duplicate destroy, ignored");
                    continue;
                };
                if slot.refcount > 0 {
                    // An add_ref arrived after the destroy was enqueued.
                    tracing::debug!(?id, refcount = slot.refcount, "destroy cancelled by add_ref");
                    continue;
                }

                slot.live = false;
                let deps = std::mem::take(&mut slot.deps);
                self.free.push(id.index());
                destroyed += 1;

                match self.outbound.try_send(LifecycleMessage::Destroy { id }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(message)) => {
                        tracing::warn!(?id, "lifecycle queue full, destroy deferred to next tick");
                        self.deferred_outbound.push(message);
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        tracing::warn!(?id, "lifecycle queue disconnected, destroy dropped");
                    }
                }

                for dep in deps {
                    self.remove_ref(dep);
                }
            }
        }
        destroyed
    }

    /// Applies a `Ready` notification from the owning context.
    ///
    /// A completion for an id that has been destroyed in the meantime is a
    /// no-op - it never resurrects the resource.
    pub fn apply_ready(&mut self, id: ResourceId, handle: MirrorHandle) {
        match self.slot_mut(id) {
            Some(slot) if slot.state == LoadState::Pending => {
                slot.state = LoadState::Ready(handle);
            }
            Some(slot) => {
                tracing::debug!(?id, state = ?slot.state, "ready for non-pending resource, ignored");
            }
            None => {
                tracing::warn!(?id, "ready for destroyed resource, ignored");
            }
        }
    }

    /// Applies a `Failed` notification from the owning context.
    pub fn apply_failed(&mut self, id: ResourceId) {
        match self.slot_mut(id) {
            Some(slot) if slot.state == LoadState::Pending => {
                tracing::warn!(?id, "resource load failed");
                slot.state = LoadState::Failed;
            }
            Some(_) | None => {
                tracing::debug!(?id, "failure for non-pending resource, ignored");
            }
        }
    }

    /// Drains `Ready`/`Failed` notifications from the owning context.
    /// Call at the start of the creating loop's tick.
    pub fn pump(&mut self, inbound: &Receiver<LifecycleMessage>) {
        while let Ok(message) = inbound.try_recv() {
            match message {
                LifecycleMessage::Ready { id, handle } => self.apply_ready(id, handle),
                LifecycleMessage::Failed { id } => self.apply_failed(id),
                other => {
                    tracing::warn!(?other, "unexpected message on notification channel");
                }
            }
        }
    }

    /// Lifecycle state of a resource, `None` for dead or stale ids.
    #[must_use]
    pub fn state(&self, id: ResourceId) -> Option<LoadState> {
        self.slot(id).map(|slot| slot.state)
    }

    /// Current refcount, `None` for dead or stale ids.
    #[must_use]
    pub fn refcount(&self, id: ResourceId) -> Option<u32> {
        self.slot(id).map(|slot| slot.refcount)
    }

    /// Opaque kind tag, `None` for dead or stale ids.
    #[must_use]
    pub fn kind(&self, id: ResourceId) -> Option<ResourceKind> {
        self.slot(id).map(|slot| slot.kind)
    }

    /// True while the resource has not been destroyed.
    #[must_use]
    pub fn is_live(&self, id: ResourceId) -> bool {
        self.slot(id).is_some()
    }

    /// Number of live resources.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.live).count()
    }
}
