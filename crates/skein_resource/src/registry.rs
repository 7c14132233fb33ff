//! # Resource Registry (owning context)
//!
//! Applies lifecycle messages in send order at the start of the owning
//! loop's tick: realizes mirrors through an opaque async capability,
//! answers with `Ready`/`Failed`, and drops mirrors on `Destroy`.
//!
//! Loads are futures run on a dedicated single-thread runtime; their
//! completions come back over a bounded channel and are applied on the next
//! tick boundary, never mid-frame. A completion that arrives after the
//! resource was destroyed is dropped - cancellation by supersession, never
//! resurrection.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::error::{RealizeError, ResourceError};
use crate::handle::{MirrorHandle, ResourceId, ResourceKind};
use crate::messages::LifecycleMessage;

/// Boxed future returned by a realize capability.
pub type RealizeFuture = Pin<Box<dyn Future<Output = Result<MirrorHandle, RealizeError>> + Send>>;

/// Opaque capability that realizes the remote side of a resource - decoding
/// an asset, uploading a GPU buffer, opening an audio stream. The registry
/// only sees success or failure.
pub trait RealizeResource: Send + Sync + 'static {
    /// Starts realizing the mirror for `id`. The returned future resolves
    /// on the loader runtime; the result is applied on a tick boundary.
    fn realize(&self, id: ResourceId, kind: ResourceKind, props: Vec<u8>) -> RealizeFuture;
}

enum MirrorState {
    /// The realize future is in flight.
    Loading,
    /// The mirror exists.
    Live(MirrorHandle),
}

struct Completion {
    id: ResourceId,
    result: Result<MirrorHandle, RealizeError>,
}

/// Keeps the loader runtime alive and shuts it down with the registry.
struct RuntimeDriver {
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Drop for RuntimeDriver {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Mirror registry owned by the owning context.
pub struct ResourceRegistry {
    realizer: Arc<dyn RealizeResource>,
    mirrors: HashMap<ResourceId, MirrorState>,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    pending_notifications: Vec<LifecycleMessage>,
    runtime: tokio::runtime::Handle,
    _driver: RuntimeDriver,
}

impl ResourceRegistry {
    /// Creates a registry realizing mirrors through `realizer`.
    ///
    /// `completion_capacity` bounds the in-flight completion queue.
    pub fn new(
        realizer: Arc<dyn RealizeResource>,
        completion_capacity: usize,
    ) -> Result<Self, ResourceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|err| ResourceError::Runtime(err.to_string()))?;
        let handle = runtime.handle().clone();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let thread = std::thread::Builder::new()
            .name("skein-resource-loader".into())
            .spawn(move || {
                // Drives every spawned load until the registry drops.
                runtime.block_on(async move {
                    let _ = shutdown_rx.await;
                });
            })
            .map_err(|err| ResourceError::Runtime(err.to_string()))?;

        let (completions_tx, completions_rx) = bounded(completion_capacity);

        Ok(Self {
            realizer,
            mirrors: HashMap::new(),
            completions_tx,
            completions_rx,
            pending_notifications: Vec::new(),
            runtime: handle,
            _driver: RuntimeDriver { shutdown: Some(shutdown_tx), thread: Some(thread) },
        })
    }

    /// Applies inbound lifecycle messages and load completions, answering
    /// on `outbound`. Call once at the start of the owning loop's tick.
    pub fn tick(
        &mut self,
        inbound: &Receiver<LifecycleMessage>,
        outbound: &Sender<LifecycleMessage>,
    ) {
        // Retry notifications that did not fit in the queue last tick.
        self.pending_notifications.retain(|message| match outbound.try_send(message.clone()) {
            Ok(()) => false,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("notification queue disconnected, dropping message");
                false
            }
        });

        while let Ok(message) = inbound.try_recv() {
            match message {
                LifecycleMessage::Create { id, kind, props } => self.apply_create(id, kind, props),
                LifecycleMessage::Destroy { id } => self.apply_destroy(id),
                other => {
                    tracing::warn!(?other, "unexpected message on lifecycle channel");
                }
            }
        }

        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion, outbound);
        }
    }

    fn apply_create(&mut self, id: ResourceId, kind: ResourceKind, props: Vec<u8>) {
        if self.mirrors.contains_key(&id) {
            tracing::warn!(?id, "duplicate create, ignored");
            return;
        }
        self.mirrors.insert(id, MirrorState::Loading);

        let realizer = Arc::clone(&self.realizer);
        let completions = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = realizer.realize(id, kind, props).await;
            if completions.try_send(Completion { id, result }).is_err() {
                tracing::warn!(?id, "completion queue unavailable, load result dropped");
            }
        });
    }

    fn apply_destroy(&mut self, id: ResourceId) {
        match self.mirrors.remove(&id) {
            Some(MirrorState::Live(_)) => {
                tracing::debug!(?id, "mirror destroyed");
            }
            Some(MirrorState::Loading) => {
                // The in-flight load completes as a no-op.
                tracing::debug!(?id, "destroy while loading, completion will be dropped");
            }
            None => {
                tracing::debug!(?id, "destroy for absent mirror, ignored");
            }
        }
    }

    fn apply_completion(&mut self, completion: Completion, outbound: &Sender<LifecycleMessage>) {
        let Completion { id, result } = completion;
        match self.mirrors.get(&id) {
            Some(MirrorState::Loading) => {}
            Some(MirrorState::Live(_)) => {
                tracing::warn!(?id, "duplicate completion, ignored");
                return;
            }
            None => {
                // Destroyed while the load was in flight.
                tracing::debug!(?id, "load completed after destroy, dropped");
                return;
            }
        }

        match result {
            Ok(handle) => {
                self.mirrors.insert(id, MirrorState::Live(handle));
                self.notify(outbound, LifecycleMessage::Ready { id, handle });
            }
            Err(err) => {
                tracing::warn!(?id, %err, "realize failed");
                self.mirrors.remove(&id);
                self.notify(outbound, LifecycleMessage::Failed { id });
            }
        }
    }

    fn notify(&mut self, outbound: &Sender<LifecycleMessage>, message: LifecycleMessage) {
        match outbound.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                tracing::warn!("notification queue full, deferred to next tick");
                self.pending_notifications.push(message);
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("notification queue disconnected, message dropped");
            }
        }
    }

    /// The realized mirror handle for `id`, if live.
    #[must_use]
    pub fn mirror(&self, id: ResourceId) -> Option<MirrorHandle> {
        match self.mirrors.get(&id) {
            Some(MirrorState::Live(handle)) => Some(*handle),
            _ => None,
        }
    }

    /// True while a load for `id` is in flight.
    #[must_use]
    pub fn is_loading(&self, id: ResourceId) -> bool {
        matches!(self.mirrors.get(&id), Some(MirrorState::Loading))
    }

    /// Number of tracked mirrors (loading or live).
    #[must_use]
    pub fn mirror_count(&self) -> usize {
        self.mirrors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::lifecycle_channel;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// Realizer that completes immediately with a handle derived from the id.
    struct MockRealizer {
        loads: AtomicU64,
    }

    impl MockRealizer {
        fn new() -> Arc<Self> {
            Arc::new(Self { loads: AtomicU64::new(0) })
        }
    }

    impl RealizeResource for MockRealizer {
        fn realize(&self, id: ResourceId, _kind: ResourceKind, _props: Vec<u8>) -> RealizeFuture {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(MirrorHandle(u64::from(id.index()) + 100)) })
        }
    }

    /// Realizer that always fails.
    struct FailingRealizer;

    impl RealizeResource for FailingRealizer {
        fn realize(&self, _id: ResourceId, _kind: ResourceKind, _props: Vec<u8>) -> RealizeFuture {
            Box::pin(async { Err(RealizeError("decoder exploded".into())) })
        }
    }

    fn pump_until<F: Fn(&ResourceRegistry) -> bool>(
        registry: &mut ResourceRegistry,
        inbound: &Receiver<LifecycleMessage>,
        outbound: &Sender<LifecycleMessage>,
        done: F,
    ) {
        for _ in 0..500 {
            registry.tick(inbound, outbound);
            if done(registry) {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("registry did not reach expected state in time");
    }

    #[test]
    fn test_create_realizes_and_notifies_ready() {
        let (to_owner_tx, to_owner_rx) = lifecycle_channel(8);
        let (to_creator_tx, to_creator_rx) = lifecycle_channel(8);
        let realizer = MockRealizer::new();
        let mut registry = ResourceRegistry::new(Arc::clone(&realizer) as Arc<dyn RealizeResource>, 8).unwrap();

        let id = ResourceId::new(0, 1);
        to_owner_tx
            .send(LifecycleMessage::Create { id, kind: ResourceKind(1), props: vec![] })
            .unwrap();

        pump_until(&mut registry, &to_owner_rx, &to_creator_tx, |r| r.mirror(id).is_some());

        assert_eq!(registry.mirror(id), Some(MirrorHandle(100)));
        assert_eq!(realizer.loads.load(Ordering::SeqCst), 1);
        assert_eq!(
            to_creator_rx.try_recv().unwrap(),
            LifecycleMessage::Ready { id, handle: MirrorHandle(100) }
        );
    }

    #[test]
    fn test_failed_load_notifies_failed() {
        let (to_owner_tx, to_owner_rx) = lifecycle_channel(8);
        let (to_creator_tx, to_creator_rx) = lifecycle_channel(8);
        let mut registry = ResourceRegistry::new(Arc::new(FailingRealizer), 8).unwrap();

        let id = ResourceId::new(4, 1);
        to_owner_tx
            .send(LifecycleMessage::Create { id, kind: ResourceKind(1), props: vec![] })
            .unwrap();

        pump_until(&mut registry, &to_owner_rx, &to_creator_tx, |r| r.mirror_count() == 0);

        assert_eq!(to_creator_rx.try_recv().unwrap(), LifecycleMessage::Failed { id });
    }

    #[test]
    fn test_destroy_during_load_cancels_completion() {
        let (to_owner_tx, to_owner_rx) = lifecycle_channel(8);
        let (to_creator_tx, to_creator_rx) = lifecycle_channel(8);

        // Realizer slow enough that the destroy overtakes the completion.
        struct SlowRealizer;
        impl RealizeResource for SlowRealizer {
            fn realize(&self, _id: ResourceId, _kind: ResourceKind, _props: Vec<u8>) -> RealizeFuture {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(MirrorHandle(1))
                })
            }
        }

        let mut registry = ResourceRegistry::new(Arc::new(SlowRealizer), 8).unwrap();

        let id = ResourceId::new(2, 1);
        to_owner_tx
            .send(LifecycleMessage::Create { id, kind: ResourceKind(1), props: vec![] })
            .unwrap();
        to_owner_tx.send(LifecycleMessage::Destroy { id }).unwrap();

        // Both messages apply on the next tick; the mirror entry is gone
        // before the load resolves.
        registry.tick(&to_owner_rx, &to_creator_tx);
        assert_eq!(registry.mirror_count(), 0);

        // Let the sleep resolve, then keep ticking: the completion must be
        // dropped, never surfacing as Ready.
        std::thread::sleep(Duration::from_millis(40));
        for _ in 0..5 {
            registry.tick(&to_owner_rx, &to_creator_tx);
        }
        assert_eq!(registry.mirror_count(), 0);
        assert!(to_creator_rx.try_recv().is_err(), "cancelled load must not notify");
    }

    #[test]
    fn test_destroy_for_absent_mirror_is_noop() {
        let (to_owner_tx, to_owner_rx) = lifecycle_channel(8);
        let (to_creator_tx, _to_creator_rx) = lifecycle_channel(8);
        let mut registry = ResourceRegistry::new(MockRealizer::new(), 8).unwrap();

        to_owner_tx
            .send(LifecycleMessage::Destroy { id: ResourceId::new(9, 9) })
            .unwrap();
        registry.tick(&to_owner_rx, &to_creator_tx);
        assert_eq!(registry.mirror_count(), 0);
    }
}
