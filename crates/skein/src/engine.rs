//! # Engine Wiring
//!
//! Builds the three execution contexts and the channels between them, then
//! hands each context out to be moved onto its own thread. After
//! construction nothing is shared except the snapshot channel and the
//! bounded lifecycle queues.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use skein_core::{DenseStore, EntityId, SharedObjectError, TripleBufferedObject, World};
use skein_input::{
    ActionId, ActionState, Correction, HistoryEntry, InputHistory, InputRecorder, PredictedState,
    ReconcileOutcome, StepSimulation,
};
use skein_resource::{
    lifecycle_channel, LifecycleMessage, RealizeResource, ResourceDirectory, ResourceRegistry,
};
use skein_scene::{NodeId, SceneGraph};
use skein_shared::{Tick, Transform, Vec3};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::snapshot::{world_schema, SnapshotFields};

/// Deterministic kinematic integrator shared by the forward step and the
/// reconciliation replay - by construction they cannot diverge.
struct KinematicStep {
    move_action: Option<ActionId>,
    jump_action: Option<ActionId>,
    speed: f32,
    jump_impulse: f32,
    gravity: f32,
    dt: f32,
}

impl StepSimulation for KinematicStep {
    fn step(&mut self, states: &[ActionState], predicted: &mut PredictedState) {
        let mut velocity = predicted.velocity;

        if let Some(ActionState::Vector2(movement)) =
            self.move_action.and_then(|id| states.get(id.0 as usize).copied())
        {
            velocity.x = movement.x * self.speed;
            velocity.z = movement.y * self.speed;
        }

        if let Some(ActionState::Button(jump)) =
            self.jump_action.and_then(|id| states.get(id.0 as usize).copied())
        {
            if jump.pressed && predicted.position.y <= 0.0 {
                velocity.y = self.jump_impulse;
            }
        }

        velocity.y += self.gravity * self.dt;
        predicted.position = predicted.position + velocity * self.dt;
        if predicted.position.y < 0.0 {
            predicted.position.y = 0.0;
            velocity.y = 0.0;
        }
        predicted.velocity = velocity;
    }
}

/// The simulation context: authoritative state and the snapshot producer.
pub struct Simulation {
    /// Current simulation tick.
    pub tick: Tick,
    /// Entity allocator.
    pub world: World,
    /// Authoritative transforms, entity-id keyed.
    pub transforms: DenseStore<Transform>,
    /// Scene graph; `root` is always live.
    pub scene: SceneGraph,
    /// Scene root node.
    pub root: NodeId,
    /// Cross-context resource directory.
    pub directory: ResourceDirectory,
    /// Action recorder.
    pub recorder: InputRecorder,
    /// Reconciliation history.
    pub history: InputHistory,

    player: EntityId,
    player_node: NodeId,
    predicted: PredictedState,
    stepper: KinematicStep,
    host_authority: bool,

    snapshot: TripleBufferedObject,
    fields: SnapshotFields,
    notifications: Receiver<LifecycleMessage>,
}

impl Simulation {
    /// One full simulation tick: drain messages, reduce input, integrate,
    /// record history, apply destroys, publish the snapshot.
    ///
    /// Returns the committed snapshot version. A starved snapshot channel
    /// ([`skein_core::ChannelError::AllSlotsInUse`]) is not fatal - the
    /// error is returned and the caller simply ticks again later.
    pub fn tick(&mut self) -> Result<u64, EngineError> {
        self.tick += 1;

        // Inbound messages first: the state below must see them.
        self.directory.pump(&self.notifications);

        self.recorder.reduce_tick();
        self.stepper.step(self.recorder.states(), &mut self.predicted);

        self.transforms
            .insert(self.player, Transform::from_position(self.predicted.position));
        self.scene
            .set_local_transform(self.player_node, Transform::from_position(self.predicted.position));
        self.scene.update(self.root)?;

        if !self.host_authority {
            self.history.push(HistoryEntry {
                tick: self.tick,
                states: self.recorder.snapshot(),
                predicted: self.predicted,
            });
        }

        self.directory.flush_destroys();

        let version = self.publish()?;
        Ok(version)
    }

    fn publish(&mut self) -> Result<u64, SharedObjectError> {
        let fields = self.fields;
        let tick = self.tick as u32;
        let transforms = &self.transforms;
        let (_, version) = self.snapshot.publish(|view| {
            fields.write(
                view,
                tick,
                transforms.iter().map(|(id, t)| (id, t.position)),
            )
        })?;
        Ok(version)
    }

    /// Applies a host correction for an earlier tick, replaying the
    /// retained history through the same integrator as the forward path.
    pub fn apply_correction(&mut self, correction: &Correction) -> ReconcileOutcome {
        let outcome = self.history.reconcile(correction, &mut self.stepper);
        if let Some(latest) = self.history.latest() {
            self.predicted = latest.predicted;
            self.transforms
                .insert(self.player, Transform::from_position(self.predicted.position));
        }
        outcome
    }

    /// The player entity driven by the action map.
    #[must_use]
    pub const fn player(&self) -> EntityId {
        self.player
    }

    /// The player's predicted state after the last tick.
    #[must_use]
    pub const fn predicted(&self) -> PredictedState {
        self.predicted
    }

    /// Switches host authority on or off. Under host authority no history
    /// is recorded - there is nothing to reconcile against yourself.
    pub fn set_host_authority(&mut self, hosting: bool) {
        self.host_authority = hosting;
    }
}

/// Decoded view of one published snapshot.
#[derive(Clone, Debug)]
pub struct SnapshotView {
    /// Snapshot channel version.
    pub version: u64,
    /// Simulation tick the snapshot was taken on.
    pub tick: u32,
    /// Entity positions, in store order.
    pub entities: Vec<(EntityId, Vec3)>,
}

/// The presentation context: a snapshot consumer at its own cadence.
pub struct Presentation {
    reader: skein_core::TripleBufferedObjectReader,
    fields: SnapshotFields,
}

impl Presentation {
    /// Reads the latest committed snapshot.
    ///
    /// Before the first commit this returns
    /// [`SharedObjectError::NotYetPublished`]; afterwards it always
    /// succeeds, possibly returning the same version as last time.
    pub fn latest(&mut self) -> Result<SnapshotView, EngineError> {
        let fields = self.fields;
        let (decoded, version) = self.reader.read(|view| fields.read(view))?;
        let (tick, entities) = decoded?;
        Ok(SnapshotView { version, tick, entities })
    }
}

/// The control context: resource lifecycle application.
pub struct Control {
    registry: ResourceRegistry,
    inbound: Receiver<LifecycleMessage>,
    outbound: Sender<LifecycleMessage>,
}

impl Control {
    /// Applies inbound lifecycle messages and load completions. Call once
    /// per control tick.
    pub fn tick(&mut self) {
        self.registry.tick(&self.inbound, &self.outbound);
    }

    /// The mirror registry, for inspection.
    #[must_use]
    pub const fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }
}

/// The wired engine: one context per loop, ready to move onto threads.
pub struct Engine {
    /// Simulation context.
    pub simulation: Simulation,
    /// Presentation context.
    pub presentation: Presentation,
    /// Control context.
    pub control: Control,
}

impl Engine {
    /// Builds the three contexts and every channel between them.
    pub fn new(
        config: &EngineConfig,
        realizer: Arc<dyn RealizeResource>,
    ) -> Result<Self, EngineError> {
        let schema = Arc::new(world_schema(config.max_snapshot_entities));
        let fields = SnapshotFields::resolve(&schema, config.max_snapshot_entities);
        let snapshot = TripleBufferedObject::new(schema);
        let reader = snapshot.reader()?;

        let (to_control_tx, to_control_rx) = lifecycle_channel(config.lifecycle_capacity);
        let (to_simulation_tx, to_simulation_rx) = lifecycle_channel(config.lifecycle_capacity);

        let map = Arc::new(config.action_map.clone());
        let mut world = World::new(1024);
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let player_node = scene.create_node();
        scene.add_child(root, player_node)?;
        let player = world.spawn();

        let mut transforms = DenseStore::new(world.capacity());
        transforms.insert(player, Transform::IDENTITY);

        let stepper = KinematicStep {
            move_action: map.action_id("player/move"),
            jump_action: map.action_id("player/jump"),
            speed: 5.0,
            jump_impulse: 8.0,
            gravity: -20.0,
            dt: config.simulation_dt(),
        };

        let simulation = Simulation {
            tick: 0,
            world,
            transforms,
            scene,
            root,
            directory: ResourceDirectory::new(to_control_tx.clone()),
            recorder: InputRecorder::new(Arc::clone(&map)),
            history: InputHistory::new(config.input_history_cap),
            player,
            player_node,
            predicted: PredictedState::default(),
            stepper,
            host_authority: false,
            snapshot,
            fields,
            notifications: to_simulation_rx,
        };

        let presentation = Presentation { reader, fields };

        let control = Control {
            registry: ResourceRegistry::new(realizer, config.lifecycle_capacity)?,
            inbound: to_control_rx,
            outbound: to_simulation_tx,
        };

        Ok(Self { simulation, presentation, control })
    }
}
