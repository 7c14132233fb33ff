//! # SKEIN Input
//!
//! From raw device values to logical action states, every tick, from
//! scratch: a [`InputRecorder`] reduces each action in its map against the
//! flat raw-input table, the wire module encodes networked actions as
//! `{action id, payload}` frames, and the history/reconcile pair keeps the
//! bounded record needed to replay local prediction after a host
//! correction.
//!
//! There is no cross-tick latching except through the `held` flag, and no
//! stringly-typed dispatch at tick time - bindings index a fixed source
//! table, actions are indices into a shared map.

mod action;
mod history;
mod reconcile;
mod recorder;
mod wire;

pub use action::{ActionDef, ActionId, ActionKind, ActionMap, ActionState, Binding, ButtonState, Source};
pub use history::{HistoryEntry, InputHistory, PredictedState};
pub use reconcile::{Correction, ReconcileOutcome, StepSimulation};
pub use recorder::{InputRecorder, RawInput, MAX_SOURCES};
pub use wire::{decode_command, decode_payload, encode_command, encode_payload, InputError};
