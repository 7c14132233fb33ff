//! # Input Recorder
//!
//! Holds the flat raw-input table and one state slot per action, and
//! reduces every action from its bindings each tick.
//!
//! ## Reduction rules
//!
//! - **Button**: `down` is the OR of every button binding's raw value.
//!   `pressed` fires on the rising edge, `released` on the falling edge,
//!   `held` mirrors `down`. Everything is recomputed fresh each tick.
//! - **Vector2**: bindings are tried in declaration order. An axes binding
//!   overwrites the axes from raw values; a directional binding sums ±1
//!   contributions. The first binding that leaves the vector non-zero
//!   wins - later bindings are not blended in.

use std::sync::Arc;

use skein_core::{CursorWriter, CodecResult};
use skein_shared::Vec2;

use crate::action::{ActionDef, ActionId, ActionMap, ActionState, Binding, ButtonState, Source};
use crate::wire::encode_command;

/// Size of the flat raw-input table.
pub const MAX_SOURCES: usize = 256;

/// Raw input values indexed by [`Source`].
///
/// Buttons are 0.0/1.0; analog axes are whatever the device layer wrote.
pub struct RawInput {
    values: [f32; MAX_SOURCES],
}

impl RawInput {
    /// Creates a table with every source at rest.
    #[must_use]
    pub const fn new() -> Self {
        Self { values: [0.0; MAX_SOURCES] }
    }

    /// Writes a raw value. Out-of-range sources are ignored.
    #[inline]
    pub fn set(&mut self, source: Source, value: f32) {
        if let Some(slot) = self.values.get_mut(source.0 as usize) {
            *slot = value;
        }
    }

    /// Reads a raw value (0.0 for out-of-range sources).
    #[inline]
    #[must_use]
    pub fn get(&self, source: Source) -> f32 {
        self.values.get(source.0 as usize).copied().unwrap_or(0.0)
    }

    /// True when the source reads non-zero.
    #[inline]
    #[must_use]
    pub fn is_down(&self, source: Source) -> bool {
        self.get(source) != 0.0
    }

    /// Returns every source to rest.
    pub fn clear(&mut self) {
        self.values = [0.0; MAX_SOURCES];
    }
}

impl Default for RawInput {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-context action recorder: raw table in, action states out.
pub struct InputRecorder {
    map: Arc<ActionMap>,
    raw: RawInput,
    states: Vec<ActionState>,
}

impl InputRecorder {
    /// Creates a recorder over a shared action map.
    #[must_use]
    pub fn new(map: Arc<ActionMap>) -> Self {
        let states = map
            .actions
            .iter()
            .map(|def| ActionState::initial(def.kind))
            .collect();
        Self { map, raw: RawInput::new(), states }
    }

    /// The shared action map.
    #[must_use]
    pub fn map(&self) -> &Arc<ActionMap> {
        &self.map
    }

    /// Writes one raw source value (device layer callback).
    pub fn set_raw(&mut self, source: Source, value: f32) {
        self.raw.set(source, value);
    }

    /// The raw table, for device layers that write in bulk.
    pub fn raw_mut(&mut self) -> &mut RawInput {
        &mut self.raw
    }

    /// Recomputes every action state from the raw table. Call once per
    /// simulation tick, before anything reads the states.
    pub fn reduce_tick(&mut self) {
        for (index, def) in self.map.actions.iter().enumerate() {
            self.states[index] = reduce(def, &self.raw, self.states[index]);
        }
    }

    /// All action states, indexed by action id.
    #[must_use]
    pub fn states(&self) -> &[ActionState] {
        &self.states
    }

    /// One action's state.
    #[must_use]
    pub fn state(&self, id: ActionId) -> Option<ActionState> {
        self.states.get(id.0 as usize).copied()
    }

    /// One action's state, resolved by name (tooling path, not tick path).
    #[must_use]
    pub fn state_by_name(&self, name: &str) -> Option<ActionState> {
        self.state(self.map.action_id(name)?)
    }

    /// Clones all states for the reconciliation history.
    #[must_use]
    pub fn snapshot(&self) -> Box<[ActionState]> {
        self.states.clone().into_boxed_slice()
    }

    /// Encodes every networked action as an `{id, payload}` command frame.
    ///
    /// Returns the number of commands written. The payload carries no type
    /// tag - the receiving end resolves each id against the same map.
    pub fn encode_commands(&self, writer: &mut CursorWriter<'_>) -> CodecResult<usize> {
        let mut count = 0;
        for (index, def) in self.map.actions.iter().enumerate() {
            if !def.networked {
                continue;
            }
            encode_command(ActionId(index as u16), &self.states[index], writer)?;
            count += 1;
        }
        Ok(count)
    }
}

/// Reduces one action from its bindings. Pure: same raw table and previous
/// state always produce the same result, which is what makes replay after
/// a correction deterministic.
pub(crate) fn reduce(def: &ActionDef, raw: &RawInput, previous: ActionState) -> ActionState {
    match previous {
        ActionState::Button(state) => ActionState::Button(reduce_button(def, raw, state)),
        ActionState::Vector2(_) => ActionState::Vector2(reduce_vector2(def, raw)),
    }
}

fn reduce_button(def: &ActionDef, raw: &RawInput, previous: ButtonState) -> ButtonState {
    let mut down = false;
    for binding in &def.bindings {
        if let Binding::Button { source } = binding {
            down = down || raw.is_down(*source);
        }
    }

    ButtonState {
        pressed: !previous.held && down,
        released: previous.held && !down,
        held: down,
    }
}

fn reduce_vector2(def: &ActionDef, raw: &RawInput) -> Vec2 {
    let mut x = 0.0;
    let mut y = 0.0;

    for binding in &def.bindings {
        match binding {
            Binding::Axes { x: sx, y: sy } => {
                if let Some(source) = sx {
                    x = raw.get(*source);
                }
                if let Some(source) = sy {
                    y = raw.get(*source);
                }
            }
            Binding::DirectionalButtons { up, down, left, right } => {
                if raw.is_down(*up) {
                    y += 1.0;
                }
                if raw.is_down(*down) {
                    y -= 1.0;
                }
                if raw.is_down(*left) {
                    x -= 1.0;
                }
                if raw.is_down(*right) {
                    x += 1.0;
                }
            }
            Binding::Button { .. } => {}
        }

        // Earliest binding producing a non-zero result wins.
        if x != 0.0 || y != 0.0 {
            break;
        }
    }

    Vec2::new(x, y)
}
