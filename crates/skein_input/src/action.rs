//! # Action Definitions
//!
//! The shared action map: both ends of a connection load the same ordered
//! list of action definitions, so an action id (the index into that list)
//! and the payload length it implies never travel on the wire.

use serde::{Deserialize, Serialize};

use skein_shared::Vec2;

/// Index of a raw input source (key, axis, ...) in the flat raw table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Source(pub u16);

/// The two action payload shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Edge-tracked button: pressed / released / held.
    Button,
    /// Two-axis vector.
    Vector2,
}

/// Per-tick state of a button action.
///
/// Recomputed fresh every tick; `pressed` and `released` are one-tick edge
/// flags, `held` is the only state that carries across ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Rising edge this tick.
    pub pressed: bool,
    /// Falling edge this tick.
    pub released: bool,
    /// Down this tick.
    pub held: bool,
}

/// State of one action, tagged by its kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActionState {
    /// Button action state.
    Button(ButtonState),
    /// Vector2 action state.
    Vector2(Vec2),
}

impl ActionState {
    /// The zero state for a kind.
    #[must_use]
    pub const fn initial(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Button => Self::Button(ButtonState {
                pressed: false,
                released: false,
                held: false,
            }),
            ActionKind::Vector2 => Self::Vector2(Vec2::ZERO),
        }
    }

    /// The kind this state belongs to.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Button(_) => ActionKind::Button,
            Self::Vector2(_) => ActionKind::Vector2,
        }
    }
}

/// A mapping from raw input sources to one logical action.
///
/// Declaration order is semantic for Vector2 actions: the earliest binding
/// producing a non-zero result wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Binding {
    /// One button source; multiple button bindings OR together.
    Button {
        /// The raw source.
        source: Source,
    },
    /// Analog axes read directly from raw values.
    Axes {
        /// Source for the x axis, if bound.
        x: Option<Source>,
        /// Source for the y axis, if bound.
        y: Option<Source>,
    },
    /// Four buttons summed into a direction vector.
    DirectionalButtons {
        /// +y source.
        up: Source,
        /// -y source.
        down: Source,
        /// -x source.
        left: Source,
        /// +x source.
        right: Source,
    },
}

/// Index of an action in its map - the wire id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ActionId(pub u16);

/// Definition of one logical action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionDef {
    /// Human-readable path, e.g. `"player/jump"`.
    pub name: String,
    /// Payload shape.
    pub kind: ActionKind,
    /// Bindings in declaration order.
    pub bindings: Vec<Binding>,
    /// Whether this action's state is sent to the host.
    #[serde(default)]
    pub networked: bool,
}

/// An ordered set of action definitions, shared out-of-band.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionMap {
    /// Map name, e.g. `"fallback"`.
    pub name: String,
    /// Actions; an action's id is its index here.
    pub actions: Vec<ActionDef>,
}

impl ActionMap {
    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True when the map declares no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Resolves an action id by name.
    #[must_use]
    pub fn action_id(&self, name: &str) -> Option<ActionId> {
        self.actions
            .iter()
            .position(|def| def.name == name)
            .map(|index| ActionId(index as u16))
    }

    /// The definition behind an id.
    #[must_use]
    pub fn def(&self, id: ActionId) -> Option<&ActionDef> {
        self.actions.get(id.0 as usize)
    }

    /// The payload kind behind an id - how a receiver knows the length.
    #[must_use]
    pub fn kind(&self, id: ActionId) -> Option<ActionKind> {
        self.def(id).map(|def| def.kind)
    }
}
