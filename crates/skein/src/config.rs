//! # Engine Configuration
//!
//! Loaded once at startup from TOML; every field falls back to the
//! engine-wide defaults, so an empty file (or none at all) boots a working
//! engine. The action map lives here because it is the out-of-band
//! contract both ends of a connection must load identically.

use std::path::Path;

use serde::Deserialize;

use skein_input::{ActionDef, ActionKind, ActionMap, Binding};
use skein_shared::constants;

use crate::error::EngineError;

/// Raw input source ids used by the fallback action map.
///
/// The numbering is the contract between the device layer and the
/// bindings; it has no meaning beyond "both sides agree".
pub mod keys {
    use skein_input::Source;

    /// W key.
    pub const KEY_W: Source = Source(17);
    /// A key.
    pub const KEY_A: Source = Source(30);
    /// S key.
    pub const KEY_S: Source = Source(31);
    /// D key.
    pub const KEY_D: Source = Source(32);
    /// Space bar.
    pub const KEY_SPACE: Source = Source(44);
    /// Left analog stick, x axis.
    pub const STICK_X: Source = Source(200);
    /// Left analog stick, y axis.
    pub const STICK_Y: Source = Source(201);
}

/// Engine tuning, loaded once at startup.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulation ticks per second.
    pub simulation_tick_rate: u32,
    /// Presentation ticks per second.
    pub presentation_tick_rate: u32,
    /// Control ticks per second.
    pub control_tick_rate: u32,
    /// Bounded capacity of each lifecycle queue.
    pub lifecycle_capacity: usize,
    /// Cap on retained reconciliation history entries.
    pub input_history_cap: usize,
    /// Maximum entities in one published snapshot.
    pub max_snapshot_entities: usize,
    /// The shared action map.
    pub action_map: ActionMap,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simulation_tick_rate: constants::SIMULATION_TICK_RATE,
            presentation_tick_rate: constants::PRESENTATION_TICK_RATE,
            control_tick_rate: constants::CONTROL_TICK_RATE,
            lifecycle_capacity: constants::LIFECYCLE_CHANNEL_CAPACITY,
            input_history_cap: constants::INPUT_HISTORY_CAP,
            max_snapshot_entities: crate::snapshot::MAX_SNAPSHOT_ENTITIES,
            action_map: fallback_action_map(),
        }
    }
}

impl EngineConfig {
    /// Parses a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a config file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Seconds per simulation tick.
    #[must_use]
    pub fn simulation_dt(&self) -> f32 {
        1.0 / self.simulation_tick_rate as f32
    }
}

/// The built-in action map: analog move with directional-button fallback,
/// plus a jump button. Both are networked.
#[must_use]
pub fn fallback_action_map() -> ActionMap {
    ActionMap {
        name: "fallback".into(),
        actions: vec![
            ActionDef {
                name: "player/move".into(),
                kind: ActionKind::Vector2,
                bindings: vec![
                    Binding::Axes { x: Some(keys::STICK_X), y: Some(keys::STICK_Y) },
                    Binding::DirectionalButtons {
                        up: keys::KEY_W,
                        down: keys::KEY_S,
                        left: keys::KEY_A,
                        right: keys::KEY_D,
                    },
                ],
                networked: true,
            },
            ActionDef {
                name: "player/jump".into(),
                kind: ActionKind::Button,
                bindings: vec![Binding::Button { source: keys::KEY_SPACE }],
                networked: true,
            },
        ],
    }
}
