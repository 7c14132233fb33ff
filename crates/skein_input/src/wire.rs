//! # Action Wire Encoding
//!
//! Payload layout (no framing, no inline type tag):
//!
//! ```text
//! Button:   1 byte    bit0 = pressed, bit1 = released, bit2 = held
//! Vector2:  8 bytes   two little-endian f32 (x, y)
//! ```
//!
//! A command frame is `action id (u16 LE)` followed by the payload. The
//! receiver resolves the payload length from the action's declared kind in
//! the shared map - schema-by-convention, exactly like the rest of the
//! codec layer.

use thiserror::Error;

use skein_core::{CodecError, CodecResult, CursorReader, CursorWriter};
use skein_shared::Vec2;

use crate::action::{ActionId, ActionKind, ActionMap, ActionState, ButtonState};

const PRESSED_BIT: u8 = 1 << 0;
const RELEASED_BIT: u8 = 1 << 1;
const HELD_BIT: u8 = 1 << 2;

/// Errors raised decoding action traffic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The frame names an action the shared map does not declare.
    #[error("unknown action id {0}")]
    UnknownAction(u16),

    /// Cursor-level failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Encodes one action payload.
pub fn encode_payload(state: &ActionState, writer: &mut CursorWriter<'_>) -> CodecResult<()> {
    match state {
        ActionState::Button(button) => {
            let mut mask = 0u8;
            if button.pressed {
                mask |= PRESSED_BIT;
            }
            if button.released {
                mask |= RELEASED_BIT;
            }
            if button.held {
                mask |= HELD_BIT;
            }
            writer.write_u8(mask)
        }
        ActionState::Vector2(v) => {
            writer.write_f32(v.x)?;
            writer.write_f32(v.y)
        }
    }
}

/// Decodes one action payload of the given kind.
pub fn decode_payload(kind: ActionKind, reader: &mut CursorReader<'_>) -> CodecResult<ActionState> {
    match kind {
        ActionKind::Button => {
            let mask = reader.read_u8()?;
            Ok(ActionState::Button(ButtonState {
                pressed: mask & PRESSED_BIT != 0,
                released: mask & RELEASED_BIT != 0,
                held: mask & HELD_BIT != 0,
            }))
        }
        ActionKind::Vector2 => {
            let x = reader.read_f32()?;
            let y = reader.read_f32()?;
            Ok(ActionState::Vector2(Vec2::new(x, y)))
        }
    }
}

/// Encodes an `{id, payload}` command frame.
pub fn encode_command(
    id: ActionId,
    state: &ActionState,
    writer: &mut CursorWriter<'_>,
) -> CodecResult<()> {
    writer.write_u16(id.0)?;
    encode_payload(state, writer)
}

/// Decodes one command frame, resolving the payload kind from `map`.
pub fn decode_command(
    map: &ActionMap,
    reader: &mut CursorReader<'_>,
) -> Result<(ActionId, ActionState), InputError> {
    let raw_id = reader.read_u16()?;
    let id = ActionId(raw_id);
    let Some(kind) = map.kind(id) else {
        return Err(InputError::UnknownAction(raw_id));
    };
    let state = decode_payload(kind, reader)?;
    Ok((id, state))
}
