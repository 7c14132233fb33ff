//! # Lifecycle Messages
//!
//! The cross-context resource protocol: four message types over a bounded
//! queue that preserves send order per channel. There is no ordering
//! guarantee across different channels - the apply-time re-validation in
//! the directory is what makes that safe.

use crossbeam_channel::{bounded, Receiver, Sender};

use skein_core::{CursorReader, CursorWriter};

use crate::error::ResourceError;
use crate::handle::{MirrorHandle, ResourceId, ResourceKind};

/// A resource lifecycle message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleMessage {
    /// Instantiate a mirror for a newly created resource.
    Create {
        /// Resource id allocated by the creating context.
        id: ResourceId,
        /// Opaque type tag.
        kind: ResourceKind,
        /// Initial properties, cursor-encoded by the creator.
        props: Vec<u8>,
    },
    /// Drop the mirror for a destroyed resource.
    Destroy {
        /// Resource id.
        id: ResourceId,
    },
    /// The mirror exists and is usable.
    Ready {
        /// Resource id.
        id: ResourceId,
        /// Opaque handle to the realized mirror.
        handle: MirrorHandle,
    },
    /// The mirror could not be realized.
    Failed {
        /// Resource id.
        id: ResourceId,
    },
}

const TAG_CREATE: u8 = 1;
const TAG_DESTROY: u8 = 2;
const TAG_READY: u8 = 3;
const TAG_FAILED: u8 = 4;

impl LifecycleMessage {
    /// The resource this message is about.
    #[must_use]
    pub const fn id(&self) -> ResourceId {
        match self {
            Self::Create { id, .. }
            | Self::Destroy { id }
            | Self::Ready { id, .. }
            | Self::Failed { id } => *id,
        }
    }

    /// Encodes this message onto a cursor.
    ///
    /// Layout: tag byte, id u64, then variant fields. `props` is length
    /// prefixed (u32); everything else is fixed width.
    pub fn encode(&self, writer: &mut CursorWriter<'_>) -> Result<(), ResourceError> {
        match self {
            Self::Create { id, kind, props } => {
                writer.write_u8(TAG_CREATE)?;
                writer.write_u64(id.to_bits())?;
                writer.write_u16(kind.0)?;
                writer.write_u32(props.len() as u32)?;
                writer.write_bytes(props)?;
            }
            Self::Destroy { id } => {
                writer.write_u8(TAG_DESTROY)?;
                writer.write_u64(id.to_bits())?;
            }
            Self::Ready { id, handle } => {
                writer.write_u8(TAG_READY)?;
                writer.write_u64(id.to_bits())?;
                writer.write_u64(handle.0)?;
            }
            Self::Failed { id } => {
                writer.write_u8(TAG_FAILED)?;
                writer.write_u64(id.to_bits())?;
            }
        }
        Ok(())
    }

    /// Decodes one message from a cursor.
    pub fn decode(reader: &mut CursorReader<'_>) -> Result<Self, ResourceError> {
        let tag = reader.read_u8()?;
        let id = ResourceId::from_bits(reader.read_u64()?);
        match tag {
            TAG_CREATE => {
                let kind = ResourceKind(reader.read_u16()?);
                let len = reader.read_u32()? as usize;
                let props = reader.read_bytes(len)?.to_vec();
                Ok(Self::Create { id, kind, props })
            }
            TAG_DESTROY => Ok(Self::Destroy { id }),
            TAG_READY => {
                let handle = MirrorHandle(reader.read_u64()?);
                Ok(Self::Ready { id, handle })
            }
            TAG_FAILED => Ok(Self::Failed { id }),
            other => Err(ResourceError::UnknownMessageTag(other)),
        }
    }
}

/// Creates one bounded, send-ordered lifecycle channel.
#[must_use]
pub fn lifecycle_channel(capacity: usize) -> (Sender<LifecycleMessage>, Receiver<LifecycleMessage>) {
    bounded(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roundtrip() {
        let messages = [
            LifecycleMessage::Create {
                id: ResourceId::new(5, 1),
                kind: ResourceKind(7),
                props: vec![1, 2, 3, 4],
            },
            LifecycleMessage::Destroy { id: ResourceId::new(5, 1) },
            LifecycleMessage::Ready {
                id: ResourceId::new(9, 2),
                handle: MirrorHandle(0xDEAD),
            },
            LifecycleMessage::Failed { id: ResourceId::new(3, 3) },
        ];

        for message in &messages {
            let mut buf = [0u8; 64];
            let mut writer = CursorWriter::new(&mut buf);
            message.encode(&mut writer).unwrap();
            let written = writer.written().to_vec();

            let mut reader = CursorReader::new(&written);
            let decoded = LifecycleMessage::decode(&mut reader).unwrap();
            assert_eq!(&decoded, message);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let buf = [9u8, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut reader = CursorReader::new(&buf);
        assert!(matches!(
            LifecycleMessage::decode(&mut reader),
            Err(ResourceError::UnknownMessageTag(9))
        ));
    }

    #[test]
    fn test_channel_preserves_send_order() {
        let (tx, rx) = lifecycle_channel(8);
        for index in 0..4 {
            tx.send(LifecycleMessage::Destroy { id: ResourceId::new(index, 0) })
                .unwrap();
        }
        for index in 0..4 {
            let message = rx.try_recv().unwrap();
            assert_eq!(message.id().index(), index);
        }
    }
}
