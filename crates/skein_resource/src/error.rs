//! # Resource Error Types

use thiserror::Error;

use skein_core::CodecError;

/// Errors that can occur in the resource lifecycle layer.
///
/// Soft conditions (stale handles, duplicate destroys, completions for dead
/// resources) are *not* errors - they are logged no-ops by design. These
/// variants cover the hard failures local to one operation.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The bounded lifecycle queue is full; the operation was not applied.
    #[error("lifecycle queue full, message dropped by sender")]
    QueueFull,

    /// The other side of a lifecycle queue is gone.
    #[error("lifecycle queue disconnected")]
    QueueDisconnected,

    /// A lifecycle message carried an unknown tag byte.
    #[error("unknown lifecycle message tag {0}")]
    UnknownMessageTag(u8),

    /// Failure encoding or decoding a lifecycle message.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The load runtime could not be started.
    #[error("failed to start load runtime: {0}")]
    Runtime(String),
}

/// Failure reported by an opaque resource-load capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("resource load failed: {0}")]
pub struct RealizeError(pub String);
