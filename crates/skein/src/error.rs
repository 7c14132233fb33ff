//! # Engine Error Types

use thiserror::Error;

use skein_core::{ChannelError, CodecError, SharedObjectError};
use skein_resource::ResourceError;
use skein_scene::SceneError;

/// Errors surfaced by the engine harness.
///
/// Each failure stays local to the operation that detected it; there is no
/// global failure handler to propagate to.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Snapshot channel failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Shared snapshot record failure.
    #[error(transparent)]
    Snapshot(#[from] SharedObjectError),

    /// Record encode/decode failure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Resource lifecycle failure.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Scene graph failure.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Configuration could not be read.
    #[error("failed to read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
