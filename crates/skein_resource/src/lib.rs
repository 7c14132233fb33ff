//! # SKEIN Resource
//!
//! Ref-counted external resources shared across execution contexts.
//!
//! One context *creates* a resource and holds references to it; another
//! context *owns* the realized mirror (a GPU buffer, a decoded audio clip -
//! opaque here). The two sides never share mutable state: everything flows
//! through bounded, per-channel-ordered lifecycle queues, applied at the
//! start of the receiving loop's tick.
//!
//! ```text
//!   creating context                     owning context
//!  ┌──────────────────┐   Create/Destroy  ┌──────────────────┐
//!  │ ResourceDirectory│ ────────────────▶ │ ResourceRegistry │
//!  │  (refcounts,     │                   │  (mirrors,       │
//!  │   pending state) │ ◀──────────────── │   async realize) │
//!  └──────────────────┘    Ready/Failed   └──────────────────┘
//! ```
//!
//! The one rule that keeps reordering safe: a destroy enqueued when the
//! refcount hit zero is **re-validated against the live refcount when it is
//! applied**. An `add_ref` that lands in between cancels it.

mod directory;
mod error;
mod handle;
mod messages;
mod registry;

pub use directory::ResourceDirectory;
pub use error::{RealizeError, ResourceError};
pub use handle::{LoadState, MirrorHandle, ResourceId, ResourceKind};
pub use messages::{lifecycle_channel, LifecycleMessage};
pub use registry::{RealizeFuture, RealizeResource, ResourceRegistry};
