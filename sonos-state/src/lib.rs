//! Sonos group and playback state
//!
//! The state half of the synchronization engine: what each speaker is
//! playing, which group it belongs to, and the rules for changing both.
//!
//! # Architecture
//!
//! ```text
//! RawEvent → decoders → DecodedEvent ─┬→ Reconciler → StateStore → StateChange
//!                                     └→ TopologyStore ──(version)──→ ConvergenceWaiter
//! ```
//!
//! Nothing here performs I/O. The `sonos-sync` crate owns the device proxy,
//! polls on behalf of these types and serializes writes with
//! [`TopologyLock`].

// Core modules
pub mod activity;
pub mod cache;
pub mod convergence;
pub mod decoder;
pub mod decoders;
pub mod model;
pub mod reconciler;
pub mod store;
pub mod topology;

// Error types
pub mod error;

// Logging infrastructure
pub mod logging;

// ============================================================================
// Re-exports
// ============================================================================

pub use activity::EventActivity;
pub use cache::GroupViewCache;
pub use convergence::{Convergence, ConvergenceWaiter, TopologyGuard, TopologyLock};
pub use decoder::{
    decode_event, ContentUpdate, DecodedEvent, EventDecoder, RenderingUpdate, TopologyUpdate,
    TransportUpdate,
};
pub use model::{
    DeviceState, MediaKind, MediaState, PositionRecord, SpeakerId, TransportState, SOURCE_LINEIN,
    SOURCE_TV,
};
pub use reconciler::{MediaPoll, Reconciler};
pub use store::{StateChange, StateStore};
pub use topology::{Membership, Pending, TopologyStore};

pub use error::{Result, StateError};

pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
