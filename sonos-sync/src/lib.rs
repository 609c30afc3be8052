//! # Sonos group synchronization engine
//!
//! Keeps a local model of a Sonos household's group topology and playback
//! state in sync with the devices, and offers group mutations that wait for
//! the household to confirm them:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sonos_sync::{EngineConfig, SyncEngine};
//!
//! let engine = SyncEngine::new(Arc::new(proxy), EngineConfig::default())?;
//! engine.add_device(&living_room).await?;
//! engine.add_device(&kitchen).await?;
//! engine.spawn_refresh_loop();
//!
//! // Announce something, then put everything back
//! engine.snapshot(&[kitchen.clone()], true).await;
//! engine.unjoin(&[kitchen.clone()]).await;
//! engine.play_media(&kitchen, "x-file-cifs://nas/chime.mp3", false).await;
//! engine.restore(&[kitchen.clone()], true).await;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! host ──→ SyncEngine ──→ Dispatcher ──→ WorkerPool ──→ DeviceProxy
//!              │                                           │
//!              │       per-speaker queue ←── RawEvent ─────┘
//!              │              │
//!              ├── TopologyStore ←── update_groups
//!              ├── StateStore    ←── update_media / rendering / favorites
//!              └── ConvergenceWaiter (join, unjoin, restore)
//! ```
//!
//! All group mutations hold one topology lock for their whole run. Device
//! calls block and run on a bounded worker pool, never on an event queue.

mod controls;
mod dispatch;
mod engine;
mod groups;
mod ingest;
mod refresh;

pub mod config;
pub mod error;
pub mod snapshot;
pub mod view;
pub mod worker;

pub use config::EngineConfig;
pub use dispatch::CommandOutcome;
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use groups::GroupOutcome;
pub use snapshot::{MediaSnapshot, Snapshot};
pub use view::DeviceView;

// Re-export commonly used types from the lower crates
pub use sonos_api::{AlarmUpdate, ApiError, Command, DeviceProxy, Service, SpeakerId};
pub use sonos_state::{
    init_logging, init_logging_from_env, Convergence, DeviceState, LoggingMode, MediaKind,
    MediaState, StateChange, TransportState,
};
