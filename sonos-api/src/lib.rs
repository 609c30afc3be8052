//! # Sonos device proxy contract
//!
//! Typed surface between the synchronization engine and the devices it
//! manages. The engine never speaks SOAP or parses UPnP event bodies itself;
//! it asks a [`DeviceProxy`] for polls, sends it [`Command`]s and receives
//! [`RawEvent`]s through an [`EventSink`].
//!
//! ```rust,ignore
//! use sonos_api::{Command, DeviceProxy, SpeakerId};
//!
//! let kitchen = SpeakerId::new("uuid:RINCON_000E58A0123401400");
//! proxy.send_command(&kitchen, &Command::Join { coordinator: living_room })?;
//! ```

pub mod command;
pub mod error;
pub mod event;
pub mod id;
pub mod proxy;
pub mod service;
pub mod status;

pub use command::{AlarmUpdate, Command, IGNORABLE_TRANSPORT_FAULTS};
pub use error::{ApiError, Result};
pub use event::{
    ContentEvent, EventData, EventSink, RawEvent, RenderingEvent, TopologyEvent, TransportEvent,
};
pub use id::SpeakerId;
pub use proxy::{DeviceProxy, EventSubscription};
pub use service::Service;
pub use status::{
    Favorite, GroupView, InputSource, MediaInfo, RenderingInfo, SpeakerInfo, TrackInfo,
    TransportInfo,
};
