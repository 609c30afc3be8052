//! Model types for sonos-state

mod media;
mod playback_state;
mod speaker_state;

pub use media::{MediaKind, MediaState, PositionRecord, SOURCE_LINEIN, SOURCE_TV};
pub use playback_state::TransportState;
pub use speaker_state::DeviceState;

pub use sonos_api::SpeakerId;
