//! Decoding raw event variables into typed updates
//!
//! Decoders never fail: a variable that cannot be parsed is dropped with a
//! debug log and the rest of the event still applies.

use sonos_api::{EventData, RawEvent, Service};
use tracing::debug;

use crate::decoders::default_decoders;
use crate::model::{SpeakerId, TransportState};

/// Typed content of one event
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    Transport(TransportUpdate),
    Rendering(RenderingUpdate),
    Topology(TopologyUpdate),
    Content(ContentUpdate),
}

/// AVTransport event content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportUpdate {
    pub state: Option<TransportState>,
    pub track_uri: Option<String>,
    /// "On Now" text of a radio show
    pub radio_show: Option<String>,
}

/// RenderingControl event content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderingUpdate {
    pub volume: Option<u8>,
    pub mute: Option<bool>,
    pub night_mode: Option<bool>,
    pub dialog_mode: Option<bool>,
}

impl RenderingUpdate {
    pub fn is_empty(&self) -> bool {
        *self == RenderingUpdate::default()
    }
}

/// ZoneGroupTopology event content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyUpdate {
    /// Event had no group attribute; proves delivery, carries nothing
    NoGroupAttribute,
    /// Attribute present but empty; the device has to be asked
    Unresolved,
    /// Member UIDs, coordinator first
    Members(Vec<SpeakerId>),
}

/// ContentDirectory event content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    pub favorites_changed: bool,
}

/// Converts one service's raw variables into a [`DecodedEvent`]
pub trait EventDecoder: Send + Sync {
    fn service(&self) -> Service;

    fn decode(&self, data: &EventData) -> Option<DecodedEvent>;
}

/// Decode with the decoder registered for the event's service
pub fn decode_event(event: &RawEvent) -> Option<DecodedEvent> {
    let decoded = default_decoders()
        .iter()
        .find(|decoder| decoder.service() == event.service)
        .and_then(|decoder| decoder.decode(&event.data));
    if decoded.is_none() {
        debug!(
            "No usable content in {} event from {}",
            event.service, event.speaker_id
        );
    }
    decoded
}

/// Parse a "1"/"0"/"true"/"false" flag
pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Drop empty and "NOT_IMPLEMENTED" values
pub(crate) fn non_empty(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != "NOT_IMPLEMENTED")
        .map(str::to_string)
}
