//! Raw event payloads delivered by device subscriptions

use tokio::sync::mpsc;

use crate::{Service, SpeakerId};

/// Channel a subscription pushes its events into
pub type EventSink = mpsc::UnboundedSender<RawEvent>;

/// One notification from one device
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub speaker_id: SpeakerId,
    pub service: Service,
    pub data: EventData,
}

impl RawEvent {
    pub fn new(speaker_id: SpeakerId, data: EventData) -> Self {
        Self {
            service: data.service(),
            speaker_id,
            data,
        }
    }
}

/// Service-specific event variables, as strings straight off the wire
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    AVTransport(TransportEvent),
    RenderingControl(RenderingEvent),
    ZoneGroupTopology(TopologyEvent),
    ContentDirectory(ContentEvent),
}

impl EventData {
    pub fn service(&self) -> Service {
        match self {
            EventData::AVTransport(_) => Service::AVTransport,
            EventData::RenderingControl(_) => Service::RenderingControl,
            EventData::ZoneGroupTopology(_) => Service::ZoneGroupTopology,
            EventData::ContentDirectory(_) => Service::ContentDirectory,
        }
    }
}

/// AVTransport `LastChange` variables
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportEvent {
    pub transport_state: Option<String>,
    pub current_track_uri: Option<String>,
    pub current_track_metadata: Option<String>,
    /// "On Now" text of a radio show, e.g. "Morning Edition, hosted by ..."
    pub radio_show: Option<String>,
}

/// RenderingControl `LastChange` variables (Master channel)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderingEvent {
    pub volume: Option<String>,
    pub mute: Option<String>,
    pub night_mode: Option<String>,
    pub dialog_level: Option<String>,
}

/// ZoneGroupTopology event variables
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopologyEvent {
    /// Comma separated member UIDs, coordinator first.
    ///
    /// `None` when the event did not carry the attribute at all.
    pub zone_player_uuids_in_group: Option<String>,
}

/// ContentDirectory event variables
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentEvent {
    pub container_update_ids: Option<String>,
}
