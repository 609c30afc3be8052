//! AVTransport event decoder

use sonos_api::{EventData, Service};
use tracing::debug;

use crate::decoder::{non_empty, DecodedEvent, EventDecoder, TransportUpdate};
use crate::model::TransportState;

/// Decoder for AVTransport events
///
/// The event's transport state, when present and known, is preferred over a
/// poll; metadata-heavy fields are still polled by the engine.
pub struct AVTransportDecoder;

impl EventDecoder for AVTransportDecoder {
    fn service(&self) -> Service {
        Service::AVTransport
    }

    fn decode(&self, data: &EventData) -> Option<DecodedEvent> {
        let EventData::AVTransport(data) = data else {
            return None;
        };

        let state = non_empty(&data.transport_state).and_then(|raw| {
            let state = TransportState::from_upnp(&raw);
            if state.is_none() {
                debug!("Unknown transport state '{}'", raw);
            }
            state
        });

        Some(DecodedEvent::Transport(TransportUpdate {
            state,
            track_uri: non_empty(&data.current_track_uri),
            radio_show: non_empty(&data.radio_show),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonos_api::TransportEvent;

    fn decode(event: TransportEvent) -> TransportUpdate {
        match AVTransportDecoder.decode(&EventData::AVTransport(event)) {
            Some(DecodedEvent::Transport(update)) => update,
            other => panic!("unexpected decode result {:?}", other),
        }
    }

    #[test]
    fn test_decodes_state_and_show() {
        let update = decode(TransportEvent {
            transport_state: Some("PAUSED_PLAYBACK".into()),
            current_track_uri: Some("x-sonosapi-stream:s1".into()),
            radio_show: Some("Morning Show,p1".into()),
            ..TransportEvent::default()
        });
        assert_eq!(update.state, Some(TransportState::Paused));
        assert_eq!(update.track_uri.as_deref(), Some("x-sonosapi-stream:s1"));
        assert_eq!(update.radio_show.as_deref(), Some("Morning Show,p1"));
    }

    #[test]
    fn test_transitioning_passes_through_decoder() {
        let update = decode(TransportEvent {
            transport_state: Some("TRANSITIONING".into()),
            ..TransportEvent::default()
        });
        assert_eq!(update.state, Some(TransportState::Transitioning));
    }

    #[test]
    fn test_unknown_state_dropped() {
        let update = decode(TransportEvent {
            transport_state: Some("RECORDING".into()),
            current_track_uri: Some("NOT_IMPLEMENTED".into()),
            ..TransportEvent::default()
        });
        assert_eq!(update, TransportUpdate::default());
    }

    #[test]
    fn test_other_service_payload_ignored() {
        let data = EventData::ContentDirectory(Default::default());
        assert!(AVTransportDecoder.decode(&data).is_none());
    }
}
