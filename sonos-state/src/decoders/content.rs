//! ContentDirectory event decoder

use sonos_api::{EventData, Service};

use crate::decoder::{ContentUpdate, DecodedEvent, EventDecoder};

/// Container id prefix of the favorites list
const FAVORITES_CONTAINER: &str = "FV:";

/// Decoder for ContentDirectory events
///
/// Favorites are refetched when the favorites container changed, or when the
/// event does not say which containers changed.
pub struct ContentDirectoryDecoder;

impl EventDecoder for ContentDirectoryDecoder {
    fn service(&self) -> Service {
        Service::ContentDirectory
    }

    fn decode(&self, data: &EventData) -> Option<DecodedEvent> {
        let EventData::ContentDirectory(data) = data else {
            return None;
        };

        let favorites_changed = match data.container_update_ids.as_deref() {
            Some(ids) if !ids.trim().is_empty() => ids
                .split(',')
                .any(|part| part.trim().starts_with(FAVORITES_CONTAINER)),
            _ => true,
        };
        Some(DecodedEvent::Content(ContentUpdate { favorites_changed }))
    }
}
