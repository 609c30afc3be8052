//! ZoneGroupTopology event decoder
//!
//! Only the group member list matters here. Whether it gets applied depends
//! on who resolved it, which the engine decides.

use sonos_api::{EventData, Service};

use crate::decoder::{DecodedEvent, EventDecoder, TopologyUpdate};
use crate::model::SpeakerId;

/// Decoder for ZoneGroupTopology events
pub struct TopologyDecoder;

impl EventDecoder for TopologyDecoder {
    fn service(&self) -> Service {
        Service::ZoneGroupTopology
    }

    fn decode(&self, data: &EventData) -> Option<DecodedEvent> {
        let EventData::ZoneGroupTopology(data) = data else {
            return None;
        };

        let update = match data.zone_player_uuids_in_group.as_deref() {
            None => TopologyUpdate::NoGroupAttribute,
            Some(raw) => {
                let members: Vec<SpeakerId> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|uid| !uid.is_empty())
                    .map(SpeakerId::new)
                    .collect();
                if members.is_empty() {
                    TopologyUpdate::Unresolved
                } else {
                    TopologyUpdate::Members(members)
                }
            }
        };
        Some(DecodedEvent::Topology(update))
    }
}
