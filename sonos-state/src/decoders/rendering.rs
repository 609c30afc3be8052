//! RenderingControl event decoder
//!
//! Handles volume, mute, night sound and speech enhancement.

use sonos_api::{EventData, Service};
use tracing::debug;

use crate::decoder::{non_empty, parse_flag, DecodedEvent, EventDecoder, RenderingUpdate};

/// Decoder for RenderingControl events
pub struct RenderingControlDecoder;

impl EventDecoder for RenderingControlDecoder {
    fn service(&self) -> Service {
        Service::RenderingControl
    }

    fn decode(&self, data: &EventData) -> Option<DecodedEvent> {
        let EventData::RenderingControl(data) = data else {
            return None;
        };

        let volume = non_empty(&data.volume).and_then(|raw| match raw.parse::<u32>() {
            Ok(v) => Some(v.min(100) as u8),
            Err(_) => {
                debug!("Ignoring malformed volume '{}'", raw);
                None
            }
        });

        let flag = |field: &Option<String>, name: &str| {
            non_empty(field).and_then(|raw| {
                let parsed = parse_flag(&raw);
                if parsed.is_none() {
                    debug!("Ignoring malformed {} '{}'", name, raw);
                }
                parsed
            })
        };

        Some(DecodedEvent::Rendering(RenderingUpdate {
            volume,
            mute: flag(&data.mute, "mute"),
            night_mode: flag(&data.night_mode, "night mode"),
            dialog_mode: flag(&data.dialog_level, "dialog level"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonos_api::RenderingEvent;

    fn decode(event: RenderingEvent) -> RenderingUpdate {
        match RenderingControlDecoder.decode(&EventData::RenderingControl(event)) {
            Some(DecodedEvent::Rendering(update)) => update,
            other => panic!("unexpected decode result {:?}", other),
        }
    }

    #[test]
    fn test_full_event() {
        let update = decode(RenderingEvent {
            volume: Some("42".into()),
            mute: Some("1".into()),
            night_mode: Some("0".into()),
            dialog_level: Some("1".into()),
        });
        assert_eq!(
            update,
            RenderingUpdate {
                volume: Some(42),
                mute: Some(true),
                night_mode: Some(false),
                dialog_mode: Some(true),
            }
        );
    }

    #[test]
    fn test_volume_clamped() {
        let update = decode(RenderingEvent {
            volume: Some("250".into()),
            ..RenderingEvent::default()
        });
        assert_eq!(update.volume, Some(100));
    }

    #[test]
    fn test_malformed_fields_dropped() {
        let update = decode(RenderingEvent {
            volume: Some("loud".into()),
            mute: Some("maybe".into()),
            ..RenderingEvent::default()
        });
        assert!(update.is_empty());
    }
}
