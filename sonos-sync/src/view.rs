//! Host-facing device view

use serde::Serialize;

use sonos_api::SpeakerId;
use sonos_state::{DeviceState, MediaState, TransportState, SOURCE_LINEIN, SOURCE_TV};

use crate::engine::SyncEngine;

/// Hardware inputs implied by a model name
pub fn model_inputs(model: &str) -> &'static [&'static str] {
    let model = model.to_uppercase();
    if model.contains("PLAY:5") || model.contains("CONNECT") {
        &[SOURCE_LINEIN]
    } else if model.contains("PLAYBAR") {
        &[SOURCE_LINEIN, SOURCE_TV]
    } else if model.contains("BEAM") {
        &[SOURCE_TV]
    } else {
        &[]
    }
}

/// Favorite titles followed by the model's inputs
pub fn source_list(state: &DeviceState) -> Vec<String> {
    state
        .favorites
        .iter()
        .map(|favorite| favorite.title.clone())
        .chain(model_inputs(&state.model).iter().map(|s| s.to_string()))
        .collect()
}

/// One speaker as a host sees it
///
/// Volume and the rendering flags belong to the speaker itself. Transport,
/// shuffle, media and sources are read through its coordinator, so every
/// member of a group reports the same playback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceView {
    pub speaker_id: SpeakerId,
    pub name: String,
    pub model: String,
    pub available: bool,
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    pub night_sound: Option<bool>,
    pub speech_enhance: Option<bool>,
    /// `None` when the speaker leads its group
    pub coordinator: Option<SpeakerId>,
    pub group: Vec<SpeakerId>,
    pub transport: TransportState,
    pub shuffle: bool,
    pub media: MediaState,
    pub source_list: Vec<String>,
}

impl DeviceView {
    pub(crate) fn new(
        speaker_id: SpeakerId,
        coordinator: Option<SpeakerId>,
        group: Vec<SpeakerId>,
        own: DeviceState,
        playback: DeviceState,
    ) -> Self {
        Self {
            speaker_id,
            name: own.name,
            model: own.model,
            available: own.available,
            volume: own.volume,
            muted: own.muted,
            night_sound: own.night_sound,
            speech_enhance: own.speech_enhance,
            coordinator,
            group,
            transport: playback.transport,
            shuffle: playback.shuffle,
            source_list: source_list(&playback),
            media: playback.media,
        }
    }

    pub fn is_coordinator(&self) -> bool {
        self.coordinator.is_none()
    }

    /// Name of the current input or station
    pub fn source(&self) -> Option<&str> {
        self.media.source_name.as_deref()
    }
}

impl SyncEngine {
    /// Sources selectable on `speaker`, as seen through its coordinator
    pub fn source_list(&self, speaker: &SpeakerId) -> Vec<String> {
        self.device_view(speaker)
            .map(|view| view.source_list)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use proptest::prelude::*;
    use sonos_api::Favorite;

    #[rstest]
    #[case("Sonos PLAY:5", &[SOURCE_LINEIN])]
    #[case("Sonos Connect:Amp", &[SOURCE_LINEIN])]
    #[case("Sonos Playbar", &[SOURCE_LINEIN, SOURCE_TV])]
    #[case("Sonos Beam", &[SOURCE_TV])]
    #[case("Sonos One", &[])]
    fn test_model_inputs(#[case] model: &str, #[case] expected: &[&str]) {
        assert_eq!(model_inputs(model), expected);
    }

    #[test]
    fn test_source_list_lists_favorites_first() {
        let mut state = DeviceState::new("Living Room", "Sonos Beam");
        state.favorites = vec![Favorite {
            title: "Jazz FM".to_string(),
            uri: Some("x-sonosapi-stream:s1".to_string()),
            metadata: None,
        }];
        assert_eq!(source_list(&state), vec!["Jazz FM", "TV"]);
    }

    #[test]
    fn test_view_reads_playback_from_coordinator() {
        let mut own = DeviceState::new("Kitchen", "Sonos One");
        own.volume = Some(12);
        let mut playback = DeviceState::new("Living Room", "Sonos Playbar");
        playback.transport = TransportState::Playing;
        playback.volume = Some(40);

        let view = DeviceView::new(
            SpeakerId::new("KITCHEN"),
            Some(SpeakerId::new("LIVING")),
            vec![SpeakerId::new("LIVING"), SpeakerId::new("KITCHEN")],
            own,
            playback,
        );
        assert_eq!(view.volume, Some(12));
        assert_eq!(view.transport, TransportState::Playing);
        assert_eq!(view.source_list, vec!["Line-in", "TV"]);
        assert!(!view.is_coordinator());
    }

    proptest! {
        #[test]
        fn prop_source_list_keeps_favorite_order(
            titles in prop::collection::vec("[A-Za-z ]{1,12}", 0..8),
            model in "(Sonos )?(PLAY:5|Playbar|Beam|One|Connect)",
        ) {
            let mut state = DeviceState::new("Den", model.as_str());
            state.favorites = titles
                .iter()
                .map(|title| Favorite {
                    title: title.clone(),
                    uri: Some("x-rincon-playlist:1".to_string()),
                    metadata: None,
                })
                .collect();

            let sources = source_list(&state);
            prop_assert_eq!(sources.len(), titles.len() + model_inputs(&model).len());
            prop_assert_eq!(&sources[..titles.len()], &titles[..]);
        }
    }
}
