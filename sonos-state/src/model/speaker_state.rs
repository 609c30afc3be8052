//! Observable per-device state

use serde::{Deserialize, Serialize};

use sonos_api::Favorite;

use super::{MediaState, TransportState};

/// Complete observable state of one speaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub name: String,
    pub model: String,
    pub available: bool,
    /// Last terminal transport state
    pub transport: TransportState,
    pub shuffle: bool,
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    /// `None` when the device has no night sound setting
    pub night_sound: Option<bool>,
    /// `None` when the device has no speech enhancement setting
    pub speech_enhance: Option<bool>,
    pub media: MediaState,
    /// Valid favorites only
    pub favorites: Vec<Favorite>,
}

impl DeviceState {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            available: true,
            transport: TransportState::default(),
            shuffle: false,
            volume: None,
            muted: None,
            night_sound: None,
            speech_enhance: None,
            media: MediaState::default(),
            favorites: Vec::new(),
        }
    }

    /// Record a transport state; transitional states are ignored
    ///
    /// Returns true if the recorded state changed.
    pub fn record_transport(&mut self, state: TransportState) -> bool {
        if !state.is_terminal() || self.transport == state {
            return false;
        }
        self.transport = state;
        true
    }

    /// Clear everything a reachable device would report
    pub fn reset_unavailable(&mut self) {
        self.available = false;
        self.transport = TransportState::Off;
        self.volume = None;
        self.muted = None;
        self.media = MediaState::default();
    }

    /// Favorite whose resource URI is `uri`
    pub fn favorite_by_uri(&self, uri: &str) -> Option<&Favorite> {
        self.favorites
            .iter()
            .find(|fav| fav.uri.as_deref() == Some(uri))
    }

    pub fn favorite_by_title(&self, title: &str) -> Option<&Favorite> {
        self.favorites.iter().find(|fav| fav.title == title)
    }
}
