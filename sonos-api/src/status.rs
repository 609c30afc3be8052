//! Raw poll results
//!
//! These mirror what the device returns: time spans stay as `H:MM:SS`
//! strings and transport states as their UPnP names. Interpretation lives in
//! `sonos-state`.

use serde::{Deserialize, Serialize};

use crate::SpeakerId;

/// Static information read once per (re)connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerInfo {
    pub zone_name: String,
    pub model_name: String,
}

/// Result of `GetTransportInfo` plus the play mode's shuffle bit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportInfo {
    /// "PLAYING", "PAUSED_PLAYBACK", "STOPPED", "TRANSITIONING", ...
    pub state: String,
    pub shuffle: bool,
}

/// Result of `GetPositionInfo` merged with the parsed track metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackInfo {
    pub uri: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_art: Option<String>,
    /// Track duration as reported, `H:MM:SS`
    pub duration: Option<String>,
    /// Relative position in the track as reported (`RelTime`)
    pub position: Option<String>,
    /// 1-based queue position, when playing from the queue
    pub queue_position: Option<u32>,
}

/// Result of `GetMediaInfo`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub current_uri: String,
    /// DIDL-Lite document describing the current URI
    pub current_uri_metadata: Option<String>,
}

/// Rendering state; night mode and speech enhancement only exist on home
/// theater products and are `None` elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderingInfo {
    pub volume: u8,
    pub mute: bool,
    pub night_mode: Option<bool>,
    pub dialog_mode: Option<bool>,
}

/// Which physical input the device is playing, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputSource {
    /// Queue, stream or anything that is not a hardware input
    #[default]
    Media,
    LineIn,
    Tv,
}

/// A device's own view of the group it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub coordinator: SpeakerId,
    /// All members, coordinator included, in device order
    pub members: Vec<SpeakerId>,
}

impl GroupView {
    /// Members ordered coordinator first, without duplicates
    pub fn ordered(&self) -> Vec<SpeakerId> {
        let mut ordered = vec![self.coordinator.clone()];
        for member in &self.members {
            if !ordered.contains(member) {
                ordered.push(member.clone());
            }
        }
        ordered
    }
}

/// An entry of the household's favorites list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub title: String,
    /// `None` when the favorite's resource could not be parsed
    pub uri: Option<String>,
    pub metadata: Option<String>,
}

impl Favorite {
    pub fn is_valid(&self) -> bool {
        self.uri.as_deref().is_some_and(|uri| !uri.is_empty())
    }
}
