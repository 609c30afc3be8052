//! Transport state enumeration

use serde::{Deserialize, Serialize};

/// Transport state of a speaker as last recorded by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    /// Currently playing audio
    Playing,
    /// Playback is paused
    Paused,
    /// Playback is stopped
    #[default]
    Stopped,
    /// Between two states; never recorded
    Transitioning,
    /// Device unreachable
    Off,
    /// Nothing loaded (`NO_MEDIA_PRESENT`)
    Idle,
}

impl TransportState {
    /// Parse a UPnP transport state string
    ///
    /// Handles the values Sonos players report:
    /// - "PLAYING"
    /// - "PAUSED_PLAYBACK"
    /// - "STOPPED"
    /// - "TRANSITIONING"
    /// - "NO_MEDIA_PRESENT"
    ///
    /// Returns `None` for anything else.
    pub fn from_upnp(state: &str) -> Option<Self> {
        match state.trim().to_uppercase().as_str() {
            "PLAYING" => Some(TransportState::Playing),
            "PAUSED_PLAYBACK" | "PAUSED" => Some(TransportState::Paused),
            "STOPPED" => Some(TransportState::Stopped),
            "TRANSITIONING" => Some(TransportState::Transitioning),
            "NO_MEDIA_PRESENT" => Some(TransportState::Idle),
            _ => None,
        }
    }

    /// Terminal states are the only ones worth recording
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportState::Transitioning)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PLAYING", Some(TransportState::Playing))]
    #[case("playing", Some(TransportState::Playing))]
    #[case("PAUSED_PLAYBACK", Some(TransportState::Paused))]
    #[case("PAUSED", Some(TransportState::Paused))]
    #[case("STOPPED", Some(TransportState::Stopped))]
    #[case("TRANSITIONING", Some(TransportState::Transitioning))]
    #[case("NO_MEDIA_PRESENT", Some(TransportState::Idle))]
    #[case("UNKNOWN", None)]
    #[case("", None)]
    fn test_from_upnp(#[case] raw: &str, #[case] expected: Option<TransportState>) {
        assert_eq!(TransportState::from_upnp(raw), expected);
    }

    #[test]
    fn test_only_transitioning_is_not_terminal() {
        assert!(!TransportState::Transitioning.is_terminal());
        for state in [
            TransportState::Playing,
            TransportState::Paused,
            TransportState::Stopped,
            TransportState::Off,
            TransportState::Idle,
        ] {
            assert!(state.is_terminal());
        }
    }

    #[test]
    fn test_default() {
        assert_eq!(TransportState::default(), TransportState::Stopped);
    }
}
