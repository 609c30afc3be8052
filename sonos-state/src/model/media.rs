//! What a speaker is playing

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hardware input labels, also used as source names
pub const SOURCE_LINEIN: &str = "Line-in";
pub const SOURCE_TV: &str = "TV";

/// Kind of media currently loaded
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaKind {
    #[default]
    None,
    /// Playing a hardware input; carries the input label
    LineIn(String),
    /// Broadcast stream without duration or position
    Radio,
    /// Discrete track with duration and position
    Track,
}

/// Last confirmed playback position and when it was read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub position: Duration,
    pub updated_at: DateTime<Utc>,
}

impl PositionRecord {
    pub fn new(position: Duration, updated_at: DateTime<Utc>) -> Self {
        Self {
            position,
            updated_at,
        }
    }

    /// Position the device should be at by `now`, assuming it kept playing
    pub fn extrapolate(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = (now - self.updated_at).to_std().unwrap_or(Duration::ZERO);
        self.position.saturating_add(elapsed)
    }
}

/// Media fields exposed for a speaker
///
/// Only meaningful on coordinators; followers show their coordinator's.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaState {
    pub kind: MediaKind,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub image_url: Option<String>,
    pub duration: Option<Duration>,
    pub position: Option<PositionRecord>,
    /// Input label or matching favorite's title
    pub source_name: Option<String>,
}
